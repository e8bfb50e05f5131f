//! ROM layout constants and parser configuration.
//!
//! Every address here is a file offset (headerless). Defaults describe the
//! US release; other revisions override them from a JSON file.

use crate::{DungeonError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Addresses and ids that differ between ROM revisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RomLayout {
    /// Subtype 1 tile pointer table
    pub subtype1_table: usize,
    /// Subtype 2 tile pointer table
    pub subtype2_table: usize,
    /// Subtype 3 tile pointer table
    pub subtype3_table: usize,
    /// Distance from each tile pointer table to its draw-routine table
    pub subtype1_routine_offset: usize,
    pub subtype2_routine_offset: usize,
    pub subtype3_routine_offset: usize,
    /// Base the signed tile pointers are relative to
    pub tile_data_base: usize,
    /// 24-bit pointer to the per-room object data pointer table
    pub room_object_pointer: usize,
    /// 16-bit byte length of the chest table
    pub chests_length_pointer: usize,
    /// 24-bit pointer to the chest table
    pub chests_data_pointer: usize,
    pub staircase_ids: Vec<i16>,
    pub chest_id: i16,
    pub big_chest_id: i16,
    /// Staircases per room that receive a target; later ones are unnamed
    pub max_staircases: usize,
    /// Number of graphics sheets
    pub sheet_count: usize,
}

impl Default for RomLayout {
    fn default() -> Self {
        Self {
            subtype1_table: 0x8000,
            subtype2_table: 0x83F0,
            subtype3_table: 0x84F0,
            subtype1_routine_offset: 0x200,
            subtype2_routine_offset: 0x80,
            subtype3_routine_offset: 0x100,
            tile_data_base: 0x1B52,
            room_object_pointer: 0x874C,
            chests_length_pointer: 0xEBF6,
            chests_data_pointer: 0xEBFB,
            staircase_ids: vec![0x139, 0x138, 0x13B, 0x12E, 0x12D],
            chest_id: 0xF99,
            big_chest_id: 0xFB1,
            max_staircases: 4,
            sheet_count: 223,
        }
    }
}

impl RomLayout {
    /// Parse a layout from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DungeonError::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DungeonError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn is_staircase(&self, id: i16) -> bool {
        self.staircase_ids.contains(&id)
    }

    pub fn is_chest(&self, id: i16) -> bool {
        id == self.chest_id || id == self.big_chest_id
    }
}

/// Room stream parser limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Loop iterations (records plus sentinels) before parsing gives up
    pub max_iterations: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_iterations: 4096,
        }
    }
}
