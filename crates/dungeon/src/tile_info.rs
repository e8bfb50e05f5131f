//! Tile references as stored in the object tile tables.
//!
//! One 16-bit word per 8x8 tile, `vhoppp cccccccccc` from MSB to LSB:
//! vertical mirror, horizontal mirror, priority, palette, tile id.

use serde::{Deserialize, Serialize};

/// One 8x8 graphics cell reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TileInfo {
    /// 10-bit tile id
    pub id: u16,
    /// 3-bit palette
    pub palette: u8,
    pub horizontal_mirror: bool,
    pub vertical_mirror: bool,
    pub priority: bool,
}

impl TileInfo {
    pub const MAX_ID: u16 = 0x3FF;
    pub const MAX_PALETTE: u8 = 7;

    /// Build a tile reference, masking id and palette to their field widths.
    pub fn new(id: u16, palette: u8, horizontal_mirror: bool, vertical_mirror: bool, priority: bool) -> Self {
        Self {
            id: id & Self::MAX_ID,
            palette: palette & Self::MAX_PALETTE,
            horizontal_mirror,
            vertical_mirror,
            priority,
        }
    }

    pub fn from_word(word: u16) -> Self {
        Self {
            id: word & 0x3FF,
            palette: ((word >> 10) & 0x07) as u8,
            priority: word & 0x2000 != 0,
            horizontal_mirror: word & 0x4000 != 0,
            vertical_mirror: word & 0x8000 != 0,
        }
    }

    pub fn to_word(self) -> u16 {
        (self.id & 0x3FF)
            | (((self.palette & 0x07) as u16) << 10)
            | ((self.priority as u16) << 13)
            | ((self.horizontal_mirror as u16) << 14)
            | ((self.vertical_mirror as u16) << 15)
    }

    /// Index of the 256-tile graphics sheet holding this tile.
    pub fn sheet_index(self) -> usize {
        (self.id / 256) as usize
    }
}

/// 16x16 metatile built from four 8x8 tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tile16 {
    pub top_left: TileInfo,
    pub top_right: TileInfo,
    pub bottom_left: TileInfo,
    pub bottom_right: TileInfo,
}

impl Tile16 {
    pub fn new(top_left: TileInfo, top_right: TileInfo, bottom_left: TileInfo, bottom_right: TileInfo) -> Self {
        Self {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
        }
    }

    /// Quadrants in row-major order with their pixel offset inside the metatile.
    pub fn quadrants(&self) -> [(usize, usize, TileInfo); 4] {
        [
            (0, 0, self.top_left),
            (8, 0, self.top_right),
            (0, 8, self.bottom_left),
            (8, 8, self.bottom_right),
        ]
    }
}
