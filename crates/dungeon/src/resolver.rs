//! Object id -> tile list resolution.
//!
//! Each object id belongs to one of three subtypes. A subtype owns a table of
//! 16-bit pointers (one per object) relative to a shared tile-data base;
//! following the pointer yields `tile_count` consecutive tile words.
//!
//! Table coverage:
//!
//! - Subtype 1: ids `0x000..=0x0FF` (and any other id outside the two ranges
//!   below), indexed by `id & 0xFF`. 248 tile counts are tabulated.
//! - Subtype 2: ids `0x100..=0x1FF`, indexed by `(id - 0x100) & 0x3F`. The
//!   table only has 64 entries, so ids above 0x13F alias entries 0..63.
//! - Subtype 3: ids `0xF80..=0xFFF`, indexed by `(id - 0xF80) & 0x7F`.

use crate::layout::RomLayout;
use crate::tile_info::{Tile16, TileInfo};
use crate::{validate_object_id, DungeonError, Result};
use rom_core::logging::{log, LogCategory, LogLevel};
use rom_core::RomSource;
use serde::Serialize;
use std::sync::Arc;

/// Tile count used when no table or rule gives one.
const DEFAULT_TILE_COUNT: usize = 8;

#[rustfmt::skip]
static SUBTYPE1_TILE_COUNTS: [u8; 0xF8] = [
     4,  8,  8,  8,  8,  8,  8,  4,  4,  5,  5,  5,  5,  5,  5,  5, // 0x00
     5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5,  5, // 0x10
     5,  9,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  3,  6, // 0x20
     6,  1,  1, 16,  1,  1, 16, 16,  6,  8, 12, 12,  4,  8,  4,  3, // 0x30
     3,  3,  3,  3,  3,  3,  3,  0,  0,  8,  8,  4,  9, 16, 16, 16, // 0x40
     1, 18, 18,  4,  1,  8,  8,  1,  1,  1,  1, 18, 18, 15,  4,  3, // 0x50
     4,  8,  8,  8,  8,  8,  8,  4,  4,  3,  1,  1,  6,  6,  1,  1, // 0x60
    16,  1,  1, 16, 16,  8, 16, 16,  4,  1,  1,  4,  1,  4,  1,  8, // 0x70
     8, 12, 12, 12, 12, 18, 18,  8, 12,  4,  3,  3,  3,  1,  1,  6, // 0x80
     8,  8,  4,  4, 16,  4,  4,  1,  1,  1,  1,  1,  1,  1,  1,  1, // 0x90
     1,  1,  1,  1, 24,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1,  1, // 0xA0
     1,  1, 16,  3,  3,  8,  8,  8,  4,  4, 16,  4,  4,  4,  1,  1, // 0xB0
     1, 68,  1,  1,  8,  8,  8,  8,  8,  8,  8,  1,  1, 28, 28,  1, // 0xC0
     1,  8,  8,  0,  0,  0,  0,  1,  8,  8,  8,  8, 21, 16,  4,  8, // 0xD0
     8,  8,  8,  8,  8,  8,  8,  8,  8,  1,  1,  1,  1,  1,  1,  1, // 0xE0
     1,  1,  1,  1,  1,  1,  1,  1,                                 // 0xF0
];

/// Object record family, which selects the pointer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Subtype {
    One = 1,
    Two = 2,
    Three = 3,
}

impl Subtype {
    pub fn of(id: i16) -> Self {
        match id {
            0xF80..=0xFFF => Subtype::Three,
            0x100..=0x1FF => Subtype::Two,
            _ => Subtype::One,
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }

    /// Pointer-table slot for an id of this subtype.
    pub fn table_index(self, id: i16) -> usize {
        match self {
            Subtype::One => (id & 0xFF) as usize,
            Subtype::Two => ((id - 0x100) & 0x3F) as usize,
            Subtype::Three => ((id - 0xF80) & 0x7F) as usize,
        }
    }

    /// Number of tile words the object's draw routine consumes.
    pub fn tile_count(self, id: i16) -> usize {
        match self {
            Subtype::One => SUBTYPE1_TILE_COUNTS
                .get((id & 0xFF) as usize)
                .map(|&n| n as usize)
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_TILE_COUNT),
            Subtype::Two => match id {
                // 4x4 blocks and corners
                0x100..=0x10F => 16,
                // Weird corners
                0x110..=0x117 => 12,
                _ => DEFAULT_TILE_COUNT,
            },
            Subtype::Three => match id {
                0xFB1 | 0xFB2 | 0xF94 | 0xFCE | 0xFE7 | 0xFE8 | 0xFEC | 0xFED => 12,
                0xFC8 | 0xFE6 | 0xFEB | 0xFFA => 16,
                _ => DEFAULT_TILE_COUNT,
            },
        }
    }
}

/// Where an object's tiles and draw routine live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubtypeDescriptor {
    pub subtype: Subtype,
    /// Start of the subtype's tile pointer table
    pub table_base: usize,
    /// Slot within the table
    pub index: usize,
    /// Address of the 16-bit tile pointer (`table_base + index * 2`)
    pub table_address: usize,
    /// Address of the draw-routine pointer
    pub routine_address: usize,
    pub tile_count: usize,
}

/// Resolves object ids to tile lists by walking the ROM pointer tables.
///
/// Holds a shared, read-only handle to the ROM. The ROM must not change while
/// a resolve is in flight.
#[derive(Clone)]
pub struct ObjectTileResolver {
    rom: Option<Arc<dyn RomSource>>,
    layout: RomLayout,
}

impl ObjectTileResolver {
    pub fn new(rom: Arc<dyn RomSource>, layout: RomLayout) -> Self {
        Self {
            rom: Some(rom),
            layout,
        }
    }

    /// Resolver with no ROM; every resolve fails until one is attached.
    pub fn detached(layout: RomLayout) -> Self {
        Self { rom: None, layout }
    }

    pub fn attach_rom(&mut self, rom: Arc<dyn RomSource>) {
        self.rom = Some(rom);
    }

    pub fn layout(&self) -> &RomLayout {
        &self.layout
    }

    pub fn rom(&self) -> Option<&Arc<dyn RomSource>> {
        self.rom.as_ref()
    }

    pub fn determine_subtype(&self, id: i16) -> Subtype {
        Subtype::of(id)
    }

    pub fn descriptor(&self, id: i16) -> Result<SubtypeDescriptor> {
        validate_object_id(id)?;
        let subtype = Subtype::of(id);
        let (table_base, routine_offset) = match subtype {
            Subtype::One => (self.layout.subtype1_table, self.layout.subtype1_routine_offset),
            Subtype::Two => (self.layout.subtype2_table, self.layout.subtype2_routine_offset),
            Subtype::Three => (self.layout.subtype3_table, self.layout.subtype3_routine_offset),
        };
        let index = subtype.table_index(id);
        Ok(SubtypeDescriptor {
            subtype,
            table_base,
            index,
            table_address: table_base + index * 2,
            routine_address: table_base + routine_offset + index * 2,
            tile_count: subtype.tile_count(id),
        })
    }

    /// Resolve the ordered tile list for an object id.
    pub fn resolve_tiles(&self, id: i16) -> Result<Vec<TileInfo>> {
        validate_object_id(id)?;
        let rom = self
            .rom
            .as_ref()
            .ok_or_else(|| DungeonError::FailedPrecondition("no ROM attached".to_string()))?;
        let desc = self.descriptor(id)?;
        let size = rom.size();

        if desc.table_address + 1 >= size {
            return Err(DungeonError::OutOfRange(format!(
                "object {:#05X}: tile pointer at {:#06X} outside ROM ({:#X} bytes)",
                id, desc.table_address, size
            )));
        }
        let offset = rom.read_i16_le(desc.table_address)?;
        let data_address = self.layout.tile_data_base as i64 + offset as i64;
        let data_end = data_address + (desc.tile_count * 2) as i64;
        if data_address < 0 || data_end > size as i64 {
            return Err(DungeonError::OutOfRange(format!(
                "object {:#05X}: tile data {:#X}..{:#X} outside ROM ({:#X} bytes)",
                id, data_address, data_end, size
            )));
        }

        let data_address = data_address as usize;
        log(LogCategory::Resolver, LogLevel::Debug, || {
            format!(
                "object {:#05X}: subtype {} slot {} ptr {:#06X} -> {:+} -> {:#06X}, {} tiles",
                id,
                desc.subtype.number(),
                desc.index,
                desc.table_address,
                offset,
                data_address,
                desc.tile_count
            )
        });

        let bytes = rom.read_slice(data_address, desc.tile_count * 2)?;
        Ok(bytes
            .chunks_exact(2)
            .map(|w| TileInfo::from_word(u16::from_le_bytes([w[0], w[1]])))
            .collect())
    }

    /// Resolve and group into 16x16 metatiles.
    ///
    /// A trailing group with fewer than four tiles has no complete metatile
    /// and is left out.
    pub fn resolve_tile16s(&self, id: i16) -> Result<Vec<Tile16>> {
        let tiles = self.resolve_tiles(id)?;
        let remainder = tiles.len() % 4;
        if remainder != 0 {
            log(LogCategory::Resolver, LogLevel::Debug, || {
                format!(
                    "object {:#05X}: {} trailing tile(s) do not fill a 16x16 block",
                    id, remainder
                )
            });
        }
        Ok(tiles
            .chunks_exact(4)
            .map(|q| Tile16::new(q[0], q[1], q[2], q[3]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rom_core::RomImage;

    const ROM_SIZE: usize = 0x10000;

    /// ROM with one tile pointer per subtype pointing at distinct tile runs.
    fn make_rom(entries: &[(usize, i16)], tile_runs: &[(usize, &[u16])]) -> Arc<dyn RomSource> {
        let mut data = vec![0u8; ROM_SIZE];
        for &(addr, offset) in entries {
            data[addr..addr + 2].copy_from_slice(&offset.to_le_bytes());
        }
        for &(addr, words) in tile_runs {
            for (i, w) in words.iter().enumerate() {
                data[addr + i * 2..addr + i * 2 + 2].copy_from_slice(&w.to_le_bytes());
            }
        }
        Arc::new(RomImage::from_raw(data))
    }

    #[test]
    fn test_determine_subtype() {
        let resolver = ObjectTileResolver::detached(RomLayout::default());
        assert_eq!(resolver.determine_subtype(0x00), Subtype::One);
        assert_eq!(resolver.determine_subtype(0xFF), Subtype::One);
        assert_eq!(resolver.determine_subtype(0x100), Subtype::Two);
        assert_eq!(resolver.determine_subtype(0x150), Subtype::Two);
        assert_eq!(resolver.determine_subtype(0x200), Subtype::One);
        assert_eq!(resolver.determine_subtype(0xFB1), Subtype::Three);
    }

    #[test]
    fn test_table_indices() {
        assert_eq!(Subtype::One.table_index(0x2A), 0x2A);
        assert_eq!(Subtype::One.table_index(0x3FF), 0xFF);
        assert_eq!(Subtype::Two.table_index(0x13F), 0x3F);
        // Past the 64-entry table the index wraps
        assert_eq!(Subtype::Two.table_index(0x150), 0x10);
        assert_eq!(Subtype::Three.table_index(0xFB1), 0x31);
    }

    #[test]
    fn test_tile_counts() {
        assert_eq!(Subtype::One.tile_count(0x00), 4);
        assert_eq!(Subtype::One.tile_count(0xC1), 68);
        // Zero entries fall back to the default
        assert_eq!(Subtype::One.tile_count(0x47), 8);
        assert_eq!(Subtype::One.tile_count(0xD3), 8);
        // Ids past the table
        assert_eq!(Subtype::One.tile_count(0xF8), 8);
        assert_eq!(Subtype::Two.tile_count(0x105), 16);
        assert_eq!(Subtype::Two.tile_count(0x112), 12);
        assert_eq!(Subtype::Two.tile_count(0x120), 8);
        assert_eq!(Subtype::Three.tile_count(0xFB1), 12);
        assert_eq!(Subtype::Three.tile_count(0xFFA), 16);
        assert_eq!(Subtype::Three.tile_count(0xF99), 8);
    }

    #[test]
    fn test_descriptor_addresses() {
        let resolver = ObjectTileResolver::detached(RomLayout::default());
        let desc = resolver.descriptor(0x05).unwrap();
        assert_eq!(desc.table_address, 0x8000 + 0x0A);
        assert_eq!(desc.routine_address, 0x8000 + 0x200 + 0x0A);

        let desc = resolver.descriptor(0x101).unwrap();
        assert_eq!(desc.table_address, 0x83F0 + 2);
        assert_eq!(desc.routine_address, 0x83F0 + 0x80 + 2);

        let desc = resolver.descriptor(0xF81).unwrap();
        assert_eq!(desc.table_address, 0x84F0 + 2);
        assert_eq!(desc.routine_address, 0x84F0 + 0x100 + 2);
    }

    #[test]
    fn test_resolve_signed_offset() {
        // Subtype 1 id 0x01 (8 tiles) with a negative offset
        let words: Vec<u16> = (0..8).map(|i| 0x4000 | i).collect();
        let rom = make_rom(&[(0x8002, -0x100)], &[(0x1B52 - 0x100, &words[..])]);
        let resolver = ObjectTileResolver::new(rom, RomLayout::default());

        let tiles = resolver.resolve_tiles(0x01).unwrap();
        assert_eq!(tiles.len(), 8);
        for (i, tile) in tiles.iter().enumerate() {
            assert_eq!(tile.id, i as u16);
            assert!(tile.horizontal_mirror);
        }
    }

    #[test]
    fn test_resolve_big_chest_twelve_tiles() {
        let words: Vec<u16> = (0..12).map(|i| 0xFFFF - i).collect();
        let rom = make_rom(&[(0x84F0 + 0x31 * 2, 0x200)], &[(0x1B52 + 0x200, &words[..])]);
        let resolver = ObjectTileResolver::new(rom, RomLayout::default());

        let tiles = resolver.resolve_tiles(0xFB1).unwrap();
        assert_eq!(tiles.len(), 12);
        for tile in &tiles {
            assert!(tile.id <= 1023);
            assert!(tile.palette <= 7);
        }
        assert_eq!(resolver.resolve_tile16s(0xFB1).unwrap().len(), 3);
    }

    #[test]
    fn test_resolve_errors() {
        let detached = ObjectTileResolver::detached(RomLayout::default());
        assert!(matches!(
            detached.resolve_tiles(0x01),
            Err(DungeonError::FailedPrecondition(_))
        ));
        assert!(matches!(
            detached.resolve_tiles(-5),
            Err(DungeonError::InvalidArgument(_))
        ));
        assert!(matches!(
            detached.resolve_tiles(0x400),
            Err(DungeonError::InvalidArgument(_))
        ));

        // Pointer table beyond a tiny ROM
        let tiny: Arc<dyn RomSource> = Arc::new(RomImage::from_raw(vec![0; 0x100]));
        let resolver = ObjectTileResolver::new(tiny, RomLayout::default());
        assert!(matches!(
            resolver.resolve_tiles(0x01),
            Err(DungeonError::OutOfRange(_))
        ));

        // Offset pointing before the start of the ROM
        let rom = make_rom(&[(0x8002, i16::MIN)], &[]);
        let resolver = ObjectTileResolver::new(rom, RomLayout::default());
        assert!(matches!(
            resolver.resolve_tiles(0x01),
            Err(DungeonError::OutOfRange(_))
        ));

        // Tile run running off the end
        let rom = make_rom(&[(0x8002, 0x7FFF)], &[]);
        let layout = RomLayout {
            tile_data_base: ROM_SIZE - 0x7FFF - 4,
            ..RomLayout::default()
        };
        let resolver = ObjectTileResolver::new(rom, layout);
        assert!(matches!(
            resolver.resolve_tiles(0x01),
            Err(DungeonError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_tile16_grouping_drops_partial() {
        // id 0x09 resolves 5 tiles: one full metatile plus one leftover
        let words = [1u16, 2, 3, 4, 5];
        let rom = make_rom(&[(0x8000 + 0x09 * 2, 0)], &[(0x1B52, &words[..])]);
        let resolver = ObjectTileResolver::new(rom, RomLayout::default());
        let groups = resolver.resolve_tile16s(0x09).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].bottom_right.id, 4);
    }
}
