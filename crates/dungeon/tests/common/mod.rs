//! Synthetic ROM and graphics fixtures shared by the integration tests.

#![allow(dead_code)]

use rom_core::gfx::{decode_sheet, IndexedBitmap, TileFormat};
use rom_core::rom::pc_to_snes;
use rom_core::{RomImage, RomSource};
use rom_dungeon::RomLayout;
use std::sync::Arc;

pub const ROOM_TABLE: usize = 0x1_8000;
pub const ROOM_DATA: usize = 0x2_0000;
pub const CHEST_TABLE: usize = 0x2_1000;
pub const ROM_SIZE: usize = 0x4_0000;

/// Room 0 object stream, header included.
///
/// Layer 0: id 0x00 at (1,1), id 0x07 at (3,2), id 0x08 at (0,4) whose tile
/// pointer leads before the ROM start. Layer 1: big chest at (5,5).
pub const ROOM0_STREAM: &[u8] = &[
    0x00, 0x00, // header
    0x04, 0x04, 0x00, //
    0x0C, 0x08, 0x07, //
    0x00, 0x10, 0x08, //
    0xFF, 0xFF, //
    0x15, 0x14, 0xFB, // 0xFB1 at (5,5)
    0xFF, 0xFF, //
    0xFF, 0xFF,
];

fn put_long(data: &mut [u8], at: usize, value: u32) {
    data[at..at + 3].copy_from_slice(&value.to_le_bytes()[..3]);
}

fn put_tiles(data: &mut [u8], layout: &RomLayout, table_address: usize, offset: i16, words: &[u16]) {
    data[table_address..table_address + 2].copy_from_slice(&offset.to_le_bytes());
    let base = (layout.tile_data_base as i64 + offset as i64) as usize;
    for (i, w) in words.iter().enumerate() {
        data[base + i * 2..base + i * 2 + 2].copy_from_slice(&w.to_le_bytes());
    }
}

pub fn build_rom() -> Arc<dyn RomSource> {
    let layout = RomLayout::default();
    let mut data = vec![0u8; ROM_SIZE];

    put_long(&mut data, layout.room_object_pointer, pc_to_snes(ROOM_TABLE));
    put_long(&mut data, ROOM_TABLE, pc_to_snes(ROOM_DATA));
    data[ROOM_DATA..ROOM_DATA + ROOM0_STREAM.len()].copy_from_slice(ROOM0_STREAM);

    // One big chest record for room 0
    put_long(&mut data, layout.chests_data_pointer, pc_to_snes(CHEST_TABLE));
    data[layout.chests_length_pointer..layout.chests_length_pointer + 2]
        .copy_from_slice(&3u16.to_le_bytes());
    data[CHEST_TABLE..CHEST_TABLE + 3].copy_from_slice(&[0x00, 0x80, 0x28]);

    // id 0x00: sheet 0 tiles 0..3
    put_tiles(&mut data, &layout, layout.subtype1_table, 0x100, &[0, 1, 2, 3]);
    // id 0x07: sheet 1, horizontally mirrored
    put_tiles(
        &mut data,
        &layout,
        layout.subtype1_table + 0x07 * 2,
        0x200,
        &[0x4100, 0x4101, 0x4102, 0x4103],
    );
    // id 0x08: pointer before the start of the ROM
    put_tiles(&mut data, &layout, layout.subtype1_table + 0x08 * 2, -0x7000, &[]);
    // Big chest 0xFB1: 12 tiles on sheet 0 with palette 2
    let chest: Vec<u16> = (0x10..0x1C).map(|id| 0x0800 | id).collect();
    put_tiles(&mut data, &layout, layout.subtype3_table + 0x31 * 2, 0x300, &chest);

    Arc::new(RomImage::from_raw(data))
}

/// Two 3bpp sheets of 256 tiles: every pixel of sheet `n` is `n + 1`.
pub fn build_sheets() -> Vec<IndexedBitmap> {
    (0..2u8)
        .map(|n| {
            let mut raw = vec![0u8; 256 * 24];
            for tile in raw.chunks_exact_mut(24) {
                for row in 0..8 {
                    // Planes 0 and 1 for row, one bit set per plane index
                    tile[row * 2] = if (n + 1) & 1 != 0 { 0xFF } else { 0 };
                    tile[row * 2 + 1] = if (n + 1) & 2 != 0 { 0xFF } else { 0 };
                }
            }
            decode_sheet(&raw, TileFormat::Snes3Bpp)
        })
        .collect()
}
