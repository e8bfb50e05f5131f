//! 8x8 tile blitting.

use crate::tile_info::TileInfo;
use rom_core::gfx::IndexedBitmap;

/// Pixel position of a tile's 8x8 block inside its 256-tile sheet.
#[inline]
pub fn tile_source_origin(tile_id: u16) -> (usize, usize) {
    let id = tile_id as usize;
    ((id % 16) * 8, ((id % 256) / 16) * 8)
}

/// Copy one 8x8 tile from `sheet` into `dst` at (`dst_x`, `dst_y`).
///
/// Source pixels are palette indices; an index at or past `palette_len` is
/// transparent. Pixels landing outside `dst`, or read from outside `sheet`,
/// are skipped. Returns the number of pixels written.
pub fn blit_tile(
    dst: &mut IndexedBitmap,
    dst_x: usize,
    dst_y: usize,
    sheet: &IndexedBitmap,
    tile: &TileInfo,
    palette_len: usize,
) -> usize {
    let (src_x, src_y) = tile_source_origin(tile.id);
    let mut written = 0;

    for py in 0..8 {
        for px in 0..8 {
            let Some(color_index) = sheet.get(src_x + px, src_y + py) else {
                continue;
            };
            if color_index as usize >= palette_len {
                continue;
            }
            let x = if tile.horizontal_mirror { 7 - px } else { px };
            let y = if tile.vertical_mirror { 7 - py } else { py };
            if dst.set(dst_x + x, dst_y + y, color_index) {
                written += 1;
            }
        }
    }
    written
}

/// Solid colour used in place of a tile whose sheet is unavailable.
///
/// `None` for an empty palette.
pub fn placeholder_color(tile_id: u16, palette_len: usize) -> Option<u8> {
    let last = palette_len.checked_sub(1)?;
    let index = ((tile_id as usize % 16) + 1).min(last);
    Some(index.min(u8::MAX as usize) as u8)
}

/// Fill the tile's 8x8 destination block with its placeholder colour.
pub fn fill_placeholder(
    dst: &mut IndexedBitmap,
    dst_x: usize,
    dst_y: usize,
    tile: &TileInfo,
    palette_len: usize,
) {
    if let Some(color) = placeholder_color(tile.id, palette_len) {
        dst.fill_rect(dst_x, dst_y, 8, 8, color);
    }
}
