//! SNES planar tile decoding.
//!
//! SNES graphics store 8x8 tiles as bitplanes. Planes are paired per row:
//! bytes `2y` and `2y+1` hold planes 0 and 1 of row `y`. Higher planes follow
//! the first 16 bytes.
//!
//! - **2bpp**: 16 bytes per tile
//! - **3bpp**: 24 bytes; plane 2 is one byte per row at `16 + y`
//!   (the compressed format dungeon graphics are stored in)
//! - **4bpp**: 32 bytes; planes 2 and 3 interleaved like 0 and 1 at `16 + 2y`

use super::bitmap::IndexedBitmap;

/// Tiles per row of a decoded sheet
pub const SHEET_TILES_PER_ROW: usize = 16;

/// Planar tile formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileFormat {
    Snes2Bpp,
    Snes3Bpp,
    Snes4Bpp,
}

/// Trait for decoding tile data into pixel indices.
pub trait TileDecoder {
    /// Decode a single pixel from a tile.
    ///
    /// Returns the palette index for the pixel at (`x`, `y`), 0 when the
    /// coordinates or the data length are out of range.
    fn decode_pixel(&self, tile_data: &[u8], x: u8, y: u8) -> u8;

    /// Size of a single tile in bytes.
    fn tile_size(&self) -> usize;
}

#[inline]
fn plane_bit(byte: u8, x: u8) -> u8 {
    (byte >> (7 - x)) & 1
}

#[derive(Debug, Clone, Copy)]
pub struct Snes2BppDecoder;

impl TileDecoder for Snes2BppDecoder {
    fn decode_pixel(&self, tile_data: &[u8], x: u8, y: u8) -> u8 {
        if tile_data.len() < 16 || x > 7 || y > 7 {
            return 0;
        }
        let row = y as usize * 2;
        plane_bit(tile_data[row], x) | (plane_bit(tile_data[row + 1], x) << 1)
    }

    fn tile_size(&self) -> usize {
        16
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Snes3BppDecoder;

impl TileDecoder for Snes3BppDecoder {
    fn decode_pixel(&self, tile_data: &[u8], x: u8, y: u8) -> u8 {
        if tile_data.len() < 24 || x > 7 || y > 7 {
            return 0;
        }
        let low = Snes2BppDecoder.decode_pixel(&tile_data[..16], x, y);
        low | (plane_bit(tile_data[16 + y as usize], x) << 2)
    }

    fn tile_size(&self) -> usize {
        24
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Snes4BppDecoder;

impl TileDecoder for Snes4BppDecoder {
    fn decode_pixel(&self, tile_data: &[u8], x: u8, y: u8) -> u8 {
        if tile_data.len() < 32 || x > 7 || y > 7 {
            return 0;
        }
        let low = Snes2BppDecoder.decode_pixel(&tile_data[..16], x, y);
        let high = Snes2BppDecoder.decode_pixel(&tile_data[16..32], x, y);
        low | (high << 2)
    }

    fn tile_size(&self) -> usize {
        32
    }
}

/// Get a tile decoder for the specified format.
pub fn get_decoder(format: TileFormat) -> Box<dyn TileDecoder + Send + Sync> {
    match format {
        TileFormat::Snes2Bpp => Box::new(Snes2BppDecoder),
        TileFormat::Snes3Bpp => Box::new(Snes3BppDecoder),
        TileFormat::Snes4Bpp => Box::new(Snes4BppDecoder),
    }
}

/// Decode a run of planar tiles into a sheet bitmap, 16 tiles per row.
///
/// A trailing partial tile is ignored. The sheet is always 128 pixels wide;
/// its height grows in 8-pixel rows with the tile count.
pub fn decode_sheet(data: &[u8], format: TileFormat) -> IndexedBitmap {
    let decoder = get_decoder(format);
    let tile_size = decoder.tile_size();
    let tile_count = data.len() / tile_size;
    let rows = tile_count.div_ceil(SHEET_TILES_PER_ROW);
    let mut sheet = IndexedBitmap::new(SHEET_TILES_PER_ROW * 8, rows * 8);

    for (tile_index, tile) in data.chunks_exact(tile_size).enumerate() {
        let base_x = (tile_index % SHEET_TILES_PER_ROW) * 8;
        let base_y = (tile_index / SHEET_TILES_PER_ROW) * 8;
        for y in 0..8u8 {
            for x in 0..8u8 {
                let index = decoder.decode_pixel(tile, x, y);
                sheet.set(base_x + x as usize, base_y + y as usize, index);
            }
        }
    }
    sheet
}
