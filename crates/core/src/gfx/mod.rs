//! Graphics primitives shared by the decoders and renderers.
//!
//! - [`IndexedBitmap`]: 8-bit palette-index pixel buffer
//! - [`Palette`]: ARGB colour table, convertible from SNES CGRAM words
//! - [`TileFormat`] / [`TileDecoder`]: planar 8x8 tile decoding

pub mod bitmap;
pub mod palette;
pub mod tile;

pub use bitmap::IndexedBitmap;
pub use palette::{IndexedPalette, Palette};
pub use tile::{decode_sheet, get_decoder, TileDecoder, TileFormat};
