//! Dungeon object decoding, tile resolution and rendering.
//!
//! Data flows one way through the crate:
//!
//! ```text
//! RomSource -> object (record codec) -> stream (room parser) -> Room
//!           -> resolver (pointer tables -> TileInfo) -> render
//!              (sheet_cache + rasterizer) -> IndexedBitmap
//! ```
//!
//! All ROM-revision constants live in [`layout::RomLayout`].

pub mod layout;
pub mod object;
pub mod rasterizer;
pub mod render;
pub mod resolver;
pub mod room;
pub mod sheet_cache;
pub mod stream;
pub mod tile_info;

use rom_core::RomError;
use thiserror::Error;

pub use layout::{ParserConfig, RomLayout};
pub use object::{DecodedObject, DoorDirection, DoorRecord, ObjectEncoding, SpecialKind};
pub use render::{ObjectRenderEngine, RenderStats};
pub use resolver::{ObjectTileResolver, Subtype, SubtypeDescriptor};
pub use room::Room;
pub use sheet_cache::{CacheStats, GraphicsSheetCache, GraphicsSheetSource};
pub use stream::{ParsedObjects, RoomContext, RoomObjectStreamParser, Termination};
pub use tile_info::{Tile16, TileInfo};

#[derive(Error, Debug)]
pub enum DungeonError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<RomError> for DungeonError {
    fn from(err: RomError) -> Self {
        match err {
            RomError::OutOfBounds { .. } => DungeonError::OutOfRange(err.to_string()),
            RomError::InvalidRom(_) | RomError::Io(_) => {
                DungeonError::FailedPrecondition(err.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, DungeonError>;

/// Largest id of the plain (type-1/type-2) object range.
pub const MAX_STANDARD_OBJECT_ID: i16 = 0x3FF;

/// First id of the extended (type-3) object range.
pub const EXTENDED_OBJECT_ID_START: i16 = 0xF80;

/// Last id of the extended (type-3) object range.
pub const EXTENDED_OBJECT_ID_END: i16 = 0xFFF;

/// Check an object id against the two valid id ranges.
pub fn validate_object_id(id: i16) -> Result<()> {
    if (0..=MAX_STANDARD_OBJECT_ID).contains(&id)
        || (EXTENDED_OBJECT_ID_START..=EXTENDED_OBJECT_ID_END).contains(&id)
    {
        Ok(())
    } else {
        Err(DungeonError::InvalidArgument(format!(
            "object id {:#X} outside [0, 0x3FF] and [0xF80, 0xFFF]",
            id
        )))
    }
}
