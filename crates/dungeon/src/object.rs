//! Room object records.
//!
//! Objects are stored as 3-byte records in one of three bit layouts. The
//! layout is picked from the bytes themselves, checked in this order:
//!
//! | Type | Discriminator | id                     | x, y          | size            |
//! |------|---------------|------------------------|---------------|-----------------|
//! | 3    | `b3 >= 0xF8`  | `b3<<4 \| b2&3<<2 \| b1&3` | `b1>>2, b2>>2` | `(b1&3)<<2 \| b2&3` |
//! | 2    | `b1 >= 0xFC`  | `0x100 + b3&0x3F`      | split over b1..b3 | always 0     |
//! | 1    | otherwise     | `b3`                   | `b1>>2, b2>>2` | `(b1&3)<<2 \| b2&3` |
//!
//! Door records inside door mode are 2 bytes: `b1 = pppp 00dd`, `b2 = kind`.

use crate::resolver::ObjectTileResolver;
use crate::tile_info::TileInfo;
use crate::{DungeonError, Result};
use rom_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the three record layouts an object uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectEncoding {
    Type1,
    Type2,
    Type3,
}

impl ObjectEncoding {
    /// Layout an id must be written with, if any.
    pub fn for_id(id: i16) -> Option<Self> {
        match id {
            0x000..=0x0F7 => Some(ObjectEncoding::Type1),
            0x100..=0x13F => Some(ObjectEncoding::Type2),
            0xF80..=0xFFF => Some(ObjectEncoding::Type3),
            _ => None,
        }
    }

    /// Layout the decoder will pick for these bytes.
    pub fn detect(b1: u8, b3: u8) -> Self {
        if b3 >= 0xF8 {
            ObjectEncoding::Type3
        } else if b1 >= 0xFC {
            ObjectEncoding::Type2
        } else {
            ObjectEncoding::Type1
        }
    }
}

/// Where a staircase leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaircaseTarget {
    Room(u8),
    /// Past the per-room staircase cap
    Unknown,
}

impl fmt::Display for StaircaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaircaseTarget::Room(room) => write!(f, "To {}", room),
            StaircaseTarget::Unknown => write!(f, "To ???"),
        }
    }
}

/// Chest contents from the room's chest table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChestRecord {
    pub item: u8,
    pub big: bool,
}

/// Extra meaning attached to a few object ids while parsing a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialKind {
    Staircase { target: StaircaseTarget },
    /// `None` when the room had fewer chest records than chest objects
    Chest { item: Option<ChestRecord> },
}

/// A placed room object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedObject {
    id: i16,
    /// Horizontal position in 8-pixel tile units
    pub x: u8,
    /// Vertical position in 8-pixel tile units
    pub y: u8,
    /// Packed size, `(size_x << 2) | size_y`
    pub size: u8,
    /// Background layer, 0..=2
    pub layer: u8,
    pub special: Option<SpecialKind>,
    #[serde(skip)]
    tiles: Option<Vec<TileInfo>>,
}

impl DecodedObject {
    pub fn new(id: i16, x: u8, y: u8, size: u8, layer: u8) -> Self {
        Self {
            id,
            x,
            y,
            size,
            layer,
            special: None,
            tiles: None,
        }
    }

    /// Decode a 3-byte object record.
    pub fn decode(b1: u8, b2: u8, b3: u8, layer: u8) -> Self {
        let (id, x, y, size) = match ObjectEncoding::detect(b1, b3) {
            ObjectEncoding::Type3 => {
                let id = ((b3 as i16) << 4) | 0x80 | (((b2 & 0x03) as i16) << 2) | (b1 & 0x03) as i16;
                let size = ((b1 & 0x03) << 2) | (b2 & 0x03);
                (id, (b1 & 0xFC) >> 2, (b2 & 0xFC) >> 2, size)
            }
            ObjectEncoding::Type2 => {
                let id = (b3 & 0x3F) as i16 + 0x100;
                let x = ((b2 & 0xF0) >> 4) | ((b1 & 0x03) << 4);
                let y = ((b2 & 0x0F) << 2) | ((b3 & 0xC0) >> 6);
                (id, x, y, 0)
            }
            ObjectEncoding::Type1 => {
                let size = ((b1 & 0x03) << 2) | (b2 & 0x03);
                (b3 as i16, (b1 & 0xFC) >> 2, (b2 & 0xFC) >> 2, size)
            }
        };
        let object = Self::new(id, x, y, size, layer);
        log(LogCategory::Parser, LogLevel::Trace, || {
            format!(
                "{:02X} {:02X} {:02X} -> id={:#05X} x={} y={} size={} layer={}",
                b1, b2, b3, id, x, y, size, layer
            )
        });
        object
    }

    /// Encode back to the 3-byte record layout the id belongs to.
    ///
    /// Fails for values no layout can hold: ids outside the three ranges,
    /// coordinates past 63, type-2/3 sizes that disagree with what the bytes
    /// would imply, records whose bytes would decode as another layout, and
    /// records starting with a stream sentinel pair.
    pub fn encode(&self) -> Result<[u8; 3]> {
        let encoding = self.encoding()?;
        if self.x > 63 || self.y > 63 {
            return Err(DungeonError::InvalidArgument(format!(
                "object {:#05X} at ({}, {}): coordinates must be <= 63",
                self.id, self.x, self.y
            )));
        }
        if self.size > 0x0F {
            return Err(DungeonError::InvalidArgument(format!(
                "object {:#05X}: size {:#04X} exceeds 4 bits",
                self.id, self.size
            )));
        }

        let id = self.id as u16;
        let bytes = match encoding {
            ObjectEncoding::Type1 => {
                if self.x == 63 {
                    return Err(DungeonError::InvalidArgument(format!(
                        "object {:#05X}: type-1 x=63 collides with the type-2 marker",
                        self.id
                    )));
                }
                [
                    (self.x << 2) | ((self.size >> 2) & 0x03),
                    (self.y << 2) | (self.size & 0x03),
                    id as u8,
                ]
            }
            ObjectEncoding::Type2 => {
                if self.size != 0 {
                    return Err(DungeonError::InvalidArgument(format!(
                        "object {:#05X}: type-2 objects have no size",
                        self.id
                    )));
                }
                let b3 = ((self.y & 0x03) << 6) | ((id - 0x100) as u8 & 0x3F);
                if b3 >= 0xF8 {
                    return Err(DungeonError::InvalidArgument(format!(
                        "object {:#05X} at y={}: record would decode as type 3",
                        self.id, self.y
                    )));
                }
                [
                    0xFC | ((self.x >> 4) & 0x03),
                    ((self.x & 0x0F) << 4) | ((self.y >> 2) & 0x0F),
                    b3,
                ]
            }
            ObjectEncoding::Type3 => {
                let implied_size = (((id & 0x03) as u8) << 2) | ((id >> 2) & 0x03) as u8;
                if self.size != implied_size {
                    return Err(DungeonError::InvalidArgument(format!(
                        "object {:#05X}: type-3 size is fixed by the id ({:#X}), got {:#X}",
                        self.id, implied_size, self.size
                    )));
                }
                [
                    (self.x << 2) | (id & 0x03) as u8,
                    (self.y << 2) | ((id >> 2) & 0x03) as u8,
                    (id >> 4) as u8,
                ]
            }
        };
        // A record may not open with FF FF (layer end) or F0 FF (door mode)
        if bytes[1] == 0xFF && (bytes[0] == 0xFF || bytes[0] == 0xF0) {
            return Err(DungeonError::InvalidArgument(format!(
                "object {:#05X} at ({}, {}): record {:02X} {:02X} collides with a stream sentinel",
                self.id, self.x, self.y, bytes[0], bytes[1]
            )));
        }
        Ok(bytes)
    }

    pub fn encoding(&self) -> Result<ObjectEncoding> {
        ObjectEncoding::for_id(self.id).ok_or_else(|| {
            DungeonError::InvalidArgument(format!(
                "object id {:#X} has no record encoding",
                self.id
            ))
        })
    }

    pub fn id(&self) -> i16 {
        self.id
    }

    /// Change the id. Drops any resolved tiles.
    pub fn set_id(&mut self, id: i16) {
        if id != self.id {
            self.id = id;
            self.tiles = None;
        }
    }

    /// Packed size split into (size_x, size_y).
    pub fn size_xy(&self) -> (u8, u8) {
        ((self.size >> 2) & 0x03, self.size & 0x03)
    }

    /// Resolved tiles, if [`ensure_tiles`](Self::ensure_tiles) has run since
    /// the last id change.
    pub fn tiles(&self) -> Option<&[TileInfo]> {
        self.tiles.as_deref()
    }

    /// Resolve and cache this object's tiles.
    pub fn ensure_tiles(&mut self, resolver: &ObjectTileResolver) -> Result<&[TileInfo]> {
        if self.tiles.is_none() {
            self.tiles = Some(resolver.resolve_tiles(self.id)?);
        }
        Ok(self.tiles.as_deref().unwrap_or_default())
    }

    pub fn is_staircase(&self) -> bool {
        matches!(self.special, Some(SpecialKind::Staircase { .. }))
    }

    pub fn is_chest(&self) -> bool {
        matches!(self.special, Some(SpecialKind::Chest { .. }))
    }
}

/// Side of the room a door sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorDirection {
    North = 0,
    South = 1,
    West = 2,
    East = 3,
}

impl DoorDirection {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => DoorDirection::North,
            1 => DoorDirection::South,
            2 => DoorDirection::West,
            _ => DoorDirection::East,
        }
    }
}

/// A 2-byte door record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorRecord {
    /// Slot along the wall, 0..=15
    pub position: u8,
    pub direction: DoorDirection,
    pub kind: u8,
    pub layer: u8,
}

impl DoorRecord {
    pub fn decode(b1: u8, b2: u8, layer: u8) -> Self {
        Self {
            position: b1 >> 4,
            direction: DoorDirection::from_bits(b1),
            kind: b2,
            layer,
        }
    }

    /// Encode to the 2-byte layout. Positions above 15 are rejected.
    pub fn encode(&self) -> Result<[u8; 2]> {
        if self.position > 0x0F {
            return Err(DungeonError::InvalidArgument(format!(
                "door position {} exceeds 4 bits",
                self.position
            )));
        }
        let b1 = (self.position << 4) | self.direction as u8;
        // F0 FF is the door-mode sentinel
        if b1 == 0xF0 && self.kind == 0xFF {
            return Err(DungeonError::InvalidArgument(format!(
                "door {:02X} {:02X} collides with a stream sentinel",
                b1, self.kind
            )));
        }
        Ok([b1, self.kind])
    }
}
