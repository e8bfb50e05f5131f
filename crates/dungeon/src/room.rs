//! Room aggregate: the object list of one dungeon room.
//!
//! Chests come from a table of 3-byte records (room word with bit 15 set for
//! big chests, then the item). `chests_length_pointer` points into bank 01
//! code at the operand of the compare that bounds the game's chest search
//! loop. That loop advances its index by 3 per record, so the operand is a
//! byte length. Reading it as a record count would walk three times past the
//! end of the table. A trailing partial record is ignored.

use crate::layout::{ParserConfig, RomLayout};
use crate::object::{ChestRecord, DecodedObject, DoorRecord};
use crate::resolver::ObjectTileResolver;
use crate::stream::{RoomContext, RoomObjectStreamParser, Termination, LAYER_COUNT};
use crate::{DungeonError, Result};
use rom_core::logging::{log, LogCategory, LogLevel};
use rom_core::{snes_to_pc, RomSource};
use serde::Serialize;

/// Number of rooms in the object pointer table
pub const ROOM_COUNT: u16 = 296;

/// First two bytes of a room's object data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RoomHeader {
    pub floor1: u8,
    pub floor2: u8,
    pub layout: u8,
}

impl RoomHeader {
    pub fn decode(b1: u8, b2: u8) -> Self {
        Self {
            floor1: b1 & 0x0F,
            floor2: b1 >> 4,
            layout: (b2 >> 2) & 0x07,
        }
    }

    pub fn encode(&self) -> [u8; 2] {
        [
            (self.floor1 & 0x0F) | (self.floor2 << 4),
            (self.layout & 0x07) << 2,
        ]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Room {
    pub id: u16,
    pub header: RoomHeader,
    objects: Vec<DecodedObject>,
    doors: Vec<DoorRecord>,
    pub chests: Vec<ChestRecord>,
    /// ROM offset of the header, when loaded from a ROM
    pub data_offset: Option<usize>,
    pub termination: Termination,
}

impl Room {
    /// Load a room's objects from the ROM.
    ///
    /// `staircase_targets` are the destination rooms from the room's header
    /// record, which lives outside the object data.
    pub fn load(
        rom: &dyn RomSource,
        layout: &RomLayout,
        config: &ParserConfig,
        room_id: u16,
        staircase_targets: &[u8],
    ) -> Result<Self> {
        if room_id >= ROOM_COUNT {
            return Err(DungeonError::InvalidArgument(format!(
                "room {} outside [0, {})",
                room_id, ROOM_COUNT
            )));
        }

        let table = snes_to_pc(rom.read_long_le(layout.room_object_pointer)?);
        let data_offset = snes_to_pc(rom.read_long_le(table + room_id as usize * 3)?);
        let header = RoomHeader::decode(rom.read_byte(data_offset)?, rom.read_byte(data_offset + 1)?);
        let chests = load_chests(rom, layout, room_id)?;

        log(LogCategory::Parser, LogLevel::Info, || {
            format!(
                "Room {}: objects at {:#06X}, floor {}/{}, layout {}, {} chest(s)",
                room_id,
                data_offset,
                header.floor1,
                header.floor2,
                header.layout,
                chests.len()
            )
        });

        let mut ctx = RoomContext::new(staircase_targets.to_vec(), chests.iter().copied());
        let parsed = RoomObjectStreamParser::new(layout.clone(), *config).parse(
            rom,
            data_offset + 2,
            &mut ctx,
        );

        Ok(Self {
            id: room_id,
            header,
            objects: parsed.objects,
            doors: parsed.doors,
            chests,
            data_offset: Some(data_offset),
            termination: parsed.termination,
        })
    }

    /// Assemble a room from parts built elsewhere, e.g. by an editor.
    pub fn from_parts(id: u16, header: RoomHeader, objects: Vec<DecodedObject>, doors: Vec<DoorRecord>) -> Self {
        Self {
            id,
            header,
            objects,
            doors,
            chests: Vec::new(),
            data_offset: None,
            termination: Termination::Completed,
        }
    }

    pub fn objects(&self) -> &[DecodedObject] {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut Vec<DecodedObject> {
        &mut self.objects
    }

    pub fn doors(&self) -> &[DoorRecord] {
        &self.doors
    }

    pub fn objects_on_layer(&self, layer: u8) -> impl Iterator<Item = &DecodedObject> {
        self.objects.iter().filter(move |o| o.layer == layer)
    }

    /// Serialise the room back to header plus object stream.
    ///
    /// Each layer is its objects, then `F0 FF` and the layer's doors if it
    /// has any, then `FF FF`.
    pub fn encode_objects(&self) -> Result<Vec<u8>> {
        if let Some(obj) = self.objects.iter().find(|o| o.layer >= LAYER_COUNT) {
            return Err(DungeonError::InvalidArgument(format!(
                "object {:#05X} on layer {}",
                obj.id(),
                obj.layer
            )));
        }

        let mut out = self.header.encode().to_vec();
        for layer in 0..LAYER_COUNT {
            for obj in self.objects_on_layer(layer) {
                out.extend_from_slice(&obj.encode()?);
            }
            let mut doors = self.doors.iter().filter(|d| d.layer == layer).peekable();
            if doors.peek().is_some() {
                out.extend_from_slice(&[0xF0, 0xFF]);
                for door in doors {
                    out.extend_from_slice(&door.encode()?);
                }
            }
            out.extend_from_slice(&[0xFF, 0xFF]);
        }
        Ok(out)
    }

    /// Resolve tiles for every object, returning how many failed.
    pub fn resolve_all(&mut self, resolver: &ObjectTileResolver) -> usize {
        let mut failed = 0;
        for obj in &mut self.objects {
            if let Err(err) = obj.ensure_tiles(resolver).map(|_| ()) {
                failed += 1;
                log(LogCategory::Resolver, LogLevel::Warn, || {
                    format!("Room {}: object {:#05X}: {}", self.id, obj.id(), err)
                });
            }
        }
        failed
    }
}

/// Chest records for one room, in table order.
fn load_chests(rom: &dyn RomSource, layout: &RomLayout, room_id: u16) -> Result<Vec<ChestRecord>> {
    let table = snes_to_pc(rom.read_long_le(layout.chests_data_pointer)?);
    // Byte length of the table, not a record count
    let length = rom.read_word_le(layout.chests_length_pointer)? as usize;
    let bytes = rom.read_slice(table, length - length % 3)?;

    Ok(bytes
        .chunks_exact(3)
        .filter_map(|entry| {
            let word = u16::from_le_bytes([entry[0], entry[1]]);
            (word & 0x7FFF == room_id).then_some(ChestRecord {
                item: entry[2],
                big: word & 0x8000 != 0,
            })
        })
        .collect())
}
