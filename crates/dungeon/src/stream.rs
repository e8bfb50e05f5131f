//! Room object stream parser.
//!
//! A room's object data is three layers of records, each ended by `FF FF`.
//! Inside a layer, `F0 FF` switches to 2-byte door records until the next
//! `FF FF`. Parsing never fails: on a truncated or runaway stream it stops
//! and returns what it has, along with the reason it stopped.

use crate::layout::{ParserConfig, RomLayout};
use crate::object::{ChestRecord, DecodedObject, DoorRecord, SpecialKind, StaircaseTarget};
use rom_core::logging::{log, LogCategory, LogLevel};
use rom_core::RomSource;
use serde::Serialize;
use std::collections::VecDeque;

/// Number of object layers in a room stream.
pub const LAYER_COUNT: u8 = 3;

const LAYER_END: [u8; 2] = [0xFF, 0xFF];
const DOOR_START: [u8; 2] = [0xF0, 0xFF];

/// Per-room data the parser consumes while tagging special objects.
#[derive(Debug, Clone, Default)]
pub struct RoomContext {
    /// Staircase destination rooms, in object order
    pub staircase_targets: Vec<u8>,
    /// Pending chest records, consumed front to back
    pub chests: VecDeque<ChestRecord>,
    staircases_seen: usize,
}

impl RoomContext {
    pub fn new(staircase_targets: Vec<u8>, chests: impl IntoIterator<Item = ChestRecord>) -> Self {
        Self {
            staircase_targets,
            chests: chests.into_iter().collect(),
            staircases_seen: 0,
        }
    }

    fn next_staircase(&mut self, cap: usize) -> StaircaseTarget {
        let slot = self.staircases_seen;
        self.staircases_seen += 1;
        match self.staircase_targets.get(slot) {
            Some(&room) if slot < cap => StaircaseTarget::Room(room),
            _ => StaircaseTarget::Unknown,
        }
    }
}

/// Why parsing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    /// All three layer terminators were read
    Completed,
    /// The next record would read past the end of the ROM
    EndOfRom,
    /// The iteration budget ran out first
    IterationBudget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Layer(u8),
    Doors(u8),
    Done,
}

/// Parser output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedObjects {
    pub objects: Vec<DecodedObject>,
    pub doors: Vec<DoorRecord>,
    /// Offset just past the last byte consumed
    pub end: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone)]
pub struct RoomObjectStreamParser {
    layout: RomLayout,
    config: ParserConfig,
}

impl RoomObjectStreamParser {
    pub fn new(layout: RomLayout, config: ParserConfig) -> Self {
        Self { layout, config }
    }

    /// Walk the object stream starting at `start`.
    pub fn parse(&self, rom: &dyn RomSource, start: usize, ctx: &mut RoomContext) -> ParsedObjects {
        let mut pos = start;
        let mut state = State::Layer(0);
        let mut objects = Vec::new();
        let mut doors = Vec::new();
        let mut iterations = 0usize;

        let termination = loop {
            let layer = match state {
                State::Done => break Termination::Completed,
                State::Layer(layer) | State::Doors(layer) => layer,
            };
            if iterations >= self.config.max_iterations {
                break Termination::IterationBudget;
            }
            iterations += 1;

            let pair = match (rom.read_byte(pos), rom.read_byte(pos + 1)) {
                (Ok(b1), Ok(b2)) => [b1, b2],
                _ => break Termination::EndOfRom,
            };

            if pair == LAYER_END {
                pos += 2;
                state = if layer + 1 >= LAYER_COUNT {
                    State::Done
                } else {
                    State::Layer(layer + 1)
                };
                continue;
            }
            if pair == DOOR_START {
                pos += 2;
                state = State::Doors(layer);
                continue;
            }

            if let State::Doors(_) = state {
                doors.push(DoorRecord::decode(pair[0], pair[1], layer));
                pos += 2;
                continue;
            }

            let Ok(b3) = rom.read_byte(pos + 2) else {
                break Termination::EndOfRom;
            };
            pos += 3;

            let mut object = DecodedObject::decode(pair[0], pair[1], b3, layer);
            self.tag_special(&mut object, ctx);
            objects.push(object);
        };

        match termination {
            Termination::Completed => log(LogCategory::Parser, LogLevel::Debug, || {
                format!(
                    "Stream at {:#06X}: {} objects, {} doors, {} bytes",
                    start,
                    objects.len(),
                    doors.len(),
                    pos - start
                )
            }),
            _ => log(LogCategory::Parser, LogLevel::Warn, || {
                format!(
                    "Stream at {:#06X} stopped early ({:?}) at {:#06X} after {} objects",
                    start,
                    termination,
                    pos,
                    objects.len()
                )
            }),
        }

        ParsedObjects {
            objects,
            doors,
            end: pos,
            termination,
        }
    }

    fn tag_special(&self, object: &mut DecodedObject, ctx: &mut RoomContext) {
        let id = object.id();
        if self.layout.is_staircase(id) {
            let target = ctx.next_staircase(self.layout.max_staircases);
            log(LogCategory::Parser, LogLevel::Trace, || {
                format!("Staircase {:#05X} at ({}, {}): {}", id, object.x, object.y, target)
            });
            object.special = Some(SpecialKind::Staircase { target });
        } else if self.layout.is_chest(id) {
            let item = ctx.chests.pop_front();
            if item.is_none() {
                log(LogCategory::Parser, LogLevel::Debug, || {
                    format!("Chest {:#05X} at ({}, {}) has no chest record", id, object.x, object.y)
                });
            }
            object.special = Some(SpecialKind::Chest { item });
        }
    }
}

impl Default for RoomObjectStreamParser {
    fn default() -> Self {
        Self::new(RomLayout::default(), ParserConfig::default())
    }
}
