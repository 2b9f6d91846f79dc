// src/protocol/command.rs
//! Incoming host commands
//!
//! Every command is three bytes, `[START][opcode][value]`. The decoder consumes
//! the stream one byte at a time: bytes seen while waiting for a frame start
//! are dropped individually, and once a start arrives the next two bytes are
//! taken as opcode and value whatever they contain.

use crate::config::constants::protocol::*;
use crate::utils::conversion::volts_to_counts;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trigger edge direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    #[default]
    Rising,
    Falling,
}

/// A decoded host command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Enable or disable one acquisition channel
    Gate { channel: u8, enable: bool },
    /// Enable (and arm) or disable (and disarm) the trigger
    TriggerEnable(bool),
    TriggerChannel(u8),
    /// First half of a level update: upper nibble of the level's high byte.
    /// Staged only; the active level does not change.
    TriggerLevelHigh(u8),
    /// Second half of a level update: lower nibble of the level's high byte.
    /// Commits the staged nibble together with this one.
    TriggerLevelLow(u8),
    TriggerEdge(Edge),
    ForceTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("unknown command opcode 0x{0:02X}")]
    UnknownCommand(u8),

    #[error("unknown trigger sub-command {sub} (value 0x{value:02X})")]
    UnknownTriggerOp { sub: u8, value: u8 },
}

impl Command {
    /// Decode the opcode/value pair of a complete frame
    pub fn decode(opcode: u8, value: u8) -> Result<Self, ProtocolError> {
        match opcode {
            OP_CHANNEL_GATE => Ok(Command::Gate {
                channel: value & GATE_CHANNEL_MASK,
                enable: value & GATE_ENABLE_BIT != 0,
            }),
            OP_TRIGGER => Self::decode_trigger(value),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }

    fn decode_trigger(value: u8) -> Result<Self, ProtocolError> {
        let flag = value & TRIGGER_FLAG_BIT != 0;
        let payload = value >> TRIGGER_PAYLOAD_SHIFT;

        match value & TRIGGER_SUB_MASK {
            SUB_ENABLE => Ok(Command::TriggerEnable(flag)),
            SUB_CHANNEL => Ok(Command::TriggerChannel((value >> TRIGGER_CHANNEL_SHIFT) & 0x03)),
            SUB_LEVEL_HIGH => Ok(Command::TriggerLevelHigh(payload)),
            SUB_LEVEL_LOW => Ok(Command::TriggerLevelLow(payload)),
            SUB_EDGE => Ok(Command::TriggerEdge(if flag { Edge::Rising } else { Edge::Falling })),
            SUB_FORCE => Ok(Command::ForceTrigger),
            sub => Err(ProtocolError::UnknownTriggerOp { sub, value }),
        }
    }

    /// Wire form of this command, as the host sends it
    pub fn encode(&self) -> [u8; COMMAND_FRAME_LEN] {
        let (opcode, value) = match *self {
            Command::Gate { channel, enable } => (
                OP_CHANNEL_GATE,
                (channel & GATE_CHANNEL_MASK) | if enable { GATE_ENABLE_BIT } else { 0 },
            ),
            Command::TriggerEnable(on) => (OP_TRIGGER, SUB_ENABLE | flag_bit(on)),
            Command::TriggerChannel(ch) => {
                (OP_TRIGGER, SUB_CHANNEL | ((ch & 0x03) << TRIGGER_CHANNEL_SHIFT))
            }
            Command::TriggerLevelHigh(n) => {
                (OP_TRIGGER, SUB_LEVEL_HIGH | ((n & 0x0F) << TRIGGER_PAYLOAD_SHIFT))
            }
            Command::TriggerLevelLow(n) => {
                (OP_TRIGGER, SUB_LEVEL_LOW | ((n & 0x0F) << TRIGGER_PAYLOAD_SHIFT))
            }
            Command::TriggerEdge(edge) => (OP_TRIGGER, SUB_EDGE | flag_bit(edge == Edge::Rising)),
            Command::ForceTrigger => (OP_TRIGGER, SUB_FORCE),
        };
        [FRAME_START, opcode, value]
    }

    /// The two commands that set the trigger level to the nearest
    /// representable value (steps of 256 counts, about 78 mV)
    pub fn trigger_level(volts: f32) -> [Command; 2] {
        let byte = level_byte(volts_to_counts(volts));
        [Command::TriggerLevelHigh(byte >> 4), Command::TriggerLevelLow(byte & 0x0F)]
    }
}

fn flag_bit(on: bool) -> u8 {
    if on { TRIGGER_FLAG_BIT } else { 0 }
}

/// High byte of the level word, rounded to nearest
pub(crate) fn level_byte(counts: i16) -> u8 {
    let rounded = ((counts as i32 + 128) >> 8).clamp(i8::MIN as i32, i8::MAX as i32) as i8;
    rounded.to_be_bytes()[0]
}

/// Level word carried by a level high byte; the low byte is always zero
pub(crate) fn level_word(byte: u8) -> i16 {
    i16::from_be_bytes([byte, 0])
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum DecodeState {
    #[default]
    AwaitStart,
    AwaitOpcode,
    AwaitValue(u8),
}

/// Streaming command decoder. Keeps partial frames between calls.
#[derive(Debug, Default)]
pub struct CommandDecoder {
    state: DecodeState,
    discarded: u64,
}

impl CommandDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes dropped while looking for a frame start
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// True while a frame has started but not completed
    pub fn in_frame(&self) -> bool {
        self.state != DecodeState::AwaitStart
    }

    /// Feed one byte; returns the decode result when it completes a frame
    pub fn push_byte(&mut self, byte: u8) -> Option<Result<Command, ProtocolError>> {
        match self.state {
            DecodeState::AwaitStart => {
                if byte == FRAME_START {
                    self.state = DecodeState::AwaitOpcode;
                } else {
                    self.discarded += 1;
                }
                None
            }
            DecodeState::AwaitOpcode => {
                self.state = DecodeState::AwaitValue(byte);
                None
            }
            DecodeState::AwaitValue(opcode) => {
                self.state = DecodeState::AwaitStart;
                Some(Command::decode(opcode, byte))
            }
        }
    }

    pub fn decode<'a>(
        &'a mut self,
        bytes: &'a [u8],
    ) -> impl Iterator<Item = Result<Command, ProtocolError>> + 'a {
        bytes.iter().filter_map(move |&b| self.push_byte(b))
    }
}
