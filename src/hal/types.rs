// src/hal/types.rs
//! Core types shared between the converter driver and the acquisition loop

use crate::config::constants::{signal::CHANNEL_COUNT, timing};
use crate::utils::conversion::{raw_to_volts, word_to_signed};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One word per channel, in readout order
pub type RawReadout = [u16; CHANNEL_COUNT];

/// A single channel reading as it travels through history and onto the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    pub channel: u8,
    /// Bus word exactly as read from the converter
    pub raw: u16,
    /// Set on the sample that fired the trigger
    pub is_trigger: bool,
}

impl Sample {
    pub fn new(channel: u8, raw: u16) -> Self {
        Self { channel, raw, is_trigger: false }
    }

    pub fn with_trigger_mark(mut self, is_trigger: bool) -> Self {
        self.is_trigger = is_trigger;
        self
    }

    /// Two's-complement reading of the bus word
    pub fn signed(&self) -> i16 {
        word_to_signed(self.raw)
    }

    pub fn volts(&self) -> f32 {
        raw_to_volts(self.raw)
    }
}

/// Which half of the BUSY handshake stalled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusyPhase {
    /// Waiting for BUSY to go high after CONVST
    Assert,
    /// Waiting for BUSY to return low at end of conversion
    Deassert,
}

impl std::fmt::Display for BusyPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusyPhase::Assert => write!(f, "assert"),
            BusyPhase::Deassert => write!(f, "deassert"),
        }
    }
}

/// Converter driver errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConverterError {
    #[error("converter BUSY did not {phase} within {waited_ns} ns")]
    BusyTimeout { phase: BusyPhase, waited_ns: u64 },

    #[error("GPIO fault on {line}: {kind}")]
    Pin { line: &'static str, kind: String },

    #[error("simulated converter exhausted")]
    Exhausted,
}

impl ConverterError {
    /// Timeouts leave the converter usable; the next cycle can retry
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConverterError::BusyTimeout { .. })
    }
}

/// Converter strobe and handshake timing, all minimums
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConverterTiming {
    #[serde(default = "defaults::convst_pulse_ns")]
    pub convst_pulse_ns: u32,

    /// RD low to data valid on the bus
    #[serde(default = "defaults::read_access_ns")]
    pub read_access_ns: u32,

    /// Data sampled to RD released
    #[serde(default = "defaults::read_hold_ns")]
    pub read_hold_ns: u32,

    /// RD released to next channel strobe
    #[serde(default = "defaults::channel_settle_ns")]
    pub channel_settle_ns: u32,

    #[serde(default = "defaults::busy_poll_ns")]
    pub busy_poll_ns: u32,

    #[serde(default = "defaults::busy_timeout_us")]
    pub busy_timeout_us: u32,
}

mod defaults {
    use super::timing::*;

    pub fn convst_pulse_ns() -> u32 { DEFAULT_CONVST_PULSE_NS }
    pub fn read_access_ns() -> u32 { DEFAULT_READ_ACCESS_NS }
    pub fn read_hold_ns() -> u32 { DEFAULT_READ_HOLD_NS }
    pub fn channel_settle_ns() -> u32 { DEFAULT_CHANNEL_SETTLE_NS }
    pub fn busy_poll_ns() -> u32 { DEFAULT_BUSY_POLL_NS }
    pub fn busy_timeout_us() -> u32 { DEFAULT_BUSY_TIMEOUT_US }
}

impl Default for ConverterTiming {
    fn default() -> Self {
        Self {
            convst_pulse_ns: defaults::convst_pulse_ns(),
            read_access_ns: defaults::read_access_ns(),
            read_hold_ns: defaults::read_hold_ns(),
            channel_settle_ns: defaults::channel_settle_ns(),
            busy_poll_ns: defaults::busy_poll_ns(),
            busy_timeout_us: defaults::busy_timeout_us(),
        }
    }
}

impl ConverterTiming {
    /// Number of BUSY polls that fit in the timeout, at least one
    pub fn busy_poll_budget(&self) -> u64 {
        let timeout_ns = self.busy_timeout_us as u64 * 1_000;
        (timeout_ns / self.busy_poll_ns.max(1) as u64).max(1)
    }
}
