// src/acquisition/trigger.rs
//! Level trigger with hysteresis
//!
//! The engine watches one channel's voltage through a Schmitt band of
//! `level ± hysteresis`. The band position only changes when the voltage
//! leaves the band on one side, so noise inside the band cannot re-trigger.
//! An armed engine fires on the configured edge and then disarms itself until
//! the history drain is finished.

use crate::config::constants::{signal::CHANNEL_COUNT, trigger::DEFAULT_HYSTERESIS_VOLTS};
use crate::error::{ScopeError, ScopeResult};
use crate::protocol::command::{level_byte, level_word};
use crate::utils::conversion::{counts_to_volts, volts_to_counts};
use serde::Serialize;
use tracing::{debug, info};

pub use crate::protocol::command::Edge;

/// Lifecycle state derived from the armed/triggered flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerState {
    Disarmed,
    Armed,
    Fired,
}

/// Last side of the hysteresis band the signal was seen on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Band {
    Below,
    Above,
}

/// Read-only snapshot of the trigger configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TriggerConfig {
    pub enabled: bool,
    pub channel: u8,
    pub level_counts: i16,
    pub level_volts: f32,
    pub hysteresis_volts: f32,
    pub edge: Edge,
    pub armed: bool,
    pub triggered: bool,
}

#[derive(Debug, Clone)]
pub struct TriggerEngine {
    enabled: bool,
    channel: u8,
    level: i16,
    hysteresis: f32,
    edge: Edge,
    armed: bool,
    triggered: bool,
    band: Option<Band>,
    staged_high: Option<u8>,
}

impl Default for TriggerEngine {
    fn default() -> Self {
        Self::new(DEFAULT_HYSTERESIS_VOLTS)
    }
}

impl TriggerEngine {
    /// Disabled engine on channel 0, level 0 V, rising edge
    pub fn new(hysteresis_volts: f32) -> Self {
        Self {
            enabled: false,
            channel: 0,
            level: 0,
            hysteresis: hysteresis_volts.abs(),
            edge: Edge::Rising,
            armed: false,
            triggered: false,
            band: None,
            staged_high: None,
        }
    }

    pub fn state(&self) -> TriggerState {
        if self.triggered {
            TriggerState::Fired
        } else if self.armed {
            TriggerState::Armed
        } else {
            TriggerState::Disarmed
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    pub fn level_counts(&self) -> i16 {
        self.level
    }

    pub fn level_volts(&self) -> f32 {
        counts_to_volts(self.level)
    }

    pub fn hysteresis_volts(&self) -> f32 {
        self.hysteresis
    }

    pub fn band(&self) -> Option<Band> {
        self.band
    }

    pub fn config(&self) -> TriggerConfig {
        TriggerConfig {
            enabled: self.enabled,
            channel: self.channel,
            level_counts: self.level,
            level_volts: self.level_volts(),
            hysteresis_volts: self.hysteresis,
            edge: self.edge,
            armed: self.armed,
            triggered: self.triggered,
        }
    }

    /// Enabling arms the engine and clears any stale fire; disabling disarms it
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.armed = enabled;
        self.triggered = false;
        self.band = None;
    }

    pub fn set_channel(&mut self, channel: u8) -> ScopeResult<()> {
        if channel as usize >= CHANNEL_COUNT {
            return Err(ScopeError::InvalidChannel(channel));
        }
        if channel != self.channel {
            self.channel = channel;
            self.band = None;
        }
        Ok(())
    }

    pub fn set_edge(&mut self, edge: Edge) {
        if edge != self.edge {
            self.edge = edge;
            self.band = None;
        }
    }

    pub fn set_level_counts(&mut self, counts: i16) {
        self.level = counts;
        self.staged_high = None;
        self.band = None;
    }

    pub fn set_level_volts(&mut self, volts: f32) {
        self.set_level_counts(volts_to_counts(volts));
    }

    /// First half of a host level update. Does not change the active level.
    pub fn stage_level_high(&mut self, nibble: u8) {
        self.staged_high = Some(nibble & 0x0F);
    }

    /// Second half of a host level update: combine with the staged nibble and
    /// apply. Without a staged nibble, the current level's upper nibble is kept.
    pub fn commit_level_low(&mut self, nibble: u8) {
        let high = self
            .staged_high
            .take()
            .unwrap_or_else(|| level_byte(self.level) >> 4);
        let counts = level_word((high << 4) | (nibble & 0x0F));

        self.set_level_counts(counts);
        debug!(level_volts = self.level_volts(), "trigger level committed");
    }

    /// Fire immediately, without a voltage test
    pub fn force(&mut self) {
        self.triggered = true;
        self.armed = false;
        info!(channel = self.channel, "trigger forced");
    }

    /// Feed the watched channel's voltage. Returns true when this sample fires.
    pub fn evaluate(&mut self, volts: f32) -> bool {
        if !self.enabled {
            return false;
        }

        let level = self.level_volts();
        let previous = self.band;
        if volts < level - self.hysteresis {
            self.band = Some(Band::Below);
        } else if volts > level + self.hysteresis {
            self.band = Some(Band::Above);
        }

        if !self.armed {
            return false;
        }

        let fired = match self.edge {
            Edge::Rising => previous == Some(Band::Below) && self.band == Some(Band::Above),
            Edge::Falling => previous == Some(Band::Above) && self.band == Some(Band::Below),
        };

        if fired {
            self.triggered = true;
            self.armed = false;
            info!(channel = self.channel, volts, edge = ?self.edge, "trigger fired");
        }
        fired
    }

    /// History has been flushed: clear the fire and re-arm if still enabled
    pub fn finish_drain(&mut self) {
        self.triggered = false;
        self.armed = self.enabled;
    }
}
