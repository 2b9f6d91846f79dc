// src/config/mod.rs
//! Configuration for the acquisition core

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use crate::hal::simulator::SimulatorSettings;
use crate::hal::types::ConverterTiming;
use crate::protocol::command::Edge;
use serde::{Deserialize, Serialize};

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ScopeConfig {
    #[serde(default)]
    pub acquisition: AcquisitionSettings,
    #[serde(default)]
    pub trigger: TriggerSettings,
    #[serde(default)]
    pub converter: ConverterTiming,
    #[serde(default)]
    pub simulator: SimulatorSettings,
}

/// Loop settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AcquisitionSettings {
    /// Channels enabled at start-up, applied in order through the channel gate
    #[serde(default = "defaults::initial_channels")]
    pub initial_channels: Vec<u8>,

    #[serde(default = "defaults::cycle_delay_us")]
    pub cycle_delay_us: u32,

    /// Stop after this many cycles; unset runs until an error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<u64>,
}

/// Trigger state at start-up
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TriggerSettings {
    #[serde(default = "defaults::hysteresis_volts")]
    pub hysteresis_volts: f32,

    #[serde(default = "defaults::trigger_channel")]
    pub channel: u8,

    #[serde(default)]
    pub edge: Edge,

    #[serde(default = "defaults::level_volts")]
    pub level_volts: f32,

    #[serde(default)]
    pub enabled: bool,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;

    pub fn initial_channels() -> Vec<u8> { signal::DEFAULT_INITIAL_CHANNELS.to_vec() }
    pub fn cycle_delay_us() -> u32 { timing::DEFAULT_CYCLE_DELAY_US }

    pub fn hysteresis_volts() -> f32 { trigger::DEFAULT_HYSTERESIS_VOLTS }
    pub fn trigger_channel() -> u8 { trigger::DEFAULT_TRIGGER_CHANNEL }
    pub fn level_volts() -> f32 { trigger::DEFAULT_LEVEL_VOLTS }
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        Self {
            initial_channels: defaults::initial_channels(),
            cycle_delay_us: defaults::cycle_delay_us(),
            max_cycles: None,
        }
    }
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            hysteresis_volts: defaults::hysteresis_volts(),
            channel: defaults::trigger_channel(),
            edge: Edge::default(),
            level_volts: defaults::level_volts(),
            enabled: false,
        }
    }
}

impl ScopeConfig {
    /// Check value ranges, collecting every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let channel_count = signal::CHANNEL_COUNT as u8;

        for &channel in &self.acquisition.initial_channels {
            if channel >= channel_count {
                errors.push(format!(
                    "acquisition.initial_channels: channel {} out of range 0..{}",
                    channel, channel_count
                ));
            }
        }

        if self.trigger.channel >= channel_count {
            errors.push(format!(
                "trigger.channel: {} out of range 0..{}",
                self.trigger.channel, channel_count
            ));
        }

        let hysteresis = self.trigger.hysteresis_volts;
        if !hysteresis.is_finite() || !(0.0..=trigger::MAX_HYSTERESIS_VOLTS).contains(&hysteresis) {
            errors.push(format!(
                "trigger.hysteresis_volts: {} outside 0..={} V",
                hysteresis,
                trigger::MAX_HYSTERESIS_VOLTS
            ));
        }

        let level = self.trigger.level_volts;
        if !level.is_finite() || level.abs() > signal::FULL_SCALE_VOLTS {
            errors.push(format!(
                "trigger.level_volts: {} outside +/-{} V",
                level,
                signal::FULL_SCALE_VOLTS
            ));
        }

        if self.converter.busy_poll_ns == 0 {
            errors.push("converter.busy_poll_ns must be non-zero".to_string());
        }
        if self.converter.busy_timeout_us == 0 {
            errors.push("converter.busy_timeout_us must be non-zero".to_string());
        }

        if !(self.simulator.sample_rate_hz > 0.0) {
            errors.push(format!(
                "simulator.sample_rate_hz: {} must be positive",
                self.simulator.sample_rate_hz
            ));
        }
        let noise = self.simulator.noise_volts;
        if !noise.is_finite() || !(0.0..=signal::FULL_SCALE_VOLTS).contains(&noise) {
            errors.push(format!(
                "simulator.noise_volts: {} outside 0..={} V",
                noise,
                signal::FULL_SCALE_VOLTS
            ));
        }
        if self.simulator.channels.len() > signal::CHANNEL_COUNT {
            errors.push(format!(
                "simulator.channels: {} waveforms for {} channels",
                self.simulator.channels.len(),
                signal::CHANNEL_COUNT
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
