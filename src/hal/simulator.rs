//! Desktop stand-ins for the converter, the delay source and the host link
//!
//! Lets the acquisition loop run off-target: [`SimulatedConverter`] produces
//! sine waveforms with noise, [`ScriptedConverter`] replays fixed readouts for
//! tests, and the two links carry bytes either in memory or across threads.

use crate::config::constants::{
    signal::{CHANNEL_COUNT, FULL_SCALE_VOLTS},
    simulator,
};
use crate::hal::traits::{Converter, HostLink};
use crate::hal::types::{ConverterError, RawReadout};
use crate::utils::conversion::volts_to_raw;
use crossbeam::channel::{Receiver, Sender, TryRecvError};
use embedded_hal::delay::DelayNs;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::time::Duration;
use thiserror::Error;

/// Per-channel waveform
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WaveformSettings {
    #[serde(default = "defaults::frequency_hz")]
    pub frequency_hz: f32,
    #[serde(default = "defaults::amplitude_volts")]
    pub amplitude_volts: f32,
    #[serde(default)]
    pub offset_volts: f32,
}

/// Simulator configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulatorSettings {
    #[serde(default = "defaults::sample_rate_hz")]
    pub sample_rate_hz: f32,
    #[serde(default = "defaults::noise_volts")]
    pub noise_volts: f32,
    #[serde(default = "defaults::seed")]
    pub seed: u64,
    /// Channels beyond the list read as 0 V
    #[serde(default = "defaults::channels")]
    pub channels: Vec<WaveformSettings>,
}

mod defaults {
    use super::{simulator::*, WaveformSettings};

    pub fn frequency_hz() -> f32 { DEFAULT_FREQUENCY_HZ }
    pub fn amplitude_volts() -> f32 { DEFAULT_AMPLITUDE_VOLTS }
    pub fn sample_rate_hz() -> f32 { DEFAULT_SAMPLE_RATE_HZ }
    pub fn noise_volts() -> f32 { DEFAULT_NOISE_VOLTS }
    pub fn seed() -> u64 { DEFAULT_SEED }

    pub fn channels() -> Vec<WaveformSettings> {
        (0..4)
            .map(|ch| WaveformSettings {
                frequency_hz: DEFAULT_FREQUENCY_HZ * (ch + 1) as f32,
                amplitude_volts: DEFAULT_AMPLITUDE_VOLTS,
                offset_volts: 0.0,
            })
            .collect()
    }
}

impl Default for WaveformSettings {
    fn default() -> Self {
        Self {
            frequency_hz: defaults::frequency_hz(),
            amplitude_volts: defaults::amplitude_volts(),
            offset_volts: 0.0,
        }
    }
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: defaults::sample_rate_hz(),
            noise_volts: defaults::noise_volts(),
            seed: defaults::seed(),
            channels: defaults::channels(),
        }
    }
}

/// Sine-wave converter with uniform noise
pub struct SimulatedConverter {
    settings: SimulatorSettings,
    rng: StdRng,
    conversions: u64,
}

impl SimulatedConverter {
    pub fn new(settings: SimulatorSettings) -> Self {
        let rng = StdRng::seed_from_u64(settings.seed);
        Self { settings, rng, conversions: 0 }
    }

    pub fn conversions(&self) -> u64 {
        self.conversions
    }

    fn channel_volts(&mut self, channel: usize, t: f32) -> f32 {
        let clean = match self.settings.channels.get(channel) {
            Some(w) => {
                w.offset_volts
                    + w.amplitude_volts * (2.0 * std::f32::consts::PI * w.frequency_hz * t).sin()
            }
            None => 0.0,
        };

        // clamped to full scale; `min` also replaces NaN
        let noise = self.settings.noise_volts.min(FULL_SCALE_VOLTS);
        if noise > 0.0 {
            clean + self.rng.gen_range(-noise..=noise)
        } else {
            clean
        }
    }
}

impl Converter for SimulatedConverter {
    fn convert(&mut self) -> Result<RawReadout, ConverterError> {
        let t = self.conversions as f32 / self.settings.sample_rate_hz.max(1.0);
        self.conversions += 1;

        let mut readout = [0u16; CHANNEL_COUNT];
        for (channel, word) in readout.iter_mut().enumerate() {
            *word = volts_to_raw(self.channel_volts(channel, t));
        }
        Ok(readout)
    }
}

/// Converter that replays queued readouts, then reports [`ConverterError::Exhausted`]
#[derive(Debug, Default)]
pub struct ScriptedConverter {
    script: VecDeque<Result<RawReadout, ConverterError>>,
}

impl ScriptedConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_raw(&mut self, readout: RawReadout) -> &mut Self {
        self.script.push_back(Ok(readout));
        self
    }

    pub fn push_volts(&mut self, volts: [f32; CHANNEL_COUNT]) -> &mut Self {
        self.push_raw(volts.map(volts_to_raw))
    }

    /// Queue the same voltage on every channel
    pub fn push_all(&mut self, volts: f32) -> &mut Self {
        self.push_volts([volts; CHANNEL_COUNT])
    }

    pub fn push_error(&mut self, error: ConverterError) -> &mut Self {
        self.script.push_back(Err(error));
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Converter for ScriptedConverter {
    fn convert(&mut self) -> Result<RawReadout, ConverterError> {
        self.script.pop_front().unwrap_or(Err(ConverterError::Exhausted))
    }
}

/// Delay backed by the OS scheduler
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}

/// Delay that returns immediately, for tests and benches
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// In-memory host link
#[derive(Debug, Default)]
pub struct MemoryLink {
    incoming: VecDeque<u8>,
    outgoing: Vec<u8>,
    frames: usize,
}

impl MemoryLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if the host had sent them
    pub fn push_incoming(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes.iter().copied());
    }

    pub fn pending_incoming(&self) -> usize {
        self.incoming.len()
    }

    pub fn outgoing(&self) -> &[u8] {
        &self.outgoing
    }

    pub fn take_outgoing(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn frames_written(&self) -> usize {
        self.frames
    }
}

impl HostLink for MemoryLink {
    type Error = Infallible;

    fn read_byte(&mut self) -> Result<Option<u8>, Infallible> {
        Ok(self.incoming.pop_front())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), Infallible> {
        self.outgoing.extend_from_slice(frame);
        self.frames += 1;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("host side of the link has disconnected")]
    Disconnected,
}

/// Host link across threads; one channel per direction
pub struct ChannelLink {
    commands: Receiver<u8>,
    frames: Sender<Vec<u8>>,
}

impl ChannelLink {
    pub fn new(commands: Receiver<u8>, frames: Sender<Vec<u8>>) -> Self {
        Self { commands, frames }
    }

    /// Create a link plus the host's ends: a command sender and a frame receiver
    pub fn pair() -> (Self, Sender<u8>, Receiver<Vec<u8>>) {
        let (cmd_tx, cmd_rx) = crossbeam::channel::unbounded();
        let (frame_tx, frame_rx) = crossbeam::channel::unbounded();
        (Self::new(cmd_rx, frame_tx), cmd_tx, frame_rx)
    }
}

impl HostLink for ChannelLink {
    type Error = LinkError;

    fn read_byte(&mut self) -> Result<Option<u8>, LinkError> {
        match self.commands.try_recv() {
            Ok(byte) => Ok(Some(byte)),
            // a host that stopped sending commands is still listening
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => Ok(None),
        }
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        self.frames.send(frame.to_vec()).map_err(|_| LinkError::Disconnected)
    }
}
