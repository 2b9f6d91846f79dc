// src/acquisition/mod.rs
//! Acquisition components: channel gate, trigger, history buffer and the loop
//! that drives them

pub mod acquisition_loop;
pub mod channel_gate;
pub mod ring_buffer;
pub mod trigger;

pub use acquisition_loop::{AcquisitionLoop, AcquisitionStats, CycleReport};
pub use channel_gate::{ChannelGate, ChannelMask};
pub use ring_buffer::SampleRingBuffer;
pub use trigger::{Band, TriggerConfig, TriggerEngine, TriggerState};
