// src/config/constants.rs
//! System-wide constants for the acquisition core

/// Converter and channel constants
pub mod signal {
    /// Channels read out per conversion, in fixed order 0..CHANNEL_COUNT
    pub const CHANNEL_COUNT: usize = 4;
    /// Upper bound on concurrently enabled channels
    pub const MAX_ENABLED_CHANNELS: u32 = 2;

    /// Input range is +/- FULL_SCALE_VOLTS
    pub const FULL_SCALE_VOLTS: f32 = 10.0;
    /// Counts per full scale (15-bit magnitude of a two's-complement word)
    pub const FULL_SCALE_COUNTS: f32 = 32768.0;

    pub const DEFAULT_INITIAL_CHANNELS: [u8; 1] = [0];
}

/// Trigger engine constants
pub mod trigger {
    /// Half-width of the Schmitt band around the trigger level
    pub const DEFAULT_HYSTERESIS_VOLTS: f32 = 1.0;
    pub const MAX_HYSTERESIS_VOLTS: f32 = super::signal::FULL_SCALE_VOLTS;
    pub const DEFAULT_TRIGGER_CHANNEL: u8 = 0;
    pub const DEFAULT_LEVEL_VOLTS: f32 = 0.0;
}

/// History buffer constants
pub mod buffers {
    /// Samples retained while waiting for a trigger
    pub const HISTORY_CAPACITY: usize = 1000;
}

/// Wire protocol constants
pub mod protocol {
    pub const FRAME_START: u8 = 0xAA;
    pub const FRAME_END: u8 = 0x55;
    pub const TRIGGER_MARK: u8 = 0xCC;

    pub const COMMAND_FRAME_LEN: usize = 3;
    pub const DATA_FRAME_LEN: usize = 5;
    pub const MARKED_DATA_FRAME_LEN: usize = 6;

    pub const OP_CHANNEL_GATE: u8 = 0xFF;
    pub const OP_TRIGGER: u8 = 0xFE;

    pub const GATE_CHANNEL_MASK: u8 = 0x03;
    pub const GATE_ENABLE_BIT: u8 = 0x04;

    pub const TRIGGER_SUB_MASK: u8 = 0x0F;
    pub const TRIGGER_FLAG_BIT: u8 = 0x10;
    pub const TRIGGER_CHANNEL_SHIFT: u8 = 4;
    pub const TRIGGER_PAYLOAD_SHIFT: u8 = 4;

    pub const SUB_ENABLE: u8 = 0;
    pub const SUB_CHANNEL: u8 = 1;
    pub const SUB_LEVEL_HIGH: u8 = 2;
    pub const SUB_LEVEL_LOW: u8 = 3;
    pub const SUB_EDGE: u8 = 4;
    pub const SUB_FORCE: u8 = 5;
}

/// Converter timing defaults, taken from the converter datasheet minimums
/// with margin for a slow MCU GPIO path
pub mod timing {
    pub const DEFAULT_CONVST_PULSE_NS: u32 = 1_000;
    pub const DEFAULT_READ_ACCESS_NS: u32 = 1_000;
    pub const DEFAULT_READ_HOLD_NS: u32 = 100;
    pub const DEFAULT_CHANNEL_SETTLE_NS: u32 = 1_000;
    pub const DEFAULT_BUSY_POLL_NS: u32 = 100;
    pub const DEFAULT_BUSY_TIMEOUT_US: u32 = 1_000;

    pub const DEFAULT_CYCLE_DELAY_US: u32 = 100;
}

/// Simulator constants
pub mod simulator {
    pub const DEFAULT_SAMPLE_RATE_HZ: f32 = 10_000.0;
    pub const DEFAULT_FREQUENCY_HZ: f32 = 50.0;
    pub const DEFAULT_AMPLITUDE_VOLTS: f32 = 5.0;
    pub const DEFAULT_NOISE_VOLTS: f32 = 0.05;
    pub const DEFAULT_SEED: u64 = 0x5C0_9E;
}

/// File system paths and environment
pub mod paths {
    pub const LOCAL_CONFIG_FILE: &str = "scope.toml";
    pub const ENV_PREFIX: &str = "SCOPE";
    pub const ENV_SEPARATOR: &str = "__";
}
