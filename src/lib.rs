//! Scope-Core: acquisition core for a four-channel digital oscilloscope
//!
//! The crate drives a parallel-bus analog-to-digital converter, streams
//! samples to a host as framed bytes, and accepts configuration commands from
//! the host over the same link. It features:
//!
//! - Hardware abstraction over `embedded-hal` pins and delays
//! - A two-channel enable policy over four converter inputs
//! - A level trigger with hysteresis and a pre-trigger history buffer
//! - Streaming decoders for both directions of the wire protocol
//! - Layered configuration and a desktop simulator
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scope_core::acquisition::AcquisitionLoop;
//! use scope_core::config::ScopeConfig;
//! use scope_core::hal::simulator::{MemoryLink, SimulatedConverter, StdDelay};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScopeConfig::default();
//!     let converter = SimulatedConverter::new(config.simulator.clone());
//!     let mut acq = AcquisitionLoop::new(converter, MemoryLink::new(), StdDelay, &config)?;
//!
//!     let stats = acq.run(Some(100))?;
//!     println!("sent {} frames", stats.frames_sent);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hal;
pub mod protocol;
pub mod utils;

// Re-export commonly used types for convenience
pub use acquisition::{
    AcquisitionLoop, AcquisitionStats, ChannelGate, CycleReport, SampleRingBuffer, TriggerEngine,
    TriggerState,
};
pub use config::{ConfigLoader, ScopeConfig};
pub use error::{ScopeError, ScopeResult};
pub use hal::{Converter, ConverterError, HostLink, Sample};
pub use protocol::{Command, CommandDecoder, Edge, FrameDecoder, ProtocolError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Four-channel oscilloscope acquisition core".to_string(),
        features: vec![
            "Parallel-bus converter driver".to_string(),
            "Level trigger with hysteresis".to_string(),
            "Pre-trigger history".to_string(),
            "Framed host protocol".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert_eq!(info.name, NAME);
        assert_eq!(info.version, VERSION);
        assert!(!info.features.is_empty());
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "scope-core");
    }
}
