// src/hal/traits.rs
//! Core HAL traits: the converter and the host byte link

use crate::hal::types::{ConverterError, RawReadout};
use std::error::Error;

/// A converter that can run one full conversion and readout cycle
pub trait Converter {
    /// Start a conversion, wait for it to finish and read every channel.
    ///
    /// Blocks for the whole hardware handshake; returns once all channel
    /// words are latched.
    fn convert(&mut self) -> Result<RawReadout, ConverterError>;
}

/// Byte stream to and from the host
pub trait HostLink {
    type Error: Error + Send + Sync + 'static;

    /// Next pending command byte, `None` when nothing is waiting. Never blocks.
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Write one complete frame
    fn write_frame(&mut self, frame: &[u8]) -> Result<(), Self::Error>;
}

impl<C: Converter + ?Sized> Converter for &mut C {
    fn convert(&mut self) -> Result<RawReadout, ConverterError> {
        (**self).convert()
    }
}

impl<L: HostLink + ?Sized> HostLink for &mut L {
    type Error = L::Error;

    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        (**self).read_byte()
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        (**self).write_frame(frame)
    }
}
