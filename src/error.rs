// src/error.rs
//! Crate-level error type
//!
//! Component errors (`ConverterError`, `ProtocolError`, `ConfigError`) stay
//! specific to their modules; [`ScopeError`] is what the acquisition loop and
//! public constructors return.

use crate::config::loader::ConfigError;
use crate::hal::types::ConverterError;
use std::error::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("converter: {0}")]
    Converter(#[from] ConverterError),

    #[error("host link: {0}")]
    Link(#[source] Box<dyn Error + Send + Sync>),

    #[error("invalid channel index {0}")]
    InvalidChannel(u8),

    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
}

impl ScopeError {
    pub(crate) fn link<E: Error + Send + Sync + 'static>(err: E) -> Self {
        ScopeError::Link(Box::new(err))
    }

    /// True for conditions after which the next acquisition cycle can proceed
    pub fn is_recoverable(&self) -> bool {
        match self {
            ScopeError::Converter(e) => e.is_recoverable(),
            _ => false,
        }
    }
}

pub type ScopeResult<T> = Result<T, ScopeError>;
