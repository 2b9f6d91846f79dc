//! Common utility functions for the acquisition core
//!
//! - Bus word / two's-complement / voltage conversions

pub mod conversion;

pub use conversion::{
    counts_to_volts,
    raw_to_volts,
    signed_to_word,
    volts_to_counts,
    volts_to_raw,
    word_to_signed,
};
