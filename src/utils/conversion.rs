//! Conversion utilities for the acquisition core
//!
//! Converts between the converter's raw bus word, its two's-complement
//! reading and a physical voltage. The same fixed-point scale is used for
//! sample values and for trigger levels sent by the host.

use crate::config::constants::signal::{FULL_SCALE_COUNTS, FULL_SCALE_VOLTS};

/// Reinterpret an unsigned bus word as a two's-complement reading.
///
/// Goes through the byte representation so the bit pattern is carried over
/// exactly, with no numeric conversion involved.
pub fn word_to_signed(word: u16) -> i16 {
    i16::from_be_bytes(word.to_be_bytes())
}

/// Inverse of [`word_to_signed`]
pub fn signed_to_word(value: i16) -> u16 {
    u16::from_be_bytes(value.to_be_bytes())
}

/// Scale a signed reading to volts
pub fn counts_to_volts(counts: i16) -> f32 {
    counts as f32 * FULL_SCALE_VOLTS / FULL_SCALE_COUNTS
}

/// Convert a raw bus word to volts
pub fn raw_to_volts(word: u16) -> f32 {
    counts_to_volts(word_to_signed(word))
}

/// Convert volts to the nearest signed reading, saturating at the rails
pub fn volts_to_counts(volts: f32) -> i16 {
    if volts.is_nan() {
        return 0;
    }
    let counts = (volts * FULL_SCALE_COUNTS / FULL_SCALE_VOLTS).round();
    counts.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Convert volts to the bus word the converter would present
pub fn volts_to_raw(volts: f32) -> u16 {
    signed_to_word(volts_to_counts(volts))
}
