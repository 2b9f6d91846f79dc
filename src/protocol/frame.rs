// src/protocol/frame.rs
//! Outgoing data frames
//!
//! One frame per sample: `[START][channel][hi][lo]{[MARK]}[END]`, 5 bytes, or 6
//! when the sample carries the trigger marker. The word is the raw converter
//! word, big-endian. There is no escaping, so a payload byte equal to a marker
//! is indistinguishable from one; the decoder resynchronises byte by byte.

use crate::config::constants::protocol::*;
use crate::config::constants::signal::CHANNEL_COUNT;
use crate::hal::types::Sample;
use std::ops::Deref;

/// A fully built frame, written to the link in one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedFrame {
    bytes: [u8; MARKED_DATA_FRAME_LEN],
    len: usize,
}

impl EncodedFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl Deref for EncodedFrame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for EncodedFrame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Build the wire frame for a sample
pub fn encode_sample(sample: &Sample) -> EncodedFrame {
    let [hi, lo] = sample.raw.to_be_bytes();
    let mut bytes = [FRAME_START, sample.channel, hi, lo, FRAME_END, 0];

    let len = if sample.is_trigger {
        bytes[4] = TRIGGER_MARK;
        bytes[5] = FRAME_END;
        MARKED_DATA_FRAME_LEN
    } else {
        DATA_FRAME_LEN
    };

    EncodedFrame { bytes, len }
}

enum Parse {
    Incomplete,
    Frame(Sample, usize),
    Invalid,
}

fn parse(buf: &[u8]) -> Parse {
    if buf[0] != FRAME_START {
        return Parse::Invalid;
    }
    if buf.len() >= 2 && buf[1] as usize >= CHANNEL_COUNT {
        return Parse::Invalid;
    }
    if buf.len() < DATA_FRAME_LEN {
        return Parse::Incomplete;
    }

    let sample = Sample::new(buf[1], u16::from_be_bytes([buf[2], buf[3]]));
    match buf[4] {
        FRAME_END => Parse::Frame(sample, DATA_FRAME_LEN),
        TRIGGER_MARK if buf.len() < MARKED_DATA_FRAME_LEN => Parse::Incomplete,
        TRIGGER_MARK if buf[5] == FRAME_END => {
            Parse::Frame(sample.with_trigger_mark(true), MARKED_DATA_FRAME_LEN)
        }
        _ => Parse::Invalid,
    }
}

/// Host-side parser for the outgoing sample stream
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: [u8; MARKED_DATA_FRAME_LEN],
    len: usize,
    skipped: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes discarded while resynchronising
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Feed one byte; returns a sample when it completes a frame
    pub fn push_byte(&mut self, byte: u8) -> Option<Sample> {
        self.pending[self.len] = byte;
        self.len += 1;

        loop {
            match parse(&self.pending[..self.len]) {
                Parse::Incomplete => return None,
                Parse::Frame(sample, used) => {
                    self.consume(used);
                    return Some(sample);
                }
                Parse::Invalid => {
                    self.consume(1);
                    self.skipped += 1;
                    if self.len == 0 {
                        return None;
                    }
                }
            }
        }
    }

    /// Feed a chunk of the stream, yielding every completed sample
    pub fn decode<'a>(&'a mut self, bytes: &'a [u8]) -> impl Iterator<Item = Sample> + 'a {
        bytes.iter().filter_map(move |&b| self.push_byte(b))
    }

    fn consume(&mut self, n: usize) {
        self.pending.copy_within(n..self.len, 0);
        self.len -= n;
    }
}
