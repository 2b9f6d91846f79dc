// src/protocol/mod.rs
//! Wire protocol between the acquisition core and the host
//!
//! Host to device: fixed 3-byte command frames ([`command`]).
//! Device to host: one 5 or 6 byte data frame per sample ([`frame`]).

pub mod command;
pub mod frame;

pub use command::{Command, CommandDecoder, Edge, ProtocolError};
pub use frame::{encode_sample, EncodedFrame, FrameDecoder};
