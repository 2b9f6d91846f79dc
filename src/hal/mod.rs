// src/hal/mod.rs
//! Hardware abstraction layer: converter driver and host link

pub mod traits;
pub mod types;
pub mod parallel_adc;
pub mod simulator;

pub use traits::*;
pub use types::*;
pub use parallel_adc::{DataBus, ParallelAdc, PinBus};
