// src/hal/parallel_adc.rs
//! Parallel-bus converter driver on embedded-hal pins
//!
//! Drives a 4-channel, 16-bit converter with a shared parallel data bus:
//! CONVST starts a conversion, BUSY reports it in progress, and each channel
//! word is gated onto the bus by pulsing RD low. Channel words come out in a
//! fixed order, one per RD strobe.
//!
//! The BUSY handshake is polled with a bounded budget, so a converter that
//! never responds produces [`ConverterError::BusyTimeout`] instead of hanging
//! the loop.

use crate::config::constants::signal::CHANNEL_COUNT;
use crate::hal::traits::Converter;
use crate::hal::types::{BusyPhase, ConverterError, ConverterTiming, RawReadout};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, InputPin, OutputPin};
use tracing::trace;

/// A 16-bit parallel data bus
pub trait DataBus {
    /// Sample the bus once. Caller is responsible for strobe timing.
    fn read_word(&mut self) -> Result<u16, ConverterError>;
}

/// Data bus made of 16 individual input pins, `pins[0]` = DB0 (LSB).
///
/// Pins must share one type; most HALs provide an erased/degraded pin type
/// for this.
pub struct PinBus<P> {
    pins: [P; 16],
}

impl<P: InputPin> PinBus<P> {
    pub fn new(pins: [P; 16]) -> Self {
        Self { pins }
    }

    pub fn release(self) -> [P; 16] {
        self.pins
    }
}

impl<P: InputPin> DataBus for PinBus<P> {
    fn read_word(&mut self) -> Result<u16, ConverterError> {
        let mut word = 0u16;
        for (bit, pin) in self.pins.iter_mut().enumerate() {
            if pin.is_high().map_err(|e| pin_fault("DB", e))? {
                word |= 1 << bit;
            }
        }
        Ok(word)
    }
}

fn pin_fault<E: embedded_hal::digital::Error>(line: &'static str, err: E) -> ConverterError {
    ConverterError::Pin { line, kind: format!("{:?}", err.kind()) }
}

/// Converter driver
pub struct ParallelAdc<CONV, BUSY, RD, BUS, D> {
    convst: CONV,
    busy: BUSY,
    rd: RD,
    bus: BUS,
    delay: D,
    timing: ConverterTiming,
}

impl<CONV, BUSY, RD, BUS, D> ParallelAdc<CONV, BUSY, RD, BUS, D>
where
    CONV: OutputPin,
    BUSY: InputPin,
    RD: OutputPin,
    BUS: DataBus,
    D: DelayNs,
{
    /// Take ownership of the converter lines and park them idle (CONVST low,
    /// RD high).
    pub fn new(
        mut convst: CONV,
        busy: BUSY,
        mut rd: RD,
        bus: BUS,
        delay: D,
        timing: ConverterTiming,
    ) -> Result<Self, ConverterError> {
        convst.set_low().map_err(|e| pin_fault("CONVST", e))?;
        rd.set_high().map_err(|e| pin_fault("RD", e))?;

        Ok(Self { convst, busy, rd, bus, delay, timing })
    }

    pub fn timing(&self) -> &ConverterTiming {
        &self.timing
    }

    /// Give the pins back
    pub fn release(self) -> (CONV, BUSY, RD, BUS, D) {
        (self.convst, self.busy, self.rd, self.bus, self.delay)
    }

    fn pulse_convst(&mut self) -> Result<(), ConverterError> {
        self.convst.set_high().map_err(|e| pin_fault("CONVST", e))?;
        self.delay.delay_ns(self.timing.convst_pulse_ns);
        self.convst.set_low().map_err(|e| pin_fault("CONVST", e))
    }

    fn wait_busy(&mut self, want_high: bool, phase: BusyPhase) -> Result<(), ConverterError> {
        let budget = self.timing.busy_poll_budget();

        for _ in 0..budget {
            if self.busy.is_high().map_err(|e| pin_fault("BUSY", e))? == want_high {
                return Ok(());
            }
            self.delay.delay_ns(self.timing.busy_poll_ns);
        }

        Err(ConverterError::BusyTimeout {
            phase,
            waited_ns: budget * self.timing.busy_poll_ns as u64,
        })
    }

    fn read_channel(&mut self) -> Result<u16, ConverterError> {
        self.rd.set_low().map_err(|e| pin_fault("RD", e))?;
        self.delay.delay_ns(self.timing.read_access_ns);

        let word = self.bus.read_word()?;

        self.delay.delay_ns(self.timing.read_hold_ns);
        self.rd.set_high().map_err(|e| pin_fault("RD", e))?;
        self.delay.delay_ns(self.timing.channel_settle_ns);

        Ok(word)
    }
}

impl<CONV, BUSY, RD, BUS, D> Converter for ParallelAdc<CONV, BUSY, RD, BUS, D>
where
    CONV: OutputPin,
    BUSY: InputPin,
    RD: OutputPin,
    BUS: DataBus,
    D: DelayNs,
{
    fn convert(&mut self) -> Result<RawReadout, ConverterError> {
        self.pulse_convst()?;
        self.wait_busy(true, BusyPhase::Assert)?;
        self.wait_busy(false, BusyPhase::Deassert)?;

        let mut readout = [0u16; CHANNEL_COUNT];
        for word in readout.iter_mut() {
            *word = self.read_channel()?;
        }

        trace!(?readout, "conversion complete");
        Ok(readout)
    }
}
