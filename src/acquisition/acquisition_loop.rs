// src/acquisition/acquisition_loop.rs
//! The acquisition loop
//!
//! One cycle: apply pending host commands, run a conversion, then for every
//! enabled channel build a sample, test it against the trigger, record it in
//! the history while the trigger is enabled, and send it. A cycle in which the
//! trigger fired ends by flushing the whole history before the next one starts.
//!
//! The loop owns every piece of mutable state (channel mask, trigger, history,
//! decoder), so there is exactly one mutator by construction.

use crate::acquisition::channel_gate::ChannelGate;
use crate::acquisition::ring_buffer::SampleRingBuffer;
use crate::acquisition::trigger::TriggerEngine;
use crate::config::ScopeConfig;
use crate::error::{ScopeError, ScopeResult};
use crate::hal::traits::{Converter, HostLink};
use crate::hal::types::Sample;
use crate::protocol::command::{Command, CommandDecoder};
use crate::protocol::frame::encode_sample;
use embedded_hal::delay::DelayNs;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

/// Counters kept across cycles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AcquisitionStats {
    pub cycles: u64,
    pub frames_sent: u64,
    pub triggers_fired: u64,
    pub forced_triggers: u64,
    pub samples_drained: u64,
    pub samples_dropped: u64,
    pub commands_applied: u64,
    pub commands_rejected: u64,
    pub bytes_discarded: u64,
    pub converter_timeouts: u64,
}

/// What a single cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Live frames sent for this conversion, excluding drained history
    pub frames_sent: usize,
    /// The trigger was in the fired state at the end of the cycle
    pub fired: bool,
    /// History samples flushed after the fire
    pub drained: usize,
}

pub struct AcquisitionLoop<C, L, D> {
    converter: C,
    link: L,
    delay: D,
    gate: ChannelGate,
    trigger: TriggerEngine,
    history: SampleRingBuffer,
    commands: CommandDecoder,
    stats: AcquisitionStats,
    cycle_delay_us: u32,
}

impl<C, L, D> AcquisitionLoop<C, L, D>
where
    C: Converter,
    L: HostLink,
    D: DelayNs,
{
    /// Build a loop with the channel and trigger state described by `config`
    pub fn new(converter: C, link: L, delay: D, config: &ScopeConfig) -> ScopeResult<Self> {
        let gate = ChannelGate::with_channels(&config.acquisition.initial_channels)?;

        let settings = &config.trigger;
        let mut trigger = TriggerEngine::new(settings.hysteresis_volts);
        trigger.set_channel(settings.channel)?;
        trigger.set_edge(settings.edge);
        trigger.set_level_volts(settings.level_volts);
        trigger.set_enabled(settings.enabled);

        Ok(Self {
            converter,
            link,
            delay,
            gate,
            trigger,
            history: SampleRingBuffer::new(),
            commands: CommandDecoder::new(),
            stats: AcquisitionStats::default(),
            cycle_delay_us: config.acquisition.cycle_delay_us,
        })
    }

    pub fn with_defaults(converter: C, link: L, delay: D) -> ScopeResult<Self> {
        Self::new(converter, link, delay, &ScopeConfig::default())
    }

    pub fn gate(&self) -> &ChannelGate {
        &self.gate
    }

    pub fn trigger(&self) -> &TriggerEngine {
        &self.trigger
    }

    pub fn history(&self) -> &SampleRingBuffer {
        &self.history
    }

    pub fn stats(&self) -> &AcquisitionStats {
        &self.stats
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn converter_mut(&mut self) -> &mut C {
        &mut self.converter
    }

    pub fn into_parts(self) -> (C, L, D) {
        (self.converter, self.link, self.delay)
    }

    /// Read every byte the host has sent so far and apply completed commands.
    /// Returns the number of commands applied.
    pub fn apply_pending_commands(&mut self) -> ScopeResult<usize> {
        let mut applied = 0;

        while let Some(byte) = self.link.read_byte().map_err(ScopeError::link)? {
            match self.commands.push_byte(byte) {
                Some(Ok(command)) => match self.apply_command(command) {
                    Ok(()) => applied += 1,
                    Err(e) => {
                        self.stats.commands_rejected += 1;
                        debug!(?command, error = %e, "command rejected");
                    }
                },
                Some(Err(e)) => {
                    self.stats.commands_rejected += 1;
                    debug!(error = %e, "command rejected");
                }
                None => {}
            }
        }

        self.stats.bytes_discarded = self.commands.discarded();
        Ok(applied)
    }

    /// Apply one decoded command to the gate or the trigger
    pub fn apply_command(&mut self, command: Command) -> ScopeResult<()> {
        match command {
            Command::Gate { channel, enable } => {
                self.gate.set(channel, enable)?;
            }
            Command::TriggerEnable(enabled) => {
                self.trigger.set_enabled(enabled);
                // a new capture session starts with empty history
                self.history.clear();
            }
            Command::TriggerChannel(channel) => self.trigger.set_channel(channel)?,
            Command::TriggerLevelHigh(nibble) => self.trigger.stage_level_high(nibble),
            Command::TriggerLevelLow(nibble) => self.trigger.commit_level_low(nibble),
            Command::TriggerEdge(edge) => self.trigger.set_edge(edge),
            Command::ForceTrigger => {
                self.trigger.force();
                self.stats.forced_triggers += 1;
            }
        }

        self.stats.commands_applied += 1;
        debug!(?command, mask = self.gate.mask().bits(), "command applied");
        Ok(())
    }

    /// Run one full acquisition cycle, without the inter-cycle delay
    pub fn run_cycle(&mut self) -> ScopeResult<CycleReport> {
        self.apply_pending_commands()?;

        let readout = match self.converter.convert() {
            Ok(readout) => readout,
            Err(e) => {
                if e.is_recoverable() {
                    self.stats.converter_timeouts += 1;
                }
                return Err(e.into());
            }
        };
        self.stats.cycles += 1;

        let mut report = CycleReport::default();

        for (index, &raw) in readout.iter().enumerate() {
            let channel = index as u8;
            if !self.gate.is_enabled(channel) {
                continue;
            }

            let mut sample = Sample::new(channel, raw);
            if channel == self.trigger.channel() && self.trigger.evaluate(sample.volts()) {
                sample.is_trigger = true;
                self.stats.triggers_fired += 1;
            }

            if self.trigger.is_enabled() && self.history.try_push(sample).is_err() {
                trace!(channel, "history full, sample dropped");
            }

            self.send(&sample)?;
            report.frames_sent += 1;
        }

        if self.trigger.is_triggered() {
            report.fired = true;
            report.drained = self.drain_history()?;
            self.trigger.finish_drain();
            info!(
                drained = report.drained,
                rearmed = self.trigger.is_armed(),
                "history flushed"
            );
        }

        self.stats.samples_dropped = self.history.dropped();
        Ok(report)
    }

    /// Run cycles back to back with the configured delay between them.
    ///
    /// Converter timeouts are logged and the cycle skipped; any other error
    /// ends the run. `None` runs until an error occurs.
    pub fn run(&mut self, max_cycles: Option<u64>) -> ScopeResult<AcquisitionStats> {
        let mut completed = 0u64;

        while max_cycles.map_or(true, |max| completed < max) {
            match self.run_cycle() {
                Ok(_) => {}
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "conversion failed, skipping cycle");
                }
                Err(e) => return Err(e),
            }

            completed += 1;
            self.delay.delay_us(self.cycle_delay_us);
        }

        Ok(self.stats.clone())
    }

    fn send(&mut self, sample: &Sample) -> ScopeResult<()> {
        let frame = encode_sample(sample);
        self.link.write_frame(&frame).map_err(ScopeError::link)?;
        self.stats.frames_sent += 1;
        trace!(channel = sample.channel, raw = sample.raw, marked = sample.is_trigger, "frame sent");
        Ok(())
    }

    fn drain_history(&mut self) -> ScopeResult<usize> {
        let mut drained = 0;

        while let Some(sample) = self.history.pop() {
            self.send(&sample)?;
            drained += 1;
        }

        self.stats.samples_drained += drained as u64;
        Ok(drained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::simulator::{MemoryLink, NoDelay, ScriptedConverter};
    use crate::hal::types::{BusyPhase, ConverterError};
    use crate::protocol::command::Edge;
    use crate::protocol::frame::FrameDecoder;

    type TestLoop = AcquisitionLoop<ScriptedConverter, MemoryLink, NoDelay>;

    fn test_loop() -> TestLoop {
        AcquisitionLoop::with_defaults(ScriptedConverter::new(), MemoryLink::new(), NoDelay).unwrap()
    }

    fn send(acq: &mut TestLoop, commands: &[Command]) {
        for cmd in commands {
            acq.link_mut().push_incoming(&cmd.encode());
        }
    }

    fn frames(acq: &mut TestLoop) -> Vec<Sample> {
        let bytes = acq.link_mut().take_outgoing();
        FrameDecoder::new().decode(&bytes).collect()
    }

    #[test]
    fn test_only_enabled_channels_are_sent() {
        let mut acq = test_loop();
        acq.converter_mut().push_raw([0x0100, 0x0200, 0x0300, 0x0400]);
        send(&mut acq, &[Command::Gate { channel: 2, enable: true }]);

        let report = acq.run_cycle().unwrap();
        assert_eq!(report.frames_sent, 2);
        assert!(!report.fired);

        let sent = frames(&mut acq);
        assert_eq!(sent, vec![Sample::new(0, 0x0100), Sample::new(2, 0x0300)]);
    }

    #[test]
    fn test_gate_change_applies_to_same_cycle() {
        let mut acq = test_loop();
        acq.converter_mut().push_all(1.0);
        send(&mut acq, &[Command::Gate { channel: 0, enable: false }]);

        assert_eq!(acq.run_cycle().unwrap().frames_sent, 0);
    }

    #[test]
    fn test_history_only_filled_while_trigger_enabled() {
        let mut acq = test_loop();
        acq.converter_mut().push_all(0.0).push_all(0.0);

        acq.run_cycle().unwrap();
        assert!(acq.history().is_empty());

        send(&mut acq, &[Command::TriggerEnable(true)]);
        acq.run_cycle().unwrap();
        assert_eq!(acq.history().len(), 1);
    }

    #[test]
    fn test_forced_trigger_drains_history() {
        let mut acq = test_loop();
        send(&mut acq, &[Command::TriggerEnable(true)]);
        for _ in 0..3 {
            acq.converter_mut().push_all(0.0);
        }
        acq.run_cycle().unwrap();
        acq.run_cycle().unwrap();
        acq.link_mut().take_outgoing();

        send(&mut acq, &[Command::ForceTrigger]);
        let report = acq.run_cycle().unwrap();

        assert!(report.fired);
        assert_eq!(report.drained, 3);
        assert!(acq.history().is_empty());
        assert!(acq.trigger().is_armed());
        assert_eq!(frames(&mut acq).len(), 4);
        assert_eq!(acq.stats().forced_triggers, 1);
    }

    #[test]
    fn test_falling_trigger_marks_sample() {
        let mut acq = test_loop();
        send(&mut acq, &[Command::TriggerEdge(Edge::Falling), Command::TriggerEnable(true)]);
        acq.converter_mut().push_all(3.0).push_all(-3.0);

        acq.run_cycle().unwrap();
        acq.link_mut().take_outgoing();
        let report = acq.run_cycle().unwrap();

        assert!(report.fired);
        let sent = frames(&mut acq);
        // live frame, then the two history samples, the last one marked
        assert_eq!(sent.len(), 3);
        assert!(sent[0].is_trigger);
        assert!(!sent[1].is_trigger);
        assert!(sent[2].is_trigger);
    }

    #[test]
    fn test_unknown_command_is_counted_and_skipped() {
        let mut acq = test_loop();
        acq.link_mut().push_incoming(&[0xAA, 0x10, 0x00]);
        send(&mut acq, &[Command::Gate { channel: 1, enable: true }]);

        assert_eq!(acq.apply_pending_commands().unwrap(), 1);
        assert_eq!(acq.stats().commands_rejected, 1);
        assert!(acq.gate().is_enabled(1));
    }

    #[test]
    fn test_trigger_disable_discards_history() {
        let mut acq = test_loop();
        send(&mut acq, &[Command::TriggerEnable(true)]);
        acq.converter_mut().push_all(0.0);
        acq.run_cycle().unwrap();
        assert_eq!(acq.history().len(), 1);

        acq.apply_command(Command::TriggerEnable(false)).unwrap();
        assert!(acq.history().is_empty());
    }

    #[test]
    fn test_converter_timeout_is_skipped_by_run() {
        let mut acq = test_loop();
        acq.converter_mut()
            .push_all(0.5)
            .push_error(ConverterError::BusyTimeout { phase: BusyPhase::Assert, waited_ns: 1_000 })
            .push_all(0.5);

        let stats = acq.run(Some(3)).unwrap();
        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.converter_timeouts, 1);
        assert_eq!(stats.frames_sent, 2);
    }

    #[test]
    fn test_stats_serialize_for_reporting() {
        let mut acq = test_loop();
        acq.converter_mut().push_all(0.0);
        acq.run_cycle().unwrap();

        let json = serde_json::to_value(acq.stats()).unwrap();
        assert_eq!(json["cycles"], 1);
        assert_eq!(json["frames_sent"], 1);
        assert_eq!(json["samples_dropped"], 0);
    }

    #[test]
    fn test_exhausted_converter_ends_run() {
        let mut acq = test_loop();
        acq.converter_mut().push_all(0.5);
        let err = acq.run(None).unwrap_err();
        assert!(matches!(err, ScopeError::Converter(ConverterError::Exhausted)));
        assert_eq!(acq.stats().cycles, 1);
    }
}
