// tests/acquisition_integration.rs
//! Integration tests for the acquisition loop, driven through the host protocol

use scope_core::acquisition::{AcquisitionLoop, TriggerState};
use scope_core::config::ScopeConfig;
use scope_core::hal::simulator::{ChannelLink, MemoryLink, NoDelay, ScriptedConverter, SimulatedConverter};
use scope_core::hal::{BusyPhase, ConverterError, Sample};
use scope_core::protocol::{Command, Edge, FrameDecoder};
use scope_core::ScopeError;
use std::thread;

type ScriptedLoop = AcquisitionLoop<ScriptedConverter, MemoryLink, NoDelay>;

fn scripted_loop() -> ScriptedLoop {
    AcquisitionLoop::with_defaults(ScriptedConverter::new(), MemoryLink::new(), NoDelay).unwrap()
}

fn host_sends(acq: &mut ScriptedLoop, commands: &[Command]) {
    for cmd in commands {
        acq.link_mut().push_incoming(&cmd.encode());
    }
}

fn host_receives(acq: &mut ScriptedLoop) -> Vec<Sample> {
    let bytes = acq.link_mut().take_outgoing();
    let mut decoder = FrameDecoder::new();
    let samples: Vec<Sample> = decoder.decode(&bytes).collect();
    assert_eq!(decoder.skipped(), 0, "device emitted malformed frames");
    samples
}

#[test]
fn test_rising_trigger_end_to_end() {
    let mut acq = scripted_loop();
    host_sends(
        &mut acq,
        &[
            Command::TriggerChannel(0),
            Command::TriggerEdge(Edge::Rising),
            Command::TriggerLevelHigh(0),
            Command::TriggerLevelLow(0),
            Command::TriggerEnable(true),
        ],
    );
    for v in [-2.0, -1.0, 0.5, 2.0] {
        acq.converter_mut().push_volts([v, 0.0, 0.0, 0.0]);
    }

    for _ in 0..3 {
        let report = acq.run_cycle().unwrap();
        assert!(!report.fired);
        assert_eq!(acq.trigger().state(), TriggerState::Armed);
    }
    assert_eq!(acq.history().len(), 3);

    let report = acq.run_cycle().unwrap();
    assert!(report.fired);
    assert_eq!(report.drained, 4);
    assert!(acq.history().is_empty());
    assert_eq!(acq.trigger().state(), TriggerState::Armed);

    let frames = host_receives(&mut acq);
    // four live frames, then the full history
    assert_eq!(frames.len(), 8);
    assert!(frames.iter().all(|s| s.channel == 0));

    let live_marks: Vec<bool> = frames[..4].iter().map(|s| s.is_trigger).collect();
    assert_eq!(live_marks, vec![false, false, false, true]);

    let history: Vec<f32> = frames[4..].iter().map(|s| s.volts()).collect();
    let expected = [-2.0, -1.0, 0.5, 2.0];
    for (got, want) in history.iter().zip(expected) {
        assert!((got - want).abs() < 0.001, "{} != {}", got, want);
    }
    assert!(frames[7].is_trigger);
    assert_eq!(acq.stats().triggers_fired, 1);
    assert_eq!(acq.stats().samples_drained, 4);
}

#[test]
fn test_retrigger_requires_new_crossing() {
    let mut acq = scripted_loop();
    host_sends(&mut acq, &[Command::TriggerEnable(true)]);
    for v in [-2.0, 2.0, 2.0, 0.0, 2.0, -2.0, 2.0] {
        acq.converter_mut().push_all(v);
    }

    let fired: Vec<bool> = (0..7).map(|_| acq.run_cycle().unwrap().fired).collect();
    assert_eq!(fired, vec![false, true, false, false, false, false, true]);
}

#[test]
fn test_channel_limit_via_commands() {
    let mut acq = scripted_loop();
    host_sends(
        &mut acq,
        &[
            Command::Gate { channel: 1, enable: true },
            Command::Gate { channel: 2, enable: true },
        ],
    );
    acq.converter_mut().push_raw([10, 11, 12, 13]);

    acq.run_cycle().unwrap();
    assert_eq!(acq.gate().mask().iter().collect::<Vec<_>>(), vec![1, 2]);

    let channels: Vec<u8> = host_receives(&mut acq).iter().map(|s| s.channel).collect();
    assert_eq!(channels, vec![1, 2]);
}

#[test]
fn test_command_split_across_cycles() {
    let mut acq = scripted_loop();
    let bytes = Command::Gate { channel: 3, enable: true }.encode();
    acq.converter_mut().push_all(0.0).push_all(0.0);

    acq.link_mut().push_incoming(&bytes[..2]);
    acq.run_cycle().unwrap();
    assert!(!acq.gate().is_enabled(3));

    acq.link_mut().push_incoming(&bytes[2..]);
    acq.run_cycle().unwrap();
    assert!(acq.gate().is_enabled(3));
}

#[test]
fn test_level_update_over_the_wire() {
    let mut acq = scripted_loop();
    host_sends(&mut acq, &Command::trigger_level(5.0));
    acq.apply_pending_commands().unwrap();
    assert!((acq.trigger().level_volts() - 5.0).abs() < 0.1);

    // only the second half applies the staged value
    host_sends(&mut acq, &[Command::TriggerLevelHigh(0xC)]);
    acq.apply_pending_commands().unwrap();
    assert!((acq.trigger().level_volts() - 5.0).abs() < 0.1);

    host_sends(&mut acq, &[Command::TriggerLevelLow(0x0)]);
    acq.apply_pending_commands().unwrap();
    assert!((acq.trigger().level_volts() + 5.0).abs() < 0.1);
}

#[test]
fn test_history_saturation_counts_drops() {
    let mut acq = scripted_loop();
    host_sends(
        &mut acq,
        &[Command::Gate { channel: 1, enable: true }, Command::TriggerEnable(true)],
    );
    for _ in 0..600 {
        acq.converter_mut().push_all(0.0);
    }

    let stats = acq.run(Some(600)).unwrap();
    assert_eq!(acq.history().len(), acq.history().capacity());
    assert_eq!(stats.samples_dropped, 200);
    assert_eq!(stats.frames_sent, 1200);

    acq.converter_mut().push_all(0.0);
    host_sends(&mut acq, &[Command::ForceTrigger]);
    acq.link_mut().take_outgoing();
    let report = acq.run_cycle().unwrap();
    assert_eq!(report.drained, 1000);
    assert_eq!(acq.stats().samples_dropped, 202);
}

#[test]
fn test_force_while_disabled_flushes_empty_history() {
    let mut acq = scripted_loop();
    host_sends(&mut acq, &[Command::ForceTrigger]);
    acq.converter_mut().push_all(1.0);

    let report = acq.run_cycle().unwrap();
    assert!(report.fired);
    assert_eq!(report.drained, 0);
    assert_eq!(acq.trigger().state(), TriggerState::Disarmed);
}

#[test]
fn test_timeouts_do_not_stop_the_loop() {
    let mut acq = scripted_loop();
    acq.converter_mut()
        .push_error(ConverterError::BusyTimeout { phase: BusyPhase::Deassert, waited_ns: 1_000_000 })
        .push_all(0.25)
        .push_error(ConverterError::BusyTimeout { phase: BusyPhase::Assert, waited_ns: 1_000_000 })
        .push_all(0.25);

    let stats = acq.run(Some(4)).unwrap();
    assert_eq!(stats.cycles, 2);
    assert_eq!(stats.converter_timeouts, 2);
    assert_eq!(host_receives(&mut acq).len(), 2);
}

#[test]
fn test_config_drives_initial_state() {
    let mut config = ScopeConfig::default();
    config.acquisition.initial_channels = vec![2, 3];
    config.trigger.channel = 3;
    config.trigger.edge = Edge::Falling;
    config.trigger.enabled = true;

    let acq = AcquisitionLoop::new(ScriptedConverter::new(), MemoryLink::new(), NoDelay, &config).unwrap();
    assert_eq!(acq.gate().mask().bits(), 0b1100);
    assert_eq!(acq.trigger().channel(), 3);
    assert_eq!(acq.trigger().edge(), Edge::Falling);
    assert_eq!(acq.trigger().state(), TriggerState::Armed);
}

#[test]
fn test_invalid_config_channel_rejected() {
    let mut config = ScopeConfig::default();
    config.trigger.channel = 9;
    let result = AcquisitionLoop::new(ScriptedConverter::new(), MemoryLink::new(), NoDelay, &config);
    assert!(matches!(result, Err(ScopeError::InvalidChannel(9))));
}

#[test]
fn test_simulated_run_over_channel_link() {
    let mut config = ScopeConfig::default();
    config.trigger.enabled = true;
    config.simulator.noise_volts = 0.0;

    let (link, commands, frames) = ChannelLink::pair();
    let converter = SimulatedConverter::new(config.simulator.clone());
    let mut acq = AcquisitionLoop::new(converter, link, NoDelay, &config).unwrap();

    let host = thread::spawn(move || {
        let mut decoder = FrameDecoder::new();
        let mut samples = Vec::new();
        for frame in frames.iter() {
            samples.extend(decoder.decode(&frame));
        }
        (samples, decoder.skipped())
    });

    for byte in (Command::Gate { channel: 1, enable: true }).encode() {
        commands.send(byte).unwrap();
    }

    // 400 cycles at 10 kHz cover two periods of the 50 Hz channel 0 sine
    let stats = acq.run(Some(400)).unwrap();
    drop(acq);

    let (samples, skipped) = host.join().unwrap();
    assert_eq!(skipped, 0);
    assert_eq!(samples.len() as u64, stats.frames_sent);
    assert!(stats.triggers_fired >= 1);
    assert!(samples.iter().any(|s| s.is_trigger));
    assert_eq!(stats.commands_applied, 1);
    assert!(samples.iter().any(|s| s.channel == 1));
}
