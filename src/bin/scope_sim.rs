//! Desktop simulator: runs the acquisition loop against a simulated converter
//! and prints the decoded frame stream.
//!
//! Usage: `scope-sim [config.toml]`. Log level follows `RUST_LOG`.

use scope_core::acquisition::AcquisitionLoop;
use scope_core::config::ConfigLoader;
use scope_core::hal::simulator::{ChannelLink, SimulatedConverter, StdDelay};
use scope_core::protocol::FrameDecoder;
use std::io::{BufWriter, Write};
use std::thread;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scope_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let info = scope_core::version_info();
    info!(name = %info.name, version = %info.version, features = ?info.features, "{}", info.description);

    let loader = match std::env::args().nth(1) {
        Some(path) => ConfigLoader::with_file(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load()?;
    info!(path = %loader.file().display(), ?config.acquisition, "configuration loaded");

    let (link, _commands, frames) = ChannelLink::pair();
    let converter = SimulatedConverter::new(config.simulator.clone());
    let mut acq = AcquisitionLoop::new(converter, link, StdDelay, &config)?;

    let printer = thread::spawn(move || {
        let stdout = std::io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        let mut decoder = FrameDecoder::new();

        'frames: for frame in frames.iter() {
            for sample in decoder.decode(&frame) {
                let mark = if sample.is_trigger { " T" } else { "" };
                if writeln!(out, "ch{} {:+8.4} V{}", sample.channel, sample.volts(), mark).is_err() {
                    break 'frames;
                }
            }
        }
        let _ = out.flush();
        decoder.skipped()
    });

    let result = acq.run(config.acquisition.max_cycles);
    let stats = acq.stats().clone();
    drop(acq);

    match printer.join() {
        Ok(0) => {}
        Ok(skipped) => warn!(skipped, "host decoder skipped bytes"),
        Err(_) => warn!("frame printer panicked"),
    }

    eprintln!("{}", serde_json::to_string_pretty(&stats)?);
    result?;
    Ok(())
}
