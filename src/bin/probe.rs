//! Probe binary. Loads one plugin the way a wrapper would and reports on it.
//!
//! Usage: `cocoon-probe <plugin-path> [instrument|effect|midi-effect]`

use cocoon::prelude::*;
use cocoon::{Error, Result};
use std::env;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const BLOCK_SIZE: usize = 512;

fn run(path: String, role: PluginRole) -> Result<()> {
    let wrapper = Wrapper::builder()
        .role(role)
        .sample_rate(48000.0)
        .max_block_size(BLOCK_SIZE as u32)
        .build()?;
    let host = wrapper.host();

    host.load(path);
    if !wrapper.wait_until_settled(Duration::from_secs(30)) {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "plugin did not finish loading",
        )));
    }

    println!("state:     {}", host.state());
    println!("name:      {}", host.hosted_name());
    println!("error:     {}", host.last_error());
    println!("sidechain: {}", host.supports_sidechain());
    println!("latency:   {} samples", host.latency_samples());
    if !host.is_loaded() {
        return Ok(());
    }

    let channels = host.wrapper_layout().block_channels();
    let mut storage = vec![vec![0.0f32; BLOCK_SIZE]; channels];
    let mut slices: Vec<&mut [f32]> = storage.iter_mut().map(Vec::as_mut_slice).collect();
    let mut block = AudioBlock::new(&mut slices);
    let mut midi = MidiBuffer::new();
    let ran = wrapper.process(&mut block, &mut midi, &TransportInfo::default(), ProcessMode::Process);
    println!("processed: {ran} ({channels} channels)");

    if let Some(document) = wrapper.save_state()? {
        println!("state doc: {}", String::from_utf8_lossy(&document));
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: cocoon-probe <plugin-path> [instrument|effect|midi-effect]");
        return ExitCode::from(2);
    };
    let role = match args.next().map(|r| r.parse::<PluginRole>()) {
        None => PluginRole::Effect,
        Some(Ok(role)) => role,
        Some(Err(e)) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    match run(path, role) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("cocoon-probe: {e}");
            ExitCode::FAILURE
        }
    }
}
