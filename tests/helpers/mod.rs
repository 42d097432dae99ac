//! Test helpers and fixtures for cocoon integration tests
//!
//! Wrappers are built against the scriptable mock format from
//! `cocoon-host`'s `testing` feature and driven by pumping their control
//! queue from the test thread.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, fixed gain)
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]

pub mod tolerances;

use cocoon::host::testing::{MockFormat, MockPlugin, MockProbe};
use cocoon::prelude::*;
use cocoon::PluginHost;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Standard buffer size for deterministic testing
pub const TEST_BUFFER_SIZE: usize = 512;

/// How long a test waits for a load to settle before failing.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// A wrapper over a mock format, plus the handles tests poke at.
pub struct Fixture {
    pub wrapper: Wrapper,
    pub format: Arc<MockFormat>,
    pub notifications: Arc<AtomicUsize>,
}

impl Fixture {
    pub fn new(role: PluginRole) -> Self {
        Self::with_format(role, MockFormat::new(), None)
    }

    /// Wrapper whose host is running `layout` rather than the role default.
    pub fn with_layout(role: PluginRole, layout: ChannelLayout) -> Self {
        Self::with_format(role, MockFormat::new(), Some(layout))
    }

    pub fn with_format(role: PluginRole, format: MockFormat, layout: Option<ChannelLayout>) -> Self {
        let format = Arc::new(format);
        let mut builder = Wrapper::builder()
            .role(role)
            .sample_rate(TEST_SAMPLE_RATE)
            .max_block_size(TEST_BUFFER_SIZE as u32)
            .shared_format(format.clone());
        if let Some(layout) = layout {
            builder = builder.layout(layout);
        }
        let wrapper = builder.build().expect("Failed to build test wrapper");

        let notifications = Arc::new(AtomicUsize::new(0));
        let counter = notifications.clone();
        wrapper.host().subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        Self {
            wrapper,
            format,
            notifications,
        }
    }

    /// Register a fake binary at `path`.
    pub fn register(&self, path: &str, plugins: Vec<MockPlugin>) -> &Self {
        self.format.register(path, plugins);
        self
    }

    pub fn host(&self) -> &PluginHost {
        self.wrapper.host()
    }

    pub fn probe(&self) -> MockProbe {
        self.format.probe()
    }

    pub fn notifications(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }

    /// Pump until the in-flight load settles.
    pub fn settle(&self) {
        assert!(
            self.wrapper.wait_until_settled(SETTLE_TIMEOUT),
            "load did not settle within {SETTLE_TIMEOUT:?}"
        );
    }

    /// `load(path)` and wait for it to settle.
    pub fn load(&self, path: &str) {
        self.host().load(path);
        self.settle();
    }
}

/// Owned multichannel buffer that can be lent out as an [`AudioBlock`].
pub struct TestBuffer {
    channels: Vec<Vec<f32>>,
}

impl TestBuffer {
    pub fn filled(channels: usize, frames: usize, value: f32) -> Self {
        Self {
            channels: vec![vec![value; frames]; channels],
        }
    }

    pub fn sine(channels: usize, frames: usize, frequency: f64) -> Self {
        let signal = generate_sine(frequency, TEST_SAMPLE_RATE, frames);
        Self {
            channels: vec![signal; channels],
        }
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Run `f` with this buffer lent out as an audio block.
    pub fn with_block<R>(&mut self, f: impl FnOnce(&mut AudioBlock<'_, '_>) -> R) -> R {
        let mut slices: Vec<&mut [f32]> = self.channels.iter_mut().map(Vec::as_mut_slice).collect();
        let mut block = AudioBlock::new(&mut slices);
        f(&mut block)
    }
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0, f32::max)
}
