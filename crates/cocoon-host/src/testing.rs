//! Scriptable plugin format for tests.
//!
//! Register fake plugin binaries under arbitrary paths, then drive a
//! [`PluginHost`](crate::PluginHost) against them. A [`MockProbe`] shared by
//! the format and every instance it creates records what the host did.

use crate::descriptor::{PluginDescriptor, PluginRole};
use crate::error::{HostError, Result};
use crate::format::{InstantiationThread, PluginFormat};
use crate::instance::{HostedInstance, PluginView};
use crate::layout::{ChannelLayout, ChannelSet};
use crate::protocol::{AudioBlock, MidiBuffer, TransportInfo};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// How a mock instantiation ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    Create,
    Fail(Option<String>),
    Panic,
}

/// Which layouts a mock instance accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutSupport {
    Any,
    Only(Vec<ChannelLayout>),
    Nothing,
}

/// One fake sub-plugin inside a registered binary.
#[derive(Debug, Clone)]
pub struct MockPlugin {
    pub role: PluginRole,
    pub name: String,
    pub manufacturer: String,
    pub default_layout: ChannelLayout,
    pub layouts: LayoutSupport,
    pub accepts_midi: bool,
    pub produces_midi: bool,
    pub latency: u32,
    pub tail_seconds: f64,
    pub outcome: MockOutcome,
    pub has_view: bool,
    pub gain: f32,
    pub initial_state: Vec<u8>,
    pub panic_on_midi_query: bool,
    pub fail_save: bool,
}

impl MockPlugin {
    pub fn new(role: PluginRole, name: impl Into<String>) -> Self {
        let midi = role != PluginRole::Effect;
        let default_layout = match role {
            PluginRole::Instrument => ChannelLayout::new(Vec::new(), vec![ChannelSet::Stereo]),
            PluginRole::Effect => ChannelLayout::stereo(),
            PluginRole::MidiEffect => ChannelLayout::midi_effect(),
        };
        Self {
            role,
            name: name.into(),
            manufacturer: "Mockworks".to_string(),
            default_layout,
            layouts: LayoutSupport::Any,
            accepts_midi: midi,
            produces_midi: role == PluginRole::MidiEffect,
            latency: 0,
            tail_seconds: 0.0,
            outcome: MockOutcome::Create,
            has_view: false,
            gain: 0.5,
            initial_state: Vec::new(),
            panic_on_midi_query: false,
            fail_save: false,
        }
    }

    pub fn instrument(name: impl Into<String>) -> Self {
        Self::new(PluginRole::Instrument, name)
    }

    pub fn effect(name: impl Into<String>) -> Self {
        Self::new(PluginRole::Effect, name)
    }

    pub fn midi_effect(name: impl Into<String>) -> Self {
        Self::new(PluginRole::MidiEffect, name)
    }

    pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }

    pub fn default_layout(mut self, layout: ChannelLayout) -> Self {
        self.default_layout = layout;
        self
    }

    pub fn layouts(mut self, layouts: LayoutSupport) -> Self {
        self.layouts = layouts;
        self
    }

    pub fn midi(mut self, accepts: bool, produces: bool) -> Self {
        self.accepts_midi = accepts;
        self.produces_midi = produces;
        self
    }

    pub fn latency(mut self, samples: u32) -> Self {
        self.latency = samples;
        self
    }

    pub fn tail_seconds(mut self, seconds: f64) -> Self {
        self.tail_seconds = seconds;
        self
    }

    pub fn outcome(mut self, outcome: MockOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_view(mut self) -> Self {
        self.has_view = true;
        self
    }

    pub fn gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn initial_state(mut self, state: impl Into<Vec<u8>>) -> Self {
        self.initial_state = state.into();
        self
    }

    /// Panic from the MIDI capability queries.
    pub fn panic_on_midi_query(mut self) -> Self {
        self.panic_on_midi_query = true;
        self
    }

    /// Fail every state save.
    pub fn failing_save(mut self) -> Self {
        self.fail_save = true;
        self
    }
}

#[derive(Default)]
struct ProbeInner {
    live: AtomicUsize,
    peak_live: AtomicUsize,
    created: AtomicUsize,
    scans: AtomicUsize,
    scan_threads: Mutex<Vec<ThreadId>>,
    views_live: AtomicUsize,
    view_violations: AtomicUsize,
    processed: AtomicUsize,
    bypassed: AtomicUsize,
    last_tempo_bits: AtomicU64,
    last_prepare: Mutex<Option<(f64, u32)>>,
    last_layout: Mutex<Option<ChannelLayout>>,
    last_loaded_state: Mutex<Option<Vec<u8>>>,
}

/// Observations shared between a [`MockFormat`] and its instances.
#[derive(Clone, Default)]
pub struct MockProbe {
    inner: Arc<ProbeInner>,
}

impl MockProbe {
    /// Instances currently alive.
    pub fn live(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// Most instances ever alive at once.
    pub fn peak_live(&self) -> usize {
        self.inner.peak_live.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.inner.created.load(Ordering::SeqCst)
    }

    pub fn scans(&self) -> usize {
        self.inner.scans.load(Ordering::SeqCst)
    }

    pub fn scan_threads(&self) -> Vec<ThreadId> {
        self.inner.scan_threads.lock().clone()
    }

    pub fn views_live(&self) -> usize {
        self.inner.views_live.load(Ordering::SeqCst)
    }

    /// Instances destroyed while one of their views was still alive.
    pub fn view_violations(&self) -> usize {
        self.inner.view_violations.load(Ordering::SeqCst)
    }

    pub fn processed_blocks(&self) -> usize {
        self.inner.processed.load(Ordering::SeqCst)
    }

    pub fn bypassed_blocks(&self) -> usize {
        self.inner.bypassed.load(Ordering::SeqCst)
    }

    pub fn last_tempo(&self) -> f64 {
        f64::from_bits(self.inner.last_tempo_bits.load(Ordering::SeqCst))
    }

    pub fn last_prepare(&self) -> Option<(f64, u32)> {
        *self.inner.last_prepare.lock()
    }

    pub fn last_layout(&self) -> Option<ChannelLayout> {
        self.inner.last_layout.lock().clone()
    }

    pub fn last_loaded_state(&self) -> Option<Vec<u8>> {
        self.inner.last_loaded_state.lock().clone()
    }

    fn instance_created(&self) {
        self.inner.created.fetch_add(1, Ordering::SeqCst);
        let now = self.inner.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak_live.fetch_max(now, Ordering::SeqCst);
    }
}

/// A [`PluginFormat`] backed by an in-memory table of fake binaries.
pub struct MockFormat {
    containers: Mutex<HashMap<PathBuf, Vec<MockPlugin>>>,
    thread: InstantiationThread,
    probe: MockProbe,
}

impl MockFormat {
    pub fn new() -> Self {
        Self::with_thread(InstantiationThread::Worker)
    }

    pub fn with_thread(thread: InstantiationThread) -> Self {
        Self {
            containers: Mutex::new(HashMap::new()),
            thread,
            probe: MockProbe::default(),
        }
    }

    /// Register a fake binary holding `plugins` in container order.
    pub fn register(&self, path: impl AsRef<Path>, plugins: Vec<MockPlugin>) {
        self.containers
            .lock()
            .insert(path.as_ref().to_path_buf(), plugins);
    }

    pub fn probe(&self) -> MockProbe {
        self.probe.clone()
    }
}

impl Default for MockFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginFormat for MockFormat {
    fn name(&self) -> &str {
        "mock"
    }

    fn scan(&self, path: &Path) -> Vec<PluginDescriptor> {
        self.probe.inner.scans.fetch_add(1, Ordering::SeqCst);
        self.probe
            .inner
            .scan_threads
            .lock()
            .push(thread::current().id());

        let containers = self.containers.lock();
        let Some(plugins) = containers.get(path) else {
            return Vec::new();
        };
        plugins
            .iter()
            .enumerate()
            .map(|(index, plugin)| {
                PluginDescriptor::new(path, index as u32, plugin.role)
                    .name(plugin.name.clone())
                    .manufacturer(plugin.manufacturer.clone())
                    .id(format!("mock.{}", plugin.name.to_lowercase()))
                    .version("1.0.0")
            })
            .collect()
    }

    fn instantiation_thread(&self) -> InstantiationThread {
        self.thread
    }

    fn instantiate(
        &self,
        descriptor: &PluginDescriptor,
        _sample_rate: f64,
        _max_block_size: u32,
    ) -> std::result::Result<Box<dyn HostedInstance>, String> {
        let plugin = self
            .containers
            .lock()
            .get(&descriptor.container_path)
            .and_then(|plugins| plugins.get(descriptor.index as usize).cloned())
            .ok_or_else(|| format!("{} disappeared after scanning", descriptor.name))?;

        match &plugin.outcome {
            MockOutcome::Create => {}
            MockOutcome::Fail(cause) => return Err(cause.clone().unwrap_or_default()),
            MockOutcome::Panic => panic!("mock plugin {} exploded", plugin.name),
        }

        self.probe.instance_created();
        Ok(Box::new(MockInstance {
            descriptor: descriptor.clone(),
            layout: plugin.default_layout.clone(),
            state: plugin.initial_state.clone(),
            plugin,
            probe: self.probe.clone(),
        }))
    }
}

/// Instance created by [`MockFormat`]. Processing applies a fixed gain.
pub struct MockInstance {
    descriptor: PluginDescriptor,
    plugin: MockPlugin,
    layout: ChannelLayout,
    state: Vec<u8>,
    probe: MockProbe,
}

impl HostedInstance for MockInstance {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn default_layout(&self) -> ChannelLayout {
        self.plugin.default_layout.clone()
    }

    fn set_layout(&mut self, layout: &ChannelLayout) -> bool {
        let accepted = match &self.plugin.layouts {
            LayoutSupport::Any => true,
            LayoutSupport::Only(allowed) => allowed.contains(layout),
            LayoutSupport::Nothing => false,
        };
        if accepted {
            self.layout = layout.clone();
            *self.probe.inner.last_layout.lock() = Some(layout.clone());
        }
        accepted
    }

    fn layout(&self) -> ChannelLayout {
        self.layout.clone()
    }

    fn accepts_midi(&self) -> bool {
        if self.plugin.panic_on_midi_query {
            panic!("mock MIDI query panicked");
        }
        self.plugin.accepts_midi
    }

    fn produces_midi(&self) -> bool {
        self.plugin.produces_midi
    }

    fn latency_samples(&self) -> u32 {
        self.plugin.latency
    }

    fn tail_seconds(&self) -> f64 {
        self.plugin.tail_seconds
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: u32) {
        *self.probe.inner.last_prepare.lock() = Some((sample_rate, max_block_size));
    }

    fn process(
        &mut self,
        block: &mut AudioBlock<'_, '_>,
        midi: &mut MidiBuffer,
        transport: &TransportInfo,
    ) {
        let n = block.num_samples;
        for channel in block.channels.iter_mut() {
            for sample in &mut channel[..n] {
                *sample *= self.plugin.gain;
            }
        }
        if !self.plugin.produces_midi {
            midi.clear();
        }
        self.probe
            .inner
            .last_tempo_bits
            .store(transport.tempo.to_bits(), Ordering::SeqCst);
        self.probe.inner.processed.fetch_add(1, Ordering::SeqCst);
    }

    fn process_bypassed(&mut self, _block: &mut AudioBlock<'_, '_>, _midi: &mut MidiBuffer) {
        self.probe.inner.bypassed.fetch_add(1, Ordering::SeqCst);
    }

    fn has_view(&self) -> bool {
        self.plugin.has_view
    }

    fn create_view(&mut self) -> Option<Box<dyn PluginView>> {
        if !self.plugin.has_view {
            return None;
        }
        self.probe.inner.views_live.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(MockView {
            probe: self.probe.clone(),
        }))
    }

    fn save_state(&self) -> Result<Vec<u8>> {
        if self.plugin.fail_save {
            return Err(HostError::StateSaveError("mock cannot save".into()));
        }
        Ok(self.state.clone())
    }

    fn load_state(&mut self, data: &[u8]) -> Result<()> {
        if data == b"corrupt" {
            return Err(HostError::StateRestoreError("mock rejects corrupt state".into()));
        }
        self.state = data.to_vec();
        *self.probe.inner.last_loaded_state.lock() = Some(data.to_vec());
        Ok(())
    }
}

impl Drop for MockInstance {
    fn drop(&mut self) {
        if self.probe.views_live() > 0 {
            self.probe.inner.view_violations.fetch_add(1, Ordering::SeqCst);
        }
        self.probe.inner.live.fetch_sub(1, Ordering::SeqCst);
    }
}

struct MockView {
    probe: MockProbe,
}

impl PluginView for MockView {
    fn size(&self) -> Option<(u32, u32)> {
        Some((640, 480))
    }

    fn attach(&mut self, parent: *mut c_void) -> Result<(u32, u32)> {
        if parent.is_null() {
            return Err(HostError::EditorError("null parent window".into()));
        }
        Ok((640, 480))
    }
}

impl Drop for MockView {
    fn drop(&mut self) {
        self.probe.inner.views_live.fetch_sub(1, Ordering::SeqCst);
    }
}
