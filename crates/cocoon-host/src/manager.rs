//! Lifecycle manager.
//!
//! [`PluginHost`] owns the single hosted instance and drives it through
//! scan → instantiate → negotiate layout → prime → restore state.
//!
//! Every field the audio thread or the view layer can observe lives in one
//! [`parking_lot::Mutex`]-guarded record. All mutation happens on the
//! control thread; public mutators called from any other thread re-post
//! themselves to the control queue. The `loading` flag is the reentrancy
//! guard: `load`, `close` and `restore_state` arriving while an attempt is in
//! flight are dropped.

use crate::config::HostConfig;
use crate::control::ControlSender;
use crate::descriptor::PluginRole;
use crate::error::{LoadError, Result};
use crate::format::PluginFormat;
use crate::instance::HostedInstance;
use crate::instantiator::{InstantiateResult, Instantiator};
use crate::layout::{negotiate, sidechain_available, ChannelLayout};
use crate::notify::ChangeBroadcaster;
use crate::scanner::DescriptorScanner;
use crate::state::{self, PersistedState};
use crate::view::{ViewHandle, ViewTracker};
use parking_lot::Mutex;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::thread;

/// The instance slot shared with the audio thread.
pub(crate) type SharedInstance = Arc<Mutex<Box<dyn HostedInstance>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Empty,
    Loading,
    Loaded,
    /// Empty, with the last load failure on record.
    Error,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Empty => write!(f, "empty"),
            LifecycleState::Loading => write!(f, "loading"),
            LifecycleState::Loaded => write!(f, "loaded"),
            LifecycleState::Error => write!(f, "error"),
        }
    }
}

/// What an explicit close does with the last load error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClosePolicy {
    /// Leave the message up for the view layer.
    #[default]
    KeepError,
    /// Hard reset.
    ClearError,
}

struct Record {
    loading: bool,
    instance: Option<SharedInstance>,
    error: String,
    path: String,
    name: String,
    layout_label: String,
    sidechain: bool,
    latency: u32,
    pending_state: Option<Vec<u8>>,
    wrapper_layout: ChannelLayout,
    sample_rate: f64,
    max_block_size: u32,
}

impl Record {
    fn clear_transient(&mut self) {
        self.name.clear();
        self.layout_label.clear();
        self.sidechain = false;
        self.latency = 0;
    }
}

struct Shared {
    role: PluginRole,
    record: Mutex<Record>,
    scanner: DescriptorScanner,
    instantiator: Instantiator,
    control: ControlSender,
    broadcaster: ChangeBroadcaster,
    views: ViewTracker,
}

/// An instance that made it through layout, priming and state replay.
struct Configured {
    instance: Box<dyn HostedInstance>,
    name: String,
    layout_label: String,
    sidechain: bool,
    latency: u32,
}

/// Handle to the lifecycle manager. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct PluginHost {
    shared: Arc<Shared>,
}

impl PluginHost {
    pub fn new(
        config: &HostConfig,
        format: Arc<dyn PluginFormat>,
        control: ControlSender,
    ) -> Result<Self> {
        config.validate()?;

        let role = config.role;
        let scanner = DescriptorScanner::new(Arc::clone(&format), role, config.accepted_roles());
        let instantiator = Instantiator::new(format, control.clone(), role);

        Ok(Self {
            shared: Arc::new(Shared {
                role,
                record: Mutex::new(Record {
                    loading: false,
                    instance: None,
                    error: String::new(),
                    path: String::new(),
                    name: String::new(),
                    layout_label: String::new(),
                    sidechain: false,
                    latency: 0,
                    pending_state: None,
                    wrapper_layout: config.wrapper_layout(),
                    sample_rate: config.sample_rate,
                    max_block_size: config.max_block_size,
                }),
                scanner,
                instantiator,
                control,
                broadcaster: ChangeBroadcaster::new(),
                views: ViewTracker::default(),
            }),
        })
    }

    pub fn role(&self) -> PluginRole {
        self.shared.role
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.record.lock().instance.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.record.lock().loading
    }

    /// Last load failure, empty when none is on record.
    pub fn last_error(&self) -> String {
        self.shared.record.lock().error.clone()
    }

    pub fn supports_sidechain(&self) -> bool {
        self.shared.record.lock().sidechain
    }

    /// `"<manufacturer> - <name> (<layout label>)"`, empty when nothing is loaded.
    pub fn hosted_name(&self) -> String {
        self.shared.record.lock().name.clone()
    }

    pub fn layout_label(&self) -> String {
        self.shared.record.lock().layout_label.clone()
    }

    pub fn plugin_path(&self) -> String {
        self.shared.record.lock().path.clone()
    }

    /// Latency the hosted instance reported when it was last primed.
    pub fn latency_samples(&self) -> u32 {
        self.shared.record.lock().latency
    }

    pub fn state(&self) -> LifecycleState {
        let record = self.shared.record.lock();
        if record.loading {
            LifecycleState::Loading
        } else if record.instance.is_some() {
            LifecycleState::Loaded
        } else if !record.error.is_empty() {
            LifecycleState::Error
        } else {
            LifecycleState::Empty
        }
    }

    /// Called on the control thread once per settled transition.
    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.shared.broadcaster.subscribe(listener);
    }

    /// Load the plugin binary at `path`, replacing whatever is hosted.
    ///
    /// Any view handed out by [`create_view_if_needed`](Self::create_view_if_needed)
    /// must already be dropped. Ignored while a load is in flight.
    pub fn load(&self, path: impl Into<String>) {
        let path = path.into();
        if !self.shared.control.is_control_thread() {
            self.forward(move |host| host.load(path));
            return;
        }

        let (retired, sample_rate, max_block_size) = {
            let mut record = self.shared.record.lock();
            if record.loading {
                tracing::debug!("Load of {} ignored: another load is in flight", path);
                return;
            }
            record.loading = true;
            record.clear_transient();
            record.path = path.clone();
            (
                record.instance.take(),
                record.sample_rate,
                record.max_block_size,
            )
        };
        if let Some(instance) = retired {
            self.retire(instance);
        }

        tracing::info!("Loading plugin from {}", path);

        let descriptor = match self.shared.scanner.select(Path::new(&path)) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                self.settle_failure(e);
                return;
            }
        };

        tracing::debug!(
            "Selected {} (#{} in {})",
            descriptor.name,
            descriptor.index,
            descriptor.container_path.display()
        );

        let host = self.clone();
        self.shared.instantiator.instantiate(
            descriptor,
            sample_rate,
            max_block_size,
            move |result| host.finish_load(result),
        );
    }

    /// Destroy the hosted instance and return to `Empty`. `policy` decides
    /// whether the last load error survives.
    ///
    /// Same view precondition as [`load`](Self::load). Ignored while a load
    /// is in flight; the caller can close again once it settles.
    pub fn close(&self, policy: ClosePolicy) {
        if !self.shared.control.is_control_thread() {
            self.forward(move |host| host.close(policy));
            return;
        }

        let retired = {
            let mut record = self.shared.record.lock();
            if record.loading {
                tracing::debug!("Close ignored: a load is in flight");
                return;
            }
            record.clear_transient();
            record.path.clear();
            record.pending_state = None;
            if policy == ClosePolicy::ClearError {
                record.error.clear();
            }
            record.instance.take()
        };
        if let Some(instance) = retired {
            self.retire(instance);
            tracing::info!("Hosted plugin closed");
        }

        self.shared.broadcaster.notify();
    }

    /// The hosted instance's editor, unless nothing is loaded, the plugin
    /// has none, or a handle from an earlier call is still alive.
    pub fn create_view_if_needed(&self) -> Option<ViewHandle> {
        debug_assert!(self.shared.control.is_control_thread());
        if self.shared.views.live() > 0 {
            return None;
        }
        let instance = self.current_instance()?;
        let view = instance.lock().create_view()?;
        Some(ViewHandle::new(view, &self.shared.views))
    }

    /// `{path, inner state}` of the hosted instance; `None` unless loaded.
    pub fn capture_state(&self) -> Option<PersistedState> {
        let (instance, plugin_path) = {
            let record = self.shared.record.lock();
            (record.instance.clone()?, record.path.clone())
        };
        let inner_state = match instance.lock().save_state() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Hosted plugin failed to save its state: {}", e);
                Vec::new()
            }
        };
        Some(PersistedState {
            plugin_path,
            inner_state,
        })
    }

    /// Queue `state.inner_state` for replay and load `state.plugin_path`.
    pub fn restore_state(&self, state: PersistedState) {
        if !self.shared.control.is_control_thread() {
            self.forward(move |host| host.restore_state(state));
            return;
        }
        {
            let mut record = self.shared.record.lock();
            if record.loading {
                tracing::debug!("Restore ignored: a load is in flight");
                return;
            }
            record.pending_state = Some(state.inner_state);
        }
        self.load(state.plugin_path);
    }

    /// Encoded state document, `None` unless loaded.
    ///
    /// A hosted instance that fails to save is an error, never an empty blob.
    pub fn save_state(&self) -> Result<Option<Vec<u8>>> {
        let (instance, plugin_path) = {
            let record = self.shared.record.lock();
            match record.instance.clone() {
                Some(instance) => (instance, record.path.clone()),
                None => return Ok(None),
            }
        };
        let inner_state = instance.lock().save_state()?;
        state::encode(&PersistedState {
            plugin_path,
            inner_state,
        })
        .map(Some)
    }

    /// Decode a state document and restore it. A document without a plugin
    /// path restores nothing.
    pub fn restore_state_bytes(&self, bytes: &[u8]) -> Result<()> {
        match state::decode(bytes)? {
            Some(decoded) => self.restore_state(decoded),
            None => tracing::debug!("State document has no plugin path; nothing to restore"),
        }
        Ok(())
    }

    /// Store the priming values and forward them verbatim to a loaded instance.
    pub fn prepare(&self, sample_rate: f64, max_block_size: u32) {
        let instance = {
            let mut record = self.shared.record.lock();
            record.sample_rate = sample_rate;
            record.max_block_size = max_block_size;
            record.instance.clone()
        };
        let Some(instance) = instance else {
            return;
        };
        let latency = {
            let mut guard = instance.lock();
            guard.prepare(sample_rate, max_block_size);
            guard.latency_samples()
        };
        self.record_latency_if_current(&instance, latency);
    }

    /// The host's active channel configuration, used by the next load.
    pub fn set_wrapper_layout(&self, layout: ChannelLayout) {
        self.shared.record.lock().wrapper_layout = layout;
    }

    pub fn wrapper_layout(&self) -> ChannelLayout {
        self.shared.record.lock().wrapper_layout.clone()
    }

    pub fn reset(&self) {
        if let Some(instance) = self.current_instance() {
            instance.lock().reset();
        }
    }

    pub fn release_resources(&self) {
        if let Some(instance) = self.current_instance() {
            instance.lock().release();
        }
    }

    pub fn tail_seconds(&self) -> f64 {
        self.current_instance()
            .map(|instance| instance.lock().tail_seconds())
            .unwrap_or(0.0)
    }

    /// The instance may have been closed or replaced since `latency` was read.
    fn record_latency_if_current(&self, instance: &SharedInstance, latency: u32) {
        let mut record = self.shared.record.lock();
        if record
            .instance
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, instance))
        {
            record.latency = latency;
        }
    }

    /// Clone of the instance slot. Holds the record lock only for the clone.
    pub(crate) fn current_instance(&self) -> Option<SharedInstance> {
        self.shared.record.lock().instance.clone()
    }

    fn forward(&self, op: impl FnOnce(&PluginHost) + Send + 'static) {
        let host = self.clone();
        if self.shared.control.post(move || op(&host)).is_err() {
            tracing::warn!("Control queue closed; lifecycle request dropped");
        }
    }

    fn finish_load(&self, result: InstantiateResult) {
        match result.and_then(|instance| self.configure(instance)) {
            Ok(configured) => {
                {
                    let mut record = self.shared.record.lock();
                    record.instance = Some(Arc::new(Mutex::new(configured.instance)));
                    record.name = configured.name.clone();
                    record.layout_label = configured.layout_label;
                    record.sidechain = configured.sidechain;
                    record.latency = configured.latency;
                    record.error.clear();
                    record.loading = false;
                }
                tracing::info!(
                    "Loaded {} (latency {} samples)",
                    configured.name,
                    configured.latency
                );
                self.shared.broadcaster.notify();
            }
            Err(e) => self.settle_failure(e),
        }
    }

    /// Negotiate layout, prime, and replay pending state. The instance is
    /// dropped here, on the control thread, if any step fails.
    fn configure(&self, mut instance: Box<dyn HostedInstance>) -> std::result::Result<Configured, LoadError> {
        let role = self.shared.role;
        let (current, sample_rate, max_block_size, pending) = {
            let mut record = self.shared.record.lock();
            (
                record.wrapper_layout.clone(),
                record.sample_rate,
                record.max_block_size,
                record.pending_state.take(),
            )
        };

        let (layout_label, sidechain) = if role == PluginRole::MidiEffect {
            if !instance.set_layout(&ChannelLayout::midi_effect()) {
                tracing::debug!("MIDI effect kept its own layout");
            }
            (String::new(), false)
        } else {
            let negotiation = negotiate(&current, &instance.default_layout(), role);
            let accepted = instance.set_layout(&negotiation.target);
            if !accepted {
                return Err(LoadError::LayoutUnsupported {
                    label: negotiation.label,
                });
            }
            let sidechain = sidechain_available(role, &negotiation.target, accepted);
            (negotiation.label, sidechain)
        };

        instance.prepare(sample_rate, max_block_size);
        let latency = instance.latency_samples();

        if let Some(bytes) = pending {
            match instance.load_state(&bytes) {
                Ok(()) => tracing::debug!("Replayed {} bytes of saved state", bytes.len()),
                Err(e) => tracing::warn!("Hosted plugin rejected saved state: {}", e),
            }
        }

        let stem = instance.descriptor().display_stem();
        let name = if role == PluginRole::MidiEffect || layout_label.is_empty() {
            stem
        } else {
            format!("{stem} ({layout_label})")
        };

        Ok(Configured {
            instance,
            name,
            layout_label,
            sidechain,
            latency,
        })
    }

    fn settle_failure(&self, error: LoadError) {
        tracing::warn!("Plugin load failed: {}", error);
        {
            let mut record = self.shared.record.lock();
            record.clear_transient();
            record.path.clear();
            record.pending_state = None;
            record.error = error.to_string();
            record.loading = false;
        }
        self.shared.broadcaster.notify();
    }

    /// Destroy an instance taken out of the record, on this thread.
    ///
    /// The audio thread may still hold a clone for the rest of its block;
    /// wait for it so the plugin is never destroyed there.
    fn retire(&self, mut instance: SharedInstance) {
        let live_views = self.shared.views.live();
        if live_views > 0 {
            tracing::error!(
                "Destroying hosted instance with {} editor view(s) still alive",
                live_views
            );
            debug_assert!(false, "editor views must be dropped before load or close");
        }

        loop {
            match Arc::try_unwrap(instance) {
                Ok(slot) => {
                    drop(slot.into_inner());
                    return;
                }
                Err(shared) => {
                    instance = shared;
                    thread::yield_now();
                }
            }
        }
    }
}

impl fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHost")
            .field("role", &self.shared.role)
            .field("state", &self.state())
            .field("name", &self.hosted_name())
            .finish()
    }
}
