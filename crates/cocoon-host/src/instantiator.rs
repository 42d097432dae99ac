//! Asynchronous instantiation.

use crate::control::ControlSender;
use crate::descriptor::{PluginDescriptor, PluginRole};
use crate::error::{LoadError, MidiDirection};
use crate::format::{InstantiationThread, PluginFormat};
use crate::instance::HostedInstance;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

pub type InstantiateResult = Result<Box<dyn HostedInstance>, LoadError>;

type Completion = Box<dyn FnOnce(InstantiateResult) + Send>;

/// Creates instances without blocking the caller.
///
/// Completion is always delivered as a control-queue task, exactly once.
#[derive(Clone)]
pub struct Instantiator {
    format: Arc<dyn PluginFormat>,
    control: ControlSender,
    role: PluginRole,
}

impl Instantiator {
    pub fn new(format: Arc<dyn PluginFormat>, control: ControlSender, role: PluginRole) -> Self {
        Self {
            format,
            control,
            role,
        }
    }

    pub fn instantiate(
        &self,
        descriptor: PluginDescriptor,
        sample_rate: f64,
        max_block_size: u32,
        on_complete: impl FnOnce(InstantiateResult) + Send + 'static,
    ) {
        let format = Arc::clone(&self.format);
        let role = self.role;

        match format.instantiation_thread() {
            InstantiationThread::Control => {
                let posted = self.control.post(move || {
                    on_complete(create(&*format, &descriptor, role, sample_rate, max_block_size));
                });
                if posted.is_err() {
                    tracing::warn!("Control queue closed; instantiation dropped");
                }
            }
            InstantiationThread::Worker => {
                let control = self.control.clone();
                let slot: Arc<Mutex<Option<Completion>>> =
                    Arc::new(Mutex::new(Some(Box::new(on_complete))));
                let worker_slot = Arc::clone(&slot);

                let spawned = thread::Builder::new()
                    .name("cocoon-instantiate".to_string())
                    .spawn(move || {
                        let result = create(&*format, &descriptor, role, sample_rate, max_block_size);
                        let Some(done) = worker_slot.lock().take() else {
                            return;
                        };
                        if control.post(move || done(result)).is_err() {
                            tracing::warn!("Control queue closed; dropping instance of {}", descriptor.name);
                        }
                    });

                if let Err(e) = spawned {
                    tracing::error!("Failed to spawn instantiation thread: {}", e);
                    if let Some(done) = slot.lock().take() {
                        let cause = e.to_string();
                        let _ = self
                            .control
                            .post(move || done(Err(LoadError::InstantiationFailed(Some(cause)))));
                    }
                }
            }
        }
    }
}

fn create(
    format: &dyn PluginFormat,
    descriptor: &PluginDescriptor,
    role: PluginRole,
    sample_rate: f64,
    max_block_size: u32,
) -> InstantiateResult {
    tracing::debug!(
        "Instantiating {} ({}) at {} Hz / {} frames",
        descriptor.name,
        descriptor.id,
        sample_rate,
        max_block_size
    );

    // capability queries call into the plugin as well
    let created = panic::catch_unwind(AssertUnwindSafe(|| -> InstantiateResult {
        let instance = format
            .instantiate(descriptor, sample_rate, max_block_size)
            .map_err(|cause| {
                LoadError::InstantiationFailed(if cause.is_empty() { None } else { Some(cause) })
            })?;
        if role == PluginRole::MidiEffect {
            check_midi_capability(instance.as_ref())?;
        }
        Ok(instance)
    }));

    created.unwrap_or_else(|_| {
        tracing::error!("Plugin {} panicked during instantiation", descriptor.name);
        Err(LoadError::Unexpected)
    })
}

/// A MIDI effect needs both MIDI in and MIDI out. On failure the caller
/// drops the instance.
pub fn check_midi_capability(instance: &dyn HostedInstance) -> Result<(), LoadError> {
    if !instance.accepts_midi() {
        return Err(LoadError::MidiCapabilityMismatch(MidiDirection::Input));
    }
    if !instance.produces_midi() {
        return Err(LoadError::MidiCapabilityMismatch(MidiDirection::Output));
    }
    Ok(())
}
