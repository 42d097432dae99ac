//! [`PluginFormat`] implementation for CLAP binaries.

use crate::instance::ClapInstance;
use crate::library::{ClapLibrary, ClapPluginInfo};
use cocoon_host::{HostedInstance, InstantiationThread, PluginDescriptor, PluginFormat, PluginRole};
use std::path::Path;
use tracing::warn;

/// Map CLAP feature strings onto a wrapper role.
pub fn role_from_features<S: AsRef<str>>(features: &[S]) -> PluginRole {
    let has = |wanted: &str| features.iter().any(|f| f.as_ref() == wanted);
    if has("instrument") {
        PluginRole::Instrument
    } else if has("note-effect") && !has("audio-effect") {
        PluginRole::MidiEffect
    } else {
        PluginRole::Effect
    }
}

fn descriptor_from(path: &Path, index: usize, info: ClapPluginInfo) -> PluginDescriptor {
    PluginDescriptor::new(path, index as u32, role_from_features(&info.features))
        .name(info.name)
        .manufacturer(info.vendor)
        .id(info.id)
        .version(info.version)
}

/// In-process CLAP hosting.
///
/// Instances are created on the control thread: CLAP requires `init` and
/// most extension calls on the main thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClapFormat;

impl ClapFormat {
    pub fn new() -> Self {
        Self
    }
}

impl PluginFormat for ClapFormat {
    fn name(&self) -> &str {
        "CLAP"
    }

    fn scan(&self, path: &Path) -> Vec<PluginDescriptor> {
        match ClapLibrary::open(path) {
            Ok(library) => library
                .plugins()
                .into_iter()
                .enumerate()
                .map(|(index, info)| descriptor_from(path, index, info))
                .collect(),
            Err(e) => {
                warn!("{e}");
                Vec::new()
            }
        }
    }

    fn instantiation_thread(&self) -> InstantiationThread {
        InstantiationThread::Control
    }

    fn instantiate(
        &self,
        descriptor: &PluginDescriptor,
        sample_rate: f64,
        max_block_size: u32,
    ) -> Result<Box<dyn HostedInstance>, String> {
        let library = ClapLibrary::open(&descriptor.container_path).map_err(|e| e.to_string())?;
        let instance = ClapInstance::instantiate(library, descriptor, sample_rate, max_block_size)
            .map_err(|e| e.to_string())?;
        Ok(Box::new(instance))
    }
}
