//! Plugin binary formats.

use crate::descriptor::PluginDescriptor;
use crate::instance::HostedInstance;
use std::path::Path;

/// Where a format requires its instances to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstantiationThread {
    /// A background thread; completion is posted back to the control queue.
    Worker,
    /// A later task on the control queue. Still asynchronous for the caller
    /// of `load`.
    Control,
}

/// A plugin binary format (CLAP, VST3, ...).
pub trait PluginFormat: Send + Sync {
    fn name(&self) -> &str;

    /// Enumerate the sub-plugins in `path`, in container order.
    ///
    /// Only ever called on the control thread. Returns an empty list when
    /// nothing loadable is found.
    fn scan(&self, path: &Path) -> Vec<PluginDescriptor>;

    fn instantiation_thread(&self) -> InstantiationThread {
        InstantiationThread::Worker
    }

    /// Create an instance from a descriptor this format produced.
    ///
    /// An empty error string means the format had nothing to say about why.
    fn instantiate(
        &self,
        descriptor: &PluginDescriptor,
        sample_rate: f64,
        max_block_size: u32,
    ) -> std::result::Result<Box<dyn HostedInstance>, String>;
}
