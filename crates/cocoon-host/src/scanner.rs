//! Descriptor scanning and selection.

use crate::descriptor::{PluginDescriptor, PluginRole};
use crate::error::LoadError;
use crate::format::PluginFormat;
use std::path::Path;
use std::sync::Arc;

/// Enumerates a plugin binary and picks the descriptor to instantiate.
///
/// Scanning must stay on the control thread: some binaries are unsafe to
/// probe anywhere else.
#[derive(Clone)]
pub struct DescriptorScanner {
    format: Arc<dyn PluginFormat>,
    role: PluginRole,
    accepted: Vec<PluginRole>,
}

impl DescriptorScanner {
    pub fn new(format: Arc<dyn PluginFormat>, role: PluginRole, accepted: Vec<PluginRole>) -> Self {
        Self {
            format,
            role,
            accepted,
        }
    }

    pub fn scan(&self, path: &Path) -> Vec<PluginDescriptor> {
        let descriptors = self.format.scan(path);
        tracing::debug!(
            "{} scan of {} found {} descriptor(s)",
            self.format.name(),
            path.display(),
            descriptors.len()
        );
        descriptors
    }

    /// Scan `path` and return the first descriptor the wrapper accepts.
    pub fn select(&self, path: &Path) -> Result<PluginDescriptor, LoadError> {
        select_descriptor(self.scan(path), self.role, &self.accepted)
    }
}

/// Pick the first descriptor, in container order, whose role is accepted.
pub fn select_descriptor(
    descriptors: Vec<PluginDescriptor>,
    wrapper_role: PluginRole,
    accepted: &[PluginRole],
) -> Result<PluginDescriptor, LoadError> {
    if descriptors.is_empty() {
        return Err(LoadError::NoValidPluginFound);
    }
    descriptors
        .into_iter()
        .find(|d| accepted.contains(&d.role))
        .ok_or(LoadError::RoleMismatch(wrapper_role))
}
