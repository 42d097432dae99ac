//! Host configuration.

use crate::descriptor::PluginRole;
use crate::error::{HostError, Result};
use crate::layout::ChannelLayout;
use serde::{Deserialize, Serialize};

/// Configuration fixed when the wrapper is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub role: PluginRole,
    /// Descriptor roles the scanner accepts; the role's default when empty.
    pub accepted_roles: Vec<PluginRole>,
    pub sample_rate: f64,
    pub max_block_size: u32,
    /// Active wrapper layout; the role's default when unset.
    pub wrapper_layout: Option<ChannelLayout>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::for_role(PluginRole::Effect)
    }
}

impl HostConfig {
    pub fn for_role(role: PluginRole) -> Self {
        Self {
            role,
            accepted_roles: Vec::new(),
            sample_rate: 44100.0,
            max_block_size: 512,
            wrapper_layout: None,
        }
    }

    pub fn accepted_roles(&self) -> Vec<PluginRole> {
        if self.accepted_roles.is_empty() {
            self.role.default_accepted()
        } else {
            self.accepted_roles.clone()
        }
    }

    pub fn wrapper_layout(&self) -> ChannelLayout {
        self.wrapper_layout
            .clone()
            .unwrap_or_else(|| ChannelLayout::default_for(self.role))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate < 8000.0 || self.sample_rate > 384000.0 {
            return Err(HostError::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.max_block_size == 0 || self.max_block_size > 65536 {
            return Err(HostError::InvalidConfig(format!(
                "max_block_size {} out of range (1-65536)",
                self.max_block_size
            )));
        }
        if let Some(layout) = &self.wrapper_layout {
            if self.role == PluginRole::MidiEffect && !layout.inputs.is_empty() {
                return Err(HostError::InvalidConfig(
                    "a midi-effect wrapper has no input buses".to_string(),
                ));
            }
        }
        Ok(())
    }
}
