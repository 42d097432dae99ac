//! Builder for configuring and constructing a [`Wrapper`].

use crate::{Result, Wrapper};
use cocoon_host::{ChannelLayout, ControlQueue, HostConfig, PluginFormat, PluginHost, PluginRole};
use std::sync::Arc;

/// The wrapper is owned by the thread that builds it: that thread becomes the
/// control thread and must pump the wrapper's control queue.
///
/// With the `clap` feature the CLAP format is used unless another one is set.
///
/// # Example
///
/// ```ignore
/// use cocoon::prelude::*;
///
/// let wrapper = Wrapper::builder()
///     .role(PluginRole::Effect)
///     .sample_rate(48000.0)
///     .max_block_size(256)
///     .build()?;
///
/// wrapper.host().load("/usr/lib/clap/Verb.clap");
/// wrapper.wait_until_settled(Duration::from_secs(5));
/// ```
#[derive(Default)]
pub struct WrapperBuilder {
    config: HostConfig,
    format: Option<Arc<dyn PluginFormat>>,
}

impl WrapperBuilder {
    /// Replace the whole configuration, e.g. one deserialized from disk.
    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: Effect
    pub fn role(mut self, role: PluginRole) -> Self {
        self.config.role = role;
        self
    }

    /// Also accept descriptors of `role`. The role's defaults apply when
    /// nothing is added.
    pub fn accept(mut self, role: PluginRole) -> Self {
        if !self.config.accepted_roles.contains(&role) {
            self.config.accepted_roles.push(role);
        }
        self
    }

    /// Default: 44100
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Default: 512
    pub fn max_block_size(mut self, max_block_size: u32) -> Self {
        self.config.max_block_size = max_block_size;
        self
    }

    /// The host's active bus layout. Defaults to the role's layout.
    pub fn layout(mut self, layout: ChannelLayout) -> Self {
        self.config.wrapper_layout = Some(layout);
        self
    }

    pub fn format(mut self, format: impl PluginFormat + 'static) -> Self {
        self.format = Some(Arc::new(format));
        self
    }

    pub fn shared_format(mut self, format: Arc<dyn PluginFormat>) -> Self {
        self.format = Some(format);
        self
    }

    pub fn build(self) -> Result<Wrapper> {
        let format = match self.format {
            Some(format) => format,
            None => default_format()?,
        };

        let control = ControlQueue::new();
        let host = PluginHost::new(&self.config, format, control.sender())?;
        tracing::debug!(
            "Built {} wrapper at {} Hz / {} samples",
            self.config.role,
            self.config.sample_rate,
            self.config.max_block_size
        );
        Ok(Wrapper::from_parts(host, control))
    }
}

#[cfg(feature = "clap")]
fn default_format() -> Result<Arc<dyn PluginFormat>> {
    Ok(Arc::new(cocoon_clap::ClapFormat::new()))
}

#[cfg(not(feature = "clap"))]
fn default_format() -> Result<Arc<dyn PluginFormat>> {
    Err(cocoon_host::HostError::InvalidConfig("no plugin format configured".to_string()).into())
}
