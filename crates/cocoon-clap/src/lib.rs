//! CLAP backend for cocoon.
//!
//! Loads `.clap` binaries in-process with `libloading` and drives them
//! through the `clap-sys` ABI behind cocoon-host's [`PluginFormat`] and
//! [`HostedInstance`] traits.
//!
//! [`PluginFormat`]: cocoon_host::PluginFormat
//! [`HostedInstance`]: cocoon_host::HostedInstance

pub mod error;
mod events;
pub mod format;
mod host;
pub mod instance;
mod library;
mod stream;
mod view;

pub use error::{ClapError, LoadStage, Result};
pub use format::{role_from_features, ClapFormat};
pub use instance::ClapInstance;
