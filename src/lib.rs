//! # Cocoon - Hosted-Plugin Lifecycle Manager
//!
//! Embeds a dynamically discovered third-party audio plugin inside a wrapper
//! that re-exposes it under a different host contract.
//!
//! ## Architecture
//!
//! Cocoon is an umbrella crate that coordinates:
//! - **cocoon-host** - Lifecycle core (scanning, asynchronous instantiation,
//!   layout negotiation, state persistence, audio bridge)
//! - **cocoon-clap** - CLAP plugin format (in-process)
//!
//! ## Quick Start
//!
//! ```ignore
//! use cocoon::prelude::*;
//!
//! let wrapper = Wrapper::builder()
//!     .role(PluginRole::Instrument)
//!     .sample_rate(48000.0)
//!     .build()?;
//!
//! wrapper.host().load("/usr/lib/clap/Synth.clap");
//! wrapper.wait_until_settled(Duration::from_secs(5));
//!
//! // audio thread
//! let bridge = wrapper.bridge();
//! bridge.process(&mut block, &mut midi, &transport, ProcessMode::Process);
//! ```
//!
//! ## Feature Flags
//!
//! - `clap` (default) - CLAP plugin hosting

/// Re-export of cocoon-host for direct access
pub use cocoon_host as host;

#[cfg(feature = "clap")]
pub use cocoon_clap as clap;

pub use cocoon_host::{
    AudioBlock, AudioBridge, ChannelLayout, ChannelSet, ClosePolicy, ControlQueue, HostConfig,
    HostedInstance, LifecycleState, LoadError, MidiBuffer, MidiEvent, PersistedState,
    PluginDescriptor, PluginFormat, PluginHost, PluginRole, PluginView, ProcessMode,
    TransportInfo, ViewHandle,
};

#[cfg(feature = "clap")]
pub use cocoon_clap::ClapFormat;

mod builder;
mod error;
mod wrapper;

pub use builder::WrapperBuilder;
pub use error::{Error, Result};
pub use wrapper::Wrapper;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{Wrapper, WrapperBuilder};

    pub use crate::{
        AudioBlock, ChannelLayout, ChannelSet, ClosePolicy, LifecycleState, MidiBuffer,
        MidiEvent, PluginRole, ProcessMode, TransportInfo,
    };

    #[cfg(feature = "clap")]
    pub use crate::ClapFormat;

    pub use std::time::Duration;
}
