//! Hosted-plugin lifecycle core.
//!
//! Owns a single third-party plugin instance on behalf of a wrapper:
//! discovery, asynchronous instantiation, channel-layout negotiation,
//! priming, and state persistence, while the audio thread keeps
//! processing through [`AudioBridge`].
//!
//! Plugin binary formats plug in through [`PluginFormat`]; see the
//! `cocoon-clap` crate for the CLAP backend.

pub mod bridge;
pub mod config;
pub mod control;
pub mod descriptor;
pub mod error;
pub mod format;
pub mod instance;
pub mod instantiator;
pub mod layout;
pub mod manager;
pub mod notify;
pub mod protocol;
pub mod scanner;
pub mod state;
pub mod view;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bridge::AudioBridge;
pub use config::HostConfig;
pub use control::{ControlQueue, ControlSender};
pub use descriptor::{PluginDescriptor, PluginRole};
pub use error::{HostError, LoadError, MidiDirection, Result};
pub use format::{InstantiationThread, PluginFormat};
pub use instance::{HostedInstance, PluginView};
pub use instantiator::{InstantiateResult, Instantiator};
pub use layout::{
    layout_label, negotiate, sidechain_available, ChannelLayout, ChannelSet, Negotiation,
};
pub use manager::{ClosePolicy, LifecycleState, PluginHost};
pub use notify::ChangeBroadcaster;
pub use protocol::{AudioBlock, MidiBuffer, MidiEvent, ProcessMode, TransportInfo};
pub use scanner::DescriptorScanner;
pub use state::PersistedState;
pub use view::ViewHandle;
