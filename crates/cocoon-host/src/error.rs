//! Error types for the hosted-plugin lifecycle

use crate::descriptor::PluginRole;
use thiserror::Error;

/// Why a load attempt settled without an installed instance.
///
/// The `Display` text is what [`PluginHost::last_error`](crate::PluginHost::last_error)
/// reports to the view layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("No valid plugin found in selected file")]
    NoValidPluginFound,

    #[error("Selected plugin is not {}", role_article(.0))]
    RoleMismatch(PluginRole),

    #[error("Selected plugin does not {} MIDI", .0.verb())]
    MidiCapabilityMismatch(MidiDirection),

    #[error("Selected plugin doesn't support current channel layout ({label})")]
    LayoutUnsupported { label: String },

    #[error("{}", instantiation_message(.0.as_deref()))]
    InstantiationFailed(Option<String>),

    #[error("Unexpected error while loading the plugin")]
    Unexpected,
}

/// The MIDI capability a MIDI-effect wrapper found missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiDirection {
    Input,
    Output,
}

impl MidiDirection {
    fn verb(&self) -> &'static str {
        match self {
            MidiDirection::Input => "accept",
            MidiDirection::Output => "produce",
        }
    }
}

fn role_article(role: &PluginRole) -> &'static str {
    match role {
        PluginRole::Instrument => "an instrument",
        PluginRole::Effect => "an effect",
        PluginRole::MidiEffect => "a MIDI effect",
    }
}

fn instantiation_message(cause: Option<&str>) -> String {
    match cause {
        Some(cause) => format!("Failed to create plugin instance: {cause}"),
        None => "Failed to create plugin instance".to_string(),
    }
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed state document: {0}")]
    MalformedState(String),

    #[error("Failed to save plugin state: {0}")]
    StateSaveError(String),

    #[error("Failed to restore plugin state: {0}")]
    StateRestoreError(String),

    #[error("Plugin editor error: {0}")]
    EditorError(String),

    #[error("Control queue closed")]
    ControlQueueClosed,

    #[error(transparent)]
    Load(#[from] LoadError),
}

pub type Result<T> = std::result::Result<T, HostError>;
