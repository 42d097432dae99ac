//! Plugin descriptors and roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// What kind of processor a plugin (or the wrapper hosting it) is.
///
/// Set once on the wrapper at construction; the scanner, layout negotiator
/// and display-name logic all branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginRole {
    Instrument,
    Effect,
    MidiEffect,
}

impl PluginRole {
    /// Descriptor roles a wrapper of this role accepts by default.
    ///
    /// Note processors frequently register as instruments, so a MIDI-effect
    /// wrapper takes either.
    pub fn default_accepted(self) -> Vec<PluginRole> {
        match self {
            PluginRole::Instrument => vec![PluginRole::Instrument],
            PluginRole::Effect => vec![PluginRole::Effect],
            PluginRole::MidiEffect => vec![PluginRole::MidiEffect, PluginRole::Instrument],
        }
    }

    /// Input bus carrying the sidechain for this role, if any.
    pub fn sidechain_bus_index(self) -> Option<usize> {
        match self {
            PluginRole::Instrument => Some(0),
            // bus 0 is the primary input
            PluginRole::Effect => Some(1),
            PluginRole::MidiEffect => None,
        }
    }
}

impl fmt::Display for PluginRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginRole::Instrument => write!(f, "instrument"),
            PluginRole::Effect => write!(f, "effect"),
            PluginRole::MidiEffect => write!(f, "midi-effect"),
        }
    }
}

impl std::str::FromStr for PluginRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "instrument" | "synth" => Ok(PluginRole::Instrument),
            "effect" | "fx" => Ok(PluginRole::Effect),
            "midi-effect" | "midi" | "note-effect" => Ok(PluginRole::MidiEffect),
            other => Err(format!("unknown plugin role '{other}'")),
        }
    }
}

/// One loadable sub-plugin inside a plugin binary.
///
/// Produced by a scan and consumed once by the instantiator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub container_path: PathBuf,
    pub index: u32,
    pub role: PluginRole,
    pub name: String,
    pub manufacturer: String,
    /// Format-native identifier (CLAP plugin id, VST3 class id, ...).
    pub id: String,
    pub version: String,
}

impl PluginDescriptor {
    pub fn new(container_path: impl AsRef<Path>, index: u32, role: PluginRole) -> Self {
        Self {
            container_path: container_path.as_ref().to_path_buf(),
            index,
            role,
            name: String::new(),
            manufacturer: String::new(),
            id: String::new(),
            version: String::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// `"<manufacturer> - <name>"`, the stem of the hosted display name.
    pub fn display_stem(&self) -> String {
        format!("{} - {}", self.manufacturer, self.name)
    }
}
