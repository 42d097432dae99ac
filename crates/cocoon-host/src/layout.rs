//! Channel layouts and layout negotiation.
//!
//! The wrapper runs with whatever channel configuration its own host
//! activated. A hosted plugin has its own bus topology. Negotiation builds
//! a target layout with the plugin's bus count, filled from the channel sets
//! the host is already using, and derives a label plus sidechain
//! availability from the result.

use crate::descriptor::PluginRole;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of auxiliary stereo outputs a wrapper exposes (disabled by default).
pub const AUX_OUTPUT_BUSES: usize = 24;

/// The channel configuration of one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSet {
    Disabled,
    Mono,
    Stereo,
    Lcr,
    Quadraphonic,
    Surround50,
    Surround51,
    Surround71,
    Discrete(u32),
}

impl ChannelSet {
    pub fn channel_count(&self) -> usize {
        match self {
            ChannelSet::Disabled => 0,
            ChannelSet::Mono => 1,
            ChannelSet::Stereo => 2,
            ChannelSet::Lcr => 3,
            ChannelSet::Quadraphonic => 4,
            ChannelSet::Surround50 => 5,
            ChannelSet::Surround51 => 6,
            ChannelSet::Surround71 => 8,
            ChannelSet::Discrete(n) => *n as usize,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.channel_count() == 0
    }

    /// The canonical set for a channel count.
    ///
    /// Counts without a named arrangement come back as [`ChannelSet::Discrete`].
    pub fn from_channel_count(count: usize) -> Self {
        match count {
            0 => ChannelSet::Disabled,
            1 => ChannelSet::Mono,
            2 => ChannelSet::Stereo,
            3 => ChannelSet::Lcr,
            4 => ChannelSet::Quadraphonic,
            5 => ChannelSet::Surround50,
            6 => ChannelSet::Surround51,
            8 => ChannelSet::Surround71,
            n => ChannelSet::Discrete(n as u32),
        }
    }

    pub fn description(&self) -> String {
        match self {
            ChannelSet::Disabled => "Disabled".to_string(),
            ChannelSet::Mono => "Mono".to_string(),
            ChannelSet::Stereo => "Stereo".to_string(),
            ChannelSet::Lcr => "LCR".to_string(),
            ChannelSet::Quadraphonic => "Quadraphonic".to_string(),
            ChannelSet::Surround50 => "5.0 Surround".to_string(),
            ChannelSet::Surround51 => "5.1 Surround".to_string(),
            ChannelSet::Surround71 => "7.1 Surround".to_string(),
            ChannelSet::Discrete(n) => format!("Discrete #{n}"),
        }
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Ordered input and output buses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelLayout {
    pub inputs: Vec<ChannelSet>,
    pub outputs: Vec<ChannelSet>,
}

impl ChannelLayout {
    pub fn new(inputs: Vec<ChannelSet>, outputs: Vec<ChannelSet>) -> Self {
        Self { inputs, outputs }
    }

    pub fn stereo() -> Self {
        Self::new(vec![ChannelSet::Stereo], vec![ChannelSet::Stereo])
    }

    /// What a MIDI effect is primed with: nothing in, one stereo output.
    pub fn midi_effect() -> Self {
        Self::new(Vec::new(), vec![ChannelSet::Stereo])
    }

    /// The buses a wrapper of `role` declares before its host changes them.
    ///
    /// Instruments: stereo sidechain in. Effects: stereo main plus stereo
    /// sidechain in. Both get a stereo main out and disabled aux outs.
    /// MIDI effects only carry the stereo main out.
    pub fn default_for(role: PluginRole) -> Self {
        let mut outputs = vec![ChannelSet::Stereo];
        match role {
            PluginRole::MidiEffect => Self::new(Vec::new(), outputs),
            PluginRole::Instrument => {
                outputs.extend(std::iter::repeat(ChannelSet::Disabled).take(AUX_OUTPUT_BUSES));
                Self::new(vec![ChannelSet::Stereo], outputs)
            }
            PluginRole::Effect => {
                outputs.extend(std::iter::repeat(ChannelSet::Disabled).take(AUX_OUTPUT_BUSES));
                Self::new(vec![ChannelSet::Stereo, ChannelSet::Stereo], outputs)
            }
        }
    }

    pub fn total_inputs(&self) -> usize {
        self.inputs.iter().map(ChannelSet::channel_count).sum()
    }

    pub fn total_outputs(&self) -> usize {
        self.outputs.iter().map(ChannelSet::channel_count).sum()
    }

    /// Channels an in-place block must carry for this layout.
    pub fn block_channels(&self) -> usize {
        self.total_inputs().max(self.total_outputs())
    }

    pub fn main_input(&self) -> ChannelSet {
        self.inputs.first().copied().unwrap_or(ChannelSet::Disabled)
    }

    pub fn main_output(&self) -> ChannelSet {
        self.outputs.first().copied().unwrap_or(ChannelSet::Disabled)
    }
}

/// Result of [`negotiate`], before the hosted instance has been asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiation {
    pub target: ChannelLayout,
    pub label: String,
}

/// Map the wrapper's active layout onto the hosted plugin's bus topology.
///
/// The target has exactly as many buses as `hosted_default`; bus *i* takes
/// the wrapper's set at index *i*, or `Disabled` when the wrapper has fewer
/// buses. Channel counts the host isn't already running are never invented.
pub fn negotiate(
    current: &ChannelLayout,
    hosted_default: &ChannelLayout,
    role: PluginRole,
) -> Negotiation {
    let pick = |wrapper: &[ChannelSet], index: usize| {
        wrapper.get(index).copied().unwrap_or(ChannelSet::Disabled)
    };

    let target = ChannelLayout {
        inputs: (0..hosted_default.inputs.len())
            .map(|i| pick(&current.inputs, i))
            .collect(),
        outputs: (0..hosted_default.outputs.len())
            .map(|i| pick(&current.outputs, i))
            .collect(),
    };

    let label = layout_label(&target, role);
    Negotiation { target, label }
}

/// Human-readable summary of a layout for `role`.
pub fn layout_label(layout: &ChannelLayout, role: PluginRole) -> String {
    match role {
        PluginRole::Instrument => match layout.outputs.len() {
            0 => String::new(),
            1 => layout.outputs[0].description(),
            _ => "Multioutput".to_string(),
        },
        PluginRole::Effect | PluginRole::MidiEffect => format!(
            "{}->{}",
            layout.main_input().description(),
            layout.main_output().description()
        ),
    }
}

/// Whether the accepted `layout` exposes the sidechain bus for `role`.
pub fn sidechain_available(role: PluginRole, layout: &ChannelLayout, accepted: bool) -> bool {
    match role.sidechain_bus_index() {
        Some(index) => accepted && layout.inputs.len() == index + 1,
        None => false,
    }
}
