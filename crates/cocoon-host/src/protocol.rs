//! Per-block data handed from the wrapper's host to the hosted instance.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub const MIDI_STACK_CAPACITY: usize = 256;

/// Raw short MIDI message with a sample offset into the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub frame_offset: u32,
    pub data: [u8; 3],
    pub len: u8,
}

impl MidiEvent {
    pub fn from_bytes(frame_offset: u32, bytes: &[u8]) -> Self {
        let mut data = [0u8; 3];
        let len = bytes.len().min(3);
        data[..len].copy_from_slice(&bytes[..len]);
        Self {
            frame_offset,
            data,
            len: len as u8,
        }
    }

    pub fn note_on(frame_offset: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self::from_bytes(frame_offset, &[0x90 | (channel & 0x0F), note, velocity])
    }

    pub fn note_off(frame_offset: u32, channel: u8, note: u8) -> Self {
        Self::from_bytes(frame_offset, &[0x80 | (channel & 0x0F), note, 0])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    pub fn status(&self) -> u8 {
        self.data[0]
    }
}

/// MIDI for one block; input on entry, whatever the plugin produced on exit.
pub type MidiBuffer = SmallVec<[MidiEvent; MIDI_STACK_CAPACITY]>;

/// Playhead information forwarded to the hosted instance each block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransportInfo {
    pub playing: bool,
    pub recording: bool,
    pub looping: bool,
    pub tempo: f64,
    pub time_sig_numerator: u16,
    pub time_sig_denominator: u16,
    pub position_samples: i64,
    pub position_seconds: f64,
    pub position_quarters: f64,
    pub bar_start_quarters: f64,
    pub bar_number: i32,
    pub loop_start_quarters: f64,
    pub loop_end_quarters: f64,
}

impl Default for TransportInfo {
    fn default() -> Self {
        Self {
            playing: false,
            recording: false,
            looping: false,
            tempo: 120.0,
            time_sig_numerator: 4,
            time_sig_denominator: 4,
            position_samples: 0,
            position_seconds: 0.0,
            position_quarters: 0.0,
            bar_start_quarters: 0.0,
            bar_number: 0,
            loop_start_quarters: 0.0,
            loop_end_quarters: 0.0,
        }
    }
}

/// How the host wants this block handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessMode {
    #[default]
    Process,
    Bypassed,
}

/// An in-place audio block.
///
/// Input buses occupy the leading channels in bus order; the plugin's
/// outputs are written back over the same channels. A block carries
/// `max(total inputs, total outputs)` channels for the active layout.
pub struct AudioBlock<'a, 'b> {
    pub channels: &'a mut [&'b mut [f32]],
    pub num_samples: usize,
}

impl<'a, 'b> AudioBlock<'a, 'b> {
    /// Wrap `channels`; the block length is the shortest channel.
    pub fn new(channels: &'a mut [&'b mut [f32]]) -> Self {
        let num_samples = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        Self {
            channels,
            num_samples,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels
            .get(index)
            .map(|c| &c[..self.num_samples])
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        let n = self.num_samples;
        self.channels.get_mut(index).map(|c| &mut c[..n])
    }

    pub fn clear(&mut self) {
        let n = self.num_samples;
        for channel in self.channels.iter_mut() {
            channel[..n].fill(0.0);
        }
    }
}
