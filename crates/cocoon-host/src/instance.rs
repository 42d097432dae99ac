//! Hosted instance abstraction.

use crate::descriptor::PluginDescriptor;
use crate::error::Result;
use crate::layout::ChannelLayout;
use crate::protocol::{AudioBlock, MidiBuffer, TransportInfo};
use std::ffi::c_void;

/// A live plugin instance created by a [`PluginFormat`](crate::PluginFormat).
///
/// Owned exclusively by the lifecycle manager. Everything except
/// [`process`](Self::process) and [`process_bypassed`](Self::process_bypassed)
/// is called on the control thread.
pub trait HostedInstance: Send {
    fn descriptor(&self) -> &PluginDescriptor;

    /// The plugin's preferred bus topology.
    fn default_layout(&self) -> ChannelLayout;

    /// Offer a layout. Returns false when the plugin rejects it, in which
    /// case the previous layout stays active.
    fn set_layout(&mut self, layout: &ChannelLayout) -> bool;

    fn layout(&self) -> ChannelLayout;

    fn accepts_midi(&self) -> bool;

    fn produces_midi(&self) -> bool;

    fn latency_samples(&self) -> u32 {
        0
    }

    fn tail_seconds(&self) -> f64 {
        0.0
    }

    /// Prime for playback. Called again on every rate or block-size change.
    fn prepare(&mut self, sample_rate: f64, max_block_size: u32);

    fn release(&mut self) {}

    fn reset(&mut self) {}

    /// Real-time thread. Must not allocate.
    fn process(&mut self, block: &mut AudioBlock<'_, '_>, midi: &mut MidiBuffer, transport: &TransportInfo);

    /// Real-time thread. Default leaves the block untouched.
    fn process_bypassed(&mut self, _block: &mut AudioBlock<'_, '_>, _midi: &mut MidiBuffer) {}

    fn has_view(&self) -> bool {
        false
    }

    /// Create the plugin's editor. The returned view borrows the instance's
    /// internals and must be dropped before the instance.
    fn create_view(&mut self) -> Option<Box<dyn PluginView>> {
        None
    }

    fn save_state(&self) -> Result<Vec<u8>>;

    fn load_state(&mut self, data: &[u8]) -> Result<()>;
}

/// A plugin editor. Lives on the control thread only.
pub trait PluginView {
    /// Preferred size in pixels.
    fn size(&self) -> Option<(u32, u32)>;

    /// Embed into a native parent window (`NSView*`, `HWND`, or X11 window id).
    /// Returns the size the editor settled on.
    fn attach(&mut self, parent: *mut c_void) -> Result<(u32, u32)>;

    fn idle(&mut self) {}
}
