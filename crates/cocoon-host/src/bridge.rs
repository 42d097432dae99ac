//! Real-time entry point.

use crate::manager::PluginHost;
use crate::protocol::{AudioBlock, MidiBuffer, ProcessMode, TransportInfo};

/// Forwards audio blocks to whatever the lifecycle manager currently hosts.
///
/// Never blocks on the instance: when the control thread is using it, or
/// nothing is loaded, the block passes through untouched. The instance slot
/// is cloned under the host's record lock, which the control thread only
/// ever holds for field updates.
#[derive(Clone)]
pub struct AudioBridge {
    host: PluginHost,
}

impl AudioBridge {
    pub fn new(host: &PluginHost) -> Self {
        Self { host: host.clone() }
    }

    /// Process one block in place. Returns whether the hosted instance ran.
    pub fn process(
        &self,
        block: &mut AudioBlock<'_, '_>,
        midi: &mut MidiBuffer,
        transport: &TransportInfo,
        mode: ProcessMode,
    ) -> bool {
        let Some(instance) = self.host.current_instance() else {
            return false;
        };
        let Some(mut guard) = instance.try_lock() else {
            return false;
        };

        match mode {
            ProcessMode::Process => guard.process(block, midi, transport),
            ProcessMode::Bypassed => guard.process_bypassed(block, midi),
        }
        true
    }
}

impl PluginHost {
    pub fn bridge(&self) -> AudioBridge {
        AudioBridge::new(self)
    }
}
