//! A wrapper: one lifecycle manager, its control queue and its audio bridge.

use crate::builder::WrapperBuilder;
use crate::Result;
use cocoon_host::{
    AudioBlock, AudioBridge, ControlQueue, MidiBuffer, PluginHost, ProcessMode, TransportInfo,
};
use std::time::Duration;

/// Owns the control queue, so it stays on the thread that built it.
/// Hand [`bridge`](Self::bridge) clones to the audio thread and
/// [`host`](Self::host) clones to anything that issues lifecycle calls.
pub struct Wrapper {
    host: PluginHost,
    bridge: AudioBridge,
    control: ControlQueue,
}

impl Wrapper {
    pub fn builder() -> WrapperBuilder {
        WrapperBuilder::default()
    }

    pub(crate) fn from_parts(host: PluginHost, control: ControlQueue) -> Self {
        Self {
            bridge: host.bridge(),
            host,
            control,
        }
    }

    pub fn host(&self) -> &PluginHost {
        &self.host
    }

    pub fn bridge(&self) -> AudioBridge {
        self.bridge.clone()
    }

    pub fn control(&self) -> &ControlQueue {
        &self.control
    }

    /// Run pending control tasks: load completions, forwarded calls.
    pub fn pump(&self) -> usize {
        self.control.pump()
    }

    /// Pump until no load is in flight. Returns false on timeout.
    pub fn wait_until_settled(&self, timeout: Duration) -> bool {
        let host = self.host.clone();
        self.control.pump_until(timeout, move || !host.is_loading())
    }

    /// Process one block in place through the hosted plugin, if any.
    pub fn process(
        &self,
        block: &mut AudioBlock<'_, '_>,
        midi: &mut MidiBuffer,
        transport: &TransportInfo,
        mode: ProcessMode,
    ) -> bool {
        self.bridge.process(block, midi, transport, mode)
    }

    /// Encoded state document, `None` when nothing is loaded.
    pub fn save_state(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.host.save_state()?)
    }

    /// Decode a state document and reload the plugin it names.
    pub fn restore_state(&self, bytes: &[u8]) -> Result<()> {
        Ok(self.host.restore_state_bytes(bytes)?)
    }
}

impl std::fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wrapper")
            .field("host", &self.host)
            .field("pending", &self.control.pending())
            .finish()
    }
}
