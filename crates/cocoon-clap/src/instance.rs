//! A live CLAP plugin behind the [`HostedInstance`] trait.

use crate::error::{ClapError, LoadStage, Result};
use crate::events::{build_transport, InputEvents, OutputEvents};
use crate::host::ClapHost;
use crate::library::ClapLibrary;
use crate::stream::{output_stream, InputCursor};
use crate::view::{ClapView, WINDOW_API};
use clap_sys::audio_buffer::clap_audio_buffer;
use clap_sys::ext::audio_ports::{clap_audio_port_info, clap_plugin_audio_ports, CLAP_EXT_AUDIO_PORTS};
use clap_sys::ext::audio_ports_config::{
    clap_audio_ports_config, clap_plugin_audio_ports_config, CLAP_EXT_AUDIO_PORTS_CONFIG,
};
use clap_sys::ext::gui::{clap_plugin_gui, CLAP_EXT_GUI};
use clap_sys::ext::latency::{clap_plugin_latency, CLAP_EXT_LATENCY};
use clap_sys::ext::note_ports::{clap_plugin_note_ports, CLAP_EXT_NOTE_PORTS};
use clap_sys::ext::state::{clap_plugin_state, CLAP_EXT_STATE};
use clap_sys::ext::tail::{clap_plugin_tail, CLAP_EXT_TAIL};
use clap_sys::plugin::clap_plugin;
use clap_sys::process::{clap_process, CLAP_PROCESS_ERROR};
use cocoon_host::{
    AudioBlock, ChannelLayout, ChannelSet, HostError, HostedInstance, MidiBuffer,
    PluginDescriptor, PluginView, TransportInfo,
};
use std::ffi::CStr;
use std::mem;
use std::ops::Range;
use std::ptr;
use tracing::{debug, warn};

/// Look up a plugin extension table.
///
/// # Safety
/// `plugin` must be a live, initialised plugin. The table lives as long as it does.
unsafe fn extension<'a, T>(plugin: *const clap_plugin, id: &CStr) -> Option<&'a T> {
    let get = (*plugin).get_extension?;
    (get(plugin, id.as_ptr()) as *const T).as_ref()
}

/// Scratch channels for one direction, one `clap_audio_buffer` per port.
///
/// The pointer table and channel storage are heap allocations that stay put
/// when this struct moves, so the `clap_audio_buffer`s remain valid.
struct PortBuffers {
    counts: Vec<u32>,
    storage: Vec<Vec<f32>>,
    _pointers: Vec<*mut f32>,
    buffers: Vec<clap_audio_buffer>,
}

impl PortBuffers {
    fn new(counts: &[u32], frames: usize) -> Self {
        let total = counts.iter().sum::<u32>() as usize;
        let mut storage: Vec<Vec<f32>> = (0..total).map(|_| vec![0.0; frames]).collect();
        let mut pointers: Vec<*mut f32> = storage.iter_mut().map(|c| c.as_mut_ptr()).collect();

        let mut buffers = Vec::with_capacity(counts.len());
        let mut offset = 0;
        for &count in counts {
            let data32 = if count == 0 {
                ptr::null_mut()
            } else {
                unsafe { pointers.as_mut_ptr().add(offset) }
            };
            buffers.push(clap_audio_buffer {
                data32,
                data64: ptr::null_mut(),
                channel_count: count,
                latency: 0,
                constant_mask: 0,
            });
            offset += count as usize;
        }

        Self {
            counts: counts.to_vec(),
            storage,
            _pointers: pointers,
            buffers,
        }
    }

    fn empty() -> Self {
        Self::new(&[], 0)
    }

    fn frames(&self) -> usize {
        self.storage.first().map_or(usize::MAX, Vec::len)
    }

    fn port_range(&self, port: usize) -> Range<usize> {
        let start = self.counts[..port].iter().sum::<u32>() as usize;
        start..start + self.counts[port] as usize
    }
}

/// Whether every enabled bus of `layout` matches the plugin's port widths.
pub(crate) fn ports_match(inputs: &[u32], outputs: &[u32], layout: &ChannelLayout) -> bool {
    let side_matches = |ports: &[u32], sets: &[ChannelSet]| {
        ports.len() == sets.len()
            && ports
                .iter()
                .zip(sets)
                .all(|(&port, set)| set.is_disabled() || set.channel_count() == port as usize)
    };
    side_matches(inputs, &layout.inputs) && side_matches(outputs, &layout.outputs)
}

/// Whether an audio-ports configuration provides the layout's main buses.
pub(crate) fn config_matches(main_input: Option<u32>, main_output: Option<u32>, layout: &ChannelLayout) -> bool {
    layout.main_input().channel_count() == main_input.unwrap_or(0) as usize
        && layout.main_output().channel_count() == main_output.unwrap_or(0) as usize
}

pub struct ClapInstance {
    plugin: *const clap_plugin,
    host: ClapHost,
    descriptor: PluginDescriptor,
    input_ports: Vec<u32>,
    output_ports: Vec<u32>,
    layout: ChannelLayout,
    midi_in: bool,
    midi_out: bool,
    activated: bool,
    processing: bool,
    pending_reset: bool,
    sample_rate: f64,
    max_block: u32,
    steady_time: i64,
    inputs: PortBuffers,
    outputs: PortBuffers,
    in_events: InputEvents,
    out_events: OutputEvents,
    // last: unloaded after the plugin is destroyed
    library: ClapLibrary,
}

// Safety: the plugin is driven from one thread at a time; the lifecycle
// manager serialises access behind its instance mutex.
unsafe impl Send for ClapInstance {}

impl ClapInstance {
    /// Create and initialise the plugin `descriptor` names inside `library`.
    pub(crate) fn instantiate(
        library: ClapLibrary,
        descriptor: &PluginDescriptor,
        sample_rate: f64,
        max_block_size: u32,
    ) -> Result<Self> {
        let path = library.path().to_path_buf();
        let plugins = library.plugins();
        let info = if descriptor.id.is_empty() {
            plugins.get(descriptor.index as usize)
        } else {
            plugins.iter().find(|p| p.id == descriptor.id)
        }
        .ok_or_else(|| {
            ClapError::load(
                &path,
                LoadStage::Instantiation,
                format!("no plugin at index {}", descriptor.index),
            )
        })?;

        let host = ClapHost::new();
        let plugin = library.create_plugin(host.as_ptr(), &info.id)?;

        let initialised = match unsafe { (*plugin).init } {
            Some(init) => unsafe { init(plugin) },
            None => false,
        };
        if !initialised {
            if let Some(destroy) = unsafe { (*plugin).destroy } {
                unsafe { destroy(plugin) };
            }
            return Err(ClapError::load(&path, LoadStage::Initialization, "plugin init failed"));
        }

        let mut instance = Self {
            plugin,
            host,
            descriptor: descriptor.clone(),
            input_ports: Vec::new(),
            output_ports: Vec::new(),
            layout: ChannelLayout::default(),
            midi_in: false,
            midi_out: false,
            activated: false,
            processing: false,
            pending_reset: false,
            sample_rate,
            max_block: max_block_size.max(1),
            steady_time: 0,
            inputs: PortBuffers::empty(),
            outputs: PortBuffers::empty(),
            in_events: InputEvents::new(),
            out_events: OutputEvents::new(),
            library,
        };
        instance.query_ports();
        instance.query_note_ports();
        instance.layout = instance.default_layout();

        debug!(
            "Instantiated CLAP plugin {} ({} in / {} out ports)",
            info.id,
            instance.input_ports.len(),
            instance.output_ports.len()
        );
        Ok(instance)
    }

    fn raw(&self) -> &clap_plugin {
        unsafe { &*self.plugin }
    }

    fn query_ports(&mut self) {
        let plugin = self.plugin;
        let ports = unsafe { extension::<clap_plugin_audio_ports>(plugin, CLAP_EXT_AUDIO_PORTS) };
        let widths = |is_input: bool| -> Vec<u32> {
            let Some(ports) = ports else {
                return Vec::new();
            };
            let (Some(count), Some(get)) = (ports.count, ports.get) else {
                return Vec::new();
            };
            (0..unsafe { count(plugin, is_input) })
                .filter_map(|index| {
                    let mut info: clap_audio_port_info = unsafe { mem::zeroed() };
                    unsafe { get(plugin, index, is_input, &mut info) }.then_some(info.channel_count)
                })
                .collect()
        };
        self.input_ports = widths(true);
        self.output_ports = widths(false);
    }

    fn query_note_ports(&mut self) {
        let plugin = self.plugin;
        let ports = unsafe { extension::<clap_plugin_note_ports>(plugin, CLAP_EXT_NOTE_PORTS) };
        let count = |is_input: bool| match ports.and_then(|p| p.count) {
            Some(count) => unsafe { count(plugin, is_input) },
            None => 0,
        };
        self.midi_in = count(true) > 0;
        self.midi_out = count(false) > 0;
    }

    fn deactivate(&mut self) {
        if self.processing {
            if let Some(stop) = self.raw().stop_processing {
                unsafe { stop(self.plugin) };
            }
            self.processing = false;
        }
        if self.activated {
            if let Some(deactivate) = self.raw().deactivate {
                unsafe { deactivate(self.plugin) };
            }
            self.activated = false;
        }
    }

    fn service_host_requests(&mut self) {
        if self.host.requests().take_callback() {
            if let Some(on_main_thread) = self.raw().on_main_thread {
                unsafe { on_main_thread(self.plugin) };
            }
        }
    }

    /// Try the plugin's audio-ports configurations for one providing the
    /// layout's main buses. Leaves the plugin activated if it was.
    fn select_config(&mut self, layout: &ChannelLayout) -> bool {
        let Some(configs) = (unsafe {
            extension::<clap_plugin_audio_ports_config>(self.plugin, CLAP_EXT_AUDIO_PORTS_CONFIG)
        }) else {
            return false;
        };
        let (Some(count), Some(get), Some(select)) = (configs.count, configs.get, configs.select) else {
            return false;
        };

        let was_active = self.activated;
        self.deactivate();

        let mut selected = false;
        for index in 0..unsafe { count(self.plugin) } {
            let mut config: clap_audio_ports_config = unsafe { mem::zeroed() };
            if !unsafe { get(self.plugin, index, &mut config) } {
                continue;
            }
            let main_input = config.has_main_input.then_some(config.main_input_channel_count);
            let main_output = config.has_main_output.then_some(config.main_output_channel_count);
            if !config_matches(main_input, main_output, layout) {
                continue;
            }
            if unsafe { select(self.plugin, config.id) } {
                self.query_ports();
                if ports_match(&self.input_ports, &self.output_ports, layout) {
                    selected = true;
                    break;
                }
            }
        }

        if was_active {
            self.prepare(self.sample_rate, self.max_block);
        }
        selected
    }

    fn gui(&self) -> Option<&clap_plugin_gui> {
        unsafe { extension::<clap_plugin_gui>(self.plugin, CLAP_EXT_GUI) }
    }

    /// Copy the block's channels for `frames` starting at `start` into the
    /// input scratch. Disabled buses are fed silence.
    fn copy_in(&mut self, block: &AudioBlock<'_, '_>, start: usize, frames: usize) {
        let mut block_channel = 0;
        for port in 0..self.inputs.counts.len() {
            let enabled = self.layout.inputs.get(port).is_some_and(|set| !set.is_disabled());
            for scratch in self.inputs.port_range(port) {
                let target = &mut self.inputs.storage[scratch][..frames];
                match block.channels.get(block_channel).filter(|_| enabled) {
                    Some(source) => target.copy_from_slice(&source[start..start + frames]),
                    None => target.fill(0.0),
                }
                if enabled {
                    block_channel += 1;
                }
            }
        }
    }

    /// Write enabled output buses back over the block's leading channels.
    fn copy_out(&self, block: &mut AudioBlock<'_, '_>, start: usize, frames: usize) {
        let mut block_channel = 0;
        for port in 0..self.outputs.counts.len() {
            if !self.layout.outputs.get(port).is_some_and(|set| !set.is_disabled()) {
                continue;
            }
            for scratch in self.outputs.port_range(port) {
                if let Some(target) = block.channels.get_mut(block_channel) {
                    target[start..start + frames].copy_from_slice(&self.outputs.storage[scratch][..frames]);
                }
                block_channel += 1;
            }
        }
    }
}

impl HostedInstance for ClapInstance {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn default_layout(&self) -> ChannelLayout {
        ChannelLayout::new(
            self.input_ports.iter().map(|&c| ChannelSet::from_channel_count(c as usize)).collect(),
            self.output_ports.iter().map(|&c| ChannelSet::from_channel_count(c as usize)).collect(),
        )
    }

    fn set_layout(&mut self, layout: &ChannelLayout) -> bool {
        if !ports_match(&self.input_ports, &self.output_ports, layout) && !self.select_config(layout) {
            debug!("CLAP plugin {} rejected layout {:?}", self.descriptor.id, layout);
            return false;
        }
        self.layout = layout.clone();
        true
    }

    fn layout(&self) -> ChannelLayout {
        self.layout.clone()
    }

    fn accepts_midi(&self) -> bool {
        self.midi_in
    }

    fn produces_midi(&self) -> bool {
        self.midi_out
    }

    fn latency_samples(&self) -> u32 {
        let latency = unsafe { extension::<clap_plugin_latency>(self.plugin, CLAP_EXT_LATENCY) };
        match latency.and_then(|l| l.get) {
            Some(get) => unsafe { get(self.plugin) },
            None => 0,
        }
    }

    fn tail_seconds(&self) -> f64 {
        let tail = unsafe { extension::<clap_plugin_tail>(self.plugin, CLAP_EXT_TAIL) };
        let Some(get) = tail.and_then(|t| t.get) else {
            return 0.0;
        };
        match unsafe { get(self.plugin) } {
            u32::MAX => f64::INFINITY,
            samples if self.sample_rate > 0.0 => samples as f64 / self.sample_rate,
            _ => 0.0,
        }
    }

    fn prepare(&mut self, sample_rate: f64, max_block_size: u32) {
        self.host.requests().take_restart();
        self.service_host_requests();
        self.deactivate();

        self.sample_rate = sample_rate;
        self.max_block = max_block_size.max(1);

        let Some(activate) = self.raw().activate else {
            warn!("CLAP plugin {} has no activate function", self.descriptor.id);
            return;
        };
        if !unsafe { activate(self.plugin, sample_rate, 1, self.max_block) } {
            let err = ClapError::load(self.library.path(), LoadStage::Activation, "activate returned false");
            warn!("{err}");
            return;
        }

        self.activated = true;
        self.inputs = PortBuffers::new(&self.input_ports, self.max_block as usize);
        self.outputs = PortBuffers::new(&self.output_ports, self.max_block as usize);
    }

    fn release(&mut self) {
        self.deactivate();
    }

    fn reset(&mut self) {
        if self.host.requests().take_restart() && self.activated {
            self.prepare(self.sample_rate, self.max_block);
        }
        self.service_host_requests();
        self.pending_reset = true;
    }

    fn process(&mut self, block: &mut AudioBlock<'_, '_>, midi: &mut MidiBuffer, transport: &TransportInfo) {
        if !self.activated {
            return;
        }
        if !self.processing {
            self.processing = match self.raw().start_processing {
                Some(start) => unsafe { start(self.plugin) },
                None => true,
            };
            if !self.processing {
                return;
            }
        }
        if mem::take(&mut self.pending_reset) {
            if let Some(reset) = self.raw().reset {
                unsafe { reset(self.plugin) };
            }
        }
        let Some(process) = self.raw().process else {
            return;
        };

        let clap_transport = build_transport(transport);
        let chunk = (self.max_block as usize).min(self.inputs.frames()).min(self.outputs.frames());
        let total = block.num_samples;
        self.out_events.clear();

        let mut start = 0;
        while start < total {
            let frames = chunk.min(total - start);
            self.copy_in(block, start, frames);
            self.in_events.fill(midi, start as u32, (start + frames) as u32);
            self.out_events.set_offset(start as u32);

            let in_events = self.in_events.as_raw();
            let out_events = self.out_events.as_raw();
            let data = clap_process {
                steady_time: self.steady_time,
                frames_count: frames as u32,
                transport: &clap_transport,
                audio_inputs: self.inputs.buffers.as_ptr(),
                audio_outputs: self.outputs.buffers.as_mut_ptr(),
                audio_inputs_count: self.inputs.buffers.len() as u32,
                audio_outputs_count: self.outputs.buffers.len() as u32,
                in_events: &in_events,
                out_events: &out_events,
            };

            let status = unsafe { process(self.plugin, &data) };
            if status != CLAP_PROCESS_ERROR {
                self.copy_out(block, start, frames);
            }
            self.steady_time += frames as i64;
            start += frames;
        }

        midi.clear();
        if self.midi_out {
            midi.extend(self.out_events.events().iter().copied());
        }
    }

    fn has_view(&self) -> bool {
        let Some(is_supported) = self.gui().and_then(|gui| gui.is_api_supported) else {
            return false;
        };
        unsafe { is_supported(self.plugin, WINDOW_API.as_ptr(), false) }
    }

    fn create_view(&mut self) -> Option<Box<dyn PluginView>> {
        if !self.has_view() {
            return None;
        }
        let gui = self.gui()? as *const clap_plugin_gui;
        let view = unsafe { ClapView::create(self.plugin, gui, self.host.requests()) }?;
        Some(Box::new(view))
    }

    fn save_state(&self) -> cocoon_host::Result<Vec<u8>> {
        let Some(state) = (unsafe { extension::<clap_plugin_state>(self.plugin, CLAP_EXT_STATE) }) else {
            return Ok(Vec::new());
        };
        let save = state
            .save
            .ok_or_else(|| HostError::StateSaveError(ClapError::MissingExtension("state.save").to_string()))?;

        let mut data = Vec::new();
        let stream = output_stream(&mut data);
        if !unsafe { save(self.plugin, &stream) } {
            return Err(HostError::StateSaveError(ClapError::Rejected("state save").to_string()));
        }
        Ok(data)
    }

    fn load_state(&mut self, data: &[u8]) -> cocoon_host::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let Some(state) = (unsafe { extension::<clap_plugin_state>(self.plugin, CLAP_EXT_STATE) }) else {
            return Err(HostError::StateRestoreError(ClapError::MissingExtension("state").to_string()));
        };
        let load = state
            .load
            .ok_or_else(|| HostError::StateRestoreError(ClapError::MissingExtension("state.load").to_string()))?;

        let mut cursor = InputCursor::new(data);
        let stream = cursor.stream();
        if !unsafe { load(self.plugin, &stream) } {
            return Err(HostError::StateRestoreError(ClapError::Rejected("state load").to_string()));
        }
        Ok(())
    }
}

impl Drop for ClapInstance {
    fn drop(&mut self) {
        self.deactivate();
        if let Some(destroy) = self.raw().destroy {
            unsafe { destroy(self.plugin) };
        }
    }
}

impl std::fmt::Debug for ClapInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClapInstance")
            .field("id", &self.descriptor.id)
            .field("inputs", &self.input_ports)
            .field("outputs", &self.output_ports)
            .field("activated", &self.activated)
            .finish()
    }
}
