//! CLAP event lists and transport conversion.
//!
//! Both lists are sized once and reused every block; events past the
//! capacity are dropped rather than allocating on the audio thread.

use clap_sys::events::{
    clap_event_header, clap_event_midi, clap_event_note, clap_event_transport, clap_input_events,
    clap_output_events, CLAP_CORE_EVENT_SPACE_ID, CLAP_EVENT_MIDI, CLAP_EVENT_NOTE_OFF,
    CLAP_EVENT_NOTE_ON, CLAP_EVENT_TRANSPORT, CLAP_TRANSPORT_HAS_BEATS_TIMELINE,
    CLAP_TRANSPORT_HAS_SECONDS_TIMELINE, CLAP_TRANSPORT_HAS_TEMPO,
    CLAP_TRANSPORT_HAS_TIME_SIGNATURE, CLAP_TRANSPORT_IS_LOOP_ACTIVE, CLAP_TRANSPORT_IS_PLAYING,
    CLAP_TRANSPORT_IS_RECORDING,
};
use clap_sys::fixedpoint::{CLAP_BEATTIME_FACTOR, CLAP_SECTIME_FACTOR};
use cocoon_host::protocol::MIDI_STACK_CAPACITY;
use cocoon_host::{MidiBuffer, MidiEvent, TransportInfo};
use std::ffi::c_void;
use std::mem;
use std::ptr;

#[derive(Clone, Copy)]
enum InputEvent {
    Note(clap_event_note),
    Midi(clap_event_midi),
}

impl InputEvent {
    fn header(&self) -> *const clap_event_header {
        match self {
            InputEvent::Note(e) => &e.header,
            InputEvent::Midi(e) => &e.header,
        }
    }
}

fn header(size: usize, time: u32, type_: u16) -> clap_event_header {
    clap_event_header {
        size: size as u32,
        time,
        space_id: CLAP_CORE_EVENT_SPACE_ID,
        type_,
        flags: 0,
    }
}

/// Note on/off become CLAP note events; everything else is passed as raw MIDI.
fn to_clap_event(event: &MidiEvent, time: u32) -> Option<InputEvent> {
    if event.len == 0 {
        return None;
    }
    let status = event.status() & 0xF0;
    let channel = (event.status() & 0x0F) as i16;
    let note = |type_: u16, velocity: u8| {
        InputEvent::Note(clap_event_note {
            header: header(mem::size_of::<clap_event_note>(), time, type_),
            note_id: -1,
            port_index: 0,
            channel,
            key: event.data[1] as i16,
            velocity: velocity as f64 / 127.0,
        })
    };

    match status {
        0x90 if event.data[2] > 0 => Some(note(CLAP_EVENT_NOTE_ON, event.data[2])),
        0x90 | 0x80 => Some(note(CLAP_EVENT_NOTE_OFF, event.data[2])),
        _ => Some(InputEvent::Midi(clap_event_midi {
            header: header(mem::size_of::<clap_event_midi>(), time, CLAP_EVENT_MIDI),
            port_index: 0,
            data: event.data,
        })),
    }
}

/// Host → plugin events for one process call.
pub(crate) struct InputEvents {
    events: Vec<InputEvent>,
}

impl InputEvents {
    pub(crate) fn new() -> Self {
        Self {
            events: Vec::with_capacity(MIDI_STACK_CAPACITY),
        }
    }

    /// Refill with the events of `midi` whose offset falls in `start..end`,
    /// rebased to `start`.
    pub(crate) fn fill(&mut self, midi: &MidiBuffer, start: u32, end: u32) {
        self.events.clear();
        for event in midi
            .iter()
            .filter(|e| e.frame_offset >= start && e.frame_offset < end)
        {
            if self.events.len() == self.events.capacity() {
                break;
            }
            if let Some(converted) = to_clap_event(event, event.frame_offset - start) {
                self.events.push(converted);
            }
        }
    }

    /// The list as the plugin sees it. Valid while `self` is not moved.
    pub(crate) fn as_raw(&self) -> clap_input_events {
        clap_input_events {
            ctx: self as *const Self as *mut c_void,
            size: Some(input_size),
            get: Some(input_get),
        }
    }
}

unsafe extern "C" fn input_size(list: *const clap_input_events) -> u32 {
    if list.is_null() {
        return 0;
    }
    let events = &*((*list).ctx as *const InputEvents);
    events.events.len() as u32
}

unsafe extern "C" fn input_get(list: *const clap_input_events, index: u32) -> *const clap_event_header {
    if list.is_null() {
        return ptr::null();
    }
    let events = &*((*list).ctx as *const InputEvents);
    match events.events.get(index as usize) {
        Some(event) => event.header(),
        None => ptr::null(),
    }
}

/// Plugin → host MIDI collected during one block.
pub(crate) struct OutputEvents {
    events: MidiBuffer,
    offset: u32,
}

impl OutputEvents {
    pub(crate) fn new() -> Self {
        Self {
            events: MidiBuffer::new(),
            offset: 0,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
        self.offset = 0;
    }

    /// Frame offset added to events pushed from now on.
    pub(crate) fn set_offset(&mut self, offset: u32) {
        self.offset = offset;
    }

    pub(crate) fn events(&self) -> &MidiBuffer {
        &self.events
    }

    pub(crate) fn as_raw(&mut self) -> clap_output_events {
        clap_output_events {
            ctx: self as *mut Self as *mut c_void,
            try_push: Some(output_try_push),
        }
    }

    fn push(&mut self, header: &clap_event_header, event: *const clap_event_header) -> bool {
        if self.events.len() >= MIDI_STACK_CAPACITY {
            return false;
        }
        if header.space_id != CLAP_CORE_EVENT_SPACE_ID {
            return true;
        }
        let time = header.time + self.offset;

        let converted = match header.type_ {
            CLAP_EVENT_NOTE_ON | CLAP_EVENT_NOTE_OFF => {
                let note = unsafe { &*(event as *const clap_event_note) };
                if note.key < 0 || note.channel < 0 {
                    None
                } else if header.type_ == CLAP_EVENT_NOTE_ON {
                    let velocity = (note.velocity * 127.0).round().clamp(1.0, 127.0) as u8;
                    Some(MidiEvent::note_on(time, note.channel as u8, note.key as u8, velocity))
                } else {
                    Some(MidiEvent::note_off(time, note.channel as u8, note.key as u8))
                }
            }
            CLAP_EVENT_MIDI => {
                let midi = unsafe { &*(event as *const clap_event_midi) };
                Some(MidiEvent::from_bytes(time, &midi.data))
            }
            _ => None,
        };

        if let Some(converted) = converted {
            self.events.push(converted);
        }
        true
    }
}

unsafe extern "C" fn output_try_push(
    list: *const clap_output_events,
    event: *const clap_event_header,
) -> bool {
    if list.is_null() || event.is_null() {
        return false;
    }
    let events = &mut *((*list).ctx as *mut OutputEvents);
    events.push(&*event, event)
}

/// Build a `clap_event_transport` for the block.
pub(crate) fn build_transport(transport: &TransportInfo) -> clap_event_transport {
    let mut flags = CLAP_TRANSPORT_HAS_TEMPO
        | CLAP_TRANSPORT_HAS_BEATS_TIMELINE
        | CLAP_TRANSPORT_HAS_SECONDS_TIMELINE
        | CLAP_TRANSPORT_HAS_TIME_SIGNATURE;
    if transport.playing {
        flags |= CLAP_TRANSPORT_IS_PLAYING;
    }
    if transport.recording {
        flags |= CLAP_TRANSPORT_IS_RECORDING;
    }
    if transport.looping {
        flags |= CLAP_TRANSPORT_IS_LOOP_ACTIVE;
    }

    let beats = |quarters: f64| (quarters * CLAP_BEATTIME_FACTOR as f64).round() as i64;
    let seconds = |secs: f64| (secs * CLAP_SECTIME_FACTOR as f64).round() as i64;
    let quarters_to_seconds = |quarters: f64| {
        if transport.tempo > 0.0 {
            quarters * 60.0 / transport.tempo
        } else {
            0.0
        }
    };

    clap_event_transport {
        header: header(mem::size_of::<clap_event_transport>(), 0, CLAP_EVENT_TRANSPORT),
        flags,
        song_pos_beats: beats(transport.position_quarters),
        song_pos_seconds: seconds(transport.position_seconds),
        tempo: transport.tempo,
        tempo_inc: 0.0,
        loop_start_beats: beats(transport.loop_start_quarters),
        loop_end_beats: beats(transport.loop_end_quarters),
        loop_start_seconds: seconds(quarters_to_seconds(transport.loop_start_quarters)),
        loop_end_seconds: seconds(quarters_to_seconds(transport.loop_end_quarters)),
        bar_start: beats(transport.bar_start_quarters),
        bar_number: transport.bar_number,
        tsig_num: transport.time_sig_numerator,
        tsig_denom: transport.time_sig_denominator,
    }
}
