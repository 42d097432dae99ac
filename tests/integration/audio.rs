//! Audio bridge tests: pass-through, forwarding, bypass and MIDI, plus
//! processing on a separate thread while the control thread reloads.

use crate::helpers::tolerances::FLOAT_EPSILON;
use crate::helpers::*;
use approx::assert_relative_eq;
use cocoon::host::testing::MockPlugin;
use cocoon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const BLOCK: usize = 128;

#[test]
fn test_empty_wrapper_passes_audio_through() {
    let fixture = Fixture::new(PluginRole::Effect);
    let mut buffer = TestBuffer::sine(2, BLOCK, 440.0);
    let original = buffer.channel(0).to_vec();
    let mut midi = MidiBuffer::new();
    midi.push(MidiEvent::note_on(0, 0, 60, 100));

    let ran = buffer.with_block(|block| {
        fixture
            .wrapper
            .process(block, &mut midi, &TransportInfo::default(), ProcessMode::Process)
    });

    assert!(!ran);
    assert_eq!(buffer.channel(0), original.as_slice());
    assert_eq!(midi.len(), 1);
}

#[test]
fn test_loaded_plugin_processes_block() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/gain.clap", vec![MockPlugin::effect("Gain").gain(0.25)]);
    fixture.load("/gain.clap");

    let mut buffer = TestBuffer::filled(2, BLOCK, 0.8);
    let mut midi = MidiBuffer::new();
    let transport = TransportInfo {
        tempo: 93.0,
        playing: true,
        ..TransportInfo::default()
    };

    let bridge = fixture.wrapper.bridge();
    let ran = buffer.with_block(|block| bridge.process(block, &mut midi, &transport, ProcessMode::Process));

    assert!(ran);
    for channel in 0..2 {
        for &sample in buffer.channel(channel) {
            assert_relative_eq!(sample, 0.2, epsilon = FLOAT_EPSILON);
        }
    }
    assert_relative_eq!(peak(buffer.channel(1)), 0.2, epsilon = FLOAT_EPSILON);
    assert_eq!(fixture.probe().processed_blocks(), 1);
    assert_eq!(fixture.probe().last_tempo(), 93.0);
}

#[test]
fn test_bypass_leaves_buffers_untouched() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/gain.clap", vec![MockPlugin::effect("Gain").gain(0.0)]);
    fixture.load("/gain.clap");

    let mut buffer = TestBuffer::sine(2, BLOCK, 1000.0);
    let original = buffer.channel(1).to_vec();
    let mut midi = MidiBuffer::new();

    let ran = buffer.with_block(|block| {
        fixture
            .wrapper
            .process(block, &mut midi, &TransportInfo::default(), ProcessMode::Bypassed)
    });

    assert!(ran);
    assert_eq!(buffer.channel(1), original.as_slice());
    assert_eq!(fixture.probe().bypassed_blocks(), 1);
    assert_eq!(fixture.probe().processed_blocks(), 0);
}

#[test]
fn test_midi_follows_plugin_capability() {
    let effect = Fixture::new(PluginRole::Effect);
    effect.register("/verb.clap", vec![MockPlugin::effect("Verb")]);
    effect.load("/verb.clap");

    let arp = Fixture::new(PluginRole::MidiEffect);
    arp.register("/arp.clap", vec![MockPlugin::midi_effect("Arp")]);
    arp.load("/arp.clap");

    for (fixture, keeps_midi) in [(&effect, false), (&arp, true)] {
        let mut buffer = TestBuffer::filled(2, BLOCK, 0.0);
        let mut midi = MidiBuffer::new();
        midi.push(MidiEvent::note_on(3, 0, 64, 90));
        buffer.with_block(|block| {
            fixture
                .wrapper
                .process(block, &mut midi, &TransportInfo::default(), ProcessMode::Process)
        });
        assert_eq!(!midi.is_empty(), keeps_midi);
    }
}

#[test]
fn test_prepare_reaches_instance_and_latency() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/look.clap", vec![MockPlugin::effect("Lookahead").latency(64).tail_seconds(1.5)]);
    fixture.load("/look.clap");

    assert_eq!(
        fixture.probe().last_prepare(),
        Some((TEST_SAMPLE_RATE, TEST_BUFFER_SIZE as u32))
    );
    assert_eq!(fixture.host().latency_samples(), 64);
    assert_eq!(fixture.host().tail_seconds(), 1.5);

    fixture.host().prepare(96000.0, 64);
    assert_eq!(fixture.probe().last_prepare(), Some((96000.0, 64)));
}

#[test]
fn test_audio_thread_survives_reloads() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/a.clap", vec![MockPlugin::effect("A").gain(0.5)]);
    fixture.register("/b.clap", vec![MockPlugin::effect("B").gain(0.5)]);

    let bridge = fixture.wrapper.bridge();
    let running = Arc::new(AtomicBool::new(true));
    let keep_going = running.clone();

    let audio = thread::spawn(move || {
        let mut blocks = 0usize;
        let mut bad_samples = 0usize;
        loop {
            let mut buffer = TestBuffer::filled(2, BLOCK, 1.0);
            let mut midi = MidiBuffer::new();
            buffer.with_block(|block| {
                bridge.process(block, &mut midi, &TransportInfo::default(), ProcessMode::Process)
            });
            // either passed through or processed, never anything else
            let sample = buffer.channel(0)[0];
            if sample != 1.0 && sample != 0.5 {
                bad_samples += 1;
            }
            blocks += 1;
            if !keep_going.load(Ordering::Acquire) {
                break;
            }
        }
        (blocks, bad_samples)
    });

    for round in 0..20 {
        let path = if round % 2 == 0 { "/a.clap" } else { "/b.clap" };
        fixture.load(path);
        assert!(fixture.probe().live() <= 1);
        if round % 5 == 4 {
            fixture.host().close(ClosePolicy::ClearError);
        }
    }

    running.store(false, Ordering::Release);
    let (blocks, bad_samples) = audio.join().unwrap();

    assert!(blocks > 0);
    assert_eq!(bad_samples, 0);
    assert_eq!(fixture.probe().peak_live(), 1);
}
