//! Persisted-state tests: the document codec and restore-driven loads.

use crate::helpers::*;
use cocoon::host::state::{decode, encode};
use cocoon::host::testing::{MockOutcome, MockPlugin};
use cocoon::host::HostError;
use cocoon::prelude::*;
use cocoon::PersistedState;

#[test]
fn test_codec_round_trip() {
    let every_byte: Vec<u8> = (0..=255).collect();
    let samples = [
        PersistedState::new("/p.vst", b"opaque".to_vec()),
        PersistedState::new("/plugins/Réverb ünd Co.clap", every_byte),
        PersistedState::new("C:\\Program Files\\Common Files\\CLAP\\Synth.clap", Vec::new()),
        PersistedState::new("", vec![0; 4096]),
    ];

    for state in samples {
        let document = encode(&state).unwrap();
        assert_eq!(decode(&document).unwrap(), Some(state));
    }
}

#[test]
fn test_document_shape() {
    let document = encode(&PersistedState::new("/p.clap", vec![1, 2, 3])).unwrap();
    let text = String::from_utf8(document).unwrap();
    assert!(text.contains("\"plugin_path\":\"/p.clap\""));
    assert!(text.contains("\"inner_state\":\"AQID\""));
}

#[test]
fn test_restore_loads_and_replays_state() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/p.vst", vec![MockPlugin::effect("Verb").initial_state(b"factory".to_vec())]);

    let bytes = b"user preset 7".to_vec();
    fixture
        .host()
        .restore_state(PersistedState::new("/p.vst", bytes.clone()));
    assert!(fixture.host().is_loading());
    fixture.settle();

    assert!(fixture.host().is_loaded());
    assert_eq!(fixture.host().plugin_path(), "/p.vst");
    let captured = fixture.host().capture_state().unwrap();
    assert_eq!(captured.plugin_path, "/p.vst");
    assert_eq!(captured.inner_state, bytes);
    assert_eq!(fixture.probe().last_loaded_state(), Some(bytes));
}

#[test]
fn test_pending_state_applies_once() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/p.clap", vec![MockPlugin::effect("Verb").initial_state(b"factory".to_vec())]);

    fixture.host().restore_state(PersistedState::new("/p.clap", b"saved".to_vec()));
    fixture.settle();
    assert_eq!(fixture.host().capture_state().unwrap().inner_state, b"saved");

    // a plain reload starts from the plugin's own state
    fixture.load("/p.clap");
    assert_eq!(fixture.host().capture_state().unwrap().inner_state, b"factory");
}

#[test]
fn test_pending_state_discarded_on_failed_load() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register(
        "/broken.clap",
        vec![MockPlugin::effect("Broken").outcome(MockOutcome::Fail(None))],
    );
    fixture.register("/p.clap", vec![MockPlugin::effect("Verb").initial_state(b"factory".to_vec())]);

    fixture.host().restore_state(PersistedState::new("/broken.clap", b"saved".to_vec()));
    fixture.settle();
    assert_eq!(fixture.host().last_error(), "Failed to create plugin instance");

    fixture.load("/p.clap");
    assert_eq!(fixture.host().capture_state().unwrap().inner_state, b"factory");
    assert_eq!(fixture.probe().last_loaded_state(), None);
}

#[test]
fn test_rejected_state_still_loads() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/p.clap", vec![MockPlugin::effect("Verb")]);

    fixture.host().restore_state(PersistedState::new("/p.clap", b"corrupt".to_vec()));
    fixture.settle();

    assert!(fixture.host().is_loaded());
    assert_eq!(fixture.host().last_error(), "");
}

#[test]
fn test_restore_while_loading_is_ignored() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/a.clap", vec![MockPlugin::effect("A")]);
    fixture.register("/b.clap", vec![MockPlugin::effect("B")]);

    fixture.host().load("/a.clap");
    fixture.host().restore_state(PersistedState::new("/b.clap", b"saved".to_vec()));
    fixture.settle();

    assert_eq!(fixture.host().plugin_path(), "/a.clap");
    assert_eq!(fixture.probe().last_loaded_state(), None);
}

#[test]
fn test_capture_requires_loaded_instance() {
    let fixture = Fixture::new(PluginRole::Effect);
    assert_eq!(fixture.host().capture_state(), None);
    assert_eq!(fixture.wrapper.save_state().unwrap(), None);
}

#[test]
fn test_document_round_trip_through_wrapper() {
    let fixture = Fixture::new(PluginRole::Instrument);
    fixture.register("/synth.clap", vec![MockPlugin::instrument("Synth").initial_state(vec![9, 9, 9])]);
    fixture.load("/synth.clap");

    let document = fixture.wrapper.save_state().unwrap().unwrap();
    fixture.host().close(ClosePolicy::ClearError);

    let restored = Fixture::new(PluginRole::Instrument);
    restored.register("/synth.clap", vec![MockPlugin::instrument("Synth")]);
    restored.wrapper.restore_state(&document).unwrap();
    restored.settle();

    assert_eq!(restored.host().capture_state().unwrap().inner_state, vec![9, 9, 9]);
}

#[test]
fn test_failed_save_is_reported() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/verb.clap", vec![MockPlugin::effect("Verb").failing_save()]);
    fixture.load("/verb.clap");

    match fixture.wrapper.save_state() {
        Err(cocoon::Error::Host(HostError::StateSaveError(_))) => {}
        other => panic!("expected a state save error, got {other:?}"),
    }
}

#[test]
fn test_document_without_path_restores_nothing() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.wrapper.restore_state(br#"{"inner_state":"AQID"}"#).unwrap();
    assert!(!fixture.host().is_loading());
    assert_eq!(fixture.probe().scans(), 0);
}

#[test]
fn test_malformed_document_is_an_error() {
    let fixture = Fixture::new(PluginRole::Effect);
    match fixture.wrapper.restore_state(b"<xml/>") {
        Err(cocoon::Error::Host(HostError::MalformedState(_))) => {}
        other => panic!("expected a malformed-state error, got {other:?}"),
    }
}
