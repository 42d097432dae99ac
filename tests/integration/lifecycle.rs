//! Lifecycle tests: load/close state machine, exclusivity, reentrancy and
//! the error record.

use crate::helpers::*;
use cocoon::host::testing::{MockFormat, MockOutcome, MockPlugin};
use cocoon::host::InstantiationThread;
use cocoon::prelude::*;
use std::thread;

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_not_a_plugin_reports_no_valid_plugin() {
    let fixture = Fixture::new(PluginRole::Effect);

    fixture.host().load("/path/NotAPlugin.bin");

    assert!(!fixture.host().is_loading());
    assert!(!fixture.host().is_loaded());
    assert_eq!(fixture.host().state(), LifecycleState::Error);
    assert_eq!(
        fixture.host().last_error(),
        "No valid plugin found in selected file"
    );
    assert_eq!(fixture.notifications(), 1);
    assert_eq!(fixture.probe().created(), 0);
}

#[test]
fn test_effect_wrapper_rejects_instrument_binary() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/synth.clap", vec![MockPlugin::instrument("Synth")]);

    fixture.load("/synth.clap");

    assert!(!fixture.host().is_loaded());
    assert_eq!(fixture.host().last_error(), "Selected plugin is not an effect");
    assert_eq!(fixture.probe().created(), 0);
    assert_eq!(fixture.probe().live(), 0);
}

#[test]
fn test_close_while_loading_waits_for_settlement() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/verb.clap", vec![MockPlugin::effect("Verb")]);

    fixture.host().load("/verb.clap");
    assert!(fixture.host().is_loading());

    fixture.host().close(ClosePolicy::ClearError);
    assert!(fixture.host().is_loading());
    assert_eq!(fixture.notifications(), 0);

    fixture.settle();
    assert!(fixture.host().is_loaded());
    assert_eq!(fixture.notifications(), 1);

    fixture.host().close(ClosePolicy::ClearError);
    assert_eq!(fixture.host().state(), LifecycleState::Empty);
    assert_eq!(fixture.probe().live(), 0);
    assert_eq!(fixture.notifications(), 2);
}

// =============================================================================
// Exclusivity
// =============================================================================

#[test]
fn test_at_most_one_instance_across_load_sequences() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/a.clap", vec![MockPlugin::effect("A")]);
    fixture.register("/b.clap", vec![MockPlugin::effect("B")]);
    fixture.register("/broken.clap", vec![MockPlugin::effect("Broken").outcome(MockOutcome::Fail(None))]);

    let sequence = ["/a.clap", "/b.clap", "/broken.clap", "/a.clap", "/missing.clap", "/b.clap"];
    for (step, path) in sequence.iter().enumerate() {
        fixture.load(path);
        assert!(fixture.probe().live() <= 1, "step {step}: {} live", fixture.probe().live());
        if step % 2 == 1 {
            fixture.host().close(ClosePolicy::KeepError);
            assert_eq!(fixture.probe().live(), 0);
        }
    }

    assert_eq!(fixture.probe().peak_live(), 1);
}

#[test]
fn test_exclusivity_with_control_thread_instantiation() {
    let fixture = Fixture::with_format(
        PluginRole::Instrument,
        MockFormat::with_thread(InstantiationThread::Control),
        None,
    );
    fixture.register("/synth.clap", vec![MockPlugin::instrument("Synth")]);

    for _ in 0..5 {
        fixture.load("/synth.clap");
        assert!(fixture.host().is_loaded());
    }
    assert_eq!(fixture.probe().created(), 5);
    assert_eq!(fixture.probe().live(), 1);
    assert_eq!(fixture.probe().peak_live(), 1);
}

// =============================================================================
// Reentrancy guard
// =============================================================================

#[test]
fn test_load_while_loading_is_ignored() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/first.clap", vec![MockPlugin::effect("First")]);
    fixture.register("/second.clap", vec![MockPlugin::effect("Second")]);

    fixture.host().load("/first.clap");
    fixture.host().load("/second.clap");
    fixture.host().load("/second.clap");
    fixture.settle();

    assert_eq!(fixture.host().plugin_path(), "/first.clap");
    assert!(fixture.host().hosted_name().contains("First"));
    assert_eq!(fixture.probe().created(), 1);
    assert_eq!(fixture.probe().scans(), 1);
    assert_eq!(fixture.notifications(), 1);
}

// =============================================================================
// Error record
// =============================================================================

#[test]
fn test_error_clears_on_success() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register(
        "/broken.clap",
        vec![MockPlugin::effect("Broken").outcome(MockOutcome::Fail(Some("bad license".to_string())))],
    );
    fixture.register("/verb.clap", vec![MockPlugin::effect("Verb")]);

    let failures = ["/broken.clap", "/nothing-here.clap", "/broken.clap"];
    for path in failures {
        fixture.load(path);
        assert!(!fixture.host().last_error().is_empty());

        fixture.load("/verb.clap");
        assert_eq!(fixture.host().last_error(), "");
        assert!(fixture.host().is_loaded());
    }
}

#[test]
fn test_instantiation_failure_embeds_cause() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register(
        "/broken.clap",
        vec![MockPlugin::effect("Broken").outcome(MockOutcome::Fail(Some("bad license".to_string())))],
    );

    fixture.load("/broken.clap");
    assert_eq!(
        fixture.host().last_error(),
        "Failed to create plugin instance: bad license"
    );
}

#[test]
fn test_panicking_plugin_is_unexpected_error() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/bomb.clap", vec![MockPlugin::effect("Bomb").outcome(MockOutcome::Panic)]);

    fixture.load("/bomb.clap");
    assert_eq!(
        fixture.host().last_error(),
        "Unexpected error while loading the plugin"
    );
    assert!(!fixture.host().is_loading());
}

#[test]
fn test_panicking_midi_query_does_not_wedge_host() {
    let fixture = Fixture::new(PluginRole::MidiEffect);
    fixture.register("/bad-arp.clap", vec![MockPlugin::midi_effect("Bad").panic_on_midi_query()]);
    fixture.register("/arp.clap", vec![MockPlugin::midi_effect("Arp")]);

    fixture.load("/bad-arp.clap");
    assert_eq!(fixture.host().state(), LifecycleState::Error);
    assert_eq!(
        fixture.host().last_error(),
        "Unexpected error while loading the plugin"
    );
    assert_eq!(fixture.probe().live(), 0);

    fixture.load("/arp.clap");
    assert!(fixture.host().is_loaded());
    assert_eq!(fixture.host().last_error(), "");
}

#[test]
fn test_close_policy_decides_error_record() {
    let fixture = Fixture::new(PluginRole::Effect);

    fixture.load("/nothing-here.clap");
    fixture.host().close(ClosePolicy::KeepError);
    assert_eq!(fixture.host().state(), LifecycleState::Error);

    fixture.host().close(ClosePolicy::ClearError);
    assert_eq!(fixture.host().state(), LifecycleState::Empty);
    assert_eq!(fixture.host().last_error(), "");
}

#[test]
fn test_midi_effect_requires_midi_capability() {
    let fixture = Fixture::new(PluginRole::MidiEffect);
    fixture.register("/deaf.clap", vec![MockPlugin::midi_effect("Deaf").midi(false, true)]);
    fixture.register("/mute.clap", vec![MockPlugin::midi_effect("Mute").midi(true, false)]);

    fixture.load("/deaf.clap");
    assert_eq!(fixture.host().last_error(), "Selected plugin does not accept MIDI");

    fixture.load("/mute.clap");
    assert_eq!(fixture.host().last_error(), "Selected plugin does not produce MIDI");
    assert_eq!(fixture.probe().live(), 0);
}

#[test]
fn test_midi_effect_accepts_instrument_descriptor() {
    let fixture = Fixture::new(PluginRole::MidiEffect);
    fixture.register(
        "/arp.clap",
        vec![MockPlugin::instrument("Arp").manufacturer("Acme").midi(true, true)],
    );

    fixture.load("/arp.clap");
    assert!(fixture.host().is_loaded());
    assert_eq!(fixture.host().hosted_name(), "Acme - Arp");
    assert!(!fixture.host().supports_sidechain());
}

// =============================================================================
// Cross-thread calls
// =============================================================================

#[test]
fn test_calls_from_other_threads_run_on_control_thread() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/verb.clap", vec![MockPlugin::effect("Verb")]);

    let host = fixture.host().clone();
    thread::spawn(move || host.load("/verb.clap")).join().unwrap();

    // forwarded, not yet run
    assert!(!fixture.host().is_loading());
    assert_eq!(fixture.probe().scans(), 0);

    fixture.wrapper.pump();
    fixture.settle();
    assert!(fixture.host().is_loaded());

    let control = thread::current().id();
    assert!(fixture.probe().scan_threads().iter().all(|&id| id == control));
}
