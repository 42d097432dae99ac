//! Layout negotiation tests: sizing against the hosted default topology,
//! labels, and sidechain derivation.

use crate::helpers::*;
use cocoon::host::testing::{LayoutSupport, MockPlugin};
use cocoon::prelude::*;

fn shaped(role: PluginRole, inputs: usize, outputs: usize) -> MockPlugin {
    MockPlugin::new(role, "Shaped")
        .midi(role != PluginRole::Effect, false)
        .default_layout(ChannelLayout::new(
            vec![ChannelSet::Stereo; inputs],
            vec![ChannelSet::Stereo; outputs],
        ))
}

#[test]
fn test_mono_host_truncates_stereo_effect_input() {
    let host_layout = ChannelLayout::new(vec![ChannelSet::Mono], vec![ChannelSet::Stereo]);
    let fixture = Fixture::with_layout(PluginRole::Effect, host_layout);
    fixture.register("/verb.clap", vec![MockPlugin::effect("Verb")]);

    fixture.load("/verb.clap");

    let offered = fixture.probe().last_layout().unwrap();
    assert_eq!(offered.inputs, vec![ChannelSet::Mono]);
    assert_eq!(offered.outputs, vec![ChannelSet::Stereo]);
    assert_eq!(fixture.host().layout_label(), "Mono->Stereo");
    assert_eq!(fixture.host().hosted_name(), "Mockworks - Verb (Mono->Stereo)");
}

#[test]
fn test_target_bus_counts_follow_hosted_default() {
    let host_layouts = [
        ChannelLayout::default_for(PluginRole::Effect),
        ChannelLayout::stereo(),
        ChannelLayout::new(vec![ChannelSet::Mono], Vec::new()),
        ChannelLayout::new(
            vec![ChannelSet::Surround51; 3],
            vec![ChannelSet::Quadraphonic; 6],
        ),
    ];
    let hosted_shapes = [(0, 1), (1, 1), (2, 1), (1, 4), (3, 2)];

    for host_layout in &host_layouts {
        for &(inputs, outputs) in &hosted_shapes {
            let fixture = Fixture::with_layout(PluginRole::Effect, host_layout.clone());
            fixture.register("/shaped.clap", vec![shaped(PluginRole::Effect, inputs, outputs)]);
            fixture.load("/shaped.clap");

            let offered = fixture.probe().last_layout().unwrap();
            assert_eq!(offered.inputs.len(), inputs, "host {host_layout:?}");
            assert_eq!(offered.outputs.len(), outputs, "host {host_layout:?}");
        }
    }
}

#[test]
fn test_missing_host_buses_are_disabled() {
    let fixture = Fixture::with_layout(PluginRole::Instrument, ChannelLayout::new(Vec::new(), vec![ChannelSet::Stereo]));
    fixture.register("/multi.clap", vec![shaped(PluginRole::Instrument, 0, 3)]);

    fixture.load("/multi.clap");

    let offered = fixture.probe().last_layout().unwrap();
    assert_eq!(
        offered.outputs,
        vec![ChannelSet::Stereo, ChannelSet::Disabled, ChannelSet::Disabled]
    );
    assert_eq!(fixture.host().layout_label(), "Multioutput");
}

#[test]
fn test_rejected_layout_reports_label() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register(
        "/picky.clap",
        vec![MockPlugin::effect("Picky").layouts(LayoutSupport::Nothing)],
    );

    fixture.load("/picky.clap");

    assert!(!fixture.host().is_loaded());
    assert_eq!(
        fixture.host().last_error(),
        "Selected plugin doesn't support current channel layout (Stereo->Stereo)"
    );
    assert!(!fixture.host().supports_sidechain());
    assert_eq!(fixture.probe().live(), 0);
}

#[test]
fn test_sidechain_derivation() {
    // (role, hosted input buses, layouts accepted, expected)
    let cases = [
        (PluginRole::Effect, 2, true, true),
        (PluginRole::Effect, 1, true, false),
        (PluginRole::Effect, 3, true, false),
        (PluginRole::Effect, 2, false, false),
        (PluginRole::Instrument, 1, true, true),
        (PluginRole::Instrument, 0, true, false),
        (PluginRole::Instrument, 2, true, false),
        (PluginRole::Instrument, 1, false, false),
    ];

    for (role, inputs, accepted, expected) in cases {
        let support = if accepted { LayoutSupport::Any } else { LayoutSupport::Nothing };
        let fixture = Fixture::new(role);
        fixture.register("/sc.clap", vec![shaped(role, inputs, 1).layouts(support)]);
        fixture.load("/sc.clap");

        assert_eq!(
            fixture.host().supports_sidechain(),
            expected,
            "{role} with {inputs} input bus(es), accepted={accepted}"
        );
        assert_eq!(fixture.host().is_loaded(), accepted);
    }
}

#[test]
fn test_midi_effect_skips_negotiation() {
    let fixture = Fixture::new(PluginRole::MidiEffect);
    fixture.register("/arp.clap", vec![shaped(PluginRole::MidiEffect, 2, 1).midi(true, true)]);

    fixture.load("/arp.clap");

    assert!(fixture.host().is_loaded());
    assert_eq!(fixture.host().layout_label(), "");
    assert!(!fixture.host().supports_sidechain());
    assert_eq!(fixture.probe().last_layout(), Some(ChannelLayout::midi_effect()));
}

#[test]
fn test_wrapper_layout_applies_to_next_load() {
    let fixture = Fixture::new(PluginRole::Effect);
    fixture.register("/verb.clap", vec![MockPlugin::effect("Verb")]);

    fixture.load("/verb.clap");
    assert_eq!(fixture.host().layout_label(), "Stereo->Stereo");

    fixture
        .host()
        .set_wrapper_layout(ChannelLayout::new(vec![ChannelSet::Mono], vec![ChannelSet::Mono]));
    assert_eq!(fixture.host().layout_label(), "Stereo->Stereo");

    fixture.load("/verb.clap");
    assert_eq!(fixture.host().layout_label(), "Mono->Mono");
}
