//! Integration tests for polyvox-synth.
//!
//! Tests cover voice stealing, sustain handling, sample instruments and
//! mixing several synths through the public API.

use polyvox_core::{SynthTables, Waveform};
use polyvox_synth::{
    AudioSource, ChannelMessage, EnvelopeParams, FmInstrument, Generator, GeneratorKind,
    GeneratorSet, MessageSink, Mixer, OscillatorInstrument, OscillatorPatch, OscillatorSettings,
    SampleData, SampleInstrument, SampleZone, StealingMode, Synth,
};

const SR: f32 = 44100.0;

fn patch() -> OscillatorPatch {
    OscillatorPatch {
        oscillators: vec![OscillatorSettings {
            waveform: Waveform::Sine,
            detune: 0.0,
            gain: 1.0,
        }],
        amp_envelope: EnvelopeParams::adsr(0.002, 0.05, 0.8, 0.05),
        ..OscillatorPatch::default()
    }
}

fn render<S: AudioSource>(source: &mut S, frames: usize) -> (Vec<f32>, Vec<f32>) {
    let mut left = vec![0.0; frames];
    let mut right = vec![0.0; frames];
    source.process(&mut left, &mut right);
    (left, right)
}

fn peak(buffer: &[f32]) -> f32 {
    buffer.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

// ---------------------------------------------------------------------------
// 1. Voice stealing
// ---------------------------------------------------------------------------

#[test]
fn stealing_with_two_voices() {
    let tables = SynthTables::new();
    let mut synth = Synth::new(OscillatorInstrument::new(patch()), &tables, SR, 2).unwrap();

    synth.note_on(0, 60, 100); // A
    synth.note_on(0, 62, 100); // B
    synth.note_on(0, 64, 100); // C
    render(&mut synth, 64);

    let notes: Vec<u8> = synth.active_voices().map(|v| v.note()).collect();
    assert_eq!(notes.len(), 2, "pool size caps active voices");
    assert!(notes.contains(&64), "C should sound");
    let stolen = if notes.contains(&60) { 62 } else { 60 };
    assert!(!notes.contains(&stolen));

    // The stolen note's release must not touch C or the survivor
    synth.note_off(0, stolen, 0);
    assert!(synth.active_voices().all(|v| v.is_on()));
}

#[test]
fn stealing_disabled_keeps_old_notes() {
    let tables = SynthTables::new();
    let mut synth = Synth::new(OscillatorInstrument::new(patch()), &tables, SR, 2)
        .unwrap()
        .with_stealing(StealingMode::Disabled);
    synth.note_on(0, 60, 100);
    synth.note_on(0, 62, 100);
    synth.note_on(0, 64, 100);
    let notes: Vec<u8> = synth.active_voices().map(|v| v.note()).collect();
    assert_eq!(notes, [60, 62]);
}

// ---------------------------------------------------------------------------
// 2. Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn voice_sounds_until_release_finishes() {
    let tables = SynthTables::new();
    let mut synth = Synth::new(OscillatorInstrument::new(patch()), &tables, SR, 4).unwrap();
    synth.note_on(0, 69, 127);
    let (left, _) = render(&mut synth, 4410);
    assert!(peak(&left) > 0.1);

    synth.note_off(0, 69, 0);
    let (left, _) = render(&mut synth, 441);
    assert!(peak(&left) > 0.0, "release tail should still sound");
    assert_eq!(synth.active_voice_count(), 1);

    render(&mut synth, 4410);
    assert_eq!(synth.active_voice_count(), 0, "voice retired after release");
    let (left, right) = render(&mut synth, 64);
    assert_eq!(peak(&left), 0.0);
    assert_eq!(peak(&right), 0.0);
}

#[test]
fn pitch_bend_reaches_sounding_voice() {
    let tables = SynthTables::new();
    let mut plain = Synth::new(OscillatorInstrument::new(patch()), &tables, SR, 1).unwrap();
    let mut bent = Synth::new(OscillatorInstrument::new(patch()), &tables, SR, 1).unwrap();
    plain.note_on(0, 69, 100);
    bent.note_on(0, 69, 100);
    bent.pitch_bend(0, 16383);

    let (a, _) = render(&mut plain, 4410);
    let (b, _) = render(&mut bent, 4410);
    let crossings = |buf: &[f32]| buf.windows(2).filter(|w| (w[0] < 0.0) != (w[1] < 0.0)).count();
    let ratio = crossings(&b) as f32 / crossings(&a) as f32;
    assert!(
        (ratio - 1.122).abs() < 0.03,
        "two semitones up expected, ratio {}",
        ratio
    );
}

#[test]
fn fm_synth_renders_chord() {
    let tables = SynthTables::new();
    let mut synth = Synth::new(FmInstrument::default(), &tables, SR, 8).unwrap();
    for note in [60, 64, 67] {
        synth.note_on(0, note, 100);
    }
    let (left, right) = render(&mut synth, 2048);
    assert_eq!(synth.active_voice_count(), 3);
    assert!(peak(&left) > 0.05);
    assert!(left.iter().chain(&right).all(|s| s.is_finite()));
}

// ---------------------------------------------------------------------------
// 3. Sample instrument
// ---------------------------------------------------------------------------

#[test]
fn sample_synth_plays_zone_and_drops_unmapped_notes() {
    let tables = SynthTables::new();
    let frames: Vec<f32> = (0..2000)
        .map(|i| (i as f32 * 0.05).sin())
        .collect();
    let zone = SampleZone::new(
        SampleData::new(frames, SR),
        60,
        GeneratorSet::from_generators(&[
            Generator::key_range(48, 72),
            Generator::new(GeneratorKind::SampleModes, 1),
            Generator::new(GeneratorKind::ReleaseVolEnv, -3600),
        ]),
    )
    .with_loop(500, 1500);
    let instrument = SampleInstrument::new(&GeneratorSet::new(), vec![zone]);
    let mut synth = Synth::new(instrument, &tables, SR, 4).unwrap();

    synth.note_on(0, 90, 100);
    assert_eq!(synth.active_voice_count(), 0, "no zone covers key 90");

    synth.note_on(0, 60, 100);
    let (left, _) = render(&mut synth, 20000);
    assert!(peak(&left[15000..]) > 0.1, "looping zone keeps sounding");
    synth.note_off(0, 60, 0);
    render(&mut synth, 20000);
    assert_eq!(synth.active_voice_count(), 0);
}

// ---------------------------------------------------------------------------
// 4. Mixing
// ---------------------------------------------------------------------------

#[test]
fn mixer_routes_channels_to_synths() {
    let tables = SynthTables::new();
    let lead = Synth::new(OscillatorInstrument::new(patch()), &tables, SR, 4)
        .unwrap()
        .with_channel_mask(0b01);
    let bass = Synth::new(FmInstrument::default(), &tables, SR, 4)
        .unwrap()
        .with_channel_mask(0b10);

    let mut mixer = Mixer::new();
    mixer.add_input(Box::new(lead), 1.0, -1.0);
    mixer.add_input(Box::new(bass), 1.0, 1.0);

    mixer.send(
        0,
        &ChannelMessage::NoteOn {
            channel: 0,
            note: 69,
            velocity: 100,
        },
    );
    assert_eq!(mixer.active_voices(), 1);

    let (left, right) = render(&mut mixer, 2048);
    assert!(peak(&left) > 0.05, "channel 0 synth is panned left");
    assert!(peak(&right) < 1e-4, "right side should be silent");

    mixer.reset();
    assert_eq!(mixer.active_voices(), 0);
}
