//! Single-note patch audition command.

use crate::commands::common::{load_engine, load_patch, wav_loader, write_output};
use clap::Args;
use polyvox_config::{Routing, validate_patch};
use polyvox_core::SynthTables;
use polyvox_io::StereoSamples;
use polyvox_synth::{ChannelMessage, MixerInput};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct ToneArgs {
    /// Factory patch name or patch file (TOML)
    #[arg(short, long, default_value = "init")]
    patch: String,

    /// MIDI note number
    #[arg(short, long, default_value = "69", value_parser = clap::value_parser!(u8).range(0..=127))]
    note: u8,

    /// Note velocity
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u8).range(1..=127))]
    velocity: u8,

    /// How long the note is held, in seconds
    #[arg(short, long, default_value = "1.0")]
    seconds: f32,

    /// Longest release tail after the note ends, in seconds
    #[arg(long, default_value = "2.0")]
    tail: f32,

    /// Output WAV file
    #[arg(short, long, default_value = "tone.wav")]
    output: PathBuf,

    /// Output sample rate
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "16")]
    bit_depth: u16,
}

/// Render `frames` frames into the end of the buffers.
fn render_into(synth: &mut dyn MixerInput, left: &mut Vec<f32>, right: &mut Vec<f32>, frames: usize) {
    let start = left.len();
    left.resize(start + frames, 0.0);
    right.resize(start + frames, 0.0);
    synth.process(&mut left[start..], &mut right[start..]);
}

pub fn run(args: ToneArgs) -> anyhow::Result<()> {
    let patch = load_patch(&args.patch)?;
    validate_patch(&patch)?;
    let engine = load_engine(None, args.sample_rate)?;
    let sample_rate = engine.sample_rate_hz();

    println!(
        "Playing '{}' ({}) note {} for {:.2}s",
        patch.name(),
        patch.kind(),
        args.note,
        args.seconds
    );

    let tables = SynthTables::new();
    let base = Path::new(&args.patch).parent();
    let mut loader = wav_loader(base);
    let mut synth = patch.build_synth(&tables, &engine, Routing::default(), &mut loader)?;

    let mut left = Vec::new();
    let mut right = Vec::new();
    synth.send(
        0,
        &ChannelMessage::NoteOn {
            channel: 0,
            note: args.note,
            velocity: args.velocity,
        },
    );
    let held = (args.seconds.max(0.0) * sample_rate) as usize;
    render_into(synth.as_mut(), &mut left, &mut right, held);

    synth.send(
        0,
        &ChannelMessage::NoteOff {
            channel: 0,
            note: args.note,
            velocity: 64,
        },
    );
    let block = engine.block_size.max(1);
    let mut tail = (args.tail.max(0.0) * sample_rate) as usize;
    while tail > 0 && synth.active_voices() > 0 {
        let n = tail.min(block);
        render_into(synth.as_mut(), &mut left, &mut right, n);
        tail -= n;
    }

    write_output(
        &args.output,
        &StereoSamples::new(left, right),
        engine.sample_rate,
        args.bit_depth,
    )
}
