//! Offline song rendering command.

use crate::commands::common::{frame_progress, load_engine, wav_loader, write_output};
use clap::Args;
use polyvox_config::{SongConfig, validate_song};
use polyvox_core::SynthTables;
use polyvox_io::StereoSamples;
use polyvox_synth::AudioSource;
use std::path::PathBuf;

#[derive(Args)]
pub struct RenderArgs {
    /// Song file (TOML)
    #[arg(value_name = "SONG")]
    song: PathBuf,

    /// Output WAV file (defaults to the song name with a .wav extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Engine settings file (TOML)
    #[arg(short, long)]
    engine: Option<PathBuf>,

    /// Output sample rate, overriding the engine settings
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Longest release tail after the last event, in seconds
    #[arg(long, default_value = "2.0")]
    tail: f32,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "16")]
    bit_depth: u16,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let song = SongConfig::load(&args.song)?;
    validate_song(&song)?;
    let engine = load_engine(args.engine.as_deref(), args.sample_rate)?;
    let output = args
        .output
        .unwrap_or_else(|| args.song.with_extension("wav"));

    println!(
        "Rendering {} ({} tracks, {} instruments) at {} Hz",
        song.name.as_deref().unwrap_or("untitled"),
        song.tracks.len(),
        song.instruments.len(),
        engine.sample_rate
    );

    let tables = SynthTables::new();
    let mut loader = wav_loader(args.song.parent());
    let mut player = song.build_player(&engine, &tables, &mut loader)?;

    let sample_rate = engine.sample_rate_hz();
    let song_frames = (player.sequencer().duration_seconds() * f64::from(sample_rate)) as u64;
    let pb = frame_progress(song_frames);

    let block = engine.block_size.max(1);
    let mut left = Vec::with_capacity(song_frames as usize);
    let mut right = Vec::with_capacity(song_frames as usize);
    let mut block_l = vec![0.0f32; block];
    let mut block_r = vec![0.0f32; block];

    while !player.is_finished() {
        block_l.fill(0.0);
        block_r.fill(0.0);
        player.process(&mut block_l, &mut block_r);
        left.extend_from_slice(&block_l);
        right.extend_from_slice(&block_r);
        pb.set_position((left.len() as u64).min(song_frames));
    }
    pb.finish_and_clear();

    let mut tail = (args.tail.max(0.0) * sample_rate) as usize;
    while tail > 0 && player.active_voices() > 0 {
        let n = tail.min(block);
        block_l[..n].fill(0.0);
        block_r[..n].fill(0.0);
        player.process(&mut block_l[..n], &mut block_r[..n]);
        left.extend_from_slice(&block_l[..n]);
        right.extend_from_slice(&block_r[..n]);
        tail -= n;
    }
    tracing::debug!(
        song_frames,
        total_frames = left.len(),
        voices_left = player.active_voices(),
        "render finished"
    );

    write_output(
        &output,
        &StereoSamples::new(left, right),
        engine.sample_rate,
        args.bit_depth,
    )
}
