//! Display song file structure and timing.

use clap::Args;
use polyvox_config::{SongConfig, validate_song};
use polyvox_core::micros_per_beat_to_bpm;
use std::path::PathBuf;

/// Display song information.
#[derive(Args)]
pub struct InfoArgs {
    /// Path to the song file
    pub song: PathBuf,
}

fn format_time(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor();
    format!("{}:{:06.3}", minutes as u64, seconds - minutes * 60.0)
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let song = SongConfig::load(&args.song)?;
    let sequencer = song.to_sequencer()?;
    let tempo_map = sequencer.tempo_map();

    println!("File:           {}", args.song.display());
    println!("Name:           {}", song.name.as_deref().unwrap_or("-"));
    println!("Ticks per beat: {}", sequencer.ticks_per_beat());
    println!(
        "Duration:       {} ({} ticks)",
        format_time(sequencer.duration_seconds()),
        sequencer.end_tick()
    );

    println!();
    println!("Tempo:");
    if tempo_map.changes().is_empty() {
        println!("  120.00 BPM throughout");
    }
    for change in tempo_map.changes() {
        println!(
            "  {:>8} ticks  {:>7}  {:.2} BPM",
            change.tick,
            format_time(tempo_map.tick_to_seconds(change.tick)),
            micros_per_beat_to_bpm(change.micros_per_beat)
        );
    }

    println!();
    println!("Tracks:");
    for (i, (config, track)) in song.tracks.iter().zip(sequencer.tracks()).enumerate() {
        println!(
            "  {i:>2}. {:<16} {:>5} events, {:>5} channel messages, ends at {}",
            config.name.as_deref().unwrap_or("-"),
            config.events.len(),
            track.channel_event_count(),
            format_time(tempo_map.tick_to_seconds(track.end_tick()))
        );
    }

    println!();
    println!("Instruments:");
    for instrument in &song.instruments {
        let kind = match song.resolve_patch(&instrument.patch) {
            Ok(patch) => patch.kind(),
            Err(_) => "missing",
        };
        let channels = if instrument.channels.is_empty() {
            "all".to_string()
        } else {
            instrument
                .channels
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        println!(
            "  {:<20} {:<10} channels {channels}",
            instrument.patch, kind
        );
    }

    if let Err(e) = validate_song(&song) {
        println!();
        println!("Problems: {e}");
    }

    Ok(())
}
