//! Property-based tests for polyvox-seq.
//!
//! Event delivery must not depend on how the host slices its render blocks.

use polyvox_seq::{Event, Player, Sequencer, Track};
use polyvox_synth::{AudioSource, ChannelMessage, MessageSink};
use proptest::prelude::*;

const SR: f32 = 48000.0;

/// Counts frames and notes the frame each message arrived at.
#[derive(Default)]
struct Recorder {
    frame: usize,
    arrivals: Vec<(usize, u16, ChannelMessage)>,
}

impl MessageSink for Recorder {
    fn send(&mut self, track: u16, message: &ChannelMessage) {
        self.arrivals.push((self.frame, track, *message));
    }
}

impl AudioSource for Recorder {
    fn process(&mut self, left: &mut [f32], _right: &mut [f32]) {
        self.frame += left.len();
    }
}

fn tracks(notes: &[(u64, u8, bool)], tempo: Option<(u64, u32)>) -> Vec<Track> {
    let mut events: Vec<Event> = notes
        .iter()
        .map(|&(tick, note, on)| {
            if on {
                Event::note_on(tick, 0, note, 100)
            } else {
                Event::note_off(tick, 0, note)
            }
        })
        .collect();
    let mut tempo_track = Vec::new();
    if let Some((tick, micros)) = tempo {
        tempo_track.push(Event::tempo(tick, micros));
    }
    events.push(Event::note_off(400, 0, 0));
    vec![Track::new(tempo_track), Track::new(events)]
}

fn play(tracks: Vec<Track>, blocks: &[usize]) -> Vec<(usize, u16, ChannelMessage)> {
    let sequencer = Sequencer::new(96, tracks).unwrap();
    let mut player = Player::new(sequencer, Recorder::default(), SR).unwrap();
    let mut left = vec![0.0f32; 4096];
    let mut right = vec![0.0f32; 4096];
    let mut sizes = blocks.iter().cycle();
    while !player.is_finished() {
        let n = *sizes.next().unwrap();
        player.process(&mut left[..n], &mut right[..n]);
    }
    player.into_parts().1.arrivals
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The same song delivers the same messages at the same frames whatever
    /// the block sizes.
    #[test]
    fn arrivals_independent_of_block_size(
        notes in prop::collection::vec((0u64..400, 0u8..128, any::<bool>()), 1..40),
        tempo in prop::option::of((0u64..400, 200_000u32..2_000_000)),
        blocks in prop::collection::vec(16usize..4096, 1..8),
    ) {
        let reference = play(tracks(&notes, tempo), &[512]);
        let sliced = play(tracks(&notes, tempo), &blocks);

        prop_assert_eq!(reference.len(), notes.len() + 1);
        prop_assert_eq!(sliced.len(), reference.len());
        for (a, b) in reference.iter().zip(&sliced) {
            prop_assert_eq!(a.1, b.1);
            prop_assert_eq!(a.2, b.2);
            prop_assert!(a.0.abs_diff(b.0) <= 1, "frame {} vs {}", a.0, b.0);
        }
    }

    /// Messages arrive in frame order and never before their exact time.
    #[test]
    fn arrivals_never_early(
        notes in prop::collection::vec((0u64..400, 0u8..128, any::<bool>()), 1..40),
        block in 16usize..4096,
    ) {
        let arrivals = play(tracks(&notes, None), &[block]);
        // 120 BPM at 96 ticks per beat
        let frames_per_tick = f64::from(SR) * 0.5 / 96.0;

        let mut expected: Vec<u64> = notes.iter().map(|n| n.0).collect();
        expected.push(400);
        expected.sort_unstable();

        for (window, tick) in arrivals.windows(2).zip(&expected) {
            prop_assert!(window[0].0 <= window[1].0);
            let exact = *tick as f64 * frames_per_tick;
            prop_assert!(window[0].0 as f64 >= exact - 1e-6);
            prop_assert!((window[0].0 as f64) < exact + 1.0);
        }
    }
}
