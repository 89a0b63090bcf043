//! Sample-accurate playback of a [`Sequencer`] into a synth or mixer.

use alloc::vec::Vec;

use polyvox_core::{EngineError, validate_sample_rate};
use polyvox_synth::{AudioSource, MessageSink};

use crate::sequencer::Sequencer;

/// Frames rendered per pass by [`Player::render_to_end`].
pub const RENDER_BLOCK: usize = 512;

/// Couples a [`Sequencer`] to something that takes messages and makes
/// sound.
///
/// Each call to [`process`](AudioSource::process) splits the block at the
/// frames where events fall, dispatches those events, and only then renders
/// the frames after them.
pub struct Player<S> {
    sequencer: Sequencer,
    sink: S,
    sample_rate: f32,
}

impl<S: MessageSink + AudioSource> Player<S> {
    /// Build a player rendering at `sample_rate`.
    pub fn new(sequencer: Sequencer, sink: S, sample_rate: f32) -> Result<Self, EngineError> {
        Ok(Self {
            sequencer,
            sink,
            sample_rate: validate_sample_rate(sample_rate)?,
        })
    }

    /// Output sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The sequencer.
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// The receiving synth or mixer.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the receiving synth or mixer.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Take the parts back.
    pub fn into_parts(self) -> (Sequencer, S) {
        (self.sequencer, self.sink)
    }

    /// True when no events remain. Voices may still be releasing.
    pub fn is_finished(&self) -> bool {
        self.sequencer.is_finished()
    }

    /// Rewind to the start at 120 BPM and silence the sink.
    pub fn restart(&mut self) {
        self.sequencer.restart();
        self.sink.reset();
    }

    /// Frames until the next event, rounded up so the event lands on the
    /// first frame at or after its exact time.
    fn frames_until_next_event(&self) -> Option<usize> {
        let seconds = self.sequencer.seconds_until_next_event()?;
        let frames = libm::ceil(seconds * f64::from(self.sample_rate) - 1e-6);
        Some(frames.max(1.0) as usize)
    }

    /// Render the whole song, then up to `tail_seconds` of release tail.
    ///
    /// The tail stops early once no voice is sounding.
    pub fn render_to_end(&mut self, tail_seconds: f32) -> (Vec<f32>, Vec<f32>) {
        let mut left = Vec::new();
        let mut right = Vec::new();
        let mut block_l = [0.0f32; RENDER_BLOCK];
        let mut block_r = [0.0f32; RENDER_BLOCK];

        while !self.sequencer.is_finished() {
            block_l.fill(0.0);
            block_r.fill(0.0);
            self.process(&mut block_l, &mut block_r);
            left.extend_from_slice(&block_l);
            right.extend_from_slice(&block_r);
        }

        let mut tail = (tail_seconds.max(0.0) * self.sample_rate) as usize;
        while tail > 0 && self.sink.active_voices() > 0 {
            let n = tail.min(RENDER_BLOCK);
            block_l[..n].fill(0.0);
            block_r[..n].fill(0.0);
            self.process(&mut block_l[..n], &mut block_r[..n]);
            left.extend_from_slice(&block_l[..n]);
            right.extend_from_slice(&block_r[..n]);
            tail -= n;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            frames = left.len(),
            sample_rate = self.sample_rate,
            "rendered song"
        );
        (left, right)
    }
}

impl<S: MessageSink + AudioSource> AudioSource for Player<S> {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let sample_rate = f64::from(self.sample_rate);
        self.sequencer.advance_time(0.0, &mut self.sink);

        let mut offset = 0;
        while offset < frames {
            let n = self
                .frames_until_next_event()
                .map_or(frames - offset, |until| until.min(frames - offset));
            self.sink
                .process(&mut left[offset..offset + n], &mut right[offset..offset + n]);
            self.sequencer
                .advance_time(n as f64 / sample_rate, &mut self.sink);
            offset += n;
        }
    }

    fn active_voices(&self) -> usize {
        self.sink.active_voices()
    }
}
