//! Polyphonic synth: a fixed pool of voices driven by channel messages.
//!
//! Every voice graph is built when the synth is created. Note handling only
//! moves slot indices between the free and active lists, both of which are
//! allocated at full capacity up front, so nothing on the note or render
//! path allocates.

use alloc::vec::Vec;

use polyvox_core::{EngineError, SignalNode, SynthTables, db_to_linear, validate_sample_rate};

use crate::channel::{CHANNEL_COUNT, ChannelState, cc};
use crate::instrument::Instrument;
use crate::message::{AudioSource, ChannelMessage, MessageSink};
use crate::voice::Voice;

/// What to do when a note arrives and every voice is busy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StealingMode {
    /// Drop the new note.
    Disabled,
    /// Take the oldest voice on the same channel (default).
    #[default]
    OldestSameChannel,
    /// Take the quietest voice on the same channel.
    QuietestSameChannel,
}

/// Voice pool plus 16 channels of controller state.
///
/// # Example
///
/// ```rust
/// use polyvox_core::SynthTables;
/// use polyvox_synth::{OscillatorInstrument, Synth};
///
/// let tables = SynthTables::new();
/// let mut synth = Synth::new(OscillatorInstrument::default(), &tables, 44100.0, 8).unwrap();
///
/// synth.note_on(0, 69, 100);
/// let mut left = vec![0.0; 256];
/// let mut right = vec![0.0; 256];
/// synth.process(&mut left, &mut right);
/// assert_eq!(synth.active_voice_count(), 1);
/// ```
pub struct Synth<I: Instrument> {
    instrument: I,
    tables: SynthTables,
    sample_rate: f32,
    voices: Vec<Voice<I::Graph>>,
    free: Vec<usize>,
    active: Vec<usize>,
    channels: [ChannelState; CHANNEL_COUNT],
    stealing: StealingMode,
    master_db: f32,
    master_gain: f32,
    next_age: u64,
    channel_mask: u16,
    track_mask: u64,
}

impl<I: Instrument> Synth<I> {
    /// Build a synth with `polyphony` voices.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidSampleRate`] for a non-positive or non-finite
    /// rate, [`EngineError::ZeroPolyphony`] for an empty pool.
    pub fn new(
        instrument: I,
        tables: &SynthTables,
        sample_rate: f32,
        polyphony: usize,
    ) -> Result<Self, EngineError> {
        validate_sample_rate(sample_rate)?;
        if polyphony == 0 {
            return Err(EngineError::ZeroPolyphony);
        }

        let voices = (0..polyphony)
            .map(|_| {
                let mut graph = instrument.build_graph();
                graph.init(tables, sample_rate);
                Voice::new(graph)
            })
            .collect();
        let mut free = Vec::with_capacity(polyphony);
        free.extend((0..polyphony).rev());

        Ok(Self {
            instrument,
            tables: tables.clone(),
            sample_rate,
            voices,
            free,
            active: Vec::with_capacity(polyphony),
            channels: [ChannelState::default(); CHANNEL_COUNT],
            stealing: StealingMode::default(),
            master_db: 0.0,
            master_gain: 1.0,
            next_age: 0,
            channel_mask: u16::MAX,
            track_mask: u64::MAX,
        })
    }

    /// Builder: stealing mode.
    pub fn with_stealing(mut self, mode: StealingMode) -> Self {
        self.stealing = mode;
        self
    }

    /// Builder: only accept messages on these channels (bit per channel).
    pub fn with_channel_mask(mut self, mask: u16) -> Self {
        self.channel_mask = mask;
        self
    }

    /// Builder: only accept messages from these tracks (bit per track;
    /// tracks above 63 share bit 63).
    pub fn with_track_mask(mut self, mask: u64) -> Self {
        self.track_mask = mask;
        self
    }

    /// Sample rate the graphs were built for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Stealing mode.
    pub fn stealing(&self) -> StealingMode {
        self.stealing
    }

    /// Change the stealing mode.
    pub fn set_stealing(&mut self, mode: StealingMode) {
        self.stealing = mode;
    }

    /// The instrument.
    pub fn instrument(&self) -> &I {
        &self.instrument
    }

    /// Pool size.
    pub fn polyphony(&self) -> usize {
        self.voices.len()
    }

    /// Voices bound to a note (held, releasing, or sustained).
    pub fn active_voice_count(&self) -> usize {
        self.active.len()
    }

    /// Active voices, oldest first.
    pub fn active_voices(&self) -> impl Iterator<Item = &Voice<I::Graph>> {
        self.active.iter().map(|&slot| &self.voices[slot])
    }

    /// Controller state of `channel` (masked to 0..16).
    pub fn channel(&self, channel: u8) -> &ChannelState {
        &self.channels[usize::from(channel & 0x0F)]
    }

    /// Master volume in dB.
    pub fn master_volume(&self) -> f32 {
        self.master_db
    }

    /// Set master volume in dB.
    pub fn set_master_volume(&mut self, db: f32) {
        self.master_db = db;
        self.master_gain = db_to_linear(db);
    }

    /// True if a message from `track` on `channel` is for this synth.
    pub fn accepts(&self, track: u16, channel: u8) -> bool {
        let track_bit = 1u64 << u32::from(track).min(63);
        self.channel_mask & (1 << (channel & 0x0F)) != 0 && self.track_mask & track_bit != 0
    }

    /// Start a note. Velocity 0 releases instead.
    pub fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        let channel = channel & 0x0F;
        let note = note.min(127);
        if velocity == 0 {
            self.note_off(channel, note, 0);
            return;
        }
        if !self.instrument.plays(channel, note, velocity) {
            #[cfg(feature = "tracing")]
            tracing::debug!(channel, note, velocity, "note dropped: no zone");
            return;
        }

        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => match self.steal(channel, note) {
                Some(slot) => slot,
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(channel, note, "note dropped: no free voice");
                    return;
                }
            },
        };

        let voice = &mut self.voices[slot];
        if !self.instrument.configure(voice.graph_mut(), channel, note, velocity) {
            #[cfg(feature = "tracing")]
            tracing::debug!(channel, note, velocity, "note dropped: no zone");
            self.free.push(slot);
            return;
        }

        self.next_age += 1;
        let pan = self.instrument.pan(voice.graph());
        let bend = self.channels[usize::from(channel)].bend_cents();
        voice.start(channel, note, velocity.min(127), self.next_age, pan, bend);
        self.active.push(slot);
    }

    /// Release a note. Deferred while the channel's sustain pedal is down.
    pub fn note_off(&mut self, channel: u8, note: u8, velocity: u8) {
        let channel = channel & 0x0F;
        let sustain = self.channels[usize::from(channel)].sustain;
        let found = self.active.iter().copied().find(|&slot| {
            let v = &self.voices[slot];
            v.channel() == channel && v.note() == note && v.is_on() && !v.is_sustained()
        });
        if let Some(slot) = found {
            let voice = &mut self.voices[slot];
            if sustain {
                voice.defer_release();
            } else {
                voice.release(velocity);
            }
        }
    }

    /// Control change.
    pub fn controller(&mut self, channel: u8, controller: u8, value: u8) {
        let channel = channel & 0x0F;
        let index = usize::from(channel);
        let was_sustained = self.channels[index].sustain;
        match controller {
            cc::ALL_SOUND_OFF => self.kill_channel(Some(channel)),
            cc::RESET_CONTROLLERS => {
                self.channels[index].reset_controllers();
                self.push_bend(channel);
            }
            cc::ALL_NOTES_OFF => self.release_channel(channel),
            _ => {
                self.channels[index].apply_controller(controller, value);
            }
        }
        if was_sustained && !self.channels[index].sustain {
            self.release_sustained(channel);
        }
    }

    /// Pitch bend from a 14-bit value, 8192 = center.
    pub fn pitch_bend(&mut self, channel: u8, value: u16) {
        let channel = channel & 0x0F;
        self.channels[usize::from(channel)].set_bend(value);
        self.push_bend(channel);
    }

    /// Program change: recorded on the channel and handed to the instrument.
    pub fn program_change(&mut self, channel: u8, program: u8) {
        let channel = channel & 0x0F;
        self.channels[usize::from(channel)].program = program.min(127);
        self.instrument.program_change(channel, program);
    }

    /// Silence every voice at once and reset all channels.
    pub fn reset(&mut self) {
        self.kill_channel(None);
        for ch in &mut self.channels {
            ch.reset();
        }
        self.next_age = 0;

        #[cfg(feature = "tracing")]
        tracing::debug!("synth reset");
    }

    /// Force every voice into release, ignoring the sustain pedal.
    pub fn panic(&mut self) {
        for ch in &mut self.channels {
            ch.sustain = false;
        }
        for &slot in &self.active {
            self.voices[slot].release(0);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(voices = self.active.len(), "panic");
    }

    /// Dispatch a message.
    pub fn handle(&mut self, message: &ChannelMessage) {
        match *message {
            ChannelMessage::NoteOn {
                channel,
                note,
                velocity,
            } => self.note_on(channel, note, velocity),
            ChannelMessage::NoteOff {
                channel,
                note,
                velocity,
            } => self.note_off(channel, note, velocity),
            ChannelMessage::Controller {
                channel,
                controller,
                value,
            } => self.controller(channel, controller, value),
            ChannelMessage::PitchBend { channel, value } => self.pitch_bend(channel, value),
            ChannelMessage::ProgramChange { channel, program } => {
                self.program_change(channel, program);
            }
        }
    }

    /// Render `left.len()` frames, adding into both buffers, then retire
    /// finished voices.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let (left, right) = (&mut left[..frames], &mut right[..frames]);

        for &slot in &self.active {
            let voice = &mut self.voices[slot];
            let ch = &self.channels[usize::from(voice.channel())];
            let gain = ch.gain(&self.tables) * self.master_gain;
            let (pan_l, pan_r) = ch.pan_gains(voice.pan());
            voice.process(left, right, gain * pan_l, gain * pan_r);
        }
        self.retire();
    }

    /// Move finished voices back to the free list.
    fn retire(&mut self) {
        #[cfg(feature = "tracing")]
        let before = self.active.len();

        let voices = &self.voices;
        let free = &mut self.free;
        self.active.retain(|&slot| {
            if voices[slot].is_finished() {
                free.push(slot);
                false
            } else {
                true
            }
        });

        #[cfg(feature = "tracing")]
        {
            let retired = before - self.active.len();
            if retired > 0 {
                tracing::trace!(retired, active = self.active.len(), "voices retired");
            }
        }
    }

    /// Pick a voice to reuse. Prefers released voices on the same channel,
    /// then held ones there, then the same preference across all channels.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn steal(&mut self, channel: u8, note: u8) -> Option<usize> {
        if self.stealing == StealingMode::Disabled {
            return None;
        }
        let quietest = self.stealing == StealingMode::QuietestSameChannel;
        let voices = &self.voices;
        let pick = |same_channel: bool, released: bool| {
            let candidates = self.active.iter().enumerate().filter(|&(_, &slot)| {
                let v = &voices[slot];
                (!same_channel || v.channel() == channel) && (!released || !v.is_on())
            });
            let best = if quietest && same_channel {
                candidates.min_by(|a, b| voices[*a.1].level().total_cmp(&voices[*b.1].level()))
            } else {
                candidates.min_by_key(|&(_, &slot)| voices[slot].age())
            };
            best.map(|(index, _)| index)
        };

        let index = pick(true, true)
            .or_else(|| pick(true, false))
            .or_else(|| pick(false, true))
            .or_else(|| pick(false, false))?;
        let slot = self.active.remove(index);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            channel,
            note,
            stolen_channel = self.voices[slot].channel(),
            stolen_note = self.voices[slot].note(),
            "voice stolen"
        );

        self.voices[slot].kill();
        Some(slot)
    }

    fn push_bend(&mut self, channel: u8) {
        let cents = self.channels[usize::from(channel)].bend_cents();
        for &slot in &self.active {
            let voice = &mut self.voices[slot];
            if voice.channel() == channel {
                voice.graph_mut().set_pitch_offset(cents);
            }
        }
    }

    fn release_channel(&mut self, channel: u8) {
        let sustain = self.channels[usize::from(channel)].sustain;
        for &slot in &self.active {
            let voice = &mut self.voices[slot];
            if voice.channel() == channel && voice.is_on() {
                if sustain {
                    voice.defer_release();
                } else {
                    voice.release(0);
                }
            }
        }
    }

    fn release_sustained(&mut self, channel: u8) {
        for &slot in &self.active {
            let voice = &mut self.voices[slot];
            if voice.channel() == channel && voice.is_sustained() {
                voice.release(0);
            }
        }
    }

    /// Drop voices immediately, on one channel or all of them.
    fn kill_channel(&mut self, channel: Option<u8>) {
        let voices = &mut self.voices;
        let free = &mut self.free;
        self.active.retain(|&slot| {
            let voice = &mut voices[slot];
            if channel.is_none_or(|ch| voice.channel() == ch) {
                voice.kill();
                free.push(slot);
                false
            } else {
                true
            }
        });
    }
}

impl<I: Instrument> MessageSink for Synth<I> {
    fn send(&mut self, track: u16, message: &ChannelMessage) {
        if self.accepts(track, message.channel()) {
            self.handle(message);
        }
    }

    fn reset(&mut self) {
        Synth::reset(self);
    }
}

impl<I: Instrument> AudioSource for Synth<I> {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        Synth::process(self, left, right);
    }

    fn active_voices(&self) -> usize {
        self.active.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{OscillatorInstrument, OscillatorPatch};
    use crate::nodes::EnvelopeParams;

    fn synth(polyphony: usize) -> Synth<OscillatorInstrument> {
        let tables = SynthTables::new();
        let patch = OscillatorPatch {
            amp_envelope: EnvelopeParams::adsr(0.001, 0.01, 0.8, 0.05),
            ..OscillatorPatch::default()
        };
        Synth::new(OscillatorInstrument::new(patch), &tables, 1000.0, polyphony).unwrap()
    }

    fn run(synth: &mut Synth<OscillatorInstrument>, frames: usize) {
        let mut left = alloc::vec![0.0; frames];
        let mut right = alloc::vec![0.0; frames];
        synth.process(&mut left, &mut right);
    }

    fn held_notes(synth: &Synth<OscillatorInstrument>) -> Vec<u8> {
        synth
            .active_voices()
            .filter(|v| v.is_on())
            .map(|v| v.note())
            .collect()
    }

    #[test]
    fn test_rejects_bad_config() {
        let tables = SynthTables::new();
        assert!(matches!(
            Synth::new(OscillatorInstrument::default(), &tables, 0.0, 4),
            Err(EngineError::InvalidSampleRate(_))
        ));
        assert!(matches!(
            Synth::new(OscillatorInstrument::default(), &tables, 44100.0, 0),
            Err(EngineError::ZeroPolyphony)
        ));
    }

    #[test]
    fn test_velocity_zero_is_note_off() {
        let mut s = synth(4);
        s.note_on(0, 60, 100);
        s.note_on(0, 60, 0);
        assert!(held_notes(&s).is_empty());
    }

    #[test]
    fn test_voice_retired_after_release() {
        let mut s = synth(4);
        s.note_on(0, 60, 100);
        run(&mut s, 100);
        s.note_off(0, 60, 0);
        assert_eq!(s.active_voice_count(), 1, "releasing voice still active");
        run(&mut s, 100);
        assert_eq!(s.active_voice_count(), 0);
    }

    #[test]
    fn test_steals_oldest_on_same_channel() {
        let mut s = synth(3);
        s.note_on(0, 60, 100);
        s.note_on(1, 62, 100);
        s.note_on(0, 64, 100);
        s.note_on(0, 67, 100);
        let mut held = held_notes(&s);
        held.sort_unstable();
        assert_eq!(held, [62, 64, 67], "oldest channel-0 note should be stolen");
    }

    #[test]
    fn test_unplayable_note_does_not_steal() {
        use crate::instrument::{SampleInstrument, SampleZone};
        use crate::nodes::SampleData;
        use crate::zone::{Generator, GeneratorSet};

        let zone = SampleZone::new(
            SampleData::new(alloc::vec![0.5; 2000], 1000.0),
            60,
            GeneratorSet::from_generators(&[Generator::key_range(48, 72)]),
        );
        let instrument = SampleInstrument::new(&GeneratorSet::new(), alloc::vec![zone]);
        let mut s = Synth::new(instrument, &SynthTables::new(), 1000.0, 2).unwrap();
        s.note_on(0, 60, 100);
        s.note_on(0, 64, 100);
        assert_eq!(s.active_voice_count(), 2);

        // Outside every zone: the full pool keeps both notes
        s.note_on(0, 100, 100);
        let mut held: Vec<u8> = s.active_voices().map(|v| v.note()).collect();
        held.sort_unstable();
        assert_eq!(held, [60, 64], "a note with no zone must not take a voice");
    }

    #[test]
    fn test_falls_back_to_global_oldest() {
        let mut s = synth(2);
        s.note_on(1, 60, 100);
        s.note_on(1, 62, 100);
        s.note_on(0, 64, 100);
        let mut held = held_notes(&s);
        held.sort_unstable();
        assert_eq!(held, [62, 64]);
    }

    #[test]
    fn test_prefers_released_voice() {
        let mut s = synth(2);
        s.note_on(0, 60, 100);
        s.note_on(0, 62, 100);
        s.note_off(0, 62, 0);
        s.note_on(0, 64, 100);
        assert_eq!(held_notes(&s), [60, 64]);
    }

    #[test]
    fn test_quietest_mode() {
        let mut s = synth(2).with_stealing(StealingMode::QuietestSameChannel);
        s.note_on(0, 60, 127);
        s.note_on(0, 62, 10);
        run(&mut s, 50);
        s.note_on(0, 64, 100);
        let mut held = held_notes(&s);
        held.sort_unstable();
        assert_eq!(held, [60, 64], "quiet note should be stolen");
    }

    #[test]
    fn test_disabled_stealing_drops_note() {
        let mut s = synth(1).with_stealing(StealingMode::Disabled);
        s.note_on(0, 60, 100);
        s.note_on(0, 62, 100);
        assert_eq!(held_notes(&s), [60]);
    }

    #[test]
    fn test_sustain_defers_release() {
        let mut s = synth(4);
        s.controller(0, cc::SUSTAIN, 127);
        s.note_on(0, 60, 100);
        s.note_off(0, 60, 0);
        run(&mut s, 200);
        assert_eq!(held_notes(&s), [60], "pedal holds the note");

        s.controller(0, cc::SUSTAIN, 0);
        run(&mut s, 200);
        assert_eq!(s.active_voice_count(), 0);
    }

    #[test]
    fn test_panic_ignores_sustain() {
        let mut s = synth(4);
        s.controller(0, cc::SUSTAIN, 127);
        s.note_on(0, 60, 100);
        s.note_on(0, 64, 100);
        s.panic();
        assert!(held_notes(&s).is_empty());
        run(&mut s, 200);
        assert_eq!(s.active_voice_count(), 0);
    }

    #[test]
    fn test_all_sound_off_is_immediate() {
        let mut s = synth(4);
        s.note_on(0, 60, 100);
        s.note_on(1, 60, 100);
        s.controller(0, cc::ALL_SOUND_OFF, 0);
        assert_eq!(s.active_voice_count(), 1);
        assert_eq!(s.active_voices().next().map(Voice::channel), Some(1));
    }

    #[test]
    fn test_masks_filter_messages() {
        let mut s = synth(4).with_channel_mask(0b10).with_track_mask(0b1);
        let on = |channel| ChannelMessage::NoteOn {
            channel,
            note: 60,
            velocity: 100,
        };
        s.send(0, &on(0));
        s.send(1, &on(1));
        assert_eq!(s.active_voice_count(), 0);
        s.send(0, &on(1));
        assert_eq!(s.active_voice_count(), 1);
    }

    #[test]
    fn test_master_volume_scales_output() {
        let mut loud = synth(1);
        let mut quiet = synth(1);
        quiet.set_master_volume(-20.0);
        loud.note_on(0, 69, 100);
        quiet.note_on(0, 69, 100);
        let mut l1 = alloc::vec![0.0; 100];
        let mut r1 = alloc::vec![0.0; 100];
        let mut l2 = alloc::vec![0.0; 100];
        let mut r2 = alloc::vec![0.0; 100];
        loud.process(&mut l1, &mut r1);
        quiet.process(&mut l2, &mut r2);
        for (a, b) in l1.iter().zip(&l2) {
            assert!((a * 0.1 - b).abs() < 1e-5);
        }
    }
}
