//! Sample playback generator with a three-state loop machine.
//!
//! Playback moves through [`LoopState::PreLoop`] → [`LoopState::MidLoop`] →
//! [`LoopState::AfterLoop`]. Once inside the loop window the phase is
//! renormalized by repeated subtraction, so any step size (very high notes
//! skipping several loop periods per sample) keeps the phase in
//! `[loop_start, loop_end)`.

use alloc::sync::Arc;

use polyvox_core::{RenderCache, SignalNode, SynthTables};

/// Raw mono sample data shared between voices.
#[derive(Debug, Clone)]
pub struct SampleData {
    frames: Arc<[f32]>,
    sample_rate: f32,
}

impl SampleData {
    /// Wrap decoded frames recorded at `sample_rate`.
    pub fn new(frames: impl Into<Arc<[f32]>>, sample_rate: f32) -> Self {
        Self {
            frames: frames.into(),
            sample_rate,
        }
    }

    /// Frames.
    pub fn frames(&self) -> &[f32] {
        &self.frames
    }

    /// Native sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether there are no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Default for SampleData {
    fn default() -> Self {
        Self::new(alloc::vec::Vec::new(), 44100.0)
    }
}

/// How the loop window is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Play start to end once.
    #[default]
    NoLoop,
    /// Play start to end, then restart from start this many more times.
    OneShot(u32),
    /// Loop for as long as the voice sounds.
    Continuous,
    /// Loop while the key is held, then play out to the end.
    Sustain,
}

/// Position relative to the loop window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Before the first pass through `loop_start`.
    #[default]
    PreLoop,
    /// Looping.
    MidLoop,
    /// Past the loop, or looping finished; plays linearly to the end.
    AfterLoop,
}

/// Frame positions and pitch parameters for one zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRegion {
    /// First frame played.
    pub start: u32,
    /// One past the last frame played.
    pub end: u32,
    /// First frame of the loop.
    pub loop_start: u32,
    /// One past the last frame of the loop.
    pub loop_end: u32,
    /// Loop behavior.
    pub loop_mode: LoopMode,
    /// Note at which the sample plays at its recorded pitch.
    pub root_key: u8,
    /// Tuning offset in cents.
    pub tune_cents: f32,
    /// Pitch change per key in cents (100 = normal tracking, 0 = fixed).
    pub key_track: f32,
    /// Pitch offset in cents at velocity 127, scaled linearly below.
    pub velocity_track: f32,
}

impl Default for SampleRegion {
    fn default() -> Self {
        Self {
            start: 0,
            end: u32::MAX,
            loop_start: 0,
            loop_end: 0,
            loop_mode: LoopMode::NoLoop,
            root_key: 60,
            tune_cents: 0.0,
            key_track: 100.0,
            velocity_track: 0.0,
        }
    }
}

impl SampleRegion {
    /// Clamp positions into `[0, len]` and disable looping when the window
    /// is inverted, empty, or outside the played range.
    pub fn sanitized(mut self, len: usize) -> Self {
        let len = u32::try_from(len).unwrap_or(u32::MAX);
        self.end = self.end.min(len);
        self.start = self.start.min(self.end);
        let loop_ok = self.loop_start < self.loop_end
            && self.loop_start >= self.start
            && self.loop_end <= self.end;
        if !loop_ok && self.loop_mode != LoopMode::NoLoop {
            if !matches!(self.loop_mode, LoopMode::OneShot(_)) {
                self.loop_mode = LoopMode::NoLoop;
            }
            self.loop_start = self.start;
            self.loop_end = self.end;
        }
        self
    }
}

/// Sample playback node.
#[derive(Debug, Clone)]
pub struct SampleGenerator {
    data: SampleData,
    region: SampleRegion,
    tables: Option<SynthTables>,
    sample_rate: f32,
    phase: f64,
    base_step: f64,
    step: f64,
    pitch_mod: f32,
    bend: f32,
    applied_cents: f32,
    note_cents: f32,
    state: LoopState,
    repeats_left: u32,
    finished: bool,
    cache: RenderCache,
}

impl SampleGenerator {
    /// Generator with no sample loaded; silent until [`set_sample`](Self::set_sample).
    pub fn new() -> Self {
        Self {
            data: SampleData::default(),
            region: SampleRegion::default(),
            tables: None,
            sample_rate: 44100.0,
            phase: 0.0,
            base_step: 1.0,
            step: 1.0,
            pitch_mod: 0.0,
            bend: 0.0,
            applied_cents: f32::NAN,
            note_cents: 0.0,
            state: LoopState::PreLoop,
            repeats_left: 0,
            finished: true,
            cache: RenderCache::new(),
        }
    }

    /// Bind sample data and region. Does not allocate; the frames are shared.
    pub fn set_sample(&mut self, data: SampleData, region: SampleRegion) {
        self.region = region.sanitized(data.len());
        self.data = data;
    }

    /// Active region after sanitizing.
    pub fn region(&self) -> &SampleRegion {
        &self.region
    }

    /// Current loop state.
    pub fn loop_state(&self) -> LoopState {
        self.state
    }

    /// Current playback position in frames.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Current phase increment in frames per output sample.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Override the phase increment directly, bypassing pitch computation
    /// until the next note.
    pub fn set_step(&mut self, step: f64) {
        self.base_step = step;
        self.step = step;
        self.applied_cents = 0.0;
        self.note_cents = 0.0;
        self.pitch_mod = 0.0;
        self.bend = 0.0;
    }

    /// Pushed pitch modulation in cents.
    #[inline]
    pub fn set_pitch_mod(&mut self, cents: f32) {
        self.pitch_mod = cents;
    }

    fn update_step(&mut self) {
        let cents = self.note_cents + self.pitch_mod + self.bend;
        if cents == self.applied_cents {
            return;
        }
        self.applied_cents = cents;
        let ratio = match &self.tables {
            Some(tables) => tables.cents_to_ratio(cents),
            None => polyvox_core::cents_to_ratio(cents),
        };
        self.step = self.base_step * f64::from(ratio);
    }

    /// Advance the phase and apply the loop machine.
    fn advance(&mut self) {
        self.phase += self.step;
        let start = f64::from(self.region.start);
        let end = f64::from(self.region.end);
        let loop_start = f64::from(self.region.loop_start);
        let loop_end = f64::from(self.region.loop_end);

        match self.region.loop_mode {
            LoopMode::Continuous | LoopMode::Sustain => {
                if self.state == LoopState::PreLoop && self.phase >= loop_start {
                    self.state = LoopState::MidLoop;
                }
                if self.state == LoopState::MidLoop {
                    let len = loop_end - loop_start;
                    while self.phase >= loop_end {
                        self.phase -= len;
                    }
                }
            }
            LoopMode::NoLoop | LoopMode::OneShot(_) => {}
        }

        if self.phase >= end {
            if let LoopMode::OneShot(_) = self.region.loop_mode {
                let len = end - start;
                while self.phase >= end && self.repeats_left > 0 && len > 0.0 {
                    self.phase -= len;
                    self.repeats_left -= 1;
                }
            }
            if self.phase >= end {
                self.finished = true;
            }
        }
    }

    fn read(&self) -> f32 {
        let frames = self.data.frames();
        let index = self.phase as usize;
        let Some(&a) = frames.get(index) else {
            return 0.0;
        };
        let frac = (self.phase - index as f64) as f32;
        let next = index + 1;
        // Inside the loop the neighbour of the last frame is loop_start
        let b = if self.state == LoopState::MidLoop && next as u32 >= self.region.loop_end {
            frames
                .get(self.region.loop_start as usize)
                .copied()
                .unwrap_or(0.0)
        } else if next as u32 >= self.region.end {
            0.0
        } else {
            frames.get(next).copied().unwrap_or(0.0)
        };
        a + (b - a) * frac
    }
}

impl Default for SampleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalNode for SampleGenerator {
    fn init(&mut self, tables: &SynthTables, sample_rate: f32) {
        self.tables = Some(tables.clone());
        self.sample_rate = sample_rate;
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        let r = &self.region;
        self.phase = f64::from(r.start);
        self.state = LoopState::PreLoop;
        self.repeats_left = match r.loop_mode {
            LoopMode::OneShot(count) => count,
            _ => 0,
        };
        self.finished = self.data.is_empty() || r.start >= r.end;
        self.base_step = f64::from(self.data.sample_rate() / self.sample_rate);
        self.note_cents = r.tune_cents
            + r.key_track * (f32::from(note) - f32::from(r.root_key))
            + r.velocity_track * f32::from(velocity) / 127.0;
        self.pitch_mod = 0.0;
        self.applied_cents = f32::NAN;
        self.cache.reset();
        self.update_step();
    }

    fn note_off(&mut self, _velocity: u8) {
        if self.region.loop_mode == LoopMode::Sustain {
            self.state = LoopState::AfterLoop;
        }
    }

    fn is_active(&self) -> bool {
        !self.finished
    }

    fn render(&mut self, flag: bool) -> f32 {
        if let Some(sample) = self.cache.hit(flag) {
            return sample;
        }
        if self.finished {
            return self.cache.store(flag, 0.0);
        }
        self.update_step();
        let sample = self.read();
        self.advance();
        self.cache.store(flag, sample)
    }

    fn set_pitch_offset(&mut self, cents: f32) {
        self.bend = cents;
    }
}
