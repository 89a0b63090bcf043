//! Filter node wrapping one source node.
//!
//! The effective cutoff is the static cutoff scaled by a sum of cents
//! offsets: key tracking and velocity tracking (fixed per note) plus pushed
//! modulation from envelopes and LFOs. Summing cents multiplies the pitch
//! ratios. Coefficients are recomputed only when that sum changes.

use polyvox_core::{Biquad, BiquadCoefficients, FilterType, RenderCache, SignalNode, SynthTables};

/// Static filter parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    /// Response shape.
    pub filter_type: FilterType,
    /// Cutoff in Hz.
    pub cutoff: f32,
    /// Resonance.
    pub q: f32,
    /// Gain for peak and shelf types, in dB.
    pub gain_db: f32,
    /// Cutoff change per key above middle C, in cents.
    pub key_track: f32,
    /// Cutoff change at velocity 0 relative to velocity 127, in cents.
    pub velocity_track: f32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            filter_type: FilterType::LowPass,
            cutoff: 20_000.0,
            q: core::f32::consts::FRAC_1_SQRT_2,
            gain_db: 0.0,
            key_track: 0.0,
            velocity_track: 0.0,
        }
    }
}

/// Biquad or one-pole filter applied to an owned source.
#[derive(Debug, Clone)]
pub struct FilterNode<S> {
    source: S,
    settings: FilterSettings,
    biquad: Biquad,
    tables: Option<SynthTables>,
    sample_rate: f32,
    note_cents: f32,
    mod_cents: f32,
    applied_cents: f32,
    cache: RenderCache,
}

impl<S: SignalNode> FilterNode<S> {
    /// Wrap `source`.
    pub fn new(source: S, settings: FilterSettings) -> Self {
        Self {
            source,
            settings,
            biquad: Biquad::new(),
            tables: None,
            sample_rate: 44100.0,
            note_cents: 0.0,
            mod_cents: 0.0,
            applied_cents: f32::NAN,
            cache: RenderCache::new(),
        }
    }

    /// The wrapped node.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The wrapped node, mutably (for pushing modulation further down).
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Static parameters.
    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Replace static parameters. Coefficients follow on the next render.
    pub fn set_settings(&mut self, settings: FilterSettings) {
        self.settings = settings;
        self.applied_cents = f32::NAN;
    }

    /// Pushed cutoff modulation in cents.
    #[inline]
    pub fn set_modulation(&mut self, cents: f32) {
        self.mod_cents = cents;
    }

    /// Effective cutoff in Hz for the current offsets.
    pub fn effective_cutoff(&self) -> f32 {
        let cents = self.note_cents + self.mod_cents;
        let ratio = match &self.tables {
            Some(tables) => tables.cents_to_ratio(cents),
            None => polyvox_core::cents_to_ratio(cents),
        };
        self.settings.cutoff * ratio
    }

    fn update_coefficients(&mut self) {
        let cents = self.note_cents + self.mod_cents;
        if cents == self.applied_cents {
            return;
        }
        self.applied_cents = cents;
        let s = self.settings;
        let coeffs = BiquadCoefficients::new(
            s.filter_type,
            self.effective_cutoff(),
            s.q,
            s.gain_db,
            self.sample_rate,
        );
        self.biquad.set_coefficients(s.filter_type, coeffs);
    }
}

impl<S: SignalNode> SignalNode for FilterNode<S> {
    fn init(&mut self, tables: &SynthTables, sample_rate: f32) {
        self.source.init(tables, sample_rate);
        self.tables = Some(tables.clone());
        self.sample_rate = sample_rate;
        self.applied_cents = f32::NAN;
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        self.source.note_on(note, velocity);
        self.biquad.reset();
        let s = &self.settings;
        self.note_cents = s.key_track * (f32::from(note) - 60.0)
            + s.velocity_track * (1.0 - f32::from(velocity.min(127)) / 127.0);
        self.mod_cents = 0.0;
        self.applied_cents = f32::NAN;
        self.cache.reset();
    }

    fn note_off(&mut self, velocity: u8) {
        self.source.note_off(velocity);
    }

    fn is_active(&self) -> bool {
        self.source.is_active()
    }

    fn render(&mut self, flag: bool) -> f32 {
        if let Some(sample) = self.cache.hit(flag) {
            return sample;
        }
        let input = self.source.render(flag);
        self.update_coefficients();
        let out = self.biquad.process(input);
        self.cache.store(flag, out)
    }

    fn set_pitch_offset(&mut self, cents: f32) {
        self.source.set_pitch_offset(cents);
    }
}
