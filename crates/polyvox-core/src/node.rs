//! The signal node contract and per-sample render memoization.
//!
//! Every audio-rate and control-rate building block (oscillators, sample
//! players, envelopes, LFOs, filters, amplifiers) implements
//! [`SignalNode`]. A voice's node graph is a tree of owned nodes built
//! once at startup, so the render path allocates nothing.
//!
//! # Memoization
//!
//! One voice renders its graph once per sample. Each render call carries a
//! boolean flag that the voice flips every sample (see [`RenderFlag`]). A
//! node that is reached several times within the same sample sees the same
//! flag and returns its cached value instead of advancing state twice.
//! [`RenderCache`] packages that check:
//!
//! ```rust
//! use polyvox_core::{RenderCache, RenderFlag};
//!
//! let mut cache = RenderCache::new();
//! let mut flag = RenderFlag::new();
//! let mut calls = 0;
//!
//! let f = flag.advance();
//! for _ in 0..3 {
//!     if cache.hit(f).is_none() {
//!         calls += 1;
//!         cache.store(f, 0.5);
//!     }
//! }
//! assert_eq!(calls, 1);
//! ```

use crate::tables::SynthTables;

/// Common interface for every node in a voice graph.
///
/// Lifecycle: `init` once at startup, then any number of
/// `note_on` / `render`* / `note_off` / `render`* cycles. Nodes keep their
/// allocations across notes; `note_on` resets running state only.
pub trait SignalNode: Send {
    /// Bind the node to a sample rate and the shared tables.
    ///
    /// Called once, before any note. Composite nodes forward to children.
    fn init(&mut self, tables: &SynthTables, sample_rate: f32);

    /// Start a note.
    fn note_on(&mut self, note: u8, velocity: u8);

    /// Release the current note. Release-phase nodes begin their tail.
    fn note_off(&mut self, velocity: u8);

    /// Whether the node still produces signal.
    ///
    /// For envelopes, false once the release has finished. For composite
    /// nodes, true while any child is active.
    fn is_active(&self) -> bool;

    /// Produce the next value.
    ///
    /// `flag` is the voice's current render flag. A node rendered twice with
    /// the same flag must return the value of the first call without
    /// advancing.
    fn render(&mut self, flag: bool) -> f32;

    /// Apply a voice-wide pitch offset in cents (pitch bend).
    ///
    /// Default is a no-op; pitched nodes override it and composites forward.
    fn set_pitch_offset(&mut self, _cents: f32) {}
}

impl<T: SignalNode + ?Sized> SignalNode for alloc::boxed::Box<T> {
    fn init(&mut self, tables: &SynthTables, sample_rate: f32) {
        (**self).init(tables, sample_rate);
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        (**self).note_on(note, velocity);
    }

    fn note_off(&mut self, velocity: u8) {
        (**self).note_off(velocity);
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn render(&mut self, flag: bool) -> f32 {
        (**self).render(flag)
    }

    fn set_pitch_offset(&mut self, cents: f32) {
        (**self).set_pitch_offset(cents);
    }
}

/// Last rendered sample tagged with the flag it was rendered under.
///
/// Starts with a `false` tag, so the first flag a voice passes must be
/// `true`. [`RenderFlag::advance`] guarantees that.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderCache {
    last_flag: bool,
    last_sample: f32,
}

impl RenderCache {
    /// Create an empty cache.
    pub const fn new() -> Self {
        Self {
            last_flag: false,
            last_sample: 0.0,
        }
    }

    /// Cached sample if it was rendered under `flag`.
    #[inline]
    pub fn hit(&self, flag: bool) -> Option<f32> {
        (self.last_flag == flag).then_some(self.last_sample)
    }

    /// Record a freshly rendered sample and return it.
    #[inline]
    pub fn store(&mut self, flag: bool, sample: f32) -> f32 {
        self.last_flag = flag;
        self.last_sample = sample;
        sample
    }

    /// Most recent value, regardless of flag.
    #[inline]
    pub fn last(&self) -> f32 {
        self.last_sample
    }

    /// Forget the cached sample so the next render of either polarity
    /// after a fresh [`RenderFlag`] recomputes.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Per-voice flag that flips once per rendered sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderFlag {
    value: bool,
}

impl RenderFlag {
    /// Create a flag whose first [`advance`](Self::advance) yields `true`.
    pub const fn new() -> Self {
        Self { value: false }
    }

    /// Flip and return the flag for the next sample.
    #[inline]
    pub fn advance(&mut self) -> bool {
        self.value = !self.value;
        self.value
    }

    /// Flag of the sample currently being rendered.
    #[inline]
    pub fn current(&self) -> bool {
        self.value
    }

    /// Return to the initial state. Pair with resetting every cache in the
    /// graph (done by `note_on`).
    pub fn reset(&mut self) {
        self.value = false;
    }
}
