//! A voice: one pre-built graph bound to a sounding note.

use polyvox_core::{RenderFlag, SignalNode};

/// Level follower release per sample.
const LEVEL_DECAY: f32 = 0.999;

/// One slot of the voice pool.
///
/// The voice owns the [`RenderFlag`] for its graph and flips it exactly
/// once per output sample, so every node in the graph sees one flag value
/// per sample.
#[derive(Debug, Clone)]
pub struct Voice<G> {
    graph: G,
    flag: RenderFlag,
    channel: u8,
    note: u8,
    velocity: u8,
    is_on: bool,
    sustained: bool,
    pan: f32,
    age: u64,
    level: f32,
}

impl<G: SignalNode> Voice<G> {
    /// Wrap a graph in an idle voice.
    pub fn new(graph: G) -> Self {
        Self {
            graph,
            flag: RenderFlag::new(),
            channel: 0,
            note: 0,
            velocity: 0,
            is_on: false,
            sustained: false,
            pan: 0.0,
            age: 0,
            level: 0.0,
        }
    }

    /// The graph.
    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// The graph, mutably.
    pub fn graph_mut(&mut self) -> &mut G {
        &mut self.graph
    }

    /// Bound channel.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Bound note.
    pub fn note(&self) -> u8 {
        self.note
    }

    /// Note-on velocity.
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Allocation counter value; lower is older.
    pub fn age(&self) -> u64 {
        self.age
    }

    /// Key still held (or held by the sustain pedal).
    pub fn is_on(&self) -> bool {
        self.is_on
    }

    /// Release deferred by the sustain pedal.
    pub fn is_sustained(&self) -> bool {
        self.sustained
    }

    /// Recent peak output level.
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Voice pan, -1 to 1.
    pub fn pan(&self) -> f32 {
        self.pan
    }

    /// Bind to a note and start the graph. The graph must already be
    /// configured for the note.
    pub fn start(&mut self, channel: u8, note: u8, velocity: u8, age: u64, pan: f32, bend_cents: f32) {
        self.channel = channel;
        self.note = note;
        self.velocity = velocity;
        self.age = age;
        self.pan = pan;
        self.is_on = true;
        self.sustained = false;
        self.level = 0.0;
        self.flag.reset();
        self.graph.note_on(note, velocity);
        self.graph.set_pitch_offset(bend_cents);
    }

    /// Release the key. The graph enters its release stages.
    pub fn release(&mut self, velocity: u8) {
        if self.is_on {
            self.is_on = false;
            self.sustained = false;
            self.graph.note_off(velocity);
        }
    }

    /// Mark the release as deferred by the sustain pedal.
    pub fn defer_release(&mut self) {
        self.sustained = true;
    }

    /// Drop the note without a release; the slot can be reused at once.
    pub fn kill(&mut self) {
        self.is_on = false;
        self.sustained = false;
        self.level = 0.0;
    }

    /// True when the key is up and the graph has gone silent.
    pub fn is_finished(&self) -> bool {
        !self.is_on && !self.graph.is_active()
    }

    /// Add `left.len()` frames into the buffers with the given gains.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32], gain_l: f32, gain_r: f32) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let flag = self.flag.advance();
            let sample = self.graph.render(flag);
            *l += sample * gain_l;
            *r += sample * gain_r;
            self.level = (self.level * LEVEL_DECAY).max(sample.abs());
        }
    }
}
