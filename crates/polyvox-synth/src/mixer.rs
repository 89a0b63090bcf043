//! Top-level stereo mixer over several synths.

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use polyvox_core::{db_to_linear, pan_gains};

use crate::message::{AudioSource, ChannelMessage, MessageSink};

/// Frames rendered per internal pass.
pub const MIXER_CHUNK: usize = 256;

/// Something the mixer can both drive with messages and pull audio from.
pub trait MixerInput: AudioSource + MessageSink + Send {}

impl<T: AudioSource + MessageSink + Send> MixerInput for T {}

struct Channel {
    source: Box<dyn MixerInput>,
    gain: f32,
    pan_l: f32,
    pan_r: f32,
}

/// Sums boxed inputs with per-input gain and pan and a master gain.
///
/// Messages are forwarded to every input; each input decides from its own
/// channel and track masks whether to act on them.
pub struct Mixer {
    inputs: Vec<Channel>,
    master_db: f32,
    master_gain: f32,
    scratch_l: Vec<f32>,
    scratch_r: Vec<f32>,
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mixer {
    /// Empty mixer at unity gain.
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            master_db: 0.0,
            master_gain: 1.0,
            scratch_l: vec![0.0; MIXER_CHUNK],
            scratch_r: vec![0.0; MIXER_CHUNK],
        }
    }

    /// Add an input at linear `gain` and `pan` (-1 to 1). Returns its index.
    pub fn add_input(&mut self, source: Box<dyn MixerInput>, gain: f32, pan: f32) -> usize {
        let (pan_l, pan_r) = pan_gains(pan.clamp(-1.0, 1.0));
        self.inputs.push(Channel {
            source,
            gain,
            pan_l,
            pan_r,
        });
        self.inputs.len() - 1
    }

    /// Number of inputs.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Change an input's gain. Out-of-range indices are ignored.
    pub fn set_input_gain(&mut self, index: usize, gain: f32) {
        if let Some(input) = self.inputs.get_mut(index) {
            input.gain = gain;
        }
    }

    /// Change an input's pan. Out-of-range indices are ignored.
    pub fn set_input_pan(&mut self, index: usize, pan: f32) {
        if let Some(input) = self.inputs.get_mut(index) {
            (input.pan_l, input.pan_r) = pan_gains(pan.clamp(-1.0, 1.0));
        }
    }

    /// Master gain in dB.
    pub fn master_volume(&self) -> f32 {
        self.master_db
    }

    /// Set master gain in dB.
    pub fn set_master_volume(&mut self, db: f32) {
        self.master_db = db;
        self.master_gain = db_to_linear(db);
    }
}

impl MessageSink for Mixer {
    fn send(&mut self, track: u16, message: &ChannelMessage) {
        for input in &mut self.inputs {
            input.source.send(track, message);
        }
    }

    fn reset(&mut self) {
        for input in &mut self.inputs {
            input.source.reset();
        }
    }
}

impl AudioSource for Mixer {
    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let mut offset = 0;
        while offset < frames {
            let n = (frames - offset).min(MIXER_CHUNK);
            let out_l = &mut left[offset..offset + n];
            let out_r = &mut right[offset..offset + n];
            for input in &mut self.inputs {
                let scratch_l = &mut self.scratch_l[..n];
                let scratch_r = &mut self.scratch_r[..n];
                scratch_l.fill(0.0);
                scratch_r.fill(0.0);
                input.source.process(scratch_l, scratch_r);

                let gl = input.gain * input.pan_l * self.master_gain;
                let gr = input.gain * input.pan_r * self.master_gain;
                for i in 0..n {
                    out_l[i] += scratch_l[i] * gl;
                    out_r[i] += scratch_r[i] * gr;
                }
            }
            offset += n;
        }
    }

    fn active_voices(&self) -> usize {
        self.inputs.iter().map(|input| input.source.active_voices()).sum()
    }
}
