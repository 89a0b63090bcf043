//! Channel messages and the traits that connect sources of events to
//! sources of audio.

/// A channel voice or mode message addressed to a synth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMessage {
    /// Key pressed. Velocity 0 is treated as a release.
    NoteOn {
        /// Channel, 0 to 15.
        channel: u8,
        /// Note number.
        note: u8,
        /// Velocity.
        velocity: u8,
    },
    /// Key released.
    NoteOff {
        /// Channel, 0 to 15.
        channel: u8,
        /// Note number.
        note: u8,
        /// Release velocity.
        velocity: u8,
    },
    /// Control change, including channel mode messages 120 to 127.
    Controller {
        /// Channel, 0 to 15.
        channel: u8,
        /// Controller number.
        controller: u8,
        /// Value.
        value: u8,
    },
    /// 14-bit pitch bend, 8192 = center.
    PitchBend {
        /// Channel, 0 to 15.
        channel: u8,
        /// Bend value.
        value: u16,
    },
    /// Program change.
    ProgramChange {
        /// Channel, 0 to 15.
        channel: u8,
        /// Program number.
        program: u8,
    },
}

impl ChannelMessage {
    /// Channel the message is addressed to.
    pub fn channel(&self) -> u8 {
        match *self {
            Self::NoteOn { channel, .. }
            | Self::NoteOff { channel, .. }
            | Self::Controller { channel, .. }
            | Self::PitchBend { channel, .. }
            | Self::ProgramChange { channel, .. } => channel,
        }
    }

    /// Ordering among messages at the same tick: releases first, so a note
    /// retriggered on the same tick is not cut by its own release.
    pub fn priority(&self) -> u8 {
        match self {
            Self::NoteOff { .. } | Self::NoteOn { velocity: 0, .. } => 0,
            Self::Controller { .. } | Self::ProgramChange { .. } | Self::PitchBend { .. } => 1,
            Self::NoteOn { .. } => 2,
        }
    }
}

/// Receives channel messages. `track` is the sequencer track the message
/// came from, so receivers can filter by track as well as by channel.
pub trait MessageSink {
    /// Handle one message.
    fn send(&mut self, track: u16, message: &ChannelMessage);

    /// Silence everything immediately.
    fn reset(&mut self) {}
}

/// Produces stereo audio. Implementations add into the buffers; they do not
/// clear them.
pub trait AudioSource {
    /// Add the next `left.len()` frames into `left` and `right`.
    fn process(&mut self, left: &mut [f32], right: &mut [f32]);

    /// Number of voices currently sounding.
    fn active_voices(&self) -> usize {
        0
    }
}
