//! Timed events and decoding of raw MIDI and meta messages.

use alloc::vec::Vec;

use polyvox_synth::ChannelMessage;

/// Meta event type carrying a tempo change.
pub const META_TEMPO: u8 = 0x51;
/// Meta event type marking the end of a track.
pub const META_END_OF_TRACK: u8 = 0x2F;

/// Errors raised while decoding raw event bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    /// Status byte is not a channel voice message.
    UnknownStatus(u8),
    /// Tempo meta event payload was not exactly three bytes long.
    TempoPayload(usize),
    /// A sequence was built with zero ticks per beat.
    ZeroTicksPerBeat,
}

impl core::fmt::Display for SequenceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownStatus(status) => write!(f, "unknown status byte 0x{status:02X}"),
            Self::TempoPayload(len) => {
                write!(f, "tempo payload must be 3 bytes, got {len}")
            }
            Self::ZeroTicksPerBeat => write!(f, "ticks per beat must be non-zero"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SequenceError {}

/// What an event does when it is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A message for the voice pools.
    Channel(ChannelMessage),
    /// New tempo in microseconds per beat.
    Tempo(u32),
    /// System exclusive data, carried but not interpreted.
    SysEx(Vec<u8>),
    /// Any other meta event (text, markers, signatures).
    Meta {
        /// Meta type byte.
        kind: u8,
        /// Raw payload.
        data: Vec<u8>,
    },
    /// End of the track.
    EndOfTrack,
}

impl EventKind {
    /// Ordering among events at the same tick.
    ///
    /// Tempo changes come first so that everything at their tick already
    /// sees the new tempo, then releases, controllers, and note starts.
    pub fn priority(&self) -> u8 {
        match self {
            Self::Tempo(_) => 0,
            Self::Channel(message) => 1 + message.priority(),
            Self::SysEx(_) | Self::Meta { .. } => 4,
            Self::EndOfTrack => 5,
        }
    }
}

/// An event at an absolute tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Absolute tick from the start of the track.
    pub tick: u64,
    /// Payload.
    pub kind: EventKind,
}

impl Event {
    /// Event from parts.
    pub fn new(tick: u64, kind: EventKind) -> Self {
        Self { tick, kind }
    }

    /// Channel message event.
    pub fn channel(tick: u64, message: ChannelMessage) -> Self {
        Self::new(tick, EventKind::Channel(message))
    }

    /// Note start.
    pub fn note_on(tick: u64, channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel(
            tick,
            ChannelMessage::NoteOn {
                channel,
                note,
                velocity,
            },
        )
    }

    /// Note release.
    pub fn note_off(tick: u64, channel: u8, note: u8) -> Self {
        Self::channel(
            tick,
            ChannelMessage::NoteOff {
                channel,
                note,
                velocity: 0,
            },
        )
    }

    /// Tempo change.
    pub fn tempo(tick: u64, micros_per_beat: u32) -> Self {
        Self::new(tick, EventKind::Tempo(micros_per_beat))
    }

    /// Decode a three-byte channel voice message.
    ///
    /// Returns `Ok(None)` for aftertouch, which the engine does not use.
    /// A note-on with velocity 0 decodes as a note-off. Data bytes are
    /// masked to seven bits.
    pub fn from_midi(
        tick: u64,
        status: u8,
        data1: u8,
        data2: u8,
    ) -> Result<Option<Self>, SequenceError> {
        let channel = status & 0x0F;
        let data1 = data1 & 0x7F;
        let data2 = data2 & 0x7F;
        let message = match status & 0xF0 {
            0x80 => ChannelMessage::NoteOff {
                channel,
                note: data1,
                velocity: data2,
            },
            0x90 if data2 == 0 => ChannelMessage::NoteOff {
                channel,
                note: data1,
                velocity: 64,
            },
            0x90 => ChannelMessage::NoteOn {
                channel,
                note: data1,
                velocity: data2,
            },
            0xA0 | 0xD0 => return Ok(None),
            0xB0 => ChannelMessage::Controller {
                channel,
                controller: data1,
                value: data2,
            },
            0xC0 => ChannelMessage::ProgramChange {
                channel,
                program: data1,
            },
            0xE0 => ChannelMessage::PitchBend {
                channel,
                value: u16::from(data1) | (u16::from(data2) << 7),
            },
            _ => return Err(SequenceError::UnknownStatus(status)),
        };
        Ok(Some(Self::channel(tick, message)))
    }

    /// Decode a meta event. Tempo payloads are three bytes of big-endian
    /// microseconds per beat.
    pub fn from_meta(tick: u64, kind: u8, data: &[u8]) -> Result<Self, SequenceError> {
        let kind = match kind {
            META_TEMPO => {
                let [a, b, c] = data else {
                    return Err(SequenceError::TempoPayload(data.len()));
                };
                EventKind::Tempo(u32::from_be_bytes([0, *a, *b, *c]))
            }
            META_END_OF_TRACK => EventKind::EndOfTrack,
            _ => EventKind::Meta {
                kind,
                data: data.to_vec(),
            },
        };
        Ok(Self::new(tick, kind))
    }

    /// System exclusive event.
    pub fn sysex(tick: u64, data: &[u8]) -> Self {
        Self::new(tick, EventKind::SysEx(data.to_vec()))
    }

    /// Sort key: tick, then kind priority.
    pub fn sort_key(&self) -> (u64, u8) {
        (self.tick, self.kind.priority())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_channel_messages() {
        let on = Event::from_midi(10, 0x93, 60, 100).unwrap().unwrap();
        assert_eq!(on, Event::note_on(10, 3, 60, 100));

        let off = Event::from_midi(0, 0x80, 60, 40).unwrap().unwrap();
        assert!(matches!(
            off.kind,
            EventKind::Channel(ChannelMessage::NoteOff { velocity: 40, .. })
        ));

        let cc = Event::from_midi(0, 0xB1, 64, 127).unwrap().unwrap();
        assert_eq!(
            cc.kind,
            EventKind::Channel(ChannelMessage::Controller {
                channel: 1,
                controller: 64,
                value: 127
            })
        );

        let program = Event::from_midi(0, 0xC2, 5, 0).unwrap().unwrap();
        assert_eq!(
            program.kind,
            EventKind::Channel(ChannelMessage::ProgramChange {
                channel: 2,
                program: 5
            })
        );
    }

    #[test]
    fn test_zero_velocity_note_on_is_release() {
        let event = Event::from_midi(0, 0x90, 60, 0).unwrap().unwrap();
        assert!(matches!(
            event.kind,
            EventKind::Channel(ChannelMessage::NoteOff { note: 60, .. })
        ));
    }

    #[test]
    fn test_pitch_bend_is_fourteen_bits() {
        let center = Event::from_midi(0, 0xE0, 0x00, 0x40).unwrap().unwrap();
        assert_eq!(
            center.kind,
            EventKind::Channel(ChannelMessage::PitchBend {
                channel: 0,
                value: 8192
            })
        );
        let max = Event::from_midi(0, 0xE0, 0x7F, 0x7F).unwrap().unwrap();
        assert_eq!(
            max.kind,
            EventKind::Channel(ChannelMessage::PitchBend {
                channel: 0,
                value: 16383
            })
        );
    }

    #[test]
    fn test_aftertouch_ignored_and_bad_status_rejected() {
        assert_eq!(Event::from_midi(0, 0xA0, 60, 10), Ok(None));
        assert_eq!(Event::from_midi(0, 0xD5, 10, 0), Ok(None));
        assert_eq!(
            Event::from_midi(0, 0x45, 0, 0),
            Err(SequenceError::UnknownStatus(0x45))
        );
        assert_eq!(
            Event::from_midi(0, 0xF0, 0, 0),
            Err(SequenceError::UnknownStatus(0xF0))
        );
    }

    #[test]
    fn test_tempo_meta() {
        let event = Event::from_meta(480, META_TEMPO, &[0x07, 0xA1, 0x20]).unwrap();
        assert_eq!(event, Event::tempo(480, 500_000));
        assert_eq!(
            Event::from_meta(0, META_TEMPO, &[1, 2]),
            Err(SequenceError::TempoPayload(2))
        );
        let end = Event::from_meta(9, META_END_OF_TRACK, &[]).unwrap();
        assert_eq!(end.kind, EventKind::EndOfTrack);
        let text = Event::from_meta(0, 0x03, b"lead").unwrap();
        assert!(matches!(text.kind, EventKind::Meta { kind: 0x03, .. }));
    }

    #[test]
    fn test_priority_order_at_same_tick() {
        let tempo = Event::tempo(0, 400_000);
        let off = Event::note_off(0, 0, 60);
        let cc = Event::from_midi(0, 0xB0, 7, 100).unwrap().unwrap();
        let on = Event::note_on(0, 0, 60, 100);
        let end = Event::new(0, EventKind::EndOfTrack);
        assert!(tempo.sort_key() < off.sort_key());
        assert!(off.sort_key() < cc.sort_key());
        assert!(cc.sort_key() < on.sort_key());
        assert!(on.sort_key() < end.sort_key());
    }
}
