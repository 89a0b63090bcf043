//! Per-channel controller state.

use polyvox_core::{SynthTables, pan_gains};

/// Number of MIDI channels per synth.
pub const CHANNEL_COUNT: usize = 16;

/// Controller numbers the synth interprets.
pub mod cc {
    /// Data entry MSB.
    pub const DATA_ENTRY: u8 = 6;
    /// Channel volume.
    pub const VOLUME: u8 = 7;
    /// Pan.
    pub const PAN: u8 = 10;
    /// Expression.
    pub const EXPRESSION: u8 = 11;
    /// Sustain pedal.
    pub const SUSTAIN: u8 = 64;
    /// Registered parameter number LSB.
    pub const RPN_LSB: u8 = 100;
    /// Registered parameter number MSB.
    pub const RPN_MSB: u8 = 101;
    /// All sound off.
    pub const ALL_SOUND_OFF: u8 = 120;
    /// Reset all controllers.
    pub const RESET_CONTROLLERS: u8 = 121;
    /// All notes off.
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// Null RPN value.
const RPN_NONE: u16 = 0x3FFF;

/// Volume, pan, expression, sustain and pitch bend of one channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelState {
    /// CC7 value.
    pub volume: u8,
    /// CC10 value (64 = center).
    pub pan: u8,
    /// CC11 value.
    pub expression: u8,
    /// Sustain pedal down.
    pub sustain: bool,
    /// Pitch bend, -1 to 1.
    pub bend: f32,
    /// Bend range in semitones.
    pub bend_range: f32,
    /// Last program change.
    pub program: u8,
    rpn: u16,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            volume: 100,
            pan: 64,
            expression: 127,
            sustain: false,
            bend: 0.0,
            bend_range: 2.0,
            program: 0,
            rpn: RPN_NONE,
        }
    }
}

impl ChannelState {
    /// Back to power-on values.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// CC121: expression, sustain and bend back to defaults. Volume, pan
    /// and program are kept.
    pub fn reset_controllers(&mut self) {
        self.expression = 127;
        self.sustain = false;
        self.bend = 0.0;
        self.rpn = RPN_NONE;
    }

    /// Apply a controller that only changes channel state. Returns `false`
    /// for controllers the channel does not track.
    pub fn apply_controller(&mut self, controller: u8, value: u8) -> bool {
        let value = value.min(127);
        match controller {
            cc::VOLUME => self.volume = value,
            cc::PAN => self.pan = value,
            cc::EXPRESSION => self.expression = value,
            cc::SUSTAIN => self.sustain = value >= 64,
            cc::RPN_MSB => self.rpn = (self.rpn & 0x7F) | u16::from(value) << 7,
            cc::RPN_LSB => self.rpn = (self.rpn & !0x7F) | u16::from(value),
            cc::DATA_ENTRY => {
                // RPN 0: pitch bend sensitivity in semitones
                if self.rpn == 0 {
                    self.bend_range = f32::from(value);
                }
            }
            _ => return false,
        }
        true
    }

    /// Set pitch bend from a 14-bit value (8192 = center).
    pub fn set_bend(&mut self, value: u16) {
        let value = value.min(0x3FFF);
        self.bend = (f32::from(value) - 8192.0) / 8192.0;
    }

    /// Current bend in cents.
    pub fn bend_cents(&self) -> f32 {
        self.bend * self.bend_range * 100.0
    }

    /// Linear gain from volume and expression (40·log10 curve each).
    pub fn gain(&self, tables: &SynthTables) -> f32 {
        let atten = tables.velocity_to_atten(self.volume) + tables.velocity_to_atten(self.expression);
        tables.attenuation_to_gain(atten)
    }

    /// Pan position, -1 to 1.
    pub fn pan_position(&self) -> f32 {
        ((f32::from(self.pan) - 64.0) / 63.0).clamp(-1.0, 1.0)
    }

    /// Constant-power gains for this channel combined with a voice pan.
    pub fn pan_gains(&self, voice_pan: f32) -> (f32, f32) {
        pan_gains((self.pan_position() + voice_pan).clamp(-1.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let tables = SynthTables::new();
        let ch = ChannelState::default();
        assert_eq!(ch.pan_position(), 0.0);
        // Volume 100: 40·log10(127/100) ≈ 4.15 dB down
        let expected = polyvox_core::db_to_linear(-4.15);
        assert!((ch.gain(&tables) - expected).abs() < 0.01);
    }

    #[test]
    fn test_controllers() {
        let mut ch = ChannelState::default();
        assert!(ch.apply_controller(cc::VOLUME, 127));
        assert!(ch.apply_controller(cc::PAN, 127));
        assert!(ch.apply_controller(cc::SUSTAIN, 64));
        assert!(!ch.apply_controller(1, 10), "mod wheel is not tracked");
        assert_eq!(ch.volume, 127);
        assert_eq!(ch.pan_position(), 1.0);
        assert!(ch.sustain);
        ch.apply_controller(cc::SUSTAIN, 63);
        assert!(!ch.sustain);
    }

    #[test]
    fn test_bend_range_rpn() {
        let mut ch = ChannelState::default();
        ch.set_bend(0x3FFF);
        assert!((ch.bend_cents() - 200.0).abs() < 0.1);

        ch.apply_controller(cc::RPN_MSB, 0);
        ch.apply_controller(cc::RPN_LSB, 0);
        ch.apply_controller(cc::DATA_ENTRY, 12);
        assert_eq!(ch.bend_range, 12.0);
        ch.set_bend(0);
        assert!((ch.bend_cents() + 1200.0).abs() < 0.1);
    }

    #[test]
    fn test_reset_controllers_keeps_volume() {
        let mut ch = ChannelState::default();
        ch.apply_controller(cc::VOLUME, 20);
        ch.apply_controller(cc::EXPRESSION, 20);
        ch.set_bend(0);
        ch.reset_controllers();
        assert_eq!(ch.volume, 20);
        assert_eq!(ch.expression, 127);
        assert_eq!(ch.bend, 0.0);
    }
}
