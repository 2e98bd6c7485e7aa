//! Decoded MIDI events and per-channel controller state.
//!
//! The engine does not decode the MIDI wire protocol; the host hands it
//! events that are already split into key/velocity/controller form, each
//! stamped with a sample offset inside the render block.

/// Center position of the 14-bit pitch wheel.
pub const PITCH_WHEEL_CENTER: u16 = 8192;

/// A decoded MIDI event, timestamped with the sample offset at which it
/// takes effect inside the current render block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    /// Sample offset within the render block (0-based).
    pub offset: usize,
    pub kind: MidiEventKind,
}

/// The event kinds the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEventKind {
    /// Key down. Velocity 0 is treated as note-off by convention.
    NoteOn { key: u8, velocity: u8 },
    /// Key up.
    NoteOff { key: u8, velocity: u8 },
    /// Continuous controller change. Unknown controller numbers are
    /// stored but otherwise ignored.
    ControlChange { controller: u8, value: u8 },
    /// Channel (mono) aftertouch.
    ChannelPressure { value: u8 },
    /// Polyphonic key aftertouch.
    KeyPressure { key: u8, value: u8 },
    /// 14-bit pitch wheel position, 0..=16383, center 8192.
    PitchWheel { value: u16 },
    /// Wheel sensitivity in semitones (RPN 0 result, pre-decoded).
    PitchWheelSensitivity { value: u8 },
    /// Immediately reclaim every active voice.
    AllOff,
}

impl MidiEvent {
    pub fn new(offset: usize, kind: MidiEventKind) -> Self {
        MidiEvent { offset, kind }
    }
}

/// State of the single MIDI channel the engine listens on.
///
/// Modulators pull controller values from here per sample, so event
/// handling only has to write the new value; no voice notification is
/// needed.
#[derive(Debug, Clone)]
pub struct Channel {
    continuous_controls: [u8; 128],
    key_pressures: [u8; 128],
    channel_pressure: u8,
    pitch_wheel: u16,
    pitch_wheel_sensitivity: u8,
}

impl Default for Channel {
    fn default() -> Self {
        Channel::new()
    }
}

impl Channel {
    pub fn new() -> Self {
        let mut continuous_controls = [0u8; 128];
        // Volume (CC 7) and expression (CC 11) start at full so the
        // default attenuation modulators are transparent until the host
        // says otherwise.
        continuous_controls[7] = 127;
        continuous_controls[11] = 127;
        // Pan (CC 10) centered.
        continuous_controls[10] = 64;
        Channel {
            continuous_controls,
            key_pressures: [0; 128],
            channel_pressure: 0,
            pitch_wheel: PITCH_WHEEL_CENTER,
            pitch_wheel_sensitivity: 2,
        }
    }

    pub fn continuous_control(&self, controller: u8) -> u8 {
        self.continuous_controls[(controller & 0x7F) as usize]
    }

    pub fn set_continuous_control(&mut self, controller: u8, value: u8) {
        self.continuous_controls[(controller & 0x7F) as usize] = value & 0x7F;
    }

    pub fn key_pressure(&self, key: u8) -> u8 {
        self.key_pressures[(key & 0x7F) as usize]
    }

    pub fn set_key_pressure(&mut self, key: u8, value: u8) {
        self.key_pressures[(key & 0x7F) as usize] = value & 0x7F;
    }

    pub fn channel_pressure(&self) -> u8 {
        self.channel_pressure
    }

    pub fn set_channel_pressure(&mut self, value: u8) {
        self.channel_pressure = value & 0x7F;
    }

    pub fn pitch_wheel(&self) -> u16 {
        self.pitch_wheel
    }

    pub fn set_pitch_wheel(&mut self, value: u16) {
        self.pitch_wheel = value.min(16383);
    }

    pub fn pitch_wheel_sensitivity(&self) -> u8 {
        self.pitch_wheel_sensitivity
    }

    pub fn set_pitch_wheel_sensitivity(&mut self, value: u8) {
        self.pitch_wheel_sensitivity = value & 0x7F;
    }
}
