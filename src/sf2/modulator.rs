//! Modulator source/destination decoding and curve transforms.
//!
//! A modulator record packs its source and amount-source specs into 16
//! bits each: continuity type, polarity, direction, and either a general
//! controller index or a MIDI continuous controller number. The decoded
//! spec selects one of sixteen 128-entry transform tables (four curves ×
//! two polarities × two directions).

use std::sync::LazyLock;

use crate::sf2::generator::Generator;
use crate::sf2::records::ModulatorRecord;

const CURVE_SIZE: usize = 128;

/// What a modulator source reads each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// No controller: the modulator contributes nothing (as primary
    /// source) or a unity factor (as amount source).
    None,
    NoteOnVelocity,
    NoteOnKey,
    KeyPressure,
    ChannelPressure,
    PitchWheel,
    PitchWheelSensitivity,
    /// Output of another modulator, resolved during the linking pass.
    Link,
    ContinuousControl(u8),
    /// A general-controller index with no defined meaning.
    Unsupported,
}

/// Curve continuity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    Linear,
    Concave,
    Convex,
    Switch,
}

/// A decoded 16-bit source spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpec(u16);

impl SourceSpec {
    pub const CC_FLAG: u16 = 0x0080;
    pub const DIRECTION_FLAG: u16 = 0x0100;
    pub const POLARITY_FLAG: u16 = 0x0200;

    pub fn new(raw: u16) -> Self {
        SourceSpec(raw)
    }

    /// Build a spec from parts; used for the default modulator set.
    pub fn general(
        index: u16,
        continuity: Continuity,
        bipolar: bool,
        negative: bool,
    ) -> Self {
        let mut raw = (index & 0x7F) | ((continuity as u16) << 10);
        if bipolar {
            raw |= Self::POLARITY_FLAG;
        }
        if negative {
            raw |= Self::DIRECTION_FLAG;
        }
        SourceSpec(raw)
    }

    pub fn continuous_control(
        controller: u8,
        continuity: Continuity,
        bipolar: bool,
        negative: bool,
    ) -> Self {
        let base = Self::general(controller as u16, continuity, bipolar, negative);
        SourceSpec(base.0 | Self::CC_FLAG)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn kind(self) -> SourceKind {
        let index = self.0 & 0x7F;
        if self.0 & Self::CC_FLAG != 0 {
            return SourceKind::ContinuousControl(index as u8);
        }
        match index {
            0 => SourceKind::None,
            2 => SourceKind::NoteOnVelocity,
            3 => SourceKind::NoteOnKey,
            10 => SourceKind::KeyPressure,
            13 => SourceKind::ChannelPressure,
            14 => SourceKind::PitchWheel,
            16 => SourceKind::PitchWheelSensitivity,
            127 => SourceKind::Link,
            _ => SourceKind::Unsupported,
        }
    }

    pub fn is_bipolar(self) -> bool {
        self.0 & Self::POLARITY_FLAG != 0
    }

    pub fn is_negative(self) -> bool {
        self.0 & Self::DIRECTION_FLAG != 0
    }

    pub fn continuity(self) -> Continuity {
        match (self.0 >> 10) & 0x3F {
            0 => Continuity::Linear,
            1 => Continuity::Concave,
            2 => Continuity::Convex,
            3 => Continuity::Switch,
            // Undefined curve types degrade to linear.
            _ => Continuity::Linear,
        }
    }

    /// Transform a controller value in [0, 127] through this spec's
    /// curve table, interpolating between entries. Fractional inputs
    /// come from 14-bit sources folded onto the 7-bit scale.
    pub fn transform(self, value: f64) -> f64 {
        let table = curve_table(self.continuity(), self.is_negative(), self.is_bipolar());
        let value = value.clamp(0.0, 127.0);
        let index = value as usize;
        let frac = value - index as f64;
        if frac == 0.0 || index + 1 >= CURVE_SIZE {
            return table[index.min(CURVE_SIZE - 1)];
        }
        table[index] + frac * (table[index + 1] - table[index])
    }
}

/// Where a modulator's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Generator(Generator),
    /// Feeds the source input of another modulator in the same zone,
    /// by zone-local modulator index.
    Link(u16),
}

impl Destination {
    const LINK_FLAG: u16 = 0x8000;

    pub fn decode(raw: u16) -> Option<Destination> {
        if raw & Self::LINK_FLAG != 0 {
            Some(Destination::Link(raw & 0x7FFF))
        } else {
            Generator::from_index(raw).map(Destination::Generator)
        }
    }
}

/// The output transform applied to a modulator's product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Linear,
    Absolute,
}

impl Transform {
    pub fn decode(raw: u16) -> Transform {
        if raw == 2 {
            Transform::Absolute
        } else {
            Transform::Linear
        }
    }

    pub fn apply(self, value: f64) -> f64 {
        match self {
            Transform::Linear => value,
            Transform::Absolute => value.abs(),
        }
    }
}

// 16 tables: continuity (4) × direction (2) × polarity (2).
static CURVES: LazyLock<Vec<[f64; CURVE_SIZE]>> = LazyLock::new(|| {
    let mut tables = Vec::with_capacity(16);
    for continuity in [
        Continuity::Linear,
        Continuity::Concave,
        Continuity::Convex,
        Continuity::Switch,
    ] {
        for negative in [false, true] {
            for bipolar in [false, true] {
                let mut table = [0.0; CURVE_SIZE];
                for (i, slot) in table.iter_mut().enumerate() {
                    let index = if negative { CURVE_SIZE - 1 - i } else { i };
                    let unipolar = unipolar_curve(continuity, index);
                    *slot = if bipolar {
                        2.0 * unipolar - 1.0
                    } else {
                        unipolar
                    };
                }
                tables.push(table);
            }
        }
    }
    tables
});

fn unipolar_curve(continuity: Continuity, index: usize) -> f64 {
    let i = index as f64;
    match continuity {
        Continuity::Linear => i / 127.0,
        Continuity::Concave => {
            if index == 127 {
                1.0
            } else {
                -40.0 / 96.0 * ((127.0 - i) / 127.0).log10()
            }
        }
        Continuity::Convex => {
            if index == 0 {
                0.0
            } else {
                1.0 + 40.0 / 96.0 * (i / 127.0).log10()
            }
        }
        Continuity::Switch => {
            if index < 64 {
                0.0
            } else {
                1.0
            }
        }
    }
}

fn curve_table(continuity: Continuity, negative: bool, bipolar: bool) -> &'static [f64; CURVE_SIZE] {
    let index =
        (continuity as usize) * 4 + (negative as usize) * 2 + bipolar as usize;
    &CURVES[index]
}

/// The ten default modulators of SF2 §8.4, installed before any zone
/// modulator. The pitch-wheel entry targets `fineTune` rather than a
/// dedicated pitch slot, following the FluidSynth convention.
pub fn default_modulators() -> [ModulatorRecord; 10] {
    use Continuity::*;
    let record = |source: SourceSpec,
                  destination: Generator,
                  amount: i16,
                  amount_source: SourceSpec| ModulatorRecord {
        source: source.raw(),
        destination: destination.index() as u16,
        amount,
        amount_source: amount_source.raw(),
        transform: 0,
    };
    let none = SourceSpec::general(0, Linear, false, false);
    [
        // Note-on velocity to initial attenuation.
        record(
            SourceSpec::general(2, Concave, false, true),
            Generator::InitialAttenuation,
            960,
            none,
        ),
        // Note-on velocity to filter cutoff.
        record(
            SourceSpec::general(2, Linear, false, true),
            Generator::InitialFilterCutoff,
            -2400,
            none,
        ),
        // Channel pressure to vibrato LFO pitch depth.
        record(
            SourceSpec::general(13, Linear, false, false),
            Generator::VibLfoToPitch,
            50,
            none,
        ),
        // CC 1 (mod wheel) to vibrato LFO pitch depth.
        record(
            SourceSpec::continuous_control(1, Linear, false, false),
            Generator::VibLfoToPitch,
            50,
            none,
        ),
        // CC 7 (volume) to initial attenuation.
        record(
            SourceSpec::continuous_control(7, Concave, false, true),
            Generator::InitialAttenuation,
            960,
            none,
        ),
        // CC 10 (pan) to pan position.
        record(
            SourceSpec::continuous_control(10, Linear, true, false),
            Generator::Pan,
            500,
            none,
        ),
        // CC 11 (expression) to initial attenuation.
        record(
            SourceSpec::continuous_control(11, Concave, false, true),
            Generator::InitialAttenuation,
            960,
            none,
        ),
        // CC 91 to reverb effect send.
        record(
            SourceSpec::continuous_control(91, Linear, false, false),
            Generator::ReverbEffectSend,
            200,
            none,
        ),
        // CC 93 to chorus effect send.
        record(
            SourceSpec::continuous_control(93, Linear, false, false),
            Generator::ChorusEffectSend,
            200,
            none,
        ),
        // Pitch wheel, scaled by wheel sensitivity, to fine tune.
        record(
            SourceSpec::general(14, Linear, true, false),
            Generator::FineTune,
            12700,
            SourceSpec::general(16, Linear, false, false),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn decodes_cc_and_general_sources() {
        let cc = SourceSpec::continuous_control(10, Continuity::Linear, true, false);
        assert_eq!(cc.kind(), SourceKind::ContinuousControl(10));
        assert!(cc.is_bipolar());
        assert!(!cc.is_negative());

        let vel = SourceSpec::general(2, Continuity::Concave, false, true);
        assert_eq!(vel.kind(), SourceKind::NoteOnVelocity);
        assert_eq!(vel.continuity(), Continuity::Concave);
        assert!(vel.is_negative());

        assert_eq!(SourceSpec::new(0).kind(), SourceKind::None);
        assert_eq!(SourceSpec::new(127).kind(), SourceKind::Link);
        assert_eq!(SourceSpec::new(5).kind(), SourceKind::Unsupported);
    }

    #[test]
    fn linear_curve_endpoints() {
        let spec = SourceSpec::general(2, Continuity::Linear, false, false);
        assert_abs_diff_eq!(spec.transform(0.0), 0.0);
        assert_abs_diff_eq!(spec.transform(127.0), 1.0);
        assert_abs_diff_eq!(spec.transform(64.0), 64.0 / 127.0, epsilon = 1e-12);
        // Fractional inputs interpolate.
        assert_abs_diff_eq!(spec.transform(63.5), 63.5 / 127.0, epsilon = 1e-12);

        let negative = SourceSpec::general(2, Continuity::Linear, false, true);
        assert_abs_diff_eq!(negative.transform(0.0), 1.0);
        assert_abs_diff_eq!(negative.transform(127.0), 0.0);

        let bipolar = SourceSpec::general(14, Continuity::Linear, true, false);
        assert_abs_diff_eq!(bipolar.transform(0.0), -1.0);
        assert_abs_diff_eq!(bipolar.transform(63.5), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bipolar.transform(127.0), 1.0);
    }

    #[test]
    fn concave_curve_shape() {
        let spec = SourceSpec::general(2, Continuity::Concave, false, false);
        assert_abs_diff_eq!(spec.transform(0.0), 0.0);
        assert_abs_diff_eq!(spec.transform(127.0), 1.0, epsilon = 1e-12);
        // Slow start: well below linear at midpoint.
        assert!(spec.transform(64.0) < 64.0 / 127.0);
        // Monotone non-decreasing.
        let mut prev = -1.0;
        for v in 0..=127 {
            let y = spec.transform(v as f64);
            assert!(y >= prev, "concave curve dipped at {v}");
            prev = y;
        }
    }

    #[test]
    fn convex_curve_shape() {
        let spec = SourceSpec::general(2, Continuity::Convex, false, false);
        assert_abs_diff_eq!(spec.transform(0.0), 0.0);
        assert_abs_diff_eq!(spec.transform(127.0), 1.0, epsilon = 1e-12);
        // Fast start: above linear at midpoint.
        assert!(spec.transform(64.0) > 64.0 / 127.0);
    }

    #[test]
    fn switch_curve_threshold() {
        let spec = SourceSpec::general(2, Continuity::Switch, false, false);
        assert_eq!(spec.transform(63.0), 0.0);
        assert_eq!(spec.transform(64.0), 1.0);
    }

    #[test]
    fn destination_decoding() {
        assert_eq!(
            Destination::decode(48),
            Some(Destination::Generator(Generator::InitialAttenuation))
        );
        assert_eq!(Destination::decode(0x8003), Some(Destination::Link(3)));
        assert_eq!(Destination::decode(60), None, "out-of-range generator");
    }

    #[test]
    fn transform_codes() {
        assert_eq!(Transform::decode(0), Transform::Linear);
        assert_eq!(Transform::decode(2), Transform::Absolute);
        assert_eq!(Transform::decode(7), Transform::Linear);
        assert_eq!(Transform::Absolute.apply(-3.0), 3.0);
    }

    #[test]
    fn default_set_matches_spec() {
        let defaults = default_modulators();
        assert_eq!(defaults.len(), 10);
        // First default: velocity to attenuation, concave negative, 960 cB.
        assert_eq!(defaults[0].amount, 960);
        assert_eq!(
            Destination::decode(defaults[0].destination),
            Some(Destination::Generator(Generator::InitialAttenuation))
        );
        let src = SourceSpec::new(defaults[0].source);
        assert_eq!(src.kind(), SourceKind::NoteOnVelocity);
        assert_eq!(src.continuity(), Continuity::Concave);
        assert!(src.is_negative());
        // Last default: pitch wheel to fine tune, scaled by sensitivity.
        let wheel = &defaults[9];
        assert_eq!(
            Destination::decode(wheel.destination),
            Some(Destination::Generator(Generator::FineTune))
        );
        assert_eq!(SourceSpec::new(wheel.source).kind(), SourceKind::PitchWheel);
        assert!(SourceSpec::new(wheel.source).is_bipolar());
        assert_eq!(
            SourceSpec::new(wheel.amount_source).kind(),
            SourceKind::PitchWheelSensitivity
        );
    }
}
