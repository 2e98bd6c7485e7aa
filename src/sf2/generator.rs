//! The SoundFont generator enumeration.
//!
//! Generators are the parameter slots of a zone. Indices 0–58 follow the
//! SF2 2.04 specification; 59 is `InitialPitch`, an engine-internal slot
//! that pitch modulators can target.

/// Number of generator slots, including the engine-internal one.
pub const GENERATOR_COUNT: usize = 60;

/// How a generator's 16-bit amount field is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountKind {
    Signed,
    Unsigned,
    Range,
}

/// A raw 16-bit generator amount, interpreted per-generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount(pub u16);

impl Amount {
    pub fn signed(self) -> i16 {
        self.0 as i16
    }

    pub fn unsigned(self) -> u16 {
        self.0
    }

    /// Key/velocity range bytes as (low, high). Some fonts store them
    /// swapped; normalize so `low <= high`.
    pub fn range(self) -> (u8, u8) {
        let a = (self.0 & 0xFF) as u8;
        let b = (self.0 >> 8) as u8;
        (a.min(b), a.max(b))
    }

    /// The amount as the f64 the voice state works in.
    pub fn value_for(self, generator: Generator) -> f64 {
        match generator.amount_kind() {
            AmountKind::Signed => self.signed() as f64,
            AmountKind::Unsigned => self.unsigned() as f64,
            // Ranges never enter the value table; encode as the low byte
            // so a misuse is at least deterministic.
            AmountKind::Range => self.range().0 as f64,
        }
    }
}

/// SF2 generator indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum Generator {
    StartAddressOffset = 0,
    EndAddressOffset = 1,
    StartLoopAddressOffset = 2,
    EndLoopAddressOffset = 3,
    StartAddressCoarseOffset = 4,
    ModLfoToPitch = 5,
    VibLfoToPitch = 6,
    ModEnvToPitch = 7,
    InitialFilterCutoff = 8,
    InitialFilterResonance = 9,
    ModLfoToFilterCutoff = 10,
    ModEnvToFilterCutoff = 11,
    EndAddressCoarseOffset = 12,
    ModLfoToVolume = 13,
    Unused1 = 14,
    ChorusEffectSend = 15,
    ReverbEffectSend = 16,
    Pan = 17,
    Unused2 = 18,
    Unused3 = 19,
    Unused4 = 20,
    DelayModLfo = 21,
    FrequencyModLfo = 22,
    DelayVibLfo = 23,
    FrequencyVibLfo = 24,
    DelayModEnvelope = 25,
    AttackModEnvelope = 26,
    HoldModEnvelope = 27,
    DecayModEnvelope = 28,
    SustainModEnvelope = 29,
    ReleaseModEnvelope = 30,
    MidiKeyToModEnvelopeHold = 31,
    MidiKeyToModEnvelopeDecay = 32,
    DelayVolEnvelope = 33,
    AttackVolEnvelope = 34,
    HoldVolEnvelope = 35,
    DecayVolEnvelope = 36,
    SustainVolEnvelope = 37,
    ReleaseVolEnvelope = 38,
    MidiKeyToVolEnvelopeHold = 39,
    MidiKeyToVolEnvelopeDecay = 40,
    Instrument = 41,
    Reserved1 = 42,
    KeyRange = 43,
    VelocityRange = 44,
    StartLoopAddressCoarseOffset = 45,
    ForcedMidiKey = 46,
    ForcedMidiVelocity = 47,
    InitialAttenuation = 48,
    Reserved2 = 49,
    EndLoopAddressCoarseOffset = 50,
    CoarseTune = 51,
    FineTune = 52,
    SampleId = 53,
    SampleModes = 54,
    Reserved3 = 55,
    ScaleTuning = 56,
    ExclusiveClass = 57,
    OverridingRootKey = 58,
    /// Engine-internal pitch slot (not encoded in files).
    InitialPitch = 59,
}

impl Generator {
    /// All generator slots in index order.
    pub const ALL: [Generator; GENERATOR_COUNT] = {
        use Generator::*;
        [
            StartAddressOffset,
            EndAddressOffset,
            StartLoopAddressOffset,
            EndLoopAddressOffset,
            StartAddressCoarseOffset,
            ModLfoToPitch,
            VibLfoToPitch,
            ModEnvToPitch,
            InitialFilterCutoff,
            InitialFilterResonance,
            ModLfoToFilterCutoff,
            ModEnvToFilterCutoff,
            EndAddressCoarseOffset,
            ModLfoToVolume,
            Unused1,
            ChorusEffectSend,
            ReverbEffectSend,
            Pan,
            Unused2,
            Unused3,
            Unused4,
            DelayModLfo,
            FrequencyModLfo,
            DelayVibLfo,
            FrequencyVibLfo,
            DelayModEnvelope,
            AttackModEnvelope,
            HoldModEnvelope,
            DecayModEnvelope,
            SustainModEnvelope,
            ReleaseModEnvelope,
            MidiKeyToModEnvelopeHold,
            MidiKeyToModEnvelopeDecay,
            DelayVolEnvelope,
            AttackVolEnvelope,
            HoldVolEnvelope,
            DecayVolEnvelope,
            SustainVolEnvelope,
            ReleaseVolEnvelope,
            MidiKeyToVolEnvelopeHold,
            MidiKeyToVolEnvelopeDecay,
            Instrument,
            Reserved1,
            KeyRange,
            VelocityRange,
            StartLoopAddressCoarseOffset,
            ForcedMidiKey,
            ForcedMidiVelocity,
            InitialAttenuation,
            Reserved2,
            EndLoopAddressCoarseOffset,
            CoarseTune,
            FineTune,
            SampleId,
            SampleModes,
            Reserved3,
            ScaleTuning,
            ExclusiveClass,
            OverridingRootKey,
            InitialPitch,
        ]
    };

    pub fn from_index(index: u16) -> Option<Generator> {
        Generator::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn amount_kind(self) -> AmountKind {
        use Generator::*;
        match self {
            KeyRange | VelocityRange => AmountKind::Range,
            Instrument | SampleId | SampleModes | ScaleTuning | ExclusiveClass => {
                AmountKind::Unsigned
            }
            _ => AmountKind::Signed,
        }
    }

    /// Default value installed before any zone applies, per SF2 §8.1.3
    /// with the engine's conventions for the forced-key/velocity slots.
    pub fn default_value(self) -> f64 {
        use Generator::*;
        match self {
            InitialFilterCutoff => 13500.0,
            DelayModLfo | DelayVibLfo => -12000.0,
            DelayModEnvelope | AttackModEnvelope | HoldModEnvelope
            | DecayModEnvelope | ReleaseModEnvelope => -12000.0,
            DelayVolEnvelope | AttackVolEnvelope | HoldVolEnvelope
            | DecayVolEnvelope | ReleaseVolEnvelope => -12000.0,
            SustainVolEnvelope => -12000.0,
            ForcedMidiKey | ForcedMidiVelocity | OverridingRootKey => -1.0,
            ScaleTuning => 100.0,
            _ => 0.0,
        }
    }

    /// Whether a preset zone may refine this generator. Sample-level
    /// parameters (addresses, loop mode, root key, exclusive class,
    /// forced key/velocity) belong to instruments only.
    pub fn is_available_in_preset(self) -> bool {
        use Generator::*;
        !matches!(
            self,
            StartAddressOffset
                | EndAddressOffset
                | StartLoopAddressOffset
                | EndLoopAddressOffset
                | StartAddressCoarseOffset
                | EndAddressCoarseOffset
                | StartLoopAddressCoarseOffset
                | EndLoopAddressCoarseOffset
                | ForcedMidiKey
                | ForcedMidiVelocity
                | SampleModes
                | ExclusiveClass
                | OverridingRootKey
                | SampleId
                | Unused1
                | Unused2
                | Unused3
                | Unused4
                | Reserved1
                | Reserved2
                | Reserved3
        )
    }

    /// The terminal generator that closes a non-global preset zone.
    pub fn is_preset_zone_link(self) -> bool {
        self == Generator::Instrument
    }

    /// The terminal generator that closes a non-global instrument zone.
    pub fn is_instrument_zone_link(self) -> bool {
        self == Generator::SampleId
    }
}
