//! Per-voice generator state and the modulation matrix.
//!
//! Each of the 60 generator slots holds an instrument-level `value`, a
//! preset-level `adjustment`, and the list of modulators targeting it.
//! `modulated()` is the only read the render path uses:
//! `value + adjustment + Σ modulator outputs`.
//!
//! Application order at note-on: defaults, global instrument zone,
//! matching instrument zone (both write `value`), global preset zone,
//! matching preset zone (both add to `adjustment`), then the modulator
//! linking pass.

use crate::midi::Channel;
use crate::sf2::generator::{Generator, GENERATOR_COUNT};
use crate::sf2::modulator::{default_modulators, Destination, SourceKind, SourceSpec, Transform};
use crate::sf2::records::ModulatorRecord;
use crate::sf2::zone::{Zone, ZonePair};

/// Everything a modulator source can read, borrowed per sample.
#[derive(Clone, Copy)]
pub struct ModContext<'a> {
    pub channel: &'a Channel,
    pub key: u8,
    pub velocity: u8,
}

/// One installed modulator.
#[derive(Debug, Clone)]
struct Modulator {
    source: SourceSpec,
    amount_source: SourceSpec,
    destination: Option<Destination>,
    amount: f64,
    transform: Transform,
    /// Batch the modulator arrived in; links only resolve within one.
    origin: u16,
    /// Index within its batch, the target of link destinations.
    local_index: u16,
    /// Indices of modulators whose output feeds this one's source.
    linked_sources: Vec<usize>,
    valid: bool,
}

impl Modulator {
    fn from_record(record: &ModulatorRecord, origin: u16, local_index: u16) -> Self {
        Modulator {
            source: SourceSpec::new(record.source),
            amount_source: SourceSpec::new(record.amount_source),
            destination: Destination::decode(record.destination),
            amount: record.amount as f64,
            transform: Transform::decode(record.transform),
            origin,
            local_index,
            linked_sources: Vec::new(),
            valid: true,
        }
    }

    /// Identical source, destination, and amount-source supersede.
    fn same_key(&self, other: &Modulator) -> bool {
        self.source == other.source
            && self.amount_source == other.amount_source
            && self.destination == other.destination
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    value: f64,
    adjustment: f64,
    mods: Vec<usize>,
}

/// The resolved generator state of one voice.
#[derive(Debug)]
pub struct VoiceState {
    slots: Vec<Slot>,
    modulators: Vec<Modulator>,
    key: u8,
    velocity: u8,
    next_origin: u16,
}

impl Default for VoiceState {
    fn default() -> Self {
        VoiceState {
            slots: vec![Slot::default(); GENERATOR_COUNT],
            modulators: Vec::new(),
            key: 0,
            velocity: 0,
            next_origin: 0,
        }
    }
}

impl VoiceState {
    /// Resolve a zone pair for a note-on event. Forced-key and
    /// forced-velocity generators replace the event values afterwards.
    pub fn configure(&mut self, pair: &ZonePair<'_>, key: u8, velocity: u8) {
        self.set_defaults();
        if let Some(zone) = pair.instrument_global {
            self.apply(zone);
        }
        self.apply(pair.instrument_zone);
        if let Some(zone) = pair.preset_global {
            self.refine(zone);
        }
        self.refine(pair.preset_zone);
        self.link_modulators();

        self.key = forced_or(self.base(Generator::ForcedMidiKey), key);
        self.velocity = forced_or(self.base(Generator::ForcedMidiVelocity), velocity);
    }

    fn set_defaults(&mut self) {
        for (generator, slot) in Generator::ALL.iter().zip(self.slots.iter_mut()) {
            slot.value = generator.default_value();
            slot.adjustment = 0.0;
            slot.mods.clear();
        }
        self.modulators.clear();
        self.next_origin = 1;
        for (i, record) in default_modulators().iter().enumerate() {
            self.install(Modulator::from_record(record, 0, i as u16));
        }
    }

    /// Instrument-level: write absolute values.
    fn apply(&mut self, zone: &Zone) {
        for record in zone.generators() {
            let Some(generator) = record.generator() else {
                continue;
            };
            if matches!(generator, Generator::KeyRange | Generator::VelocityRange) {
                continue;
            }
            self.slots[generator.index()].value = record.amount.value_for(generator);
        }
        self.install_zone_modulators(zone);
    }

    /// Preset-level: add relative adjustments, for preset-available
    /// generators only.
    fn refine(&mut self, zone: &Zone) {
        for record in zone.generators() {
            let Some(generator) = record.generator() else {
                continue;
            };
            if !generator.is_available_in_preset()
                || matches!(generator, Generator::KeyRange | Generator::VelocityRange)
            {
                continue;
            }
            self.slots[generator.index()].adjustment += record.amount.value_for(generator);
        }
        self.install_zone_modulators(zone);
    }

    fn install_zone_modulators(&mut self, zone: &Zone) {
        let origin = self.next_origin;
        self.next_origin += 1;
        for (i, record) in zone.modulators().iter().enumerate() {
            self.install(Modulator::from_record(record, origin, i as u16));
        }
    }

    fn install(&mut self, modulator: Modulator) {
        for earlier in &mut self.modulators {
            if earlier.valid && earlier.same_key(&modulator) {
                earlier.valid = false;
            }
        }
        let index = self.modulators.len();
        if let Some(Destination::Generator(generator)) = modulator.destination {
            self.slots[generator.index()].mods.push(index);
        }
        self.modulators.push(modulator);
    }

    /// Wire link sinks (source spec "link") to the modulators whose
    /// destination names them, within the same batch. A sink nothing
    /// feeds, or that feeds itself, is invalid.
    fn link_modulators(&mut self) {
        for sink in 0..self.modulators.len() {
            if self.modulators[sink].source.kind() != SourceKind::Link {
                continue;
            }
            let origin = self.modulators[sink].origin;
            let local = self.modulators[sink].local_index;
            let sources: Vec<usize> = self
                .modulators
                .iter()
                .enumerate()
                .filter(|(i, m)| {
                    *i != sink
                        && m.valid
                        && m.origin == origin
                        && m.destination == Some(Destination::Link(local))
                })
                .map(|(i, _)| i)
                .collect();
            if sources.is_empty() {
                self.modulators[sink].valid = false;
            } else {
                self.modulators[sink].linked_sources = sources;
            }
        }
    }

    /// The static part of a slot, for configure-time reads.
    pub fn base(&self, generator: Generator) -> f64 {
        let slot = &self.slots[generator.index()];
        slot.value + slot.adjustment
    }

    /// The fully modulated slot value.
    pub fn modulated(&self, generator: Generator, ctx: &ModContext<'_>) -> f64 {
        let slot = &self.slots[generator.index()];
        let mut total = slot.value + slot.adjustment;
        for &index in &slot.mods {
            total += evaluate(&self.modulators, index, ctx, 0);
        }
        total
    }

    /// Effective key after forced-key resolution.
    pub fn key(&self) -> u8 {
        self.key
    }

    /// Effective velocity after forced-velocity resolution.
    pub fn velocity(&self) -> u8 {
        self.velocity
    }
}

fn forced_or(forced: f64, event: u8) -> u8 {
    if forced >= 0.0 {
        (forced as i64).clamp(0, 127) as u8
    } else {
        event
    }
}

/// Link chains deeper than this are treated as cycles and cut off.
const MAX_LINK_DEPTH: u8 = 8;

fn evaluate(modulators: &[Modulator], index: usize, ctx: &ModContext<'_>, depth: u8) -> f64 {
    let m = &modulators[index];
    if !m.valid || depth > MAX_LINK_DEPTH {
        return 0.0;
    }
    let raw = match m.source.kind() {
        SourceKind::None | SourceKind::Unsupported => return 0.0,
        // Linked outputs sum onto the controller scale before curving.
        SourceKind::Link => m
            .linked_sources
            .iter()
            .map(|&i| evaluate(modulators, i, ctx, depth + 1))
            .sum::<f64>()
            .clamp(0.0, 127.0),
        _ => curve_input(m.source, ctx),
    };
    let primary = m.source.transform(raw);
    let factor = match m.amount_source.kind() {
        SourceKind::None => 1.0,
        SourceKind::Link | SourceKind::Unsupported => return 0.0,
        _ => m.amount_source.transform(curve_input(m.amount_source, ctx)),
    };
    m.transform.apply(m.amount * primary * factor)
}

/// A source's current value on the [0, 127] curve scale.
fn source_value(kind: SourceKind, ctx: &ModContext<'_>) -> f64 {
    match kind {
        SourceKind::NoteOnVelocity => ctx.velocity as f64,
        SourceKind::NoteOnKey => ctx.key as f64,
        SourceKind::KeyPressure => ctx.channel.key_pressure(ctx.key) as f64,
        SourceKind::ChannelPressure => ctx.channel.channel_pressure() as f64,
        // 14-bit wheel position folded onto the curve scale so that
        // center (8192) lands exactly on the bipolar zero.
        SourceKind::PitchWheel => ctx.channel.pitch_wheel() as f64 * 127.0 / 16384.0,
        SourceKind::PitchWheelSensitivity => ctx.channel.pitch_wheel_sensitivity() as f64,
        SourceKind::ContinuousControl(cc) => ctx.channel.continuous_control(cc) as f64,
        SourceKind::None | SourceKind::Unsupported | SourceKind::Link => 0.0,
    }
}

/// A source's position on the curve scale, adjusted for polarity. 7-bit
/// values feeding a bipolar curve are folded the same way as the wheel
/// so that controller center (64) lands exactly on the bipolar zero.
fn curve_input(spec: SourceSpec, ctx: &ModContext<'_>) -> f64 {
    let raw = source_value(spec.kind(), ctx);
    match spec.kind() {
        SourceKind::PitchWheel => raw,
        _ if spec.is_bipolar() => raw * 127.0 / 128.0,
        _ => raw,
    }
}
