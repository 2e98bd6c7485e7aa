//! One polyphonic voice.
//!
//! Composes the generator state, two envelopes, two LFOs, the pitch
//! computer, the sample read head, and the low-pass filter into a
//! stereo-sample-per-call unit. Voices live in the engine's fixed pool
//! and are reconfigured in place on every note-on.

use std::sync::Arc;

use crate::dsp::envelope::{Envelope, EnvelopeConfig, Stage};
use crate::dsp::filter::Filter;
use crate::dsp::lfo::Lfo;
use crate::dsp::pitch::PitchComputer;
use crate::dsp::sample_gen::{Bounds, Interpolation, SampleGenerator};
use crate::dsp::state::{ModContext, VoiceState};
use crate::dsp::tables;
use crate::midi::Channel;
use crate::sf2::generator::Generator;
use crate::sf2::records::SampleHeader;
use crate::sf2::sample::LoadedSample;
use crate::sf2::zone::ZonePair;

/// 1000 ‰ of sustain maps onto this much attenuation.
pub const MAX_ATTENUATION_CB: f64 = 960.0;

/// Release gain below `noiseFloor / peakMagnitude` ends the voice.
const NOISE_FLOOR: f64 = 2.0e-5;

/// `sampleModes` generator values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LoopMode {
    #[default]
    None,
    /// Mode 1: loop for as long as the envelope runs.
    Continuous,
    /// Mode 3: loop while the key is held, play out after release.
    WhileKeyPressed,
}

impl LoopMode {
    fn from_generator(value: f64) -> LoopMode {
        match value as i64 {
            1 => LoopMode::Continuous,
            3 => LoopMode::WhileKeyPressed,
            _ => LoopMode::None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Voice {
    state: VoiceState,
    vol_env: Envelope,
    mod_env: Envelope,
    mod_lfo: Lfo,
    vib_lfo: Lfo,
    pitch: PitchComputer,
    generator: SampleGenerator,
    filter: Filter,
    loop_mode: LoopMode,
    exclusive_class: u32,
    event_key: u8,
    released: bool,
    done: bool,
    peak: f64,
    loop_peak: f64,
}

impl Voice {
    /// Resolve a zone pair and arm the voice for rendering.
    #[allow(clippy::too_many_arguments)]
    pub fn configure(
        &mut self,
        pair: &ZonePair<'_>,
        key: u8,
        velocity: u8,
        header: &SampleHeader,
        sample: Arc<LoadedSample>,
        channel: &Channel,
        sample_rate: f64,
        block_size: usize,
        interpolation: Interpolation,
    ) {
        self.state.configure(pair, key, velocity);
        self.event_key = key;
        self.released = false;
        self.done = false;

        let ctx = ModContext {
            channel,
            key: self.state.key(),
            velocity: self.state.velocity(),
        };
        let m = |generator: Generator| self.state.modulated(generator, &ctx);

        self.loop_mode = LoopMode::from_generator(self.state.base(Generator::SampleModes));
        self.exclusive_class = self.state.base(Generator::ExclusiveClass).max(0.0) as u32;
        self.peak = sample.max_magnitude;
        self.loop_peak = sample.loop_max_magnitude;

        self.pitch
            .configure(header, &self.state, self.state.key(), sample_rate);
        let bounds = Bounds::from_state(header, &self.state);
        self.generator.configure(sample, bounds, interpolation);

        let key_scale = 60.0 - self.state.key() as f64;
        self.vol_env.configure(
            &EnvelopeConfig {
                delay: tables::cents_to_seconds(m(Generator::DelayVolEnvelope)),
                attack: tables::cents_to_seconds(m(Generator::AttackVolEnvelope)),
                hold: tables::cents_to_seconds(
                    m(Generator::HoldVolEnvelope)
                        + m(Generator::MidiKeyToVolEnvelopeHold) * key_scale,
                ),
                decay: tables::cents_to_seconds(
                    m(Generator::DecayVolEnvelope)
                        + m(Generator::MidiKeyToVolEnvelopeDecay) * key_scale,
                ),
                sustain: sustain_level(m(Generator::SustainVolEnvelope)),
                release: tables::cents_to_seconds(m(Generator::ReleaseVolEnvelope)),
                ..EnvelopeConfig::default()
            },
            sample_rate,
        );
        self.mod_env.configure(
            &EnvelopeConfig {
                delay: tables::cents_to_seconds(m(Generator::DelayModEnvelope)),
                attack: tables::cents_to_seconds(m(Generator::AttackModEnvelope)),
                hold: tables::cents_to_seconds(
                    m(Generator::HoldModEnvelope)
                        + m(Generator::MidiKeyToModEnvelopeHold) * key_scale,
                ),
                decay: tables::cents_to_seconds(
                    m(Generator::DecayModEnvelope)
                        + m(Generator::MidiKeyToModEnvelopeDecay) * key_scale,
                ),
                sustain: sustain_level(m(Generator::SustainModEnvelope)),
                release: tables::cents_to_seconds(m(Generator::ReleaseModEnvelope)),
                ..EnvelopeConfig::default()
            },
            sample_rate,
        );
        self.vol_env.gate_on();
        self.mod_env.gate_on();

        self.mod_lfo.configure(
            tables::cents_to_frequency(m(Generator::FrequencyModLfo)),
            tables::cents_to_seconds(m(Generator::DelayModLfo)),
            sample_rate,
        );
        self.vib_lfo.configure(
            tables::cents_to_frequency(m(Generator::FrequencyVibLfo)),
            tables::cents_to_seconds(m(Generator::DelayVibLfo)),
            sample_rate,
        );

        self.filter.configure(sample_rate, block_size);
        self.filter.update(
            m(Generator::InitialFilterCutoff),
            m(Generator::InitialFilterResonance),
        );
    }

    /// The note-on key this voice answers note-off for.
    pub fn event_key(&self) -> u8 {
        self.event_key
    }

    pub fn exclusive_class(&self) -> u32 {
        self.exclusive_class
    }

    /// Chorus and reverb send levels as [0, 1] fractions of the dry
    /// signal. The voice renders dry; a host mixer applies these.
    pub fn effect_sends(&self, channel: &Channel) -> (f64, f64) {
        let ctx = ModContext {
            channel,
            key: self.state.key(),
            velocity: self.state.velocity(),
        };
        let send = |generator: Generator| {
            (self.state.modulated(generator, &ctx) / 1000.0).clamp(0.0, 1.0)
        };
        (
            send(Generator::ChorusEffectSend),
            send(Generator::ReverbEffectSend),
        )
    }

    /// Gate both envelopes into release.
    pub fn release_key(&mut self) {
        self.released = true;
        self.vol_env.gate_off();
        self.mod_env.gate_off();
    }

    pub fn is_active(&self) -> bool {
        !self.done && !self.vol_env.is_idle() && !self.generator.is_stopped()
    }

    /// Produce one stereo sample and advance all voice-local state.
    pub fn next_sample(&mut self, channel: &Channel) -> (f64, f64) {
        let ctx = ModContext {
            channel,
            key: self.state.key(),
            velocity: self.state.velocity(),
        };
        let mod_lfo = self.mod_lfo.next();
        let vib_lfo = self.vib_lfo.next();
        let mod_env = self.mod_env.next();
        let vol_env = self.vol_env.next();
        if self.vol_env.stage() == Stage::Delay {
            return (0.0, 0.0);
        }

        let m = |generator: Generator| self.state.modulated(generator, &ctx);
        let to_pitch = |v: f64| v.clamp(-12000.0, 12000.0);

        let attenuation = tables::centibels_to_attenuation(m(Generator::InitialAttenuation));
        let dynamic_cb = MAX_ATTENUATION_CB * (1.0 - vol_env)
            + mod_lfo * -m(Generator::ModLfoToVolume);
        let gain = attenuation * tables::centibels_to_attenuation(dynamic_cb);

        // Wheel and other pitch modulators ride on fineTune; subtract
        // the static part the pitch computer already folded in.
        let pitch_cents = m(Generator::FineTune) - self.state.base(Generator::FineTune)
            + m(Generator::InitialPitch)
            + mod_lfo * to_pitch(m(Generator::ModLfoToPitch))
            + vib_lfo * to_pitch(m(Generator::VibLfoToPitch))
            + mod_env * to_pitch(m(Generator::ModEnvToPitch));
        let increment = self.pitch.increment(pitch_cents);

        let can_loop = match self.loop_mode {
            LoopMode::None => false,
            LoopMode::Continuous => true,
            LoopMode::WhileKeyPressed => !self.released,
        };
        let raw = self.generator.next(increment, can_loop);

        self.filter.update(
            m(Generator::InitialFilterCutoff)
                + mod_lfo * to_pitch(m(Generator::ModLfoToFilterCutoff))
                + mod_env * to_pitch(m(Generator::ModEnvToFilterCutoff)),
            m(Generator::InitialFilterResonance),
        );
        let filtered = self.filter.process(raw);

        let mono = filtered * gain;
        let (left, right) = tables::pan_lookup(m(Generator::Pan));

        if self.vol_env.stage() == Stage::Release {
            let peak = if self.generator.has_looped() {
                self.loop_peak
            } else {
                self.peak
            };
            if peak <= 0.0 || gain < NOISE_FLOOR / peak {
                self.done = true;
            }
        }

        (mono * left, mono * right)
    }
}

/// Sustain generators express attenuation from full scale in 0.1%
/// units: 0 is full level, 1000 is silence.
fn sustain_level(value: f64) -> f64 {
    1.0 - value.clamp(0.0, 1000.0) / 1000.0
}
