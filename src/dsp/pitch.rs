//! Phase-increment math.
//!
//! Captures the static pitch picture at note-on (root key, pitch
//! correction, scale tuning, coarse/fine tune) and turns per-sample
//! modulation cents into a read-head increment. Static coarse and fine
//! tune are clamped to their generator ranges; modulator contributions
//! (pitch wheel among them) add on top unclamped.

use crate::dsp::state::VoiceState;
use crate::dsp::tables;
use crate::sf2::generator::Generator;
use crate::sf2::records::SampleHeader;

#[derive(Debug, Clone, Copy, Default)]
pub struct PitchComputer {
    root_frequency: f64,
    /// Static pitch in absolute cents, modulation not included.
    pitch: f64,
}

impl PitchComputer {
    pub fn configure(
        &mut self,
        header: &SampleHeader,
        state: &VoiceState,
        key: u8,
        sample_rate: f64,
    ) {
        let overriding = state.base(Generator::OverridingRootKey);
        let root_key = if overriding >= 0.0 {
            overriding
        } else {
            header.original_key as f64
        };
        let root_pitch = root_key * 100.0 - header.pitch_correction as f64;
        self.root_frequency =
            tables::cents_to_frequency(root_pitch) * sample_rate / header.sample_rate as f64;

        let scale = state.base(Generator::ScaleTuning).clamp(0.0, 1200.0);
        let coarse = state.base(Generator::CoarseTune).clamp(-120.0, 120.0);
        let fine = state.base(Generator::FineTune).clamp(-99.0, 99.0);
        self.pitch =
            scale * (key as f64 - root_pitch / 100.0) + root_pitch + coarse * 100.0 + fine;
    }

    /// Phase increment for this sample. `modulation_cents` is the sum
    /// of LFO, envelope, and modulator pitch contributions.
    pub fn increment(&self, modulation_cents: f64) -> f64 {
        tables::cents_to_frequency(self.pitch + modulation_cents) / self.root_frequency
    }
}
