//! Resonant low-pass biquad.
//!
//! Coefficients are recomputed only when the modulated cutoff moves by
//! more than 5% (or the resonance changes), and the new set is reached
//! through a linear per-sample ramp sized at 40% of the render block.
//! The voice filters its mono sample before panning; the result is the
//! same as filtering each output channel.

use crate::dsp::tables;

/// Resonance ceiling in centibels.
pub const MAX_RESONANCE_CB: f64 = 960.0;

const CUTOFF_CHANGE_THRESHOLD: f64 = 0.05;
const RAMP_BLOCK_FRACTION: f64 = 0.4;

#[derive(Debug, Clone, Copy, Default)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Coefficients {
    fn lowpass(cutoff_hz: f64, resonance_cb: f64, sample_rate: f64) -> Coefficients {
        // Keep ω strictly inside (0, π).
        let cutoff = cutoff_hz.clamp(10.0, 0.475 * sample_rate);
        let omega = std::f64::consts::TAU * cutoff / sample_rate;
        // 0 cB of resonance is a Butterworth response (Q damping √2).
        let q = 10.0_f64.powf((30.1 - resonance_cb.clamp(0.0, MAX_RESONANCE_CB)) / 200.0);
        let k = 0.5 * q * omega.sin();
        let c1 = (1.0 - k) / (1.0 + k);
        let c2 = (1.0 + c1) * omega.cos();
        let c3 = (1.0 + c1 - c2) / 4.0;
        Coefficients {
            b0: c3,
            b1: 2.0 * c3,
            b2: c3,
            a1: -c2,
            a2: c1,
        }
    }

    fn step_toward(&mut self, target: &Coefficients, t: f64) {
        self.b0 += (target.b0 - self.b0) * t;
        self.b1 += (target.b1 - self.b1) * t;
        self.b2 += (target.b2 - self.b2) * t;
        self.a1 += (target.a1 - self.a1) * t;
        self.a2 += (target.a2 - self.a2) * t;
    }
}

/// One voice's low-pass filter, transposed direct form II.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    sample_rate: f64,
    ramp_length: u32,
    cutoff: f64,
    resonance: f64,
    current: Coefficients,
    target: Coefficients,
    ramp_remaining: u32,
    primed: bool,
    z1: f64,
    z2: f64,
}

impl Filter {
    pub fn configure(&mut self, sample_rate: f64, block_size: usize) {
        self.sample_rate = sample_rate;
        self.ramp_length = (block_size as f64 * RAMP_BLOCK_FRACTION) as u32;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
        self.primed = false;
        self.ramp_remaining = 0;
    }

    /// Retarget from the modulated cutoff (absolute cents) and
    /// resonance (centibels). Small cutoff changes are ignored.
    pub fn update(&mut self, cutoff_cents: f64, resonance_cb: f64) {
        let cutoff_hz = tables::cents_to_frequency(cutoff_cents);
        let resonance = resonance_cb.clamp(0.0, MAX_RESONANCE_CB);
        if self.primed {
            let cutoff_moved =
                (cutoff_hz - self.cutoff).abs() > self.cutoff * CUTOFF_CHANGE_THRESHOLD;
            let resonance_moved = (resonance - self.resonance).abs() > 1.0;
            if !cutoff_moved && !resonance_moved {
                return;
            }
            self.target = Coefficients::lowpass(cutoff_hz, resonance, self.sample_rate);
            self.ramp_remaining = self.ramp_length;
        } else {
            // First update after reset jumps straight to the target.
            self.current = Coefficients::lowpass(cutoff_hz, resonance, self.sample_rate);
            self.target = self.current;
            self.primed = true;
        }
        self.cutoff = cutoff_hz;
        self.resonance = resonance;
    }

    pub fn process(&mut self, input: f64) -> f64 {
        if self.ramp_remaining > 0 {
            let t = 1.0 / self.ramp_remaining as f64;
            self.current.step_toward(&self.target, t);
            self.ramp_remaining -= 1;
        }
        let c = &self.current;
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }
}
