//! Triangle LFO.
//!
//! Bipolar output in [-1, 1], starting at 0 with a rising slope. The
//! counter advances by `4·f/sampleRate` per sample (a triangle covers a
//! range of 4 per cycle) and reflects off both rails. A configured
//! delay emits 0 without advancing the phase.

#[derive(Debug, Clone, Copy, Default)]
pub struct Lfo {
    counter: f64,
    increment: f64,
    delay_remaining: u64,
    delay: u64,
}

impl Lfo {
    /// Configure from a frequency in Hz and a delay in seconds.
    pub fn configure(&mut self, frequency: f64, delay: f64, sample_rate: f64) {
        self.increment = 4.0 * frequency / sample_rate;
        self.delay = (delay.max(0.0) * sample_rate).floor() as u64;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.counter = 0.0;
        self.increment = self.increment.abs();
        self.delay_remaining = self.delay;
    }

    /// Current value without advancing.
    pub fn value(&self) -> f64 {
        if self.delay_remaining > 0 {
            0.0
        } else {
            self.counter
        }
    }

    /// Emit the current value, then advance one sample.
    pub fn next(&mut self) -> f64 {
        if self.delay_remaining > 0 {
            self.delay_remaining -= 1;
            return 0.0;
        }
        let out = self.counter;
        self.counter += self.increment;
        if self.counter >= 1.0 {
            self.counter = 2.0 - self.counter;
            self.increment = -self.increment;
        } else if self.counter <= -1.0 {
            self.counter = -2.0 - self.counter;
            self.increment = -self.increment;
        }
        out
    }
}
