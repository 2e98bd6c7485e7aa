//! DAHDSR envelope generator.
//!
//! Six stages driven by one recurrence: `v' = clamp(v·α + β, 0, 1)`,
//! one step per sample. Attack converges toward `1 + κ` so it crosses
//! 1.0 exactly when its duration expires; decay and release converge
//! past their targets the same way. Zero-duration stages are skipped,
//! except sustain, which only a gate-off leaves.

/// Default curvature κ. Smaller values make attack/decay more linear.
pub const DEFAULT_CURVATURE: f64 = 0.01;

const CURVATURE_MIN: f64 = 1e-9;
const CURVATURE_MAX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Delay,
    Attack,
    Hold,
    Decay,
    Sustain,
    Release,
}

/// Stage timing in seconds plus the sustain level, as resolved from the
/// generator state.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeConfig {
    pub delay: f64,
    pub attack: f64,
    pub hold: f64,
    pub decay: f64,
    /// Sustain level in [0, 1].
    pub sustain: f64,
    pub release: f64,
    pub curvature: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        EnvelopeConfig {
            delay: 0.0,
            attack: 0.0,
            hold: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 0.0,
            curvature: DEFAULT_CURVATURE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Coeffs {
    alpha: f64,
    beta: f64,
    duration: u64,
}

impl Coeffs {
    /// α = exp(−ln((1+κ)/κ)/duration); β aims the recurrence at
    /// `aim` so the actual target is crossed, not approached.
    fn new(duration: u64, curvature: f64, aim: f64) -> Coeffs {
        if duration == 0 {
            return Coeffs::default();
        }
        let alpha = (-((1.0 + curvature) / curvature).ln() / duration as f64).exp();
        Coeffs {
            alpha,
            beta: aim * (1.0 - alpha),
            duration,
        }
    }
}

/// One envelope instance, reused across voice configurations.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    stage: Option<StageState>,
    delay: u64,
    attack: Coeffs,
    hold: u64,
    decay: Coeffs,
    sustain: f64,
    release: Coeffs,
    value: f64,
}

#[derive(Debug, Clone, Copy)]
struct StageState {
    stage: Stage,
    remaining: u64,
}

impl Envelope {
    pub fn configure(&mut self, config: &EnvelopeConfig, sample_rate: f64) {
        let curvature = config.curvature.clamp(CURVATURE_MIN, CURVATURE_MAX);
        let samples = |seconds: f64| (seconds.max(0.0) * sample_rate).floor() as u64;
        let sustain = config.sustain.clamp(0.0, 1.0);
        self.delay = samples(config.delay);
        self.attack = Coeffs::new(samples(config.attack), curvature, 1.0 + curvature);
        self.hold = samples(config.hold);
        self.decay = Coeffs::new(samples(config.decay), curvature, sustain - curvature);
        self.sustain = sustain;
        self.release = Coeffs::new(samples(config.release), curvature, -curvature);
        self.stage = None;
        self.value = 0.0;
    }

    /// Start the envelope from the top.
    pub fn gate_on(&mut self) {
        self.value = 0.0;
        self.stage = Some(StageState {
            stage: Stage::Delay,
            remaining: self.delay,
        });
    }

    /// Jump to release from any non-idle stage.
    pub fn gate_off(&mut self) {
        if self.stage.is_some() {
            self.stage = Some(StageState {
                stage: Stage::Release,
                remaining: self.release.duration,
            });
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage.map_or(Stage::Idle, |s| s.stage)
    }

    pub fn is_idle(&self) -> bool {
        self.stage.is_none()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Advance one sample and return the new value.
    pub fn next(&mut self) -> f64 {
        loop {
            let Some(state) = self.stage.as_mut() else {
                return 0.0;
            };
            match state.stage {
                // Never stored in a live StageState; settle to idle.
                Stage::Idle => {
                    self.stage = None;
                    return 0.0;
                }
                Stage::Delay => {
                    if state.remaining > 0 {
                        state.remaining -= 1;
                        self.value = 0.0;
                        return 0.0;
                    }
                    *state = StageState {
                        stage: Stage::Attack,
                        remaining: self.attack.duration,
                    };
                }
                Stage::Attack => {
                    if state.remaining > 0 {
                        state.remaining -= 1;
                        self.value =
                            (self.value * self.attack.alpha + self.attack.beta).clamp(0.0, 1.0);
                        return self.value;
                    }
                    // The recurrence crosses 1 exactly at expiry.
                    self.value = 1.0;
                    *state = StageState {
                        stage: Stage::Hold,
                        remaining: self.hold,
                    };
                }
                Stage::Hold => {
                    if state.remaining > 0 {
                        state.remaining -= 1;
                        self.value = 1.0;
                        return 1.0;
                    }
                    *state = StageState {
                        stage: Stage::Decay,
                        remaining: self.decay.duration,
                    };
                }
                Stage::Decay => {
                    if state.remaining > 0 {
                        state.remaining -= 1;
                        self.value =
                            (self.value * self.decay.alpha + self.decay.beta).clamp(0.0, 1.0);
                        if self.value <= self.sustain {
                            self.value = self.sustain;
                            state.stage = Stage::Sustain;
                        }
                        return self.value;
                    }
                    state.stage = Stage::Sustain;
                }
                Stage::Sustain => {
                    self.value = self.sustain;
                    return self.value;
                }
                Stage::Release => {
                    self.value = self.value * self.release.alpha + self.release.beta;
                    if self.value <= 0.0 || self.release.duration == 0 {
                        self.value = 0.0;
                        self.stage = None;
                    }
                    return self.value;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn envelope(config: EnvelopeConfig) -> Envelope {
        let mut env = Envelope::default();
        env.configure(&config, 100.0);
        env.gate_on();
        env
    }

    #[test]
    fn idle_until_gated() {
        let mut env = Envelope::default();
        env.configure(&EnvelopeConfig::default(), 100.0);
        assert!(env.is_idle());
        assert_eq!(env.next(), 0.0);
    }

    #[test]
    fn delay_emits_zero() {
        let mut env = envelope(EnvelopeConfig {
            delay: 0.05, // 5 samples at 100 Hz
            attack: 0.1,
            ..EnvelopeConfig::default()
        });
        for _ in 0..5 {
            assert_eq!(env.next(), 0.0);
            assert_eq!(env.stage(), Stage::Delay);
        }
        assert!(env.next() > 0.0, "attack starts after delay");
    }

    #[test]
    fn attack_is_monotone_and_caps_at_one() {
        let mut env = envelope(EnvelopeConfig {
            attack: 0.1, // 10 samples
            hold: 0.1,
            ..EnvelopeConfig::default()
        });
        let mut prev = 0.0;
        for _ in 0..10 {
            let v = env.next();
            assert!(v > prev, "attack must rise, got {v} after {prev}");
            assert!(v <= 1.0);
            prev = v;
        }
        // Hold emits exactly 1.
        assert_eq!(env.next(), 1.0);
        assert_eq!(env.stage(), Stage::Hold);
    }

    #[test]
    fn zero_duration_stages_skip_to_sustain() {
        let mut env = envelope(EnvelopeConfig {
            sustain: 0.5,
            ..EnvelopeConfig::default()
        });
        assert_eq!(env.next(), 0.5);
        assert_eq!(env.stage(), Stage::Sustain);
    }

    #[test]
    fn decay_settles_on_sustain() {
        let mut env = envelope(EnvelopeConfig {
            decay: 0.2, // 20 samples
            sustain: 0.4,
            ..EnvelopeConfig::default()
        });
        let mut last = 1.0;
        for _ in 0..40 {
            last = env.next();
        }
        assert_abs_diff_eq!(last, 0.4, epsilon = 1e-6);
        assert_eq!(env.stage(), Stage::Sustain);
    }

    #[test]
    fn gate_off_releases_to_idle() {
        let mut env = envelope(EnvelopeConfig {
            sustain: 0.8,
            release: 0.1, // 10 samples
            ..EnvelopeConfig::default()
        });
        env.next();
        env.gate_off();
        assert_eq!(env.stage(), Stage::Release);
        let mut steps = 0;
        while !env.is_idle() {
            let v = env.next();
            assert!(v < 0.8);
            steps += 1;
            assert!(steps < 100, "release never reached idle");
        }
        // Crossed zero at roughly the configured duration.
        assert!((8..=15).contains(&steps), "release took {steps} samples");
        assert_eq!(env.next(), 0.0);
    }

    #[test]
    fn gate_off_with_zero_release_is_immediate() {
        let mut env = envelope(EnvelopeConfig::default());
        env.next();
        env.gate_off();
        assert_eq!(env.next(), 0.0);
        assert!(env.is_idle());
    }

    #[test]
    fn gate_off_during_attack_releases_from_current_value() {
        let mut env = envelope(EnvelopeConfig {
            attack: 0.5,
            release: 0.5,
            ..EnvelopeConfig::default()
        });
        for _ in 0..10 {
            env.next();
        }
        let at_release = env.value();
        assert!(at_release > 0.0 && at_release < 1.0);
        env.gate_off();
        let v = env.next();
        assert!(v < at_release, "release must fall from {at_release}, got {v}");
    }
}
