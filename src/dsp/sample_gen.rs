//! Interpolated sample read head.
//!
//! The index is a split (whole, partial) pair so long samples keep full
//! precision. Reads interpolate linearly or with the 4-point cubic
//! table; neighbor reads near the loop boundary wrap so a looped
//! waveform stays continuous.

use std::sync::Arc;

use crate::dsp::state::VoiceState;
use crate::dsp::tables;
use crate::sf2::generator::Generator;
use crate::sf2::records::SampleHeader;
use crate::sf2::sample::LoadedSample;

/// Read-head interpolator choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    Linear,
    #[default]
    Cubic,
}

/// Play window in sample points, relative to the decoded buffer start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub start: u64,
    pub start_loop: u64,
    pub end_loop: u64,
    pub end: u64,
}

impl Bounds {
    /// Combine the header's window with the state's four fine+coarse
    /// offset generator pairs. Every position is clamped into the
    /// header's window, and ordering is enforced, so violated font
    /// constraints degrade instead of crashing.
    pub fn from_state(header: &SampleHeader, state: &VoiceState) -> Bounds {
        let offset = |fine: Generator, coarse: Generator| {
            (state.base(fine) + state.base(coarse) * 32768.0) as i64
        };
        let absolute = |base: u32, off: i64| {
            (base as i64 + off).clamp(header.start as i64, header.end as i64) as u64
                - header.start as u64
        };
        let start = absolute(
            header.start,
            offset(
                Generator::StartAddressOffset,
                Generator::StartAddressCoarseOffset,
            ),
        );
        let end = absolute(
            header.end,
            offset(
                Generator::EndAddressOffset,
                Generator::EndAddressCoarseOffset,
            ),
        )
        .max(start);
        let start_loop = absolute(
            header.loop_start,
            offset(
                Generator::StartLoopAddressOffset,
                Generator::StartLoopAddressCoarseOffset,
            ),
        )
        .clamp(start, end);
        let end_loop = absolute(
            header.loop_end,
            offset(
                Generator::EndLoopAddressOffset,
                Generator::EndLoopAddressCoarseOffset,
            ),
        )
        .clamp(start_loop, end);
        Bounds {
            start,
            start_loop,
            end_loop,
            end,
        }
    }

    fn has_loop(&self) -> bool {
        self.end_loop > self.start_loop
    }
}

/// One voice's read head over a decoded sample.
#[derive(Debug, Default)]
pub struct SampleGenerator {
    data: Option<Arc<LoadedSample>>,
    bounds: Bounds,
    interpolation: Interpolation,
    whole: u64,
    partial: f64,
    stopped: bool,
    looped: bool,
}

impl SampleGenerator {
    pub fn configure(
        &mut self,
        data: Arc<LoadedSample>,
        bounds: Bounds,
        interpolation: Interpolation,
    ) {
        self.whole = bounds.start;
        self.partial = 0.0;
        self.stopped = false;
        self.looped = false;
        self.bounds = bounds;
        self.interpolation = interpolation;
        self.data = Some(data);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Whether the head has wrapped the loop at least once.
    pub fn has_looped(&self) -> bool {
        self.looped
    }

    /// Fractional read position, for diagnostics and tests.
    pub fn position(&self) -> f64 {
        self.whole as f64 + self.partial
    }

    /// Read one interpolated sample at the current position, then
    /// advance by `increment`.
    pub fn next(&mut self, increment: f64, can_loop: bool) -> f64 {
        if self.stopped {
            return 0.0;
        }
        let value = self.value(can_loop);
        self.advance(increment, can_loop);
        value
    }

    fn value(&self, can_loop: bool) -> f64 {
        let Some(data) = self.data.as_ref() else {
            return 0.0;
        };
        let samples = &data.data;
        let i = self.whole as usize;
        if i >= samples.len() {
            return 0.0;
        }
        let wrap = can_loop && self.bounds.has_loop();
        let right = |index: u64| -> f64 {
            let index = if wrap && index >= self.bounds.end_loop {
                self.bounds.start_loop + (index - self.bounds.end_loop)
            } else {
                index
            };
            samples.get(index as usize).copied().unwrap_or(0.0)
        };
        match self.interpolation {
            Interpolation::Linear => {
                let a = samples[i];
                let b = right(self.whole + 1);
                a + self.partial * (b - a)
            }
            Interpolation::Cubic => {
                let left = if wrap && self.looped && self.whole == self.bounds.start_loop {
                    self.bounds.end_loop.saturating_sub(1)
                } else {
                    self.whole.saturating_sub(1)
                };
                let w = tables::cubic_weights(
                    (self.partial * tables::CUBIC_WEIGHTS_SIZE as f64) as usize,
                );
                samples.get(left as usize).copied().unwrap_or(0.0) * w[0]
                    + samples[i] * w[1]
                    + right(self.whole + 1) * w[2]
                    + right(self.whole + 2) * w[3]
            }
        }
    }

    fn advance(&mut self, increment: f64, can_loop: bool) {
        let whole_inc = increment.floor();
        self.whole += whole_inc as u64;
        self.partial += increment - whole_inc;
        if self.partial >= 1.0 {
            let carry = self.partial.floor();
            self.whole += carry as u64;
            self.partial -= carry;
        }
        if can_loop && self.bounds.has_loop() && self.whole >= self.bounds.end_loop {
            self.whole -= self.bounds.end_loop - self.bounds.start_loop;
            self.looped = true;
        } else if self.whole >= self.bounds.end {
            self.stopped = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sf2::sample::GUARD_POINTS;
    use approx::assert_abs_diff_eq;

    fn loaded(data: Vec<f64>) -> Arc<LoadedSample> {
        let mut data = data;
        let max = data.iter().fold(0.0_f64, |a, &v| a.max(v.abs()));
        data.extend(std::iter::repeat_n(0.0, GUARD_POINTS));
        Arc::new(LoadedSample {
            data,
            max_magnitude: max,
            loop_max_magnitude: max,
        })
    }

    fn ramp(len: usize) -> Vec<f64> {
        (0..len).map(|i| i as f64).collect()
    }

    #[test]
    fn linear_interpolation_on_ramp_is_exact() {
        let mut sg = SampleGenerator::default();
        sg.configure(
            loaded(ramp(64)),
            Bounds {
                start: 0,
                start_loop: 0,
                end_loop: 0,
                end: 64,
            },
            Interpolation::Linear,
        );
        assert_eq!(sg.next(1.5, false), 0.0);
        assert_abs_diff_eq!(sg.next(1.5, false), 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(sg.next(1.5, false), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn cubic_interpolation_reproduces_ramp_interior() {
        let mut sg = SampleGenerator::default();
        sg.configure(
            loaded(ramp(64)),
            Bounds {
                start: 4,
                start_loop: 4,
                end_loop: 4,
                end: 64,
            },
            Interpolation::Cubic,
        );
        // Cubic weights are exact for linear data away from edges.
        sg.next(0.25, false);
        assert_abs_diff_eq!(sg.next(0.25, false), 4.25, epsilon = 1e-9);
        assert_abs_diff_eq!(sg.next(0.25, false), 4.5, epsilon = 1e-9);
    }

    #[test]
    fn stops_past_end_without_loop() {
        let mut sg = SampleGenerator::default();
        sg.configure(
            loaded(ramp(8)),
            Bounds {
                start: 0,
                start_loop: 0,
                end_loop: 0,
                end: 8,
            },
            Interpolation::Linear,
        );
        for _ in 0..8 {
            assert!(!sg.is_stopped());
            sg.next(1.0, false);
        }
        assert!(sg.is_stopped());
        assert_eq!(sg.next(1.0, false), 0.0);
    }

    #[test]
    fn integer_loop_round_trips_exactly() {
        let mut sg = SampleGenerator::default();
        let bounds = Bounds {
            start: 0,
            start_loop: 2,
            end_loop: 12, // loop of 10
            end: 16,
        };
        sg.configure(loaded(ramp(16)), bounds, Interpolation::Linear);
        for _ in 0..4 {
            sg.next(1.0, true);
        }
        let before = sg.position();
        for _ in 0..10 {
            sg.next(1.0, true);
        }
        assert_eq!(sg.position(), before, "one loop period must return home");
        assert!(sg.has_looped());
        assert!(!sg.is_stopped());
    }

    #[test]
    fn loop_ignored_when_not_permitted() {
        let mut sg = SampleGenerator::default();
        let bounds = Bounds {
            start: 0,
            start_loop: 2,
            end_loop: 12,
            end: 16,
        };
        sg.configure(loaded(ramp(16)), bounds, Interpolation::Linear);
        for _ in 0..16 {
            sg.next(1.0, false);
        }
        assert!(sg.is_stopped());
        assert!(!sg.has_looped());
    }

    #[test]
    fn right_neighbor_wraps_at_loop_end() {
        // Loop [0, 4) over values 10, 20, 30, 40; reading at 3.5 with a
        // loop should interpolate toward the loop start (10), not 50.
        let mut sg = SampleGenerator::default();
        sg.configure(
            loaded(vec![10.0, 20.0, 30.0, 40.0, 50.0]),
            Bounds {
                start: 0,
                start_loop: 0,
                end_loop: 4,
                end: 5,
            },
            Interpolation::Linear,
        );
        sg.next(3.5, true);
        assert_abs_diff_eq!(sg.next(0.0, true), 25.0, epsilon = 1e-12);
    }

    #[test]
    fn bounds_honor_offsets_and_clamp() {
        use crate::dsp::state::VoiceState;
        use crate::sf2::generator::Amount;
        use crate::sf2::records::GeneratorRecord;
        use crate::sf2::zone::{Zone, ZonePair};

        let header = SampleHeader {
            name: "t".into(),
            start: 100,
            end: 1100,
            loop_start: 200,
            loop_end: 1000,
            sample_rate: 44100,
            original_key: 60,
            pitch_correction: 0,
            link: 0,
            kind: 1,
        };

        let gen_rec = |g: Generator, amount: i16| GeneratorRecord {
            raw_index: g.index() as u16,
            amount: Amount(amount as u16),
        };
        let iz = Zone::new(
            vec![
                gen_rec(Generator::StartAddressOffset, 50),
                gen_rec(Generator::EndAddressOffset, 9999), // clamps to header end
                gen_rec(Generator::SampleId, 0),
            ],
            vec![],
            Generator::SampleId,
        );
        let pz = Zone::new(
            vec![gen_rec(Generator::Instrument, 0)],
            vec![],
            Generator::Instrument,
        );
        let mut state = VoiceState::default();
        state.configure(
            &ZonePair {
                preset_global: None,
                preset_zone: &pz,
                instrument_global: None,
                instrument_zone: &iz,
                sample_index: 0,
            },
            60,
            100,
        );

        let bounds = Bounds::from_state(&header, &state);
        assert_eq!(bounds.start, 50);
        assert_eq!(bounds.end, 1000, "end offset clamped to header window");
        assert_eq!(bounds.start_loop, 100);
        assert_eq!(bounds.end_loop, 900);
        assert!(bounds.start <= bounds.start_loop);
        assert!(bounds.start_loop <= bounds.end_loop);
        assert!(bounds.end_loop <= bounds.end);
    }
}
