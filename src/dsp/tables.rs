//! Lookup tables and primitive DSP conversions.
//!
//! Every table is computed once at first use and is read-only afterwards,
//! so the hot render path only ever does index arithmetic. Conversions
//! follow SoundFont units: absolute cents for frequency (6900 = 440 Hz),
//! timecents for durations, centibels for attenuation.

use std::sync::LazyLock;

/// Entries in the cents-to-frequency partial table (one per cent).
const PARTIAL_SIZE: usize = 1200;
/// Entries in the centibel tables, covering [0, 1440] cB.
const CENTIBEL_SIZE: usize = 1441;
/// Entries in the pan tables, covering [-500, +500].
const PAN_SIZE: usize = 1001;
/// Entries in the quarter-wave sine table.
const SINE_SIZE: usize = 4096;
/// Rows in the cubic interpolation weight table.
pub const CUBIC_WEIGHTS_SIZE: usize = 1024;

static CENTS_PARTIAL: LazyLock<[f64; PARTIAL_SIZE]> = LazyLock::new(|| {
    let mut table = [0.0; PARTIAL_SIZE];
    for (i, v) in table.iter_mut().enumerate() {
        *v = 6.875 * 2.0_f64.powf(i as f64 / 1200.0);
    }
    table
});

static ATTENUATION: LazyLock<[f64; CENTIBEL_SIZE]> = LazyLock::new(|| {
    let mut table = [0.0; CENTIBEL_SIZE];
    for (i, v) in table.iter_mut().enumerate() {
        *v = 10.0_f64.powf(-(i as f64) / 200.0);
    }
    table
});

static GAIN: LazyLock<[f64; CENTIBEL_SIZE]> = LazyLock::new(|| {
    let mut table = [0.0; CENTIBEL_SIZE];
    for (i, v) in table.iter_mut().enumerate() {
        *v = 10.0_f64.powf(i as f64 / 200.0);
    }
    table
});

static PAN: LazyLock<[f64; PAN_SIZE]> = LazyLock::new(|| {
    let mut table = [0.0; PAN_SIZE];
    for (i, v) in table.iter_mut().enumerate() {
        *v = (i as f64 * std::f64::consts::PI / (2.0 * 1000.0)).sin();
    }
    table
});

static SINE: LazyLock<[f64; SINE_SIZE]> = LazyLock::new(|| {
    let mut table = [0.0; SINE_SIZE];
    for (i, v) in table.iter_mut().enumerate() {
        *v = (i as f64 * std::f64::consts::FRAC_PI_2 / SINE_SIZE as f64).sin();
    }
    table
});

static CUBIC_WEIGHTS: LazyLock<Vec<[f64; 4]>> = LazyLock::new(|| {
    (0..CUBIC_WEIGHTS_SIZE)
        .map(|i| {
            let x = i as f64 / CUBIC_WEIGHTS_SIZE as f64;
            let x2 = x * x;
            let x3 = x2 * x;
            [
                -0.5 * x3 + x2 - 0.5 * x,
                1.5 * x3 - 2.5 * x2 + 1.0,
                -1.5 * x3 + 2.0 * x2 + 0.5 * x,
                0.5 * x3 - 0.5 * x2,
            ]
        })
        .collect()
});

/// Convert absolute cents to a frequency in Hz. Value 0 is ≈ 8.176 Hz
/// (MIDI key 0), 6900 is 440 Hz, +1200 doubles the frequency. Negative
/// input yields 1.0.
pub fn cents_to_frequency(cents: f64) -> f64 {
    if cents < 0.0 {
        return 1.0;
    }
    let shifted = cents as i64 + 300;
    let whole = shifted / 1200;
    let partial = (shifted % 1200) as usize;
    f64::powi(2.0, whole as i32) * CENTS_PARTIAL[partial]
}

/// Convert timecents to seconds: `2^(cents / 1200)`. -12000 is ≈ 1 ms,
/// 0 is 1 s.
pub fn cents_to_seconds(cents: f64) -> f64 {
    2.0_f64.powf(cents / 1200.0)
}

/// Attenuation factor for a centibel value: `10^(-cB / 200)`. Input is
/// clamped to [0, 1440] (144 dB).
pub fn centibels_to_attenuation(centibels: f64) -> f64 {
    ATTENUATION[centibel_index(centibels)]
}

/// Gain factor for a centibel value, the reciprocal of
/// [`centibels_to_attenuation`].
pub fn centibels_to_gain(centibels: f64) -> f64 {
    GAIN[centibel_index(centibels)]
}

fn centibel_index(centibels: f64) -> usize {
    (centibels.round().clamp(0.0, (CENTIBEL_SIZE - 1) as f64)) as usize
}

/// Equal-power stereo gains for a pan position in [-500, +500].
/// -500 is hard left (1, 0), 0 is center (≈0.7071 each), +500 hard right.
pub fn pan_lookup(pan: f64) -> (f64, f64) {
    let index = (pan.round().clamp(-500.0, 500.0) + 500.0) as usize;
    (PAN[PAN_SIZE - 1 - index], PAN[index])
}

/// Table-backed sine for an argument in radians, any quadrant.
pub fn sine_lookup(radians: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let mut x = radians % tau;
    if x < 0.0 {
        x += tau;
    }
    let half_pi = std::f64::consts::FRAC_PI_2;
    let quadrant = (x / half_pi) as usize;
    let within = x % half_pi;
    let index =
        ((within / half_pi * SINE_SIZE as f64) as usize).min(SINE_SIZE - 1);
    match quadrant {
        0 => SINE[index],
        1 => SINE[SINE_SIZE - 1 - index],
        2 => -SINE[index],
        _ => -SINE[SINE_SIZE - 1 - index],
    }
}

/// The four 4-point interpolation weights for a fractional position,
/// indexed by `⌊partial · 1024⌋`.
pub fn cubic_weights(row: usize) -> &'static [f64; 4] {
    &CUBIC_WEIGHTS[row.min(CUBIC_WEIGHTS_SIZE - 1)]
}

/// Map [0, 1] to [-1, +1].
pub fn unipolar_to_bipolar(value: f64) -> f64 {
    2.0 * value - 1.0
}

/// Map [-1, +1] to [0, 1].
pub fn bipolar_to_unipolar(value: f64) -> f64 {
    0.5 * (value + 1.0)
}

/// Clamp a unipolar modulator value into [0, 1].
pub fn clamped_unipolar(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Clamp a bipolar modulator value into [-1, +1].
pub fn clamped_bipolar(value: f64) -> f64 {
    value.clamp(-1.0, 1.0)
}

/// Parabolic sine approximation over [-π, π]. Worst-case absolute error
/// against `f64::sin` is below 0.0011; used where table generation wants
/// to avoid the libm call.
pub fn parabolic_sine(radians: f64) -> f64 {
    const B: f64 = 4.0 / std::f64::consts::PI;
    const C: f64 = -4.0 / (std::f64::consts::PI * std::f64::consts::PI);
    const P: f64 = 0.225;
    let y = B * radians + C * radians * radians.abs();
    P * (y * y.abs() - y) + y
}
