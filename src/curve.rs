//! Per-note delay and velocity curves, and the jitter source behind the
//! "random" controls.

use crate::beat::BeatClassification;
use crate::params::StrumConfig;

pub const MIN_VELOCITY: f64 = 1.0;
pub const MAX_VELOCITY: f64 = 127.0;

/// Source of uniform draws in [0, 1).
///
/// Every `rand` RNG is a `Jitter`; tests can plug in scripted sources.
pub trait Jitter {
    fn next_unit(&mut self) -> f64;
}

impl<R: rand::Rng> Jitter for R {
    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Uniform draw in [min, max). Works with min > max too (negative values
/// spread "backwards"), which a range-based sampler would reject.
pub fn random_in_range<J: Jitter + ?Sized>(jitter: &mut J, min: f64, max: f64) -> f64 {
    jitter.next_unit() * (max - min) + min
}

/// Spread `value` by ±`pct` percent. Zero percent never touches the source.
pub fn jittered<J: Jitter + ?Sized>(value: f64, pct: f64, jitter: &mut J) -> f64 {
    if pct > 0.0 {
        let spread = value * pct / 100.0;
        random_in_range(jitter, value - spread, value + spread)
    } else {
        value
    }
}

// ─── Delay ──────────────────────────────────────────────────────────────────

/// Un-randomized step delays for a stroke: the gap before note i.
///
/// Note 0 has no gap; note 1 waits `division_ms`; every later gap grows by
/// `curve` times the previous one.
#[derive(Debug, Clone)]
pub struct DelayCurve {
    division_ms: f64,
    curve: f64,
    index: usize,
    previous: f64,
}

impl DelayCurve {
    pub fn new(division_ms: f64, curve: f64) -> Self {
        Self {
            division_ms,
            curve,
            index: 0,
            previous: 0.0,
        }
    }

    pub fn from_config(config: &StrumConfig) -> Self {
        Self::new(config.division_ms, config.division_curve)
    }
}

impl Iterator for DelayCurve {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let base = match self.index {
            0 => 0.0,
            1 => self.division_ms,
            _ => self.previous + self.curve * self.previous,
        };
        self.index += 1;
        self.previous = base;
        Some(base)
    }
}

/// Cumulative offsets (ms) for `n` notes without jitter.
pub fn cumulative_offsets(division_ms: f64, curve: f64, n: usize) -> Vec<f64> {
    DelayCurve::new(division_ms, curve)
        .take(n)
        .scan(0.0, |sum, step| {
            *sum += step;
            Some(*sum)
        })
        .collect()
}

// ─── Velocity ───────────────────────────────────────────────────────────────

/// Velocity before jitter and accents: base plus `index × curve`.
pub fn curved_velocity(base: u8, index: usize, curve: f64) -> f64 {
    base as f64 + index as f64 * curve
}

/// Apply the enabled accents for this chord's beat position.
/// Down-beat and first-beat boosts stack multiplicatively.
pub fn accented_velocity(velocity: f64, beat: &BeatClassification, config: &StrumConfig) -> f64 {
    let mut v = velocity;
    if config.downbeat_accent && beat.is_down_beat {
        v *= 1.0 + config.downbeat_accent_pct / 100.0;
    }
    if config.first_beat_accent && beat.is_first_beat {
        v *= 1.0 + config.first_beat_accent_pct / 100.0;
    }
    v
}

/// Clamp into the MIDI note-on range and round to an integer velocity.
pub fn clamp_velocity(velocity: f64) -> u8 {
    if velocity.is_nan() {
        return MIN_VELOCITY as u8;
    }
    velocity.clamp(MIN_VELOCITY, MAX_VELOCITY).round() as u8
}
