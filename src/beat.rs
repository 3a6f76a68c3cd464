//! Beat classification for the follow-beat strum modes and the accents.
//!
//! Positions are host musical time in beats, 1-based (beat 1.0 is the start
//! of the song). The down-beat arithmetic below is a fixed, compatibility-
//! tested algorithm: keep the formulas as they are, including the quirks
//! (e.g. the 1/8 grid counts the sixteenth after the beat as a down beat).

use crate::params::StrumDirection;
use log::warn;
use serde::{Deserialize, Serialize};

/// How close (in beats) a chord must land to the bar line to count as "first beat".
pub const FIRST_BEAT_TOLERANCE: f64 = 0.1;

/// Ticks per beat used when snapping the position up to the grid.
const GRID_TICKS: f64 = 128.0;

/// Which grid the follow-beat modes listen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatGrid {
    Eighths,
    Sixteenths,
}

impl StrumDirection {
    pub fn beat_grid(&self) -> Option<BeatGrid> {
        match self {
            StrumDirection::FollowEighths => Some(BeatGrid::Eighths),
            StrumDirection::FollowSixteenths => Some(BeatGrid::Sixteenths),
            _ => None,
        }
    }
}

/// Result of classifying one block position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatClassification {
    pub is_down_beat: bool,
    pub is_first_beat: bool,
}

/// Classify a block start position against the grid and the bar line.
pub fn classify(position: f64, meter_numerator: u32, grid: BeatGrid) -> BeatClassification {
    let meter = effective_meter(meter_numerator);
    BeatClassification {
        is_down_beat: is_down_beat(position, meter, grid),
        is_first_beat: is_first_beat(position, meter),
    }
}

/// Snap the position up to the next 1/(meter·128) tick, take the fractional
/// beat, and test it against the down range of the chosen grid.
pub fn is_down_beat(position: f64, meter_numerator: u32, grid: BeatGrid) -> bool {
    let meter = effective_meter(meter_numerator) as f64;
    let division = meter * GRID_TICKS;
    let mut division_length = 1.0 / (division / GRID_TICKS);
    let beat_to_schedule = (position * division).ceil() / division;
    let mut deviation = beat_to_schedule - beat_to_schedule.floor();

    match grid {
        BeatGrid::Eighths => division_length *= 2.0,
        BeatGrid::Sixteenths => {
            if deviation >= 0.5 {
                deviation -= 0.5;
            }
        }
    }
    let down_range = division_length - division_length / 2.0;

    deviation <= down_range || deviation >= down_range * 3.0
}

/// Within [`FIRST_BEAT_TOLERANCE`] of beat 1, or of beat `meter + 1`,
/// after folding the position into a four-beat window.
pub fn is_first_beat(position: f64, meter_numerator: u32) -> bool {
    let meter = effective_meter(meter_numerator) as f64;
    // `%` truncates toward zero, same as the host's remainder
    let start_beat = position % 4.0;
    start_beat <= 1.0 + FIRST_BEAT_TOLERANCE || start_beat >= meter + 1.0 - FIRST_BEAT_TOLERANCE
}

fn effective_meter(meter_numerator: u32) -> u32 {
    if meter_numerator == 0 {
        warn!("meter numerator 0 reported by host, assuming 1");
        1
    } else {
        meter_numerator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eighths_on_and_off_beat() {
        assert!(is_down_beat(1.0, 4, BeatGrid::Eighths));
        assert!(is_down_beat(3.0, 4, BeatGrid::Eighths));
        assert!(!is_down_beat(1.5, 4, BeatGrid::Eighths));
        assert!(!is_down_beat(2.4, 4, BeatGrid::Eighths));
    }

    #[test]
    fn test_eighths_window_edges() {
        // down range is a quarter beat either side of the beat
        assert!(is_down_beat(2.25, 4, BeatGrid::Eighths));
        assert!(is_down_beat(2.75, 4, BeatGrid::Eighths));
        assert!(!is_down_beat(2.3, 4, BeatGrid::Eighths));
        assert!(!is_down_beat(2.7, 4, BeatGrid::Eighths));
    }

    #[test]
    fn test_sixteenths_fold_half_beats() {
        assert!(is_down_beat(1.0, 4, BeatGrid::Sixteenths));
        assert!(is_down_beat(1.5, 4, BeatGrid::Sixteenths));
        assert!(!is_down_beat(1.25, 4, BeatGrid::Sixteenths));
        assert!(!is_down_beat(1.75, 4, BeatGrid::Sixteenths));
        // 0.45 folds to nothing (< 0.5), lands in the wrap-around window
        assert!(is_down_beat(1.45, 4, BeatGrid::Sixteenths));
    }

    #[test]
    fn test_position_snaps_up_to_grid() {
        // just before the beat snaps onto it
        assert!(is_down_beat(1.9999, 4, BeatGrid::Sixteenths));
    }

    #[test]
    fn test_three_four_eighths() {
        // 3/4: divisionLength = 2/3, down range = 1/3
        assert!(is_down_beat(2.0, 3, BeatGrid::Eighths));
        assert!(is_down_beat(2.3, 3, BeatGrid::Eighths));
        assert!(!is_down_beat(2.5, 3, BeatGrid::Eighths));
    }

    #[test]
    fn test_first_beat() {
        assert!(is_first_beat(1.0, 4));
        assert!(is_first_beat(1.05, 4));
        assert!(is_first_beat(5.0, 4));
        assert!(!is_first_beat(2.0, 4));
        assert!(!is_first_beat(3.0, 4));
        assert!(!is_first_beat(1.2, 4));
    }

    #[test]
    fn test_first_beat_upper_window() {
        // meter 2: second clause catches 2.9..4
        assert!(is_first_beat(2.95, 2));
        assert!(!is_first_beat(2.5, 2));
    }

    #[test]
    fn test_zero_meter_does_not_produce_nan() {
        let c = classify(1.0, 0, BeatGrid::Eighths);
        assert!(c.is_down_beat);
        assert!(c.is_first_beat);
    }

    #[test]
    fn test_classify_combines_both() {
        let c = classify(2.5, 4, BeatGrid::Eighths);
        assert_eq!(
            c,
            BeatClassification {
                is_down_beat: false,
                is_first_beat: false
            }
        );
    }
}
