//! Strum parameters: the ten host-visible controls and their serializable snapshot.
//!
//! The host addresses controls by display name ("Strum Division", ...), so the
//! table in [`PARAMETERS`] is the single source of names, ranges and defaults.
//! `StrumConfig` is the per-block snapshot the engine reads.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;

/// How the chord is ordered before it is played.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StrumDirection {
    /// Ascending pitch, as sorted
    Down,
    /// Descending pitch
    Up,
    /// Flip every chord, starting with Down
    Alternate,
    /// Down on eighth-note down beats, Up otherwise
    FollowEighths,
    /// Down on sixteenth-note down beats, Up otherwise
    FollowSixteenths,
}

impl StrumDirection {
    pub const ALL: [StrumDirection; 5] = [
        StrumDirection::Down,
        StrumDirection::Up,
        StrumDirection::Alternate,
        StrumDirection::FollowEighths,
        StrumDirection::FollowSixteenths,
    ];

    /// Menu index as the host reports it. Anything outside 0–4 is `None`.
    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn index(&self) -> i32 {
        match self {
            StrumDirection::Down => 0,
            StrumDirection::Up => 1,
            StrumDirection::Alternate => 2,
            StrumDirection::FollowEighths => 3,
            StrumDirection::FollowSixteenths => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StrumDirection::Down => "Down",
            StrumDirection::Up => "Up",
            StrumDirection::Alternate => "Alternate : Always",
            StrumDirection::FollowEighths => "Follow Beats 1/8",
            StrumDirection::FollowSixteenths => "Follow Beats 1/16",
        }
    }
}

impl fmt::Display for StrumDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Parameter table ────────────────────────────────────────────────────────

/// Declaration of one host-visible control.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub unit: &'static str,
}

impl ParamSpec {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

pub const STRUM_DIRECTION: &str = "Strum Direction";
pub const STRUM_DIVISION: &str = "Strum Division";
pub const STRUM_DIVISION_CURVE: &str = "Strum Division Curve";
pub const STRUM_RANDOM_DIVISION: &str = "Strum Random Division";
pub const STRUM_VELOCITY_CURVE: &str = "Strum Velocity Curve";
pub const STRUM_RANDOM_VELOCITY: &str = "Strum Random Velocity";
pub const DOWNBEAT_ACCENT: &str = "Downbeat Accent";
pub const DOWNBEAT_ACCENT_AMOUNT: &str = "Downbeat Accent Amount";
pub const FIRST_BEAT_ACCENT: &str = "First Beat Accent";
pub const FIRST_BEAT_ACCENT_AMOUNT: &str = "First Beat Accent Amount";

pub const PARAMETERS: [ParamSpec; 10] = [
    ParamSpec { name: STRUM_DIRECTION, min: 0.0, max: 4.0, default: 0.0, unit: "" },
    ParamSpec { name: STRUM_DIVISION, min: 1.0, max: 500.0, default: 10.0, unit: "ms" },
    ParamSpec { name: STRUM_DIVISION_CURVE, min: -0.5, max: 0.5, default: 0.0, unit: "" },
    ParamSpec { name: STRUM_RANDOM_DIVISION, min: 0.0, max: 100.0, default: 0.0, unit: "%" },
    ParamSpec { name: STRUM_VELOCITY_CURVE, min: -20.0, max: 20.0, default: 0.0, unit: "" },
    ParamSpec { name: STRUM_RANDOM_VELOCITY, min: 0.0, max: 50.0, default: 0.0, unit: "%" },
    ParamSpec { name: DOWNBEAT_ACCENT, min: 0.0, max: 1.0, default: 0.0, unit: "" },
    ParamSpec { name: DOWNBEAT_ACCENT_AMOUNT, min: 0.0, max: 50.0, default: 0.0, unit: "%" },
    ParamSpec { name: FIRST_BEAT_ACCENT, min: 0.0, max: 1.0, default: 0.0, unit: "" },
    ParamSpec { name: FIRST_BEAT_ACCENT_AMOUNT, min: 0.0, max: 50.0, default: 0.0, unit: "%" },
];

/// Look up a control declaration by its host-visible name.
pub fn param_spec(name: &str) -> Option<&'static ParamSpec> {
    PARAMETERS.iter().find(|p| p.name == name)
}

// ─── Config snapshot ────────────────────────────────────────────────────────

/// Snapshot of all ten controls, read once per processing block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrumConfig {
    /// Raw direction selector (menu index). Kept raw so a bad value from the
    /// host can be reported instead of silently mapped.
    pub direction: i32,
    /// Gap between the first and second note, ms
    pub division_ms: f64,
    /// Per-step growth of the gap: negative speeds the stroke up
    pub division_curve: f64,
    /// Gap jitter, percent of the step
    pub random_division_pct: f64,
    /// Velocity added per note index
    pub velocity_curve: f64,
    /// Velocity jitter, percent
    pub random_velocity_pct: f64,
    pub downbeat_accent: bool,
    pub downbeat_accent_pct: f64,
    pub first_beat_accent: bool,
    pub first_beat_accent_pct: f64,
}

impl Default for StrumConfig {
    fn default() -> Self {
        Self {
            direction: 0,
            division_ms: 10.0,
            division_curve: 0.0,
            random_division_pct: 0.0,
            velocity_curve: 0.0,
            random_velocity_pct: 0.0,
            downbeat_accent: false,
            downbeat_accent_pct: 0.0,
            first_beat_accent: false,
            first_beat_accent_pct: 0.0,
        }
    }
}

impl StrumConfig {
    pub fn with_direction(mut self, direction: StrumDirection) -> Self {
        self.direction = direction.index();
        self
    }

    /// Parsed direction, `None` if the selector is out of range.
    pub fn direction_mode(&self) -> Option<StrumDirection> {
        StrumDirection::from_index(self.direction)
    }

    /// Read a control by host-visible name. Booleans read as 0.0 / 1.0.
    pub fn get(&self, name: &str) -> Result<f64, String> {
        let value = match name {
            STRUM_DIRECTION => self.direction as f64,
            STRUM_DIVISION => self.division_ms,
            STRUM_DIVISION_CURVE => self.division_curve,
            STRUM_RANDOM_DIVISION => self.random_division_pct,
            STRUM_VELOCITY_CURVE => self.velocity_curve,
            STRUM_RANDOM_VELOCITY => self.random_velocity_pct,
            DOWNBEAT_ACCENT => bool_value(self.downbeat_accent),
            DOWNBEAT_ACCENT_AMOUNT => self.downbeat_accent_pct,
            FIRST_BEAT_ACCENT => bool_value(self.first_beat_accent),
            FIRST_BEAT_ACCENT_AMOUNT => self.first_beat_accent_pct,
            _ => return Err(format!("unknown parameter: {}", name)),
        };
        Ok(value)
    }

    /// Set a control by host-visible name, clamped to its declared range.
    /// Menu and switch controls round to the nearest step.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), String> {
        let spec = param_spec(name).ok_or_else(|| format!("unknown parameter: {}", name))?;
        if !value.is_finite() {
            return Err(format!("{}: value must be finite", name));
        }
        let v = spec.clamp(value);
        match name {
            STRUM_DIRECTION => self.direction = v.round() as i32,
            STRUM_DIVISION => self.division_ms = v,
            STRUM_DIVISION_CURVE => self.division_curve = v,
            STRUM_RANDOM_DIVISION => self.random_division_pct = v,
            STRUM_VELOCITY_CURVE => self.velocity_curve = v,
            STRUM_RANDOM_VELOCITY => self.random_velocity_pct = v,
            DOWNBEAT_ACCENT => self.downbeat_accent = v >= 0.5,
            DOWNBEAT_ACCENT_AMOUNT => self.downbeat_accent_pct = v,
            FIRST_BEAT_ACCENT => self.first_beat_accent = v >= 0.5,
            FIRST_BEAT_ACCENT_AMOUNT => self.first_beat_accent_pct = v,
            _ => return Err(format!("unknown parameter: {}", name)),
        }
        Ok(())
    }

    /// Apply a `"Name=value"` assignment, as given on the command line.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<(), String> {
        let (name, value) = assignment
            .split_once('=')
            .ok_or_else(|| format!("expected Name=value, got {:?}", assignment))?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|e| format!("{}: bad value {:?}: {}", name.trim(), value.trim(), e))?;
        self.set(name.trim(), value)
    }

    /// Copy with every numeric control pulled into its declared range.
    /// The direction selector is left alone; the engine reports bad selectors.
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        for spec in PARAMETERS.iter().filter(|p| p.name != STRUM_DIRECTION) {
            // get() only fails on unknown names; every table name is known
            let Ok(raw) = self.get(spec.name) else { continue };
            let fixed = if raw.is_finite() { spec.clamp(raw) } else { spec.default };
            if fixed != raw {
                warn!("{} = {} out of range, using {}", spec.name, raw, fixed);
                let _ = out.set(spec.name, fixed);
            }
        }
        out
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, String> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| format!("read config {:?}: {}", path, e))?;
        let config: StrumConfig = serde_json::from_str(&data)
            .map_err(|e| format!("parse config {:?}: {}", path, e))?;
        info!("Loaded strum config from {:?}", path);
        Ok(config.sanitized())
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, json)?;
        info!("Strum config saved to {:?}", path);
        Ok(())
    }
}

impl fmt::Display for StrumConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction_mode() {
            Some(d) => d.name().to_string(),
            None => format!("invalid({})", self.direction),
        };
        write!(
            f,
            "dir={}  div={:.0}ms curve={:+.2} rnd={:.0}%  vel curve={:+.0} rnd={:.0}%",
            dir,
            self.division_ms,
            self.division_curve,
            self.random_division_pct,
            self.velocity_curve,
            self.random_velocity_pct,
        )?;
        if self.downbeat_accent {
            write!(f, "  downbeat +{:.0}%", self.downbeat_accent_pct)?;
        }
        if self.first_beat_accent {
            write!(f, "  first beat +{:.0}%", self.first_beat_accent_pct)?;
        }
        Ok(())
    }
}

fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_table() {
        let config = StrumConfig::default();
        for spec in PARAMETERS.iter() {
            assert_eq!(config.get(spec.name).unwrap(), spec.default, "{}", spec.name);
        }
    }

    #[test]
    fn test_direction_from_index() {
        assert_eq!(StrumDirection::from_index(0), Some(StrumDirection::Down));
        assert_eq!(StrumDirection::from_index(4), Some(StrumDirection::FollowSixteenths));
        assert_eq!(StrumDirection::from_index(5), None);
        assert_eq!(StrumDirection::from_index(-1), None);
        for d in StrumDirection::ALL {
            assert_eq!(StrumDirection::from_index(d.index()), Some(d));
        }
    }

    #[test]
    fn test_set_by_name_clamps() {
        let mut c = StrumConfig::default();
        c.set(STRUM_DIVISION, 900.0).unwrap();
        assert_eq!(c.division_ms, 500.0);
        c.set(STRUM_DIVISION_CURVE, -3.0).unwrap();
        assert_eq!(c.division_curve, -0.5);
        c.set(DOWNBEAT_ACCENT, 1.0).unwrap();
        assert!(c.downbeat_accent);
        c.set(STRUM_DIRECTION, 2.4).unwrap();
        assert_eq!(c.direction_mode(), Some(StrumDirection::Alternate));
    }

    #[test]
    fn test_set_unknown_name() {
        let mut c = StrumConfig::default();
        let err = c.set("Strum Speed", 1.0).unwrap_err();
        assert!(err.contains("unknown parameter"), "got: {}", err);
        assert!(c.set(STRUM_DIVISION, f64::NAN).is_err());
    }

    #[test]
    fn test_apply_assignment() {
        let mut c = StrumConfig::default();
        c.apply_assignment("Strum Velocity Curve = -5").unwrap();
        assert_eq!(c.velocity_curve, -5.0);
        assert!(c.apply_assignment("Strum Division").is_err());
        assert!(c.apply_assignment("Strum Division=fast").is_err());
    }

    #[test]
    fn test_sanitized_clamps_out_of_range() {
        let c = StrumConfig {
            division_ms: 0.0,
            random_velocity_pct: 80.0,
            direction: 9,
            ..Default::default()
        };
        let s = c.sanitized();
        assert_eq!(s.division_ms, 1.0);
        assert_eq!(s.random_velocity_pct, 50.0);
        // direction errors are the engine's to report
        assert_eq!(s.direction, 9);
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let c: StrumConfig = serde_json::from_str(r#"{"direction":2,"division_ms":25}"#).unwrap();
        assert_eq!(c.direction_mode(), Some(StrumDirection::Alternate));
        assert_eq!(c.division_ms, 25.0);
        assert_eq!(c.velocity_curve, 0.0);
    }
}
