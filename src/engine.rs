use crate::beat::{self, BeatClassification};
use crate::curve::{
    accented_velocity, clamp_velocity, curved_velocity, jittered, DelayCurve, Jitter,
};
use crate::params::{StrumConfig, StrumDirection};
use crate::scheduler::HostScheduler;
use crate::types::*;
use log::{debug, error, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Which way the pick travels across the chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    /// Plays the chord in ascending pitch order
    Down,
    /// Plays the chord in descending pitch order
    Up,
}

impl Stroke {
    pub fn flipped(self) -> Self {
        match self {
            Stroke::Down => Stroke::Up,
            Stroke::Up => Stroke::Down,
        }
    }
}

/// Turns one collected chord per block into a strum.
///
/// Holds the only state that outlives a block: the previous stroke (for
/// "Alternate : Always") and the last beat classification, which is only
/// refreshed in the follow-beat modes and otherwise kept as it was.
/// Accents in the fixed modes therefore see the last classified position.
pub struct StrumEngine<J: Jitter = StdRng> {
    jitter: J,
    previous_stroke: Stroke,
    beat: BeatClassification,
    chords_played: u64,
}

impl StrumEngine<StdRng> {
    /// Engine with an entropy-seeded random source.
    pub fn new() -> Self {
        Self::with_jitter(StdRng::from_entropy())
    }

    /// Engine whose random draws repeat for the same seed.
    pub fn seeded(seed: u64) -> Self {
        Self::with_jitter(StdRng::seed_from_u64(seed))
    }
}

impl Default for StrumEngine<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<J: Jitter> StrumEngine<J> {
    pub fn with_jitter(jitter: J) -> Self {
        Self {
            jitter,
            // primed as Up so the first alternate stroke is Down
            previous_stroke: Stroke::Up,
            beat: BeatClassification::default(),
            chords_played: 0,
        }
    }

    /// Per-block entry point. Returns how many notes were handed to `out`.
    ///
    /// Every block with a stopped transport sends all-notes-off and
    /// discards `chord`.
    pub fn process<S: HostScheduler + ?Sized>(
        &mut self,
        chord: Option<Chord>,
        transport: &Transport,
        config: &StrumConfig,
        out: &mut S,
    ) -> usize {
        let chord = chord.filter(|c| !c.is_empty());

        if !transport.playing {
            out.all_notes_off();
            if let Some(c) = chord {
                debug!("transport stopped, discarding {} pending notes", c.len());
            }
            return 0;
        }

        let Some(chord) = chord else { return 0 };
        let notes = self.plan(chord, transport, config);

        for (i, note) in notes.iter().enumerate() {
            if i == 0 {
                out.schedule_now(*note);
            } else {
                out.schedule(*note, note.offset_ms);
            }
        }
        notes.len()
    }

    /// Order the chord and compute every note's velocity and offset,
    /// without sending anything.
    pub fn plan(
        &mut self,
        chord: Chord,
        transport: &Transport,
        config: &StrumConfig,
    ) -> Vec<ScheduledNote> {
        let mode = config.direction_mode();
        if let Some(grid) = mode.and_then(|d| d.beat_grid()) {
            self.beat = beat::classify(transport.position, transport.meter_numerator, grid);
        }

        let position = chord.position;
        let mut notes = chord.notes;
        notes.sort_by_key(|n| n.pitch);

        let stroke = self.resolve_stroke(mode, config.direction);
        if stroke == Stroke::Up {
            notes.reverse();
        }

        let mut planned = Vec::with_capacity(notes.len());
        let mut offset_ms = 0.0;
        for (i, (note, base_delay)) in notes
            .iter()
            .zip(DelayCurve::from_config(config))
            .enumerate()
        {
            let v = curved_velocity(note.velocity, i, config.velocity_curve);
            let v = jittered(v, config.random_velocity_pct, &mut self.jitter);
            let v = accented_velocity(v, &self.beat, config);

            if i > 0 {
                offset_ms += jittered(base_delay, config.random_division_pct, &mut self.jitter);
            }

            let scheduled = ScheduledNote {
                pitch: note.pitch,
                velocity: clamp_velocity(v),
                offset_ms,
            };
            trace!(
                "  {} vel {:.1} -> {} at +{:.2}ms",
                note_name(note.pitch),
                v,
                scheduled.velocity,
                offset_ms
            );
            planned.push(scheduled);
        }

        self.chords_played += 1;
        debug!(
            "chord #{} at beat {:.3}: {} notes, {:?} stroke, down={} first={}, span {:.1}ms",
            self.chords_played,
            position,
            planned.len(),
            stroke,
            self.beat.is_down_beat,
            self.beat.is_first_beat,
            offset_ms
        );
        planned
    }

    fn resolve_stroke(&mut self, mode: Option<StrumDirection>, raw: i32) -> Stroke {
        match mode {
            Some(StrumDirection::Down) => Stroke::Down,
            Some(StrumDirection::Up) => Stroke::Up,
            Some(StrumDirection::Alternate) => {
                let stroke = self.previous_stroke.flipped();
                self.previous_stroke = stroke;
                stroke
            }
            Some(StrumDirection::FollowEighths) | Some(StrumDirection::FollowSixteenths) => {
                if self.beat.is_down_beat {
                    Stroke::Down
                } else {
                    Stroke::Up
                }
            }
            None => {
                error!("unrecognized strum direction {}, playing chord as sorted", raw);
                Stroke::Down
            }
        }
    }

    /// Last beat classification (stale outside the follow-beat modes).
    pub fn beat(&self) -> BeatClassification {
        self.beat
    }

    pub fn previous_stroke(&self) -> Stroke {
        self.previous_stroke
    }

    pub fn chords_played(&self) -> u64 {
        self.chords_played
    }
}
