use crate::types::*;
use log::{debug, trace};

/// What the collector did with an incoming event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collected {
    /// Note-on appended to the pending chord
    Buffered,
    /// Note-on from a different block while a chord is still pending
    Dropped,
    /// Not a note-on (or a zero-velocity note-on, which releases a note):
    /// forward to the host untouched
    PassThrough(MidiEvent),
}

/// Gathers note-ons that arrive within the same host block into one chord.
///
/// The host calls [`ChordCollector::handle`] for every incoming event, then
/// hands the finished chord to the engine with [`ChordCollector::take_chord`]
/// at the end of the block. A note-on whose block differs from the pending
/// chord's is not merged into it.
#[derive(Debug, Default)]
pub struct ChordCollector {
    pending: Chord,
    dropped: u64,
}

impl ChordCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, event: MidiEvent, block_start: f64) -> Collected {
        match event {
            MidiEvent::NoteOn { pitch, velocity } if velocity > 0 => {
                if self.pending.is_empty() || block_start == self.pending.position {
                    self.pending.notes.push(NoteEvent {
                        pitch,
                        velocity,
                        start_position: block_start,
                    });
                    self.pending.position = block_start;
                    trace!("collect {} at beat {:.3}", note_name(pitch), block_start);
                    Collected::Buffered
                } else {
                    self.dropped += 1;
                    debug!(
                        "dropping {} at beat {:.3}: chord at beat {:.3} still pending",
                        note_name(pitch),
                        block_start,
                        self.pending.position
                    );
                    Collected::Dropped
                }
            }
            other => Collected::PassThrough(other),
        }
    }

    /// Move the pending chord out, leaving the collector empty.
    pub fn take_chord(&mut self) -> Option<Chord> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Note-ons rejected so far because another block's chord was pending.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}
