use crate::types::*;
use crossbeam_channel::Sender;

/// The host's side of the contract: where strummed notes and forwarded
/// events go. Implementations must not block.
pub trait HostScheduler {
    /// Send a note-on `offset_ms` after the current block's reference time.
    fn schedule(&mut self, note: ScheduledNote, offset_ms: f64);
    /// Send a note-on right away.
    fn schedule_now(&mut self, note: ScheduledNote);
    /// Silence everything, including notes already handed to `schedule`.
    fn all_notes_off(&mut self);
    /// Forward a non-note event unchanged.
    fn pass_through(&mut self, event: MidiEvent);
}

/// Keeps every request in order. Used by tests and offline rendering.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    pub events: Vec<OutputEvent>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> Vec<ScheduledNote> {
        self.events.iter().filter_map(|e| e.as_note().copied()).collect()
    }

    pub fn all_notes_off_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, OutputEvent::AllNotesOff))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl HostScheduler for RecordingScheduler {
    fn schedule(&mut self, note: ScheduledNote, offset_ms: f64) {
        self.events.push(OutputEvent::Note(ScheduledNote { offset_ms, ..note }));
    }

    fn schedule_now(&mut self, note: ScheduledNote) {
        self.events.push(OutputEvent::Note(ScheduledNote { offset_ms: 0.0, ..note }));
    }

    fn all_notes_off(&mut self) {
        self.events.push(OutputEvent::AllNotesOff);
    }

    fn pass_through(&mut self, event: MidiEvent) {
        self.events.push(OutputEvent::PassThrough { event });
    }
}

/// Fans requests out to downstream consumers (console, logger, OSC),
/// stamped with the block position they were produced in.
pub struct ChannelScheduler {
    txs: Vec<Sender<StampedOutput>>,
    position: f64,
    sent: u64,
}

impl ChannelScheduler {
    pub fn new(txs: Vec<Sender<StampedOutput>>) -> Self {
        Self {
            txs,
            position: 0.0,
            sent: 0,
        }
    }

    /// Block position stamped onto subsequent outputs.
    pub fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    pub fn sent_count(&self) -> u64 {
        self.sent
    }

    fn send(&mut self, event: OutputEvent) {
        let out = StampedOutput {
            position: self.position,
            event,
        };
        for tx in &self.txs {
            // a consumer that hung up must not stall the others
            let _ = tx.send(out);
        }
        self.sent += 1;
    }
}

impl HostScheduler for ChannelScheduler {
    fn schedule(&mut self, note: ScheduledNote, offset_ms: f64) {
        self.send(OutputEvent::Note(ScheduledNote { offset_ms, ..note }));
    }

    fn schedule_now(&mut self, note: ScheduledNote) {
        self.send(OutputEvent::Note(ScheduledNote { offset_ms: 0.0, ..note }));
    }

    fn all_notes_off(&mut self) {
        self.send(OutputEvent::AllNotesOff);
    }

    fn pass_through(&mut self, event: MidiEvent) {
        self.send(OutputEvent::PassThrough { event });
    }
}
