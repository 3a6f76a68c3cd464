use serde::{Deserialize, Serialize};
use std::fmt;

// ─── MIDI input ─────────────────────────────────────────────────────────────

/// A MIDI event as delivered by the host, channel-less.
/// Serializes with a `"type"` tag so scripts stay readable:
/// `{"type":"note_on","pitch":60,"velocity":100}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MidiEvent {
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8, velocity: u8 },
    ControlChange { controller: u8, value: u8 },
    ProgramChange { program: u8 },
    PitchBend { value: i16 },
    ChannelPressure { pressure: u8 },
    PolyPressure { pitch: u8, pressure: u8 },
}

impl MidiEvent {
    /// Raw status + data bytes on channel 1, for wire outputs.
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            MidiEvent::NoteOn { pitch, velocity } => vec![0x90, pitch & 0x7f, velocity & 0x7f],
            MidiEvent::NoteOff { pitch, velocity } => vec![0x80, pitch & 0x7f, velocity & 0x7f],
            MidiEvent::PolyPressure { pitch, pressure } => {
                vec![0xa0, pitch & 0x7f, pressure & 0x7f]
            }
            MidiEvent::ControlChange { controller, value } => {
                vec![0xb0, controller & 0x7f, value & 0x7f]
            }
            MidiEvent::ProgramChange { program } => vec![0xc0, program & 0x7f],
            MidiEvent::ChannelPressure { pressure } => vec![0xd0, pressure & 0x7f],
            MidiEvent::PitchBend { value } => {
                // -8192..=8191 centred on 0x2000
                let raw = (value as i32 + 8192).clamp(0, 16383) as u16;
                vec![0xe0, (raw & 0x7f) as u8, (raw >> 7) as u8]
            }
        }
    }
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiEvent::NoteOn { pitch, velocity } => {
                write!(f, "NoteOn  {:<4} ({:>3}) vel={}", note_name(*pitch), pitch, velocity)
            }
            MidiEvent::NoteOff { pitch, velocity } => {
                write!(f, "NoteOff {:<4} ({:>3}) vel={}", note_name(*pitch), pitch, velocity)
            }
            MidiEvent::ControlChange { controller, value } => {
                write!(f, "CC {} = {}", controller, value)
            }
            MidiEvent::ProgramChange { program } => write!(f, "Program {}", program),
            MidiEvent::PitchBend { value } => write!(f, "PitchBend {}", value),
            MidiEvent::ChannelPressure { pressure } => write!(f, "Pressure {}", pressure),
            MidiEvent::PolyPressure { pitch, pressure } => {
                write!(f, "PolyPressure {} = {}", note_name(*pitch), pressure)
            }
        }
    }
}

// ─── Captured notes ─────────────────────────────────────────────────────────

/// A note-on captured by the collector, stamped with the host block it arrived in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NoteEvent {
    /// MIDI note number 0–127
    pub pitch: u8,
    /// MIDI velocity 1–127
    pub velocity: u8,
    /// Block start position in beats (host musical time, beat 1 = song start)
    pub start_position: f64,
}

/// Note-ons that arrived in the same host block, to be strummed together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chord {
    pub notes: Vec<NoteEvent>,
    pub position: f64,
}

impl Chord {
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn pitches(&self) -> Vec<u8> {
        self.notes.iter().map(|n| n.pitch).collect()
    }
}

// ─── Host transport ─────────────────────────────────────────────────────────

/// Timing snapshot the host hands over at the start of each processing block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transport {
    pub playing: bool,
    /// Block start position in beats
    pub position: f64,
    /// Time signature numerator (beats per bar)
    #[serde(default = "default_meter")]
    pub meter_numerator: u32,
}

fn default_meter() -> u32 {
    4
}

impl Transport {
    pub fn playing_at(position: f64) -> Self {
        Self {
            playing: true,
            position,
            meter_numerator: 4,
        }
    }

    pub fn stopped_at(position: f64) -> Self {
        Self {
            playing: false,
            position,
            meter_numerator: 4,
        }
    }

    pub fn with_meter(mut self, numerator: u32) -> Self {
        self.meter_numerator = numerator;
        self
    }
}

// ─── Strum output ───────────────────────────────────────────────────────────

/// A note-on handed to the host scheduler. `offset_ms` is relative to the
/// block the chord was processed in; 0.0 means "send now".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScheduledNote {
    pub pitch: u8,
    pub velocity: u8,
    pub offset_ms: f64,
}

/// Everything the strummer can ask the host to do.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputEvent {
    Note(ScheduledNote),
    PassThrough { event: MidiEvent },
    AllNotesOff,
}

impl OutputEvent {
    pub fn as_note(&self) -> Option<&ScheduledNote> {
        match self {
            OutputEvent::Note(n) => Some(n),
            _ => None,
        }
    }
}

/// An output event stamped with the block position it was produced in.
/// Produced by the host harness, consumed by console, logger and OSC sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StampedOutput {
    /// Block start position in beats
    pub position: f64,
    #[serde(flatten)]
    pub event: OutputEvent,
}

impl fmt::Display for StampedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.event {
            OutputEvent::Note(n) => write!(
                f,
                "beat {:>8.3}  +{:>7.2}ms  {:<4} ({:>3}) vel={:>3}",
                self.position,
                n.offset_ms,
                note_name(n.pitch),
                n.pitch,
                n.velocity
            ),
            OutputEvent::PassThrough { event } => {
                write!(f, "beat {:>8.3}  thru       {}", self.position, event)
            }
            OutputEvent::AllNotesOff => {
                write!(f, "beat {:>8.3}  ALL NOTES OFF", self.position)
            }
        }
    }
}

// ─── Inter-thread messages ──────────────────────────────────────────────────

/// What the host delivers to the strummer, in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum HostMessage {
    /// An incoming event during the block that starts at `block_start`.
    Midi { event: MidiEvent, block_start: f64 },
    /// End of event delivery for a block: run the per-block processing.
    Block(Transport),
    /// A new parameter snapshot from the editor.
    Config(crate::params::StrumConfig),
}

// ─── Helpers ────────────────────────────────────────────────────────────────

pub const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Scientific pitch name, middle C (60) = C4.
pub fn note_name(pitch: u8) -> String {
    let octave = (pitch as i32 / 12) - 1;
    format!("{}{}", NOTE_NAMES[(pitch % 12) as usize], octave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_names() {
        assert_eq!(note_name(60), "C4");
        assert_eq!(note_name(40), "E2");
        assert_eq!(note_name(0), "C-1");
        assert_eq!(note_name(127), "G9");
    }

    #[test]
    fn test_midi_event_bytes() {
        let on = MidiEvent::NoteOn { pitch: 64, velocity: 100 };
        assert_eq!(on.to_bytes(), vec![0x90, 64, 100]);
        let bend = MidiEvent::PitchBend { value: 0 };
        assert_eq!(bend.to_bytes(), vec![0xe0, 0x00, 0x40]);
        let bend_max = MidiEvent::PitchBend { value: 8191 };
        assert_eq!(bend_max.to_bytes(), vec![0xe0, 0x7f, 0x7f]);
    }

    #[test]
    fn test_host_message_json_shape() {
        let msg = HostMessage::Midi {
            event: MidiEvent::NoteOn { pitch: 60, velocity: 90 },
            block_start: 1.0,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""msg":"midi""#), "got: {}", json);
        assert!(json.contains(r#""type":"note_on""#), "got: {}", json);

        let block: HostMessage =
            serde_json::from_str(r#"{"msg":"block","playing":true,"position":2.5}"#).unwrap();
        assert_eq!(block, HostMessage::Block(Transport::playing_at(2.5)));
    }

    #[test]
    fn test_stamped_output_flattens() {
        let out = StampedOutput {
            position: 3.0,
            event: OutputEvent::Note(ScheduledNote { pitch: 50, velocity: 80, offset_ms: 10.0 }),
        };
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains(r#""kind":"note""#), "got: {}", json);
        assert!(json.contains(r#""offset_ms":10.0"#), "got: {}", json);
        let back: StampedOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, out);
    }
}
