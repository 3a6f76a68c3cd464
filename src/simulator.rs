use crate::types::*;
use crossbeam_channel::Sender;
use log::info;
use std::thread;
use std::time::Duration;

/// Host block size in beats (a sixteenth of a beat).
pub const BLOCK_BEATS: f64 = 0.0625;

pub const DEMOS: [&str; 2] = ["basic", "offbeat"];

/// One chord hit in a demo pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// 1-based beat position
    pub beat: f64,
    pub pitches: Vec<u8>,
    pub velocity: u8,
}

// Open-position guitar voicings, low string first
const E_MAJOR: [u8; 6] = [40, 47, 52, 56, 59, 64];
const A_MAJOR: [u8; 5] = [45, 52, 57, 61, 64];
const D_MAJOR: [u8; 4] = [50, 57, 62, 66];
const B7: [u8; 5] = [47, 51, 57, 59, 66];

/// Stands in for a sequencer playing a part: renders a demo pattern into
/// host blocks and pushes them down the channel, optionally paced in real time.
pub struct Simulator {
    tx: Sender<HostMessage>,
    tempo_bpm: f64,
    meter: u32,
    realtime: bool,
}

impl Simulator {
    pub fn new(tx: Sender<HostMessage>, tempo_bpm: f64, realtime: bool) -> Self {
        Self {
            tx,
            tempo_bpm: tempo_bpm.max(1.0),
            meter: 4,
            realtime,
        }
    }

    /// Play a named demo to completion. Blocks the calling thread.
    pub fn run(&self, demo: &str) -> Result<usize, String> {
        let (hits, length) = demo_pattern(demo)?;
        let messages = render(&hits, length, self.meter, BLOCK_BEATS);
        info!(
            "Simulator: demo {:?}, {} chords over {} beats at {} bpm",
            demo,
            hits.len(),
            length,
            self.tempo_bpm
        );

        let block_time = Duration::from_secs_f64(BLOCK_BEATS * 60.0 / self.tempo_bpm);
        let mut sent = 0;
        for msg in messages {
            let is_block = matches!(msg, HostMessage::Block(_));
            if self.tx.send(msg).is_err() {
                info!("Simulator: host hung up after {} messages", sent);
                break;
            }
            sent += 1;
            if self.realtime && is_block {
                thread::sleep(block_time);
            }
        }
        info!("Simulator: demo complete ({} messages)", sent);
        Ok(sent)
    }
}

/// Chord hits and total length in beats for a named demo.
pub fn demo_pattern(name: &str) -> Result<(Vec<Hit>, f64), String> {
    let progression: [&[u8]; 4] = [&E_MAJOR, &A_MAJOR, &D_MAJOR, &B7];
    let mut hits = Vec::new();

    match name {
        // one chord per bar, struck on every beat
        "basic" => {
            for (bar, chord) in progression.iter().enumerate() {
                for beat in 0..4 {
                    hits.push(Hit {
                        beat: 1.0 + (bar * 4 + beat) as f64,
                        pitches: chord.to_vec(),
                        velocity: if beat == 0 { 100 } else { 88 },
                    });
                }
            }
        }
        // D . D U . U D U
        "offbeat" => {
            let pattern = [0.0, 1.0, 1.5, 2.5, 3.0, 3.5];
            for (bar, chord) in progression.iter().enumerate() {
                for &offset in &pattern {
                    hits.push(Hit {
                        beat: 1.0 + bar as f64 * 4.0 + offset,
                        pitches: chord.to_vec(),
                        velocity: 92,
                    });
                }
            }
        }
        other => {
            return Err(format!(
                "unknown demo {:?} (available: {})",
                other,
                DEMOS.join(", ")
            ))
        }
    }

    Ok((hits, progression.len() as f64 * 4.0))
}

/// Turn hits into the host's message stream: per block, the events that fall
/// inside it, then the block itself. The previous chord's notes are released
/// right before the next hit, the sustain pedal brackets the whole part, and
/// one stopped block ends it.
pub fn render(hits: &[Hit], length_beats: f64, meter: u32, block_beats: f64) -> Vec<HostMessage> {
    let mut messages = Vec::new();
    let mut held: Vec<u8> = Vec::new();
    let n_blocks = (length_beats / block_beats).ceil() as usize;

    for k in 0..n_blocks {
        let start = 1.0 + k as f64 * block_beats;
        let end = start + block_beats;

        if k == 0 {
            messages.push(HostMessage::Midi {
                event: MidiEvent::ControlChange { controller: 64, value: 127 },
                block_start: start,
            });
        }

        for hit in hits.iter().filter(|h| h.beat >= start && h.beat < end) {
            for pitch in held.drain(..) {
                messages.push(HostMessage::Midi {
                    event: MidiEvent::NoteOff { pitch, velocity: 0 },
                    block_start: start,
                });
            }
            for &pitch in &hit.pitches {
                messages.push(HostMessage::Midi {
                    event: MidiEvent::NoteOn { pitch, velocity: hit.velocity },
                    block_start: start,
                });
            }
            held.extend_from_slice(&hit.pitches);
        }

        messages.push(HostMessage::Block(Transport {
            playing: true,
            position: start,
            meter_numerator: meter,
        }));
    }

    let stop_at = 1.0 + n_blocks as f64 * block_beats;
    for pitch in held.drain(..) {
        messages.push(HostMessage::Midi {
            event: MidiEvent::NoteOff { pitch, velocity: 0 },
            block_start: stop_at,
        });
    }
    messages.push(HostMessage::Midi {
        event: MidiEvent::ControlChange { controller: 64, value: 0 },
        block_start: stop_at,
    });
    messages.push(HostMessage::Block(Transport {
        playing: false,
        position: stop_at,
        meter_numerator: meter,
    }));
    messages
}
