use crate::types::*;
use crossbeam_channel::Receiver;
use log::{debug, error, info};
use rosc::{OscMessage, OscPacket, OscType};
use std::net::UdpSocket;

/// Forwards strum output to an OSC receiver (synth, DAW bridge, visualizer):
///
/// - `/strum/note        i:pitch i:velocity f:offset_ms f:beat`
/// - `/strum/all_notes_off f:beat`
/// - `/strum/passthrough b:midi-bytes`
///
/// Delayed notes are sent immediately with their offset; the receiver is
/// responsible for waiting.
pub struct OscSender {
    rx: Receiver<StampedOutput>,
    target: String,
}

impl OscSender {
    pub fn new(rx: Receiver<StampedOutput>, target: String) -> Self {
        Self { rx, target }
    }

    /// Run the OSC sender loop. Blocks the calling thread.
    pub fn run(&self) {
        let socket = match UdpSocket::bind("0.0.0.0:0") {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to bind UDP socket: {}", e);
                return;
            }
        };
        info!("OSC sender → {}", self.target);

        for item in self.rx.iter() {
            match encode(&item) {
                Ok(buf) => {
                    if let Err(e) = socket.send_to(&buf, &self.target) {
                        debug!("OSC send error: {}", e);
                    }
                }
                Err(e) => debug!("OSC encode error: {}", e),
            }
        }
        info!("OSC sender shutting down");
    }
}

/// OSC message for one output event.
pub fn message(item: &StampedOutput) -> OscMessage {
    let beat = item.position as f32;
    match &item.event {
        OutputEvent::Note(n) => OscMessage {
            addr: "/strum/note".to_string(),
            args: vec![
                OscType::Int(n.pitch as i32),
                OscType::Int(n.velocity as i32),
                OscType::Float(n.offset_ms as f32),
                OscType::Float(beat),
            ],
        },
        OutputEvent::AllNotesOff => OscMessage {
            addr: "/strum/all_notes_off".to_string(),
            args: vec![OscType::Float(beat)],
        },
        OutputEvent::PassThrough { event } => OscMessage {
            addr: "/strum/passthrough".to_string(),
            args: vec![OscType::Blob(event.to_bytes())],
        },
    }
}

pub fn encode(item: &StampedOutput) -> Result<Vec<u8>, rosc::OscError> {
    rosc::encoder::encode(&OscPacket::Message(message(item)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_message() {
        let item = StampedOutput {
            position: 2.5,
            event: OutputEvent::Note(ScheduledNote { pitch: 52, velocity: 101, offset_ms: 22.5 }),
        };
        let msg = message(&item);
        assert_eq!(msg.addr, "/strum/note");
        assert_eq!(
            msg.args,
            vec![
                OscType::Int(52),
                OscType::Int(101),
                OscType::Float(22.5),
                OscType::Float(2.5)
            ]
        );
    }

    #[test]
    fn test_encode_decodes_back() {
        let item = StampedOutput {
            position: 1.0,
            event: OutputEvent::PassThrough {
                event: MidiEvent::ControlChange { controller: 64, value: 0 },
            },
        };
        let buf = encode(&item).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buf).unwrap();
        match packet {
            OscPacket::Message(m) => {
                assert_eq!(m.addr, "/strum/passthrough");
                assert_eq!(m.args, vec![OscType::Blob(vec![0xb0, 64, 0])]);
            }
            other => panic!("expected message, got {:?}", other),
        }
    }
}
