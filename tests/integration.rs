//! End-to-end tests for the strum pipeline.
//!
//! These exercise the full data flow:
//!   HostMessage channel → Host (collector + engine) → StampedOutput channel → assertions
//!
//! The simulator renders demo patterns into host blocks exactly as a
//! sequencer would deliver them, so the same stream can be checked for chord
//! grouping, stroke direction, timing and the stop behaviour.

use crossbeam_channel::bounded;
use std::io::Cursor;
use std::thread;
use std::time::Duration;

use strummer::engine::StrumEngine;
use strummer::host::{Host, HostStats};
use strummer::params::{StrumConfig, StrumDirection};
use strummer::script_reader::{write_script, ScriptReader};
use strummer::simulator::{demo_pattern, render, Hit, BLOCK_BEATS};
use strummer::types::*;

// ─── Helpers ───────────────────────────────────────────────────────────────

/// Run a host in a background thread, feeding it a sequence of messages.
/// Collects outputs until the input channel closes.
fn run_pipeline(
    messages: Vec<HostMessage>,
    config: StrumConfig,
    seed: u64,
) -> (Vec<StampedOutput>, HostStats) {
    let (input_tx, input_rx) = bounded::<HostMessage>(4096);
    let (out_tx, out_rx) = bounded::<StampedOutput>(65536);

    let host_handle = thread::Builder::new()
        .name("test-host".into())
        .spawn(move || {
            Host::with_engine(input_rx, vec![out_tx], config, StrumEngine::seeded(seed)).run()
        })
        .unwrap();

    for msg in messages {
        input_tx.send(msg).unwrap();
    }
    drop(input_tx);

    let mut outputs = Vec::new();
    while let Ok(o) = out_rx.recv_timeout(Duration::from_millis(500)) {
        outputs.push(o);
    }

    let stats = host_handle.join().unwrap();
    (outputs, stats)
}

/// Group note outputs by the block they were produced in.
fn strums(outputs: &[StampedOutput]) -> Vec<(f64, Vec<ScheduledNote>)> {
    let mut groups: Vec<(f64, Vec<ScheduledNote>)> = Vec::new();
    for o in outputs {
        if let OutputEvent::Note(n) = o.event {
            match groups.last_mut() {
                Some((pos, notes)) if *pos == o.position => notes.push(n),
                _ => groups.push((o.position, vec![n])),
            }
        }
    }
    groups
}

fn chord_at(beat: f64, pitches: &[u8]) -> Hit {
    Hit {
        beat,
        pitches: pitches.to_vec(),
        velocity: 100,
    }
}

// ─── Integration Tests ─────────────────────────────────────────────────────

#[test]
fn test_pipeline_basic_demo() {
    let (hits, length) = demo_pattern("basic").unwrap();
    let messages = render(&hits, length, 4, BLOCK_BEATS);
    let (outputs, stats) = run_pipeline(messages, StrumConfig::default(), 1);

    assert_eq!(stats.chords, 16);
    let groups = strums(&outputs);
    assert_eq!(groups.len(), 16);

    // E major, six strings, Down: ascending, 10ms apart
    let (pos, first) = &groups[0];
    assert_eq!(*pos, 1.0);
    let pitches: Vec<u8> = first.iter().map(|n| n.pitch).collect();
    assert_eq!(pitches, vec![40, 47, 52, 56, 59, 64]);
    let offsets: Vec<f64> = first.iter().map(|n| n.offset_ms).collect();
    assert_eq!(offsets, vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0]);
    assert!(first.iter().all(|n| n.velocity == 100));

    // sustain pedal and note-offs went through untouched
    assert!(stats.passed_through > 0);
    assert!(outputs.iter().any(|o| matches!(
        o.event,
        OutputEvent::PassThrough { event: MidiEvent::ControlChange { controller: 64, value: 127 } }
    )));

    // the single stopped block at the end silences everything
    let offs: Vec<&StampedOutput> = outputs
        .iter()
        .filter(|o| o.event == OutputEvent::AllNotesOff)
        .collect();
    assert_eq!(offs.len(), 1);
    assert_eq!(offs[0].position, 17.0);
}

#[test]
fn test_pipeline_offbeat_follows_eighths() {
    let (hits, length) = demo_pattern("offbeat").unwrap();
    let messages = render(&hits, length, 4, BLOCK_BEATS);
    let config = StrumConfig::default().with_direction(StrumDirection::FollowEighths);
    let (outputs, _) = run_pipeline(messages, config, 1);

    let groups = strums(&outputs);
    assert_eq!(groups.len(), 24);
    for (pos, notes) in &groups {
        let ascending = notes.windows(2).all(|w| w[0].pitch < w[1].pitch);
        let on_beat = pos.fract() == 0.0;
        assert_eq!(
            ascending, on_beat,
            "beat {}: expected {} stroke",
            pos,
            if on_beat { "down" } else { "up" }
        );
    }
}

#[test]
fn test_pipeline_alternate_across_chords() {
    let hits = vec![
        chord_at(1.0, &[40, 45, 50]),
        chord_at(1.5, &[40, 45, 50]),
        chord_at(2.0, &[40, 45, 50]),
        chord_at(2.5, &[40, 45, 50]),
    ];
    let messages = render(&hits, 2.0, 4, BLOCK_BEATS);
    let config = StrumConfig::default().with_direction(StrumDirection::Alternate);
    let (outputs, _) = run_pipeline(messages, config, 1);

    let firsts: Vec<u8> = strums(&outputs).iter().map(|(_, n)| n[0].pitch).collect();
    assert_eq!(firsts, vec![40, 50, 40, 50]);
}

#[test]
fn test_pipeline_stop_discards_pending_chord() {
    let messages = vec![
        HostMessage::Midi { event: MidiEvent::NoteOn { pitch: 40, velocity: 100 }, block_start: 1.0 },
        HostMessage::Block(Transport::playing_at(1.0)),
        HostMessage::Midi { event: MidiEvent::NoteOn { pitch: 45, velocity: 100 }, block_start: 2.0 },
        HostMessage::Midi { event: MidiEvent::NoteOn { pitch: 50, velocity: 100 }, block_start: 2.0 },
        HostMessage::Block(Transport::stopped_at(2.0)),
        HostMessage::Block(Transport::stopped_at(2.0)),
        // nothing left to play once the transport restarts
        HostMessage::Block(Transport::playing_at(2.0625)),
    ];
    let (outputs, stats) = run_pipeline(messages, StrumConfig::default(), 1);

    // each stopped block silences again
    let events: Vec<OutputEvent> = outputs.iter().map(|o| o.event).collect();
    assert_eq!(
        events,
        vec![
            OutputEvent::Note(ScheduledNote { pitch: 40, velocity: 100, offset_ms: 0.0 }),
            OutputEvent::AllNotesOff,
            OutputEvent::AllNotesOff,
        ]
    );
    assert_eq!(stats.chords, 1);
}

#[test]
fn test_pipeline_zero_velocity_note_on_releases() {
    let release = MidiEvent::NoteOn { pitch: 45, velocity: 0 };
    let messages = vec![
        HostMessage::Midi { event: MidiEvent::NoteOn { pitch: 40, velocity: 100 }, block_start: 1.0 },
        HostMessage::Midi { event: release, block_start: 1.0 },
        HostMessage::Block(Transport::playing_at(1.0)),
    ];
    let (outputs, stats) = run_pipeline(messages, StrumConfig::default(), 1);

    assert_eq!(stats.passed_through, 1);
    assert_eq!(stats.notes, 1);
    assert!(outputs.iter().any(|o| o.event == OutputEvent::PassThrough { event: release }));
    assert_eq!(strums(&outputs)[0].1[0].pitch, 40);
}

#[test]
fn test_pipeline_late_note_is_not_merged() {
    // a note arriving for the next block while the chord is still pending
    let messages = vec![
        HostMessage::Midi { event: MidiEvent::NoteOn { pitch: 40, velocity: 100 }, block_start: 1.0 },
        HostMessage::Midi { event: MidiEvent::NoteOn { pitch: 45, velocity: 100 }, block_start: 1.0625 },
        HostMessage::Block(Transport::playing_at(1.0)),
    ];
    let (outputs, stats) = run_pipeline(messages, StrumConfig::default(), 1);
    assert_eq!(stats.dropped, 1);
    assert_eq!(strums(&outputs)[0].1.len(), 1);
}

#[test]
fn test_pipeline_config_change_mid_stream() {
    let mut messages = render(&[chord_at(1.0, &[40, 45, 50])], 1.0, 4, BLOCK_BEATS);
    // drop the trailing stop block, switch to Up, then play another chord
    messages.pop();
    messages.push(HostMessage::Config(
        StrumConfig {
            division_ms: 25.0,
            ..Default::default()
        }
        .with_direction(StrumDirection::Up),
    ));
    messages.extend(render(&[chord_at(2.0, &[40, 45, 50])], 1.0, 4, BLOCK_BEATS).into_iter().map(
        |m| match m {
            HostMessage::Midi { event, block_start } => HostMessage::Midi { event, block_start: block_start + 1.0 },
            HostMessage::Block(t) => HostMessage::Block(Transport { position: t.position + 1.0, ..t }),
            other => other,
        },
    ));
    let (outputs, _) = run_pipeline(messages, StrumConfig::default(), 1);

    let groups = strums(&outputs);
    assert_eq!(groups.len(), 2);
    let second: Vec<(u8, f64)> = groups[1].1.iter().map(|n| (n.pitch, n.offset_ms)).collect();
    assert_eq!(second, vec![(50, 0.0), (45, 25.0), (40, 50.0)]);
}

#[test]
fn test_pipeline_randomized_is_seed_reproducible() {
    let (hits, length) = demo_pattern("offbeat").unwrap();
    let config = StrumConfig {
        random_division_pct: 40.0,
        random_velocity_pct: 20.0,
        division_curve: 0.2,
        ..Default::default()
    };
    let (a, _) = run_pipeline(render(&hits, length, 4, BLOCK_BEATS), config.clone(), 42);
    let (b, _) = run_pipeline(render(&hits, length, 4, BLOCK_BEATS), config.clone(), 42);
    assert_eq!(a, b);

    for (_, notes) in strums(&a) {
        assert_eq!(notes[0].offset_ms, 0.0);
        assert!(notes.windows(2).all(|w| w[0].offset_ms <= w[1].offset_ms));
        assert!(notes.iter().all(|n| (1..=127).contains(&n.velocity)));
    }
}

#[test]
fn test_pipeline_from_script() {
    let hits = vec![chord_at(1.0, &[64, 59, 55])];
    let messages = render(&hits, 0.5, 3, BLOCK_BEATS);
    let config = StrumConfig {
        velocity_curve: -10.0,
        ..Default::default()
    };

    let mut buf = Vec::new();
    write_script(&mut buf, 3, Some(&config), &messages).unwrap();
    let reader = ScriptReader::open(Cursor::new(buf)).unwrap();
    let config = reader.header.config.clone().unwrap();
    let (outputs, _) = run_pipeline(reader.read_all(), config, 1);

    let notes = &strums(&outputs)[0].1;
    let got: Vec<(u8, u8)> = notes.iter().map(|n| (n.pitch, n.velocity)).collect();
    assert_eq!(got, vec![(55, 100), (59, 90), (64, 80)]);
}
