use crate::types::*;
use crossbeam_channel::Receiver;
use std::io::{self, Write};

/// Prints one line per output event, with an ASCII velocity bar for notes
/// and a blank line between chords.
pub struct ConsoleDisplay {
    rx: Receiver<StampedOutput>,
    show_pass_through: bool,
}

impl ConsoleDisplay {
    pub fn new(rx: Receiver<StampedOutput>, show_pass_through: bool) -> Self {
        Self {
            rx,
            show_pass_through,
        }
    }

    pub fn run(&self) {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let mut last_position: Option<f64> = None;

        for item in self.rx.iter() {
            if let Some(line) = self.render(&item, &mut last_position) {
                let _ = writeln!(out, "{}", line);
                let _ = out.flush();
            }
        }
    }

    /// Format one event, or `None` if it is filtered out.
    fn render(&self, item: &StampedOutput, last_position: &mut Option<f64>) -> Option<String> {
        match &item.event {
            OutputEvent::Note(note) => {
                let mut line = String::new();
                if last_position.is_some_and(|p| p != item.position) {
                    line.push('\n');
                }
                *last_position = Some(item.position);
                line.push_str(&format!("{}  {}", item, make_bar(note.velocity, 32)));
                Some(line)
            }
            OutputEvent::PassThrough { .. } if !self.show_pass_through => None,
            _ => Some(item.to_string()),
        }
    }
}

fn make_bar(velocity: u8, width: usize) -> String {
    let filled = ((velocity as f32 / 127.0) * width as f32).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}
