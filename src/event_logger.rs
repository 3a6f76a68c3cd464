use crate::params::{StrumConfig, PARAMETERS};
use crate::types::*;
use crossbeam_channel::Receiver;
use log::{error, info};
use serde_json::json;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Writes a session directory: `manifest.json` (config at start),
/// `events.jsonl` (one `StampedOutput` per line) and `stats.json`.
pub struct EventLogger {
    rx: Receiver<StampedOutput>,
    session_dir: PathBuf,
    config: StrumConfig,
}

/// Totals written to `stats.json`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStats {
    pub events: u64,
    pub notes: u64,
    pub pass_through: u64,
    pub all_notes_off: u64,
    pub longest_strum_ms: f64,
}

impl EventLogger {
    /// Create `output_dir/session_<unix-secs>/`.
    pub fn new(rx: Receiver<StampedOutput>, output_dir: &Path, config: StrumConfig) -> io::Result<Self> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let session_dir = output_dir.join(format!("session_{}", timestamp));
        Self::in_dir(rx, session_dir, config)
    }

    /// Log into exactly `session_dir`, creating it if needed.
    pub fn in_dir(rx: Receiver<StampedOutput>, session_dir: PathBuf, config: StrumConfig) -> io::Result<Self> {
        fs::create_dir_all(&session_dir)?;
        Ok(Self {
            rx,
            session_dir,
            config,
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Run the logger until the channel closes. Blocks the calling thread.
    pub fn run(&self) -> io::Result<SessionStats> {
        info!("Event logger → {:?}", self.session_dir);
        self.write_manifest()?;

        let events_path = self.session_dir.join("events.jsonl");
        let mut writer = BufWriter::new(File::create(&events_path)?);
        let mut stats = SessionStats::default();

        for item in self.rx.iter() {
            let line = serde_json::to_string(&item).map_err(io::Error::other)?;
            writeln!(writer, "{}", line)?;
            stats.events += 1;
            match item.event {
                OutputEvent::Note(n) => {
                    stats.notes += 1;
                    stats.longest_strum_ms = stats.longest_strum_ms.max(n.offset_ms);
                }
                OutputEvent::PassThrough { .. } => stats.pass_through += 1,
                OutputEvent::AllNotesOff => stats.all_notes_off += 1,
            }

            if stats.events % 1000 == 0 {
                writer.flush()?;
                info!("Logged {} events", stats.events);
            }
        }
        writer.flush()?;

        let stats_json = json!({
            "total_events": stats.events,
            "notes": stats.notes,
            "pass_through": stats.pass_through,
            "all_notes_off": stats.all_notes_off,
            "longest_strum_ms": stats.longest_strum_ms,
        });
        let stats_path = self.session_dir.join("stats.json");
        let pretty = serde_json::to_string_pretty(&stats_json).map_err(io::Error::other)?;
        fs::write(&stats_path, pretty).unwrap_or_else(|e| error!("Failed to write stats: {}", e));

        info!(
            "Session saved: {} events ({} notes) → {:?}",
            stats.events, stats.notes, self.session_dir
        );
        Ok(stats)
    }

    fn write_manifest(&self) -> io::Result<()> {
        let manifest = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "system": "strummer",
            "config": self.config,
            "parameters": PARAMETERS.iter().map(|p| {
                json!({
                    "name": p.name,
                    "value": self.config.get(p.name).ok(),
                    "min": p.min,
                    "max": p.max,
                    "unit": p.unit,
                })
            }).collect::<Vec<_>>(),
        });

        let path = self.session_dir.join("manifest.json");
        let pretty = serde_json::to_string_pretty(&manifest).map_err(io::Error::other)?;
        fs::write(&path, pretty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn temp_session(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("strummer-test-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_logger_writes_session() {
        let dir = temp_session("logger");
        let (tx, rx) = unbounded();
        let logger = EventLogger::in_dir(rx, dir.clone(), StrumConfig::default()).unwrap();

        tx.send(StampedOutput {
            position: 1.0,
            event: OutputEvent::Note(ScheduledNote { pitch: 40, velocity: 90, offset_ms: 0.0 }),
        })
        .unwrap();
        tx.send(StampedOutput {
            position: 1.0,
            event: OutputEvent::Note(ScheduledNote { pitch: 45, velocity: 90, offset_ms: 10.0 }),
        })
        .unwrap();
        tx.send(StampedOutput { position: 2.0, event: OutputEvent::AllNotesOff }).unwrap();
        drop(tx);

        let stats = logger.run().unwrap();
        assert_eq!(stats.events, 3);
        assert_eq!(stats.notes, 2);
        assert_eq!(stats.all_notes_off, 1);
        assert_eq!(stats.longest_strum_ms, 10.0);

        let lines = fs::read_to_string(dir.join("events.jsonl")).unwrap();
        let parsed: Vec<StampedOutput> = lines
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[2].event, OutputEvent::AllNotesOff);

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("manifest.json")).unwrap()).unwrap();
        assert_eq!(manifest["system"], "strummer");
        assert_eq!(manifest["parameters"].as_array().unwrap().len(), 10);
        assert_eq!(manifest["parameters"][1]["value"], 10.0);

        let _ = fs::remove_dir_all(&dir);
    }
}
