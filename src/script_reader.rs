//! JSONL performance scripts, a recorded stream of host messages.
//!
//! First line is a header (`{"format":"strummer-script", ...}`), optionally
//! carrying a starting config. Every following line is one `HostMessage`.
//! The header's `meter` fills in `meter_numerator` for block lines that omit it.
//! Works with any `BufRead`: files, in-memory buffers, stdin.

use crate::params::StrumConfig;
use crate::types::HostMessage;
use std::io::{BufRead, Write};

pub const SCRIPT_FORMAT: &str = "strummer-script";

/// Parsed script header.
#[derive(Debug)]
pub struct ScriptHeader {
    pub format: String,
    pub meter: u32,
    pub config: Option<StrumConfig>,
    pub raw: serde_json::Value,
}

/// Line-by-line script reader.
pub struct ScriptReader<R: BufRead> {
    reader: R,
    pub header: ScriptHeader,
    line_buf: String,
    line_no: usize,
}

impl<R: BufRead> ScriptReader<R> {
    /// Read and validate the header line. Fails if the header is missing,
    /// unparseable, or lacks `"format": "strummer-script"`.
    pub fn open(mut reader: R) -> Result<Self, String> {
        let mut first_line = String::new();
        reader
            .read_line(&mut first_line)
            .map_err(|e| format!("read header: {}", e))?;

        let first_line = first_line.trim();
        if first_line.is_empty() {
            return Err("empty script".into());
        }

        let raw: serde_json::Value =
            serde_json::from_str(first_line).map_err(|e| format!("parse header: {}", e))?;

        let format = raw["format"]
            .as_str()
            .ok_or("missing \"format\" field")?
            .to_string();
        if format != SCRIPT_FORMAT {
            return Err(format!("unknown format: {}", format));
        }

        let meter = match raw.get("meter") {
            None => 4,
            Some(v) => v
                .as_u64()
                .and_then(|m| u32::try_from(m).ok())
                .ok_or_else(|| format!("bad \"meter\" field: {}", v))?,
        };
        let config = match raw.get("config") {
            Some(v) if !v.is_null() => Some(
                serde_json::from_value::<StrumConfig>(v.clone())
                    .map_err(|e| format!("parse header config: {}", e))?,
            ),
            _ => None,
        };

        Ok(Self {
            reader,
            header: ScriptHeader {
                format,
                meter,
                config,
                raw,
            },
            line_buf: String::new(),
            line_no: 1,
        })
    }

    /// Read the next message. `None` at EOF, `Err` for unparseable lines.
    pub fn next_message(&mut self) -> Option<Result<HostMessage, String>> {
        loop {
            self.line_buf.clear();
            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    let trimmed = self.line_buf.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(
                        serde_json::from_str::<serde_json::Value>(trimmed)
                            .and_then(|v| serde_json::from_value(self.with_header_meter(v)))
                            .map_err(|e| format!("line {}: {}", self.line_no, e)),
                    );
                }
                Err(e) => return Some(Err(format!("read line: {}", e))),
            }
        }
    }

    fn with_header_meter(&self, mut line: serde_json::Value) -> serde_json::Value {
        if let Some(obj) = line.as_object_mut() {
            if obj.get("msg").and_then(|m| m.as_str()) == Some("block") {
                obj.entry("meter_numerator")
                    .or_insert_with(|| self.header.meter.into());
            }
        }
        line
    }

    /// Read all remaining messages, skipping malformed lines.
    pub fn read_all(mut self) -> Vec<HostMessage> {
        let mut messages = Vec::new();
        while let Some(result) = self.next_message() {
            if let Ok(msg) = result {
                messages.push(msg);
            }
        }
        messages
    }
}

/// Write a script (header + one message per line) that `ScriptReader` accepts.
pub fn write_script<W: Write>(
    mut w: W,
    meter: u32,
    config: Option<&StrumConfig>,
    messages: &[HostMessage],
) -> Result<(), String> {
    let header = serde_json::json!({
        "format": SCRIPT_FORMAT,
        "meter": meter,
        "config": config,
    });
    writeln!(w, "{}", header).map_err(|e| format!("write header: {}", e))?;
    for msg in messages {
        let line = serde_json::to_string(msg).map_err(|e| format!("encode message: {}", e))?;
        writeln!(w, "{}", line).map_err(|e| format!("write message: {}", e))?;
    }
    Ok(())
}
