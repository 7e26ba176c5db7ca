use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use crate::diff::diff_json;

pub enum MessageLogMode {
    Full,
    Diffed,
}

/// NDJSON record of every frame exchanged with the mediation server.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_body: Option<Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            mode,
            file,
            previous_body: None,
        })
    }

    pub fn log_request(&mut self, method: &str, path: &str, body: Option<&str>) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "dir": "req",
            "method": method,
            "path": path,
            "body": body.map(parse_or_text),
        });
        self.write_line(&entry);
    }

    pub fn log_response(&mut self, path: &str, status: u16, body: &str) {
        let body = parse_or_text(body);

        // Only JSON documents are worth diffing; acknowledgements are logged as-is.
        let diffable = matches!(self.mode, MessageLogMode::Diffed)
            && (body.is_array() || body.is_object());
        if !diffable {
            let entry = json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "resp",
                "path": path,
                "status": status,
                "body": body,
            });
            self.write_line(&entry);
            return;
        }

        let entry = match self.previous_body.take() {
            None => json!({
                "ts": Utc::now().to_rfc3339(),
                "dir": "resp",
                "path": path,
                "status": status,
                "full": true,
                "body": body,
            }),
            Some(prev) => {
                let mut changes = Vec::new();
                diff_json(&prev, &body, "", &mut changes);
                let change_entries: Vec<Value> = changes
                    .iter()
                    .map(|(path, old, new)| json!({ "path": path, "old": old, "new": new }))
                    .collect();
                json!({
                    "ts": Utc::now().to_rfc3339(),
                    "dir": "resp",
                    "path": path,
                    "status": status,
                    "changes": change_entries,
                })
            }
        };
        self.write_line(&entry);
        self.previous_body = Some(body);
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}

fn parse_or_text(body: &str) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
