use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

/// Severity attached to every structured log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Writes `{"ts_ms","level","event","data"}` JSON lines for events at or above `min_level`.
pub struct JsonLineLogger<W: Write> {
    writer: W,
    min_level: LogLevel,
}

impl<W: Write> JsonLineLogger<W> {
    pub fn new(writer: W, min_level: LogLevel) -> Self {
        Self { writer, min_level }
    }

    pub fn log_line(&mut self, level: &str, event: &str, data: serde_json::Value) {
        let parsed = LogLevel::parse(level).unwrap_or(LogLevel::Info);
        if parsed < self.min_level {
            return;
        }
        let line = serde_json::json!({
            "ts_ms": now_ms(),
            "level": parsed.as_str(),
            "event": event,
            "data": data
        })
        .to_string();
        // Write errors are ignored.
        let _ = self.writer.write_all(format!("{line}\n").as_bytes());
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Log sink that drops every event.
pub fn discard(_level: &str, _event: &str, _data: serde_json::Value) {}

pub fn redact_url_for_log(value: &str) -> String {
    match Url::parse(value) {
        Ok(uri) => {
            if uri.query().is_none() {
                return value.to_string();
            }
            let scheme = uri.scheme();
            let authority = uri.host_str().unwrap_or("unknown-host");
            format!("{scheme}://{authority}/...")
        }
        Err(_) => "[invalid-url]".to_string(),
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
