/// Rendering for `binchain run`.
///
/// # Text output
///
/// ```text
/// mode:     stream
/// outcome:  stalled (waiting for 4 bytes)
/// consumed: 8 bytes
///
/// name  value
/// body  68656c6c6f (5 bytes)
/// len   5
/// ```
///
/// Values are listed by name. Numbers print in their shortest exact
/// decimal form, byte slices as lowercase hex followed by their length.
use std::collections::BTreeMap;
use std::fmt::Write as _;

use binchain_decoder::{StreamState, Value, Vars};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Buffer,
    Stream,
}

impl Mode {
    fn label(self) -> &'static str {
        match self {
            Mode::Buffer => "buffer",
            Mode::Stream => "stream",
        }
    }
}

/// How the run finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Every step ran.
    Complete,
    /// The input ended while a read was pending.
    Stalled,
    /// The parser stopped short for any other reason.
    Incomplete,
}

impl From<StreamState> for Outcome {
    fn from(state: StreamState) -> Self {
        match state {
            StreamState::Done | StreamState::Ended => Outcome::Complete,
            StreamState::Stalled => Outcome::Stalled,
            StreamState::Active | StreamState::Failed => Outcome::Incomplete,
        }
    }
}

/// Everything `binchain run` prints.
#[derive(Debug)]
pub struct Report<'a> {
    pub mode: Mode,
    pub outcome: Outcome,
    /// Byte count of the read the parser stalled on.
    pub waiting_for: Option<usize>,
    pub consumed: usize,
    pub vars: &'a Vars,
}

pub fn render_text(report: &Report<'_>) -> String {
    let mut out = String::new();
    let outcome = match (report.outcome, report.waiting_for) {
        (Outcome::Stalled, Some(bytes)) => format!("stalled (waiting for {bytes} bytes)"),
        (Outcome::Stalled, None) => "stalled".to_string(),
        (Outcome::Complete, _) => "complete".to_string(),
        (Outcome::Incomplete, _) => "incomplete".to_string(),
    };

    let _ = writeln!(out, "mode:     {}", report.mode.label());
    let _ = writeln!(out, "outcome:  {outcome}");
    let _ = writeln!(out, "consumed: {} bytes", report.consumed);
    let _ = writeln!(out);

    let entries = report.vars.sorted();
    if entries.is_empty() {
        let _ = writeln!(out, "(no values)");
        return out;
    }

    let width = entries
        .iter()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0)
        .max("name".len());
    let _ = writeln!(out, "{:<width$}  value", "name");
    for (name, value) in entries {
        let _ = writeln!(out, "{name:<width$}  {}", format_value(value));
    }
    out
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::Bytes(bytes) => format!("{} ({} bytes)", hex::encode(bytes), bytes.len()),
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    mode: Mode,
    outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    waiting_for: Option<usize>,
    consumed: usize,
    vars: BTreeMap<&'a str, JsonValue>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum JsonValue {
    Number(f64),
    Bytes { hex: String, len: usize },
}

/// Render the report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(report: &Report<'_>) -> serde_json::Result<String> {
    let vars = report
        .vars
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::Number(n) => JsonValue::Number(*n),
                Value::Bytes(bytes) => JsonValue::Bytes {
                    hex: hex::encode(bytes),
                    len: bytes.len(),
                },
            };
            (name, value)
        })
        .collect();

    serde_json::to_string_pretty(&JsonReport {
        mode: report.mode,
        outcome: report.outcome,
        waiting_for: report.waiting_for,
        consumed: report.consumed,
        vars,
    })
}
