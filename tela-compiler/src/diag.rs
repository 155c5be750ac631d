//! Structured diagnostics.
//!
//! Everything user-facing funnels into [`Diagnostic`]: parse and analysis
//! errors, emit errors, and rustc's own JSON output. Severity order is most
//! severe first so `sort` puts errors at the top.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub id: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<DiagLocation>,
}

impl Diagnostic {
    pub fn error(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            severity: Severity::Error,
            message: message.into(),
            location: None,
        }
    }

    pub fn warning(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            severity: Severity::Warning,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, file: impl Into<String>, line: usize, column: usize) -> Self {
        self.location = Some(DiagLocation {
            file: file.into(),
            line,
            column,
        });
        self
    }
}

/// Stable sort: errors first, then warnings, then notes; original order is
/// kept within each severity.
pub fn order_by_severity(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|d| d.severity);
}

#[derive(Deserialize)]
struct RustcMessage {
    message: String,
    level: String,
    #[serde(default)]
    code: Option<RustcCode>,
    #[serde(default)]
    spans: Vec<RustcSpan>,
}

#[derive(Deserialize)]
struct RustcCode {
    code: String,
}

#[derive(Deserialize)]
struct RustcSpan {
    file_name: String,
    line_start: usize,
    column_start: usize,
    #[serde(default)]
    is_primary: bool,
}

/// Map `rustc --error-format=json` stderr lines into [`Diagnostic`]s.
/// Non-diagnostic lines are skipped.
pub fn parse_rustc_output(stderr: &str) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for line in stderr.lines() {
        let line = line.trim();
        if line.is_empty() || !line.starts_with('{') {
            continue;
        }
        let Ok(msg) = serde_json::from_str::<RustcMessage>(line) else {
            continue;
        };
        if msg.message.is_empty() {
            continue;
        }
        let severity = if msg.level.starts_with("error") {
            Severity::Error
        } else if msg.level.starts_with("warning") {
            Severity::Warning
        } else {
            Severity::Note
        };
        let location = msg
            .spans
            .iter()
            .find(|s| s.is_primary)
            .or(msg.spans.first())
            .map(|s| DiagLocation {
                file: s.file_name.clone(),
                line: s.line_start,
                column: s.column_start,
            });
        out.push(Diagnostic {
            id: msg.code.map(|c| c.code).unwrap_or_else(|| "rustc".to_string()),
            severity,
            message: msg.message,
            location,
        });
    }
    out
}
