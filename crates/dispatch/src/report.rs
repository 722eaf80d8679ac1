//! Report formatting
//!
//! Merges envelopes into one plain-text report. Every provider gets a
//! block starting with a `provider_id: status` line so output stays
//! machine-parsable.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::classifier::{RequestKind, RequestSpec};
use crate::envelope::{ResultEnvelope, Status};

pub const DEFAULT_MAX_PAYLOAD_CHARS: usize = 8000;
pub const TRUNCATION_MARKER: &str = "… [truncated]";

/// The terminal artifact of one dispatch
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub invocation_id: Uuid,
    pub kind: Option<RequestKind>,
    pub raw_intent: String,
    pub envelopes: Vec<ResultEnvelope>,
    pub summary: String,
    pub completed_at: DateTime<Utc>,
    #[serde(skip)]
    payload_limit: usize,
}

impl Report {
    pub fn success_count(&self) -> usize {
        self.envelopes.iter().filter(|e| e.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.envelopes.len() - self.success_count()
    }

    pub fn has_success(&self) -> bool {
        self.envelopes.iter().any(|e| e.is_success())
    }

    /// Successful payloads in invocation order
    pub fn payloads(&self) -> Vec<&str> {
        self.envelopes.iter().filter_map(|e| e.payload()).collect()
    }

    /// Plain-text rendering
    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.raw_intent.is_empty() {
            out.push_str(&format!("# {}\n\n", self.raw_intent));
        }

        for envelope in &self.envelopes {
            out.push_str(&format!("{}: {}\n", envelope.provider_id(), envelope.status()));
            match envelope.payload() {
                Some(payload) => {
                    for line in truncate_chars(payload, self.payload_limit).lines() {
                        if line.is_empty() {
                            out.push('\n');
                        } else {
                            out.push_str("  ");
                            out.push_str(line);
                            out.push('\n');
                        }
                    }
                }
                None => {
                    let detail = envelope.error_detail().unwrap_or("no detail");
                    out.push_str(&format!("  ! {}\n", detail));
                }
            }
            out.push('\n');
        }

        out.push_str(&self.summary);
        out.push('\n');
        out
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug, Clone)]
pub struct ReportFormatter {
    max_payload_chars: usize,
}

impl ReportFormatter {
    /// `0` disables truncation
    pub fn new(max_payload_chars: usize) -> Self {
        Self { max_payload_chars }
    }

    pub fn max_payload_chars(&self) -> usize {
        self.max_payload_chars
    }

    /// Always yields a report, whatever the envelopes say
    pub fn format(&self, envelopes: Vec<ResultEnvelope>) -> Report {
        Report {
            invocation_id: Uuid::new_v4(),
            kind: None,
            raw_intent: String::new(),
            summary: summarize(&envelopes),
            envelopes,
            completed_at: Utc::now(),
            payload_limit: self.max_payload_chars,
        }
    }

    /// `format` with the request's kind and intent attached
    pub fn format_for(&self, spec: &RequestSpec, envelopes: Vec<ResultEnvelope>) -> Report {
        let mut report = self.format(envelopes);
        report.kind = Some(spec.kind());
        report.raw_intent = spec.raw_intent().to_string();
        report
    }
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD_CHARS)
    }
}

fn summarize(envelopes: &[ResultEnvelope]) -> String {
    if envelopes.is_empty() {
        return "no providers were invoked".to_string();
    }

    let total = envelopes.len();
    let succeeded = envelopes.iter().filter(|e| e.is_success()).count();
    let noun = if total == 1 { "provider" } else { "providers" };
    let mut summary = format!("{} of {} {} succeeded", succeeded, total, noun);

    let breakdown: Vec<String> = [
        (Status::ProviderError, "provider error", "provider errors"),
        (Status::CredentialMissing, "missing credentials", "missing credentials"),
        (Status::Timeout, "timeout", "timeouts"),
    ]
    .into_iter()
    .filter_map(|(status, one, many)| {
        let n = envelopes.iter().filter(|e| e.status() == status).count();
        match n {
            0 => None,
            1 => Some(format!("1 {}", one)),
            n => Some(format!("{} {}", n, many)),
        }
    })
    .collect();

    if !breakdown.is_empty() {
        summary.push_str(&format!(" ({})", breakdown.join(", ")));
    }
    summary
}

/// Cut on a char boundary, appending the marker when anything was dropped
fn truncate_chars(text: &str, limit: usize) -> std::borrow::Cow<'_, str> {
    if limit == 0 {
        return text.into();
    }
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER).into(),
        None => text.into(),
    }
}
