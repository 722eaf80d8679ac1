//! Result envelopes: one per provider invocation attempt

use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    ProviderError,
    CredentialMissing,
    Timeout,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::ProviderError => "provider_error",
            Status::CredentialMissing => "credential_missing",
            Status::Timeout => "timeout",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform provider result.
///
/// Only constructible through the status-specific constructors, so the
/// payload is present iff the status is `Success`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultEnvelope {
    provider_id: String,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_detail: Option<String>,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl ResultEnvelope {
    pub fn success(
        provider_id: impl Into<String>,
        payload: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            status: Status::Success,
            payload: Some(payload.into()),
            error_detail: None,
            elapsed,
        }
    }

    pub fn provider_error(
        provider_id: impl Into<String>,
        detail: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self::failure(provider_id, Status::ProviderError, detail.into(), elapsed)
    }

    /// Synthesized without any network call
    pub fn credential_missing(provider_id: impl Into<String>, missing: &[String]) -> Self {
        let detail = if missing.is_empty() {
            "required credentials not configured".to_string()
        } else {
            format!("missing credentials: {}", missing.join(", "))
        };
        Self::failure(provider_id, Status::CredentialMissing, detail, Duration::ZERO)
    }

    pub fn timeout(provider_id: impl Into<String>, limit: Duration, elapsed: Duration) -> Self {
        Self::failure(
            provider_id,
            Status::Timeout,
            format!("no response within {:.1}s", limit.as_secs_f64()),
            elapsed,
        )
    }

    fn failure(
        provider_id: impl Into<String>,
        status: Status,
        detail: String,
        elapsed: Duration,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            status,
            payload: None,
            error_detail: Some(detail),
            elapsed,
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
