//! Provider invoker
//!
//! Calls one provider once and always returns an envelope. Credential
//! failures, provider errors, panics and timeouts never escape.

use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::descriptor::ProviderDescriptor;
use crate::envelope::ResultEnvelope;
use crate::gate::CredentialGate;
use crate::registry::CapabilityProvider;
use crate::Parameters;
use taskwire_config::Credentials;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ProviderInvoker {
    default_timeout: Duration,
    overrides: HashMap<String, Duration>,
}

impl ProviderInvoker {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            default_timeout,
            overrides: HashMap::new(),
        }
    }

    /// Per-provider timeouts taking precedence over descriptor values
    pub fn with_overrides(mut self, overrides: HashMap<String, Duration>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn set_default_timeout(&mut self, timeout: Duration) {
        self.default_timeout = timeout;
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn set_override(&mut self, provider_id: impl Into<String>, timeout: Duration) {
        self.overrides.insert(provider_id.into(), timeout);
    }

    /// Configured override, then descriptor value, then the default
    pub fn timeout_for(&self, descriptor: &ProviderDescriptor) -> Duration {
        self.overrides
            .get(&descriptor.id)
            .copied()
            .or(descriptor.timeout)
            .unwrap_or(self.default_timeout)
    }

    pub async fn invoke(
        &self,
        provider: &dyn CapabilityProvider,
        params: Parameters,
        credentials: &Credentials,
    ) -> ResultEnvelope {
        self.invoke_within(provider, params, credentials, None).await
    }

    /// `invoke` with a caller-requested limit that replaces `timeout_for`
    pub async fn invoke_within(
        &self,
        provider: &dyn CapabilityProvider,
        params: Parameters,
        credentials: &Credentials,
        requested: Option<Duration>,
    ) -> ResultEnvelope {
        let descriptor = provider.descriptor();
        let id = descriptor.id.as_str();

        let missing = CredentialGate::new(credentials).missing(descriptor);
        if !missing.is_empty() {
            warn!("◆ {} SKIPPED, MISSING {}", id, missing.join(", "));
            return ResultEnvelope::credential_missing(id, &missing);
        }

        let limit = requested.unwrap_or_else(|| self.timeout_for(descriptor));
        debug!("◆ INVOKING {} (timeout {:?})", id, limit);

        let started = Instant::now();
        let call = AssertUnwindSafe(provider.invoke(params, credentials)).catch_unwind();

        // Dropping the call on timeout cancels it and releases its connection
        let envelope = match tokio::time::timeout(limit, call).await {
            Ok(Ok(Ok(payload))) => ResultEnvelope::success(id, payload, started.elapsed()),
            Ok(Ok(Err(e))) => ResultEnvelope::provider_error(id, e.to_string(), started.elapsed()),
            Ok(Err(panic)) => ResultEnvelope::provider_error(
                id,
                format!("provider panicked: {}", panic_message(&panic)),
                started.elapsed(),
            ),
            Err(_) => ResultEnvelope::timeout(id, limit, started.elapsed()),
        };

        if envelope.is_success() {
            debug!("◆ {} OK IN {:?}", id, envelope.elapsed());
        } else {
            warn!(
                "◆ {} {}: {}",
                id,
                envelope.status(),
                envelope.error_detail().unwrap_or_default()
            );
        }
        envelope
    }
}

impl Default for ProviderInvoker {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
