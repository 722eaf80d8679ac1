//! Task runner: drives candidates through the invoker under a run policy

use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{debug, info};

use crate::classifier::{RequestSpec, RunPolicy};
use crate::envelope::ResultEnvelope;
use crate::gate::CredentialGate;
use crate::invoker::ProviderInvoker;
use crate::registry::SharedProvider;
use taskwire_config::Credentials;

pub const DEFAULT_MAX_PARALLELISM: usize = 4;

#[derive(Debug, Clone)]
pub struct TaskRunner {
    invoker: ProviderInvoker,
    max_parallelism: usize,
}

impl TaskRunner {
    pub fn new(invoker: ProviderInvoker) -> Self {
        Self {
            invoker,
            max_parallelism: DEFAULT_MAX_PARALLELISM,
        }
    }

    /// Upper bound on concurrent calls under fan-out-all (at least 1)
    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = max_parallelism.max(1);
        self
    }

    pub fn max_parallelism(&self) -> usize {
        self.max_parallelism
    }

    pub fn invoker(&self) -> &ProviderInvoker {
        &self.invoker
    }

    pub fn invoker_mut(&mut self) -> &mut ProviderInvoker {
        &mut self.invoker
    }

    /// Run every candidate the policy calls for, envelopes in candidate order
    pub async fn run(
        &self,
        candidates: &[SharedProvider],
        spec: &RequestSpec,
        credentials: &Credentials,
    ) -> Vec<ResultEnvelope> {
        self.run_observed(candidates, spec, credentials, &|_: &str| {})
            .await
    }

    /// `run`, calling `on_invoke` with the provider id each time a
    /// candidate passes the gate and is about to be called
    pub async fn run_observed(
        &self,
        candidates: &[SharedProvider],
        spec: &RequestSpec,
        credentials: &Credentials,
        on_invoke: &(dyn Fn(&str) + Send + Sync),
    ) -> Vec<ResultEnvelope> {
        info!(
            "◆ RUNNING {} CANDIDATES ({})",
            candidates.len(),
            spec.policy()
        );

        match spec.policy() {
            RunPolicy::FirstSuccess => {
                let mut envelopes = Vec::with_capacity(candidates.len());
                for provider in candidates {
                    let envelope = self.attempt(provider, spec, credentials, on_invoke).await;
                    let done = envelope.is_success();
                    envelopes.push(envelope);
                    if done {
                        debug!("◆ FIRST SUCCESS FROM {}", provider.id());
                        break;
                    }
                }
                envelopes
            }
            RunPolicy::FanOutAll => {
                // buffered keeps completion order equal to candidate order
                stream::iter(candidates)
                    .map(|provider| self.attempt(provider, spec, credentials, on_invoke))
                    .buffered(self.max_parallelism)
                    .collect()
                    .await
            }
        }
    }

    async fn attempt(
        &self,
        provider: &SharedProvider,
        spec: &RequestSpec,
        credentials: &Credentials,
        on_invoke: &(dyn Fn(&str) + Send + Sync),
    ) -> ResultEnvelope {
        let descriptor = provider.descriptor();

        // Missing credentials outrank bad arguments in the report
        let missing = CredentialGate::new(credentials).missing(descriptor);
        if !missing.is_empty() {
            return ResultEnvelope::credential_missing(&descriptor.id, &missing);
        }

        on_invoke(&descriptor.id);
        match descriptor.bind(spec.parameters()) {
            Ok(params) => {
                self.invoker
                    .invoke_within(provider.as_ref(), params, credentials, spec.timeout())
                    .await
            }
            Err(e) => ResultEnvelope::provider_error(
                &descriptor.id,
                format!("invalid arguments: {}", e),
                Duration::ZERO,
            ),
        }
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new(ProviderInvoker::default())
    }
}
