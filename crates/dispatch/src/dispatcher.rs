//! Dispatcher: gate → classify → run → format, one pipeline per request

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

use crate::classifier::{RequestClassifier, RoutingTable};
use crate::descriptor::ProviderDescriptor;
use crate::registry::ProviderRegistry;
use crate::report::{Report, ReportFormatter};
use crate::runner::TaskRunner;
use crate::{Parameters, Result};
use taskwire_config::{Config, Credentials};

/// Lifecycle of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Classified,
    Invoking,
    Completed,
}

impl Phase {
    /// `Invoking` may repeat; `Completed` is terminal
    pub fn can_advance_to(&self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Created, Phase::Classified)
                | (Phase::Classified, Phase::Invoking)
                | (Phase::Classified, Phase::Completed)
                | (Phase::Invoking, Phase::Invoking)
                | (Phase::Invoking, Phase::Completed)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Created => "CREATED",
            Phase::Classified => "CLASSIFIED",
            Phase::Invoking => "INVOKING",
            Phase::Completed => "COMPLETED",
        };
        f.write_str(name)
    }
}

fn advance(current: &mut Phase, next: Phase) {
    debug_assert!(
        current.can_advance_to(next),
        "illegal phase transition {} -> {}",
        current,
        next
    );
    debug!("◆ PHASE {} → {}", current, next);
    *current = next;
}

/// Stateless between calls; every field is read-only after construction
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    classifier: RequestClassifier,
    runner: TaskRunner,
    formatter: ReportFormatter,
    credentials: Arc<Credentials>,
}

impl Dispatcher {
    pub fn new(registry: ProviderRegistry, credentials: Credentials) -> Self {
        Self {
            registry: Arc::new(registry),
            classifier: RequestClassifier::default(),
            runner: TaskRunner::default(),
            formatter: ReportFormatter::default(),
            credentials: Arc::new(credentials),
        }
    }

    /// Dispatcher tuned from the `dispatch` section of the config
    pub fn from_config(
        config: &Config,
        registry: ProviderRegistry,
        credentials: Credentials,
    ) -> Self {
        Self::new(registry, credentials)
            .with_default_timeout(config.default_timeout())
            .with_provider_timeouts(config.provider_timeout_overrides())
            .with_max_parallelism(config.max_parallelism())
            .with_payload_limit(config.max_payload_chars())
    }

    pub fn with_routes(mut self, routes: RoutingTable) -> Self {
        self.classifier = RequestClassifier::new(routes);
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.runner.invoker_mut().set_default_timeout(timeout);
        self
    }

    pub fn with_provider_timeouts(mut self, overrides: HashMap<String, Duration>) -> Self {
        let invoker = self.runner.invoker_mut();
        for (id, timeout) in overrides {
            invoker.set_override(id, timeout);
        }
        self
    }

    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.runner = self.runner.with_max_parallelism(max_parallelism);
        self
    }

    pub fn with_payload_limit(mut self, max_payload_chars: usize) -> Self {
        self.formatter = ReportFormatter::new(max_payload_chars);
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn routes(&self) -> &RoutingTable {
        self.classifier.routes()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Check every route against the registry up front
    pub fn validate(&self) -> Result<()> {
        self.classifier.routes().validate(&self.registry)
    }

    /// Descriptors whose credentials are all present
    pub fn available_providers(&self) -> Vec<&ProviderDescriptor> {
        self.registry
            .availability(&self.credentials)
            .into_iter()
            .filter_map(|(descriptor, available)| available.then_some(descriptor))
            .collect()
    }

    /// Run one request to completion.
    ///
    /// Provider failures end up inside the report; only routing bugs
    /// (a route naming an unregistered provider) return an error.
    pub async fn dispatch(&self, choice: &str, parameters: Parameters) -> Result<Report> {
        self.run_pipeline(choice, &parameters, &self.credentials)
            .await
    }

    /// `dispatch` with extra credentials layered over the process ones
    pub async fn dispatch_with_credentials(
        &self,
        choice: &str,
        parameters: Parameters,
        extra: &Credentials,
    ) -> Result<Report> {
        let merged = self.credentials.merged(extra);
        self.run_pipeline(choice, &parameters, &merged).await
    }

    async fn run_pipeline(
        &self,
        choice: &str,
        parameters: &Parameters,
        credentials: &Credentials,
    ) -> Result<Report> {
        let mut phase = Phase::Created;

        let classification = self
            .classifier
            .classify(&self.registry, choice, parameters)?;
        advance(&mut phase, Phase::Classified);
        info!("◆ DISPATCHING: {}", classification.spec.raw_intent());

        // Entered once per candidate that passes the gate
        let phase = Mutex::new(phase);
        let on_invoke = |id: &str| {
            let mut current = phase.lock().unwrap_or_else(PoisonError::into_inner);
            advance(&mut current, Phase::Invoking);
            debug!("◆ {} → {}", *current, id);
        };
        let envelopes = self
            .runner
            .run_observed(
                &classification.candidates,
                &classification.spec,
                credentials,
                &on_invoke,
            )
            .await;
        let mut phase = phase.into_inner().unwrap_or_else(PoisonError::into_inner);

        let report = self.formatter.format_for(&classification.spec, envelopes);
        advance(&mut phase, Phase::Completed);
        info!("◆ {}", report.summary);

        Ok(report)
    }
}
