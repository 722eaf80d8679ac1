//! Shared stub providers for dispatch tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskwire_dispatch::{
    BoxError, CapabilityProvider, Credentials, ParamSpec, Parameters, ProviderDescriptor,
    ProviderRegistry,
};

#[derive(Clone)]
pub enum Behavior {
    Succeed(String),
    Fail(String),
    Sleep(Duration, String),
    Panic(String),
}

/// Concurrent-call gauge shared between stubs
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Deterministic provider that records every call it receives
pub struct StubProvider {
    descriptor: ProviderDescriptor,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<Parameters>>>,
    gauge: Option<Arc<InFlight>>,
}

impl StubProvider {
    pub fn new(id: &str, behavior: Behavior) -> Self {
        let descriptor = ProviderDescriptor::new(id, id)
            .param(ParamSpec::string("query", "Query").required())
            .param(
                ParamSpec::integer("num_results", "Result count")
                    .with_default(5)
                    .with_range(1, 10),
            );
        Self {
            descriptor,
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
            gauge: None,
        }
    }

    pub fn ok(id: &str, payload: &str) -> Self {
        Self::new(id, Behavior::Succeed(payload.to_string()))
    }

    pub fn failing(id: &str, message: &str) -> Self {
        Self::new(id, Behavior::Fail(message.to_string()))
    }

    pub fn sleeping(id: &str, delay: Duration) -> Self {
        Self::new(id, Behavior::Sleep(delay, format!("{} woke up", id)))
    }

    pub fn panicking(id: &str, message: &str) -> Self {
        Self::new(id, Behavior::Panic(message.to_string()))
    }

    pub fn requires(mut self, credential: &str) -> Self {
        self.descriptor = self.descriptor.requires(credential);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.descriptor = self.descriptor.with_timeout(timeout);
        self
    }

    pub fn with_param(mut self, spec: ParamSpec) -> Self {
        self.descriptor = self.descriptor.param(spec);
        self
    }

    pub fn tracked(mut self, gauge: &Arc<InFlight>) -> Self {
        self.gauge = Some(Arc::clone(gauge));
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn seen(&self) -> Arc<Mutex<Vec<Parameters>>> {
        Arc::clone(&self.seen)
    }
}

#[async_trait]
impl CapabilityProvider for StubProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        params: Parameters,
        _credentials: &Credentials,
    ) -> Result<String, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(params);

        if let Some(gauge) = &self.gauge {
            gauge.enter();
        }
        let result = match &self.behavior {
            Behavior::Succeed(payload) => Ok(payload.clone()),
            Behavior::Fail(message) => Err(message.clone().into()),
            Behavior::Sleep(delay, payload) => {
                tokio::time::sleep(*delay).await;
                Ok(payload.clone())
            }
            Behavior::Panic(message) => panic!("{}", message),
        };
        if let Some(gauge) = &self.gauge {
            gauge.leave();
        }
        result
    }
}

pub fn count(calls: &Arc<AtomicUsize>) -> usize {
    calls.load(Ordering::SeqCst)
}

pub fn params(value: Value) -> Parameters {
    value.as_object().cloned().expect("object literal")
}

pub fn query(q: &str) -> Parameters {
    params(serde_json::json!({ "query": q }))
}

pub fn registry_of(providers: Vec<StubProvider>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(provider);
    }
    registry
}
