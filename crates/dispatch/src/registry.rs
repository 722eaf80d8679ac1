//! Provider registry

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::descriptor::ProviderDescriptor;
use crate::gate::CredentialGate;
use crate::{BoxError, Parameters};
use taskwire_config::Credentials;

/// An external capability: a descriptor plus one async call.
///
/// `invoke` receives arguments already bound against the descriptor's
/// schema. Errors and panics are turned into envelopes by the invoker.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;

    async fn invoke(&self, params: Parameters, credentials: &Credentials)
        -> Result<String, BoxError>;

    fn id(&self) -> &str {
        &self.descriptor().id
    }
}

pub type SharedProvider = Arc<dyn CapabilityProvider>;

/// Providers by id
pub struct ProviderRegistry {
    providers: BTreeMap<String, SharedProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }

    /// Register a provider; a later registration with the same id replaces it
    pub fn register<T: CapabilityProvider + 'static>(&mut self, provider: T) {
        self.register_shared(Arc::new(provider));
    }

    pub fn register_shared(&mut self, provider: SharedProvider) {
        let id = provider.id().to_string();
        self.providers.insert(id, provider);
    }

    pub fn get(&self, id: &str) -> Option<SharedProvider> {
        self.providers.get(id).cloned()
    }

    pub fn has(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    pub fn descriptors(&self) -> Vec<&ProviderDescriptor> {
        self.providers.values().map(|p| p.descriptor()).collect()
    }

    /// Sorted ids
    pub fn ids(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    /// Every credential name any registered provider needs
    pub fn credential_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .providers
            .values()
            .flat_map(|p| p.descriptor().required_credentials.iter().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Descriptors paired with their current availability
    pub fn availability<'a>(
        &'a self,
        credentials: &Credentials,
    ) -> Vec<(&'a ProviderDescriptor, bool)> {
        let gate = CredentialGate::new(credentials);
        self.providers
            .values()
            .map(|p| {
                let descriptor = p.descriptor();
                (descriptor, gate.available(descriptor))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
