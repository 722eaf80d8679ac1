//! Tests for the provider registry and credential gating

mod common;

use common::{registry_of, StubProvider};
use taskwire_dispatch::providers::WikipediaProvider;
use taskwire_dispatch::{
    builtin_registry, CapabilityProvider, CredentialGate, Credentials, ProviderRegistry,
};

#[test]
fn test_registry_new() {
    let registry = ProviderRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.ids().is_empty());
}

#[test]
fn test_registry_default() {
    let registry: ProviderRegistry = Default::default();
    assert_eq!(registry.len(), 0);
}

#[test]
fn test_registry_register_and_get() {
    let mut registry = ProviderRegistry::new();
    registry.register(WikipediaProvider::new());

    assert!(registry.has("wikipedia"));
    let provider = registry.get("wikipedia");
    assert!(provider.is_some());
    assert_eq!(provider.unwrap().id(), "wikipedia");
    assert!(registry.get("nonexistent").is_none());
}

#[test]
fn test_registry_replace_same_id() {
    let registry = registry_of(vec![
        StubProvider::ok("dup", "first"),
        StubProvider::ok("dup", "second").requires("DUP_KEY"),
    ]);
    assert_eq!(registry.len(), 1);
    let descriptor = registry.get("dup").unwrap().descriptor().clone();
    assert!(descriptor.required_credentials.contains("DUP_KEY"));
}

#[test]
fn test_availability_listing() {
    let registry = builtin_registry();
    let creds = Credentials::from_pairs([("SERPER_API_KEY", "s"), ("GOOGLE_API_KEY", "g")]);

    let available: Vec<&str> = registry
        .availability(&creds)
        .into_iter()
        .filter(|(_, ok)| *ok)
        .map(|(d, _)| d.id.as_str())
        .collect();

    // google_search still lacks GOOGLE_CSE_ID
    assert_eq!(
        available,
        vec![
            "arxiv",
            "serper_news",
            "serper_search",
            "wikidata",
            "wikipedia",
            "yahoo_finance_news"
        ]
    );
}

#[test]
fn test_gate_matches_descriptor_requirements() {
    let registry = builtin_registry();
    let creds = Credentials::from_pairs([
        ("GOOGLE_API_KEY", "g"),
        ("GOOGLE_CSE_ID", "c"),
        ("SERPER_API_KEY", "s"),
        ("WOLFRAM_ALPHA_APPID", "w"),
        ("ASKNEWS_CLIENT_ID", "a"),
        ("ASKNEWS_CLIENT_SECRET", "b"),
        ("APIFY_API_TOKEN", "t"),
    ]);
    let gate = CredentialGate::new(&creds);

    for descriptor in registry.descriptors() {
        assert!(gate.available(descriptor), "{}", descriptor.id);
    }

    let none = Credentials::new();
    let gate = CredentialGate::new(&none);
    let google = registry.get("google_search").unwrap();
    assert_eq!(
        gate.missing(google.descriptor()),
        vec!["GOOGLE_API_KEY".to_string(), "GOOGLE_CSE_ID".to_string()]
    );
}

#[test]
fn test_registered_stub_is_invocable() {
    let stub = StubProvider::ok("stub", "pong");
    let registry = registry_of(vec![stub]);
    let provider = registry.get("stub").unwrap();

    let result = tokio_test::block_on(provider.invoke(common::query("ping"), &Credentials::new()));
    assert_eq!(result.unwrap(), "pong");
}
