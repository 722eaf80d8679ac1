//! Dispatcher end to end against stub providers

mod common;

use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

use common::{count, params, query, registry_of, StubProvider};
use taskwire_config::Config;
use taskwire_dispatch::{
    Credentials, DispatchError, Dispatcher, ParamSpec, ProviderRegistry, RequestKind, Route,
    RoutingTable, Status,
};

/// Stubs standing in for every provider id the built-in routes name
fn stub_registry(overrides: Vec<StubProvider>) -> ProviderRegistry {
    let mut registry = registry_of(
        [
            "google_search",
            "serper_search",
            "serper_news",
            "wikipedia",
            "arxiv",
            "wolfram_alpha",
            "wikidata",
            "yahoo_finance_news",
            "asknews",
            "apify_crawler",
        ]
        .iter()
        .map(|id| StubProvider::ok(id, &format!("{} results", id)))
        .collect(),
    );
    for stub in overrides {
        registry.register(stub);
    }
    registry
}

#[tokio::test]
async fn test_quick_exchange_rate() {
    let registry = stub_registry(vec![StubProvider::ok("google_search", "1 USD = 0.91 EUR")]);
    let dispatcher = Dispatcher::new(registry, Credentials::new());

    let report = dispatcher
        .dispatch("quick", query("exchange rate USD to EUR"))
        .await
        .unwrap();

    assert_eq!(report.envelopes.len(), 1);
    assert_eq!(report.envelopes[0].status(), Status::Success);
    assert_eq!(report.envelopes[0].payload(), Some("1 USD = 0.91 EUR"));
    assert_eq!(report.kind, Some(RequestKind::Quick));
    assert_eq!(
        report.raw_intent,
        "Perform a quick search for: exchange rate USD to EUR"
    );
    assert!(report.render().contains("google_search: success\n  1 USD = 0.91 EUR\n"));
}

#[tokio::test]
async fn test_identical_input_identical_structure() {
    let dispatcher = Dispatcher::new(stub_registry(vec![]), Credentials::new());
    let input = params(json!({"query": "rust", "num_results": 3}));

    let a = dispatcher.dispatch("comprehensive", input.clone()).await.unwrap();
    let b = dispatcher.dispatch("comprehensive", input).await.unwrap();

    let shape = |r: &taskwire_dispatch::Report| {
        r.envelopes
            .iter()
            .map(|e| (e.provider_id().to_string(), e.status(), e.payload().map(str::to_string)))
            .collect::<Vec<_>>()
    };
    assert_eq!(shape(&a), shape(&b));
    assert_eq!(a.summary, b.summary);
    assert_eq!(a.raw_intent, b.raw_intent);
    assert_ne!(a.invocation_id, b.invocation_id);
}

#[tokio::test]
async fn test_all_failed_still_reports() {
    let registry = stub_registry(vec![
        StubProvider::failing("google_search", "quota exceeded"),
        StubProvider::failing("serper_search", "401"),
        StubProvider::failing("wikipedia", "unreachable"),
    ]);
    let dispatcher = Dispatcher::new(registry, Credentials::new());

    let report = dispatcher.dispatch("general", query("q")).await.unwrap();

    assert_eq!(report.envelopes.len(), 3);
    assert!(!report.has_success());
    assert_eq!(report.summary, "0 of 3 providers succeeded (3 provider errors)");
    assert!(report.render().contains("google_search: provider_error\n  ! quota exceeded"));
}

#[tokio::test]
async fn test_only_credential_missing_envelopes_when_gated() {
    let stub = StubProvider::ok("serper_news", "news").requires("SERPER_API_KEY");
    let calls = stub.calls();
    let dispatcher = Dispatcher::new(stub_registry(vec![stub]), Credentials::new());

    let report = dispatcher.dispatch("news", query("elections")).await.unwrap();

    assert_eq!(report.envelopes.len(), 1);
    assert_eq!(report.envelopes[0].status(), Status::CredentialMissing);
    assert_eq!(count(&calls), 0);
    assert!(dispatcher
        .available_providers()
        .iter()
        .all(|d| d.id != "serper_news"));
}

#[tokio::test]
async fn test_per_call_credentials() {
    let stub = StubProvider::ok("serper_news", "news").requires("SERPER_API_KEY");
    let calls = stub.calls();
    let dispatcher = Dispatcher::new(stub_registry(vec![stub]), Credentials::new());
    let extra = Credentials::from_pairs([("SERPER_API_KEY", "per-call")]);

    let report = dispatcher
        .dispatch_with_credentials("news", query("elections"), &extra)
        .await
        .unwrap();

    assert!(report.has_success());
    assert_eq!(count(&calls), 1);
    // process credentials are untouched
    assert!(!dispatcher.credentials().is_present("SERPER_API_KEY"));
}

#[tokio::test]
async fn test_unknown_choice_dispatches_general() {
    let dispatcher = Dispatcher::new(stub_registry(vec![]), Credentials::new());
    let report = dispatcher.dispatch("does-not-exist", params(json!({}))).await.unwrap();

    assert_eq!(report.kind, Some(RequestKind::General));
    assert_eq!(report.raw_intent, "Search for: latest technology news");
    assert_eq!(report.envelopes[0].provider_id(), "google_search");
}

#[tokio::test]
async fn test_unregistered_route_target_is_an_error() {
    let routes = RoutingTable::default().with_route(
        RequestKind::Academic,
        Route::first_success(["semantic_scholar"], "Papers on: {q}"),
    );
    let dispatcher = Dispatcher::new(stub_registry(vec![]), Credentials::new()).with_routes(routes);

    assert!(dispatcher.validate().is_err());
    let err = dispatcher.dispatch("academic", query("q")).await.err().unwrap();
    assert!(matches!(err, DispatchError::UnknownProvider { .. }));
}

#[tokio::test]
async fn test_provider_timeout_overrides() {
    let slow = StubProvider::sleeping("arxiv", Duration::from_millis(400));
    let dispatcher = Dispatcher::new(stub_registry(vec![slow]), Credentials::new())
        .with_default_timeout(Duration::from_secs(5))
        .with_provider_timeouts(HashMap::from([(
            "arxiv".to_string(),
            Duration::from_millis(50),
        )]));

    let report = dispatcher.dispatch("academic", query("q")).await.unwrap();
    assert_eq!(report.envelopes[0].status(), Status::Timeout);
    assert_eq!(report.summary, "0 of 1 provider succeeded (1 timeout)");
}

#[tokio::test]
async fn test_from_config_applies_payload_limit() {
    let mut config = Config::default();
    config.dispatch.max_payload_chars = 4;
    let registry = stub_registry(vec![StubProvider::ok("wolfram_alpha", "x = 42 exactly")]);
    let dispatcher = Dispatcher::from_config(&config, registry, Credentials::new());

    let report = dispatcher.dispatch("compute", query("x")).await.unwrap();
    assert!(report.render().contains("  x = … [truncated]\n"));
    assert_eq!(report.payloads(), vec!["x = 42 exactly"]);
}

#[tokio::test]
async fn test_report_serializes() {
    let dispatcher = Dispatcher::new(stub_registry(vec![]), Credentials::new());
    let report = dispatcher.dispatch("academic", query("q")).await.unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["kind"], "academic");
    assert_eq!(value["envelopes"][0]["provider_id"], "arxiv");
    assert_eq!(value["envelopes"][0]["status"], "success");
    assert!(value["invocation_id"].is_string());
}

#[tokio::test]
async fn test_requested_timeout_secs_bounds_the_call() {
    let slow = StubProvider::sleeping("google_search", Duration::from_millis(1500));
    let seen = slow.seen();
    let dispatcher = Dispatcher::new(stub_registry(vec![slow]), Credentials::new())
        .with_default_timeout(Duration::from_secs(30));

    let started = std::time::Instant::now();
    let report = dispatcher
        .dispatch(
            "quick",
            params(json!({"query": "x", "timeout_secs": 1, "hours_back": 99999, "max_pages": 0})),
        )
        .await
        .unwrap();

    assert_eq!(report.envelopes[0].status(), Status::Timeout);
    assert!(started.elapsed() < Duration::from_millis(1400), "{:?}", started.elapsed());
    // parameters the provider does not declare are not forwarded
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], params(json!({"query": "x", "num_results": 1})));
}

#[tokio::test]
async fn test_timeout_secs_is_clamped_before_use() {
    let stub = StubProvider::sleeping("arxiv", Duration::from_millis(50));
    let dispatcher = Dispatcher::new(stub_registry(vec![stub]), Credentials::new())
        .with_provider_timeouts(HashMap::from([(
            "arxiv".to_string(),
            Duration::from_millis(10),
        )]));

    // 0 clamps to 1s, which replaces the 10ms override
    let report = dispatcher
        .dispatch("academic", params(json!({"query": "q", "timeout_secs": 0})))
        .await
        .unwrap();
    assert_eq!(report.envelopes[0].status(), Status::Success);
}

#[tokio::test]
async fn test_hours_back_reaches_historical_provider() {
    let stub = StubProvider::ok("asknews", "old news").with_param(
        ParamSpec::integer("hours_back", "Lookback")
            .with_default(168)
            .with_range(1, 720),
    );
    let seen = stub.seen();
    let dispatcher = Dispatcher::new(stub_registry(vec![stub]), Credentials::new());

    let report = dispatcher
        .dispatch("historical", params(json!({"topic": "tariffs", "hours_back": 99999})))
        .await
        .unwrap();

    assert_eq!(report.raw_intent, "Search for historical news about: tariffs");
    assert!(report.has_success());
    assert_eq!(seen.lock().unwrap()[0]["hours_back"], 720);
}

#[tokio::test]
async fn test_max_pages_reaches_crawler() {
    let stub = StubProvider::ok("apify_crawler", "pages").with_param(
        ParamSpec::integer("max_pages", "Pages")
            .with_default(10)
            .with_range(1, 100),
    );
    let seen = stub.seen();
    let dispatcher = Dispatcher::new(stub_registry(vec![stub]), Credentials::new());

    dispatcher
        .dispatch("crawl", params(json!({"query": "https://example.com", "max_pages": 0})))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0]["max_pages"], 1);
    assert_eq!(seen[0]["query"], "https://example.com");
}

#[tokio::test]
async fn test_knowledge_falls_through_to_wikipedia() {
    let registry = stub_registry(vec![StubProvider::failing("wikidata", "503")]);
    let dispatcher = Dispatcher::new(registry, Credentials::new());

    let report = dispatcher.dispatch("8", query("Douglas Adams")).await.unwrap();

    assert_eq!(report.kind, Some(RequestKind::Knowledge));
    let ids: Vec<&str> = report.envelopes.iter().map(|e| e.provider_id()).collect();
    assert_eq!(ids, vec!["wikidata", "wikipedia"]);
    assert_eq!(report.payloads(), vec!["wikipedia results"]);
}

#[tokio::test]
async fn test_fan_out_with_gated_candidate() {
    // serper_search gated out; the other three are invoked
    let gated = StubProvider::ok("serper_search", "x").requires("SERPER_API_KEY");
    let dispatcher = Dispatcher::new(stub_registry(vec![gated]), Credentials::new());

    let report = dispatcher.dispatch("comprehensive", query("q")).await.unwrap();

    assert_eq!(report.envelopes.len(), 4);
    assert_eq!(report.envelopes[0].status(), Status::CredentialMissing);
    assert_eq!(report.success_count(), 3);
}
