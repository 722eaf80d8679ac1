//! Built-in HTTP providers
//!
//! Each provider owns its descriptor and a `reqwest` client. Base URLs are
//! overridable so tests can point them at a local mock server.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::registry::ProviderRegistry;
use crate::{BoxError, Parameters};

pub mod apify;
pub mod arxiv;
pub mod asknews;
pub mod google;
pub mod serper;
pub mod wikidata;
pub mod wikipedia;
pub mod wolfram;
pub mod yahoo_finance;

pub use apify::ApifyCrawlerProvider;
pub use arxiv::ArxivProvider;
pub use asknews::AskNewsProvider;
pub use google::GoogleSearchProvider;
pub use serper::{SerperNewsProvider, SerperSearchProvider};
pub use wikidata::WikidataProvider;
pub use wikipedia::WikipediaProvider;
pub use wolfram::WolframAlphaProvider;
pub use yahoo_finance::YahooFinanceNewsProvider;

pub const USER_AGENT: &str = concat!("taskwire/", env!("CARGO_PKG_VERSION"));

/// Register every built-in provider
pub fn register_builtin_providers(registry: &mut ProviderRegistry) {
    registry.register(GoogleSearchProvider::new());
    registry.register(SerperSearchProvider::new());
    registry.register(SerperNewsProvider::new());
    registry.register(WikipediaProvider::new());
    registry.register(ArxivProvider::new());
    registry.register(WolframAlphaProvider::new());
    registry.register(WikidataProvider::new());
    registry.register(YahooFinanceNewsProvider::new());
    registry.register(AskNewsProvider::new());
    registry.register(ApifyCrawlerProvider::new());
}

/// A registry holding only the built-in providers
pub fn builtin_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    register_builtin_providers(&mut registry);
    registry
}

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_default()
}

/// Deserialize bound parameters into a provider's argument struct
pub(crate) fn parse_args<T: DeserializeOwned>(params: Parameters) -> Result<T, BoxError> {
    Ok(serde_json::from_value(Value::Object(params))?)
}

/// Credential value; the gate has already checked presence
pub(crate) fn credential(
    credentials: &taskwire_config::Credentials,
    name: &str,
) -> Result<String, BoxError> {
    credentials
        .get(name)
        .map(str::to_string)
        .ok_or_else(|| format!("credential {} not set", name).into())
}

/// Turn a non-2xx response into an error carrying the status and body
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, BoxError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        Err(format!("API returned {}", status).into())
    } else {
        let snippet: String = body.chars().take(200).collect();
        Err(format!("API returned {}: {}", status, snippet).into())
    }
}

/// String field of a JSON object, or `fallback`
pub(crate) fn field<'a>(item: &'a Value, key: &str, fallback: &'a str) -> &'a str {
    item.get(key).and_then(Value::as_str).unwrap_or(fallback)
}

/// Trim trailing slashes so paths join cleanly
pub(crate) fn normalize_base(url: impl Into<String>) -> String {
    url.into().trim_end_matches('/').to_string()
}
