//! Request classification
//!
//! Turns a user choice plus a free-form parameter bag into an ordered
//! candidate list and an immutable [`RequestSpec`]. Bad input never fails
//! here: unknown kinds, blank queries and out-of-range numbers are replaced
//! with documented defaults and recorded as [`ClassificationFallback`]s.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::descriptor::coerce_integer;
use crate::registry::{ProviderRegistry, SharedProvider};
use crate::{DispatchError, Parameters, Result};

pub const DEFAULT_QUERY: &str = "latest technology news";
pub const FALLBACK_TEMPLATE: &str = "Search for: {q}";

const QUERY_ALIASES: [&str; 2] = ["topic", "q"];

/// Numeric parameter bounds: (name, min, max, default)
pub const NUMERIC_BOUNDS: [(&str, i64, i64, i64); 4] = [
    ("num_results", 1, 10, 5),
    ("max_pages", 1, 100, 10),
    ("hours_back", 1, 720, 168),
    ("timeout_secs", 1, 300, 120),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    General,
    Detailed,
    Quick,
    News,
    Academic,
    Comprehensive,
    Compute,
    Knowledge,
    Finance,
    Historical,
    Crawl,
}

impl RequestKind {
    pub const ALL: [RequestKind; 11] = [
        RequestKind::General,
        RequestKind::Detailed,
        RequestKind::Quick,
        RequestKind::News,
        RequestKind::Academic,
        RequestKind::Comprehensive,
        RequestKind::Compute,
        RequestKind::Knowledge,
        RequestKind::Finance,
        RequestKind::Historical,
        RequestKind::Crawl,
    ];

    pub fn menu_number(&self) -> u8 {
        match self {
            RequestKind::General => 1,
            RequestKind::Detailed => 2,
            RequestKind::Quick => 3,
            RequestKind::News => 4,
            RequestKind::Academic => 5,
            RequestKind::Comprehensive => 6,
            RequestKind::Compute => 7,
            RequestKind::Knowledge => 8,
            RequestKind::Finance => 9,
            RequestKind::Historical => 10,
            RequestKind::Crawl => 11,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::General => "general",
            RequestKind::Detailed => "detailed",
            RequestKind::Quick => "quick",
            RequestKind::News => "news",
            RequestKind::Academic => "academic",
            RequestKind::Comprehensive => "comprehensive",
            RequestKind::Compute => "compute",
            RequestKind::Knowledge => "knowledge",
            RequestKind::Finance => "finance",
            RequestKind::Historical => "historical",
            RequestKind::Crawl => "crawl",
        }
    }

    /// Parse a kind name (any case) or menu number
    pub fn from_choice(choice: &str) -> Option<Self> {
        let choice = choice.trim();
        if choice.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|kind| {
            kind.as_str().eq_ignore_ascii_case(choice) || kind.menu_number().to_string() == choice
        })
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunPolicy {
    /// Try candidates in order, stop at the first success
    FirstSuccess,
    /// Invoke every candidate, keep every envelope
    FanOutAll,
}

impl fmt::Display for RunPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPolicy::FirstSuccess => f.write_str("first-success"),
            RunPolicy::FanOutAll => f.write_str("fan-out-all"),
        }
    }
}

/// Candidates, policy, intent template and fixed parameters for one kind
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub candidates: Vec<String>,
    pub policy: RunPolicy,
    /// `{q}` is replaced with the query
    pub intent_template: String,
    /// Applied after normalization, overriding caller values
    pub fixed: Parameters,
}

impl Route {
    fn new<I, S>(candidates: I, policy: RunPolicy, intent_template: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            policy,
            intent_template: intent_template.to_string(),
            fixed: Parameters::new(),
        }
    }

    pub fn first_success<I, S>(candidates: I, intent_template: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(candidates, RunPolicy::FirstSuccess, intent_template)
    }

    pub fn fan_out_all<I, S>(candidates: I, intent_template: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(candidates, RunPolicy::FanOutAll, intent_template)
    }

    pub fn with_fixed(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fixed.insert(name.to_string(), value.into());
        self
    }

    pub fn render_intent(&self, query: &str) -> String {
        self.intent_template.replace("{q}", query)
    }
}

/// Request kind to route mapping
#[derive(Debug, Clone)]
pub struct RoutingTable {
    routes: HashMap<RequestKind, Route>,
    fallback_template: String,
    default_query: String,
}

impl RoutingTable {
    /// A table with no routes; every kind must be `set` before use
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
            fallback_template: FALLBACK_TEMPLATE.to_string(),
            default_query: DEFAULT_QUERY.to_string(),
        }
    }

    pub fn set(&mut self, kind: RequestKind, route: Route) {
        self.routes.insert(kind, route);
    }

    pub fn with_route(mut self, kind: RequestKind, route: Route) -> Self {
        self.set(kind, route);
        self
    }

    pub fn with_default_query(mut self, query: impl Into<String>) -> Self {
        self.default_query = query.into();
        self
    }

    pub fn route(&self, kind: RequestKind) -> Option<&Route> {
        self.routes.get(&kind)
    }

    pub fn default_query(&self) -> &str {
        &self.default_query
    }

    pub fn fallback_template(&self) -> &str {
        &self.fallback_template
    }

    /// Routes in menu order
    pub fn routes(&self) -> Vec<(RequestKind, &Route)> {
        RequestKind::ALL
            .into_iter()
            .filter_map(|kind| self.routes.get(&kind).map(|r| (kind, r)))
            .collect()
    }

    /// Every route must name only registered providers
    pub fn validate(&self, registry: &ProviderRegistry) -> Result<()> {
        for (kind, route) in self.routes() {
            if route.candidates.is_empty() {
                return Err(DispatchError::EmptyRoute(kind.to_string()));
            }
            if let Some(id) = route.candidates.iter().find(|id| !registry.has(id)) {
                return Err(DispatchError::UnknownProvider {
                    kind: kind.to_string(),
                    provider_id: id.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        use RequestKind::*;
        Self::empty()
            .with_route(
                General,
                Route::first_success(
                    ["google_search", "serper_search", "wikipedia"],
                    "Perform a general web search for: {q}",
                ),
            )
            .with_route(
                Detailed,
                Route::first_success(
                    ["serper_search", "google_search"],
                    "Perform a detailed search with metadata for: {q}",
                ),
            )
            .with_route(
                Quick,
                Route::first_success(["google_search"], "Perform a quick search for: {q}")
                    .with_fixed("num_results", 1),
            )
            .with_route(
                News,
                Route::first_success(["serper_news"], "Search for recent news about: {q}"),
            )
            .with_route(
                Academic,
                Route::first_success(["arxiv"], "Search for papers related to: {q}"),
            )
            .with_route(
                Comprehensive,
                Route::fan_out_all(
                    ["serper_search", "google_search", "wikipedia", "arxiv"],
                    "Conduct comprehensive research on: {q}",
                ),
            )
            .with_route(
                Compute,
                Route::first_success(["wolfram_alpha"], "Compute the answer to: {q}"),
            )
            .with_route(
                Knowledge,
                Route::first_success(
                    ["wikidata", "wikipedia"],
                    "Look up structured facts about: {q}",
                ),
            )
            .with_route(
                Finance,
                Route::first_success(
                    ["yahoo_finance_news"],
                    "Search for the latest financial news about: {q}",
                ),
            )
            .with_route(
                Historical,
                Route::first_success(["asknews"], "Search for historical news about: {q}"),
            )
            .with_route(
                Crawl,
                Route::first_success(["apify_crawler"], "Crawl website content from: {q}"),
            )
    }
}

/// A default applied during classification. Logged, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClassificationFallback {
    UnknownKind {
        input: String,
    },
    DefaultQuery,
    Clamped {
        name: String,
        requested: i64,
        applied: i64,
    },
    Unparsable {
        name: String,
        input: String,
        applied: i64,
    },
}

impl fmt::Display for ClassificationFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationFallback::UnknownKind { input } => {
                write!(f, "unknown request kind '{}', using general search", input)
            }
            ClassificationFallback::DefaultQuery => {
                write!(f, "no query given, using the default query")
            }
            ClassificationFallback::Clamped {
                name,
                requested,
                applied,
            } => write!(f, "{} = {} out of bounds, clamped to {}", name, requested, applied),
            ClassificationFallback::Unparsable {
                name,
                input,
                applied,
            } => write!(f, "{} = '{}' is not a number, using {}", name, input, applied),
        }
    }
}

/// The normalized request. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSpec {
    kind: RequestKind,
    raw_intent: String,
    parameters: Parameters,
    policy: RunPolicy,
    fallbacks: Vec<ClassificationFallback>,
}

impl RequestSpec {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn raw_intent(&self) -> &str {
        &self.raw_intent
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn query(&self) -> &str {
        self.parameters
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn policy(&self) -> RunPolicy {
        self.policy
    }

    /// Per-call limit from `timeout_secs`, already clamped
    pub fn timeout(&self) -> Option<Duration> {
        self.parameters
            .get("timeout_secs")
            .and_then(Value::as_u64)
            .map(Duration::from_secs)
    }

    pub fn fallbacks(&self) -> &[ClassificationFallback] {
        &self.fallbacks
    }
}

/// Classifier output: resolved candidates plus the request spec
#[derive(Clone)]
pub struct Classification {
    pub candidates: Vec<SharedProvider>,
    pub spec: RequestSpec,
}

impl Classification {
    pub fn candidate_ids(&self) -> Vec<&str> {
        self.candidates.iter().map(|p| p.id()).collect()
    }
}

pub struct RequestClassifier {
    routes: RoutingTable,
}

impl RequestClassifier {
    pub fn new(routes: RoutingTable) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    /// Classify one request.
    ///
    /// Only errors when a route names a provider the registry does not
    /// hold, or has no route at all; user input alone never fails.
    pub fn classify(
        &self,
        registry: &ProviderRegistry,
        choice: &str,
        raw: &Parameters,
    ) -> Result<Classification> {
        let mut fallbacks = Vec::new();

        let (kind, known) = match RequestKind::from_choice(choice) {
            Some(kind) => (kind, true),
            None => {
                fallbacks.push(ClassificationFallback::UnknownKind {
                    input: choice.trim().to_string(),
                });
                (RequestKind::General, false)
            }
        };

        let route = self
            .routes
            .route(kind)
            .ok_or_else(|| DispatchError::MissingRoute(kind.to_string()))?;
        if route.candidates.is_empty() {
            return Err(DispatchError::EmptyRoute(kind.to_string()));
        }

        let mut parameters = raw.clone();
        let query = match take_query(&mut parameters) {
            Some(query) => query,
            None => {
                fallbacks.push(ClassificationFallback::DefaultQuery);
                self.routes.default_query.clone()
            }
        };
        parameters.insert("query".to_string(), Value::String(query.clone()));

        normalize_numbers(&mut parameters, &mut fallbacks);
        for (name, value) in &route.fixed {
            parameters.insert(name.clone(), value.clone());
        }

        let raw_intent = if known {
            route.render_intent(&query)
        } else {
            self.routes.fallback_template.replace("{q}", &query)
        };

        let candidates = route
            .candidates
            .iter()
            .map(|id| {
                registry
                    .get(id)
                    .ok_or_else(|| DispatchError::UnknownProvider {
                        kind: kind.to_string(),
                        provider_id: id.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        for fallback in &fallbacks {
            warn!("◆ CLASSIFICATION FALLBACK: {}", fallback);
        }
        debug!(
            "◆ CLASSIFIED AS {} ({}, {} candidates)",
            kind,
            route.policy,
            candidates.len()
        );

        Ok(Classification {
            candidates,
            spec: RequestSpec {
                kind,
                raw_intent,
                parameters,
                policy: route.policy,
                fallbacks,
            },
        })
    }
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::new(RoutingTable::default())
    }
}

/// Pull the query out of `query` or one of its aliases; blank counts as absent
fn take_query(parameters: &mut Parameters) -> Option<String> {
    let mut found = None;
    for name in std::iter::once("query").chain(QUERY_ALIASES) {
        let value = parameters.remove(name);
        if found.is_some() {
            continue;
        }
        let text = match value {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => continue,
        };
        if !text.is_empty() {
            found = Some(text);
        }
    }
    found
}

fn normalize_numbers(parameters: &mut Parameters, fallbacks: &mut Vec<ClassificationFallback>) {
    for (name, min, max, default) in NUMERIC_BOUNDS {
        let Some(raw) = parameters.get(name).filter(|v| !v.is_null()) else {
            continue;
        };

        let applied = match coerce_integer(raw) {
            Some(n) => {
                let clamped = n.clamp(min, max);
                if clamped != n {
                    fallbacks.push(ClassificationFallback::Clamped {
                        name: name.to_string(),
                        requested: n,
                        applied: clamped,
                    });
                }
                clamped
            }
            None => {
                let input = match raw {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                fallbacks.push(ClassificationFallback::Unparsable {
                    name: name.to_string(),
                    input,
                    applied: default,
                });
                default
            }
        };
        parameters.insert(name.to_string(), Value::from(applied));
    }
}
