//! Google Custom Search JSON API

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{credential, ensure_success, field, http_client, normalize_base, parse_args};
use crate::descriptor::{ParamSpec, ProviderDescriptor};
use crate::registry::CapabilityProvider;
use crate::{BoxError, Parameters};
use taskwire_config::Credentials;

pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const GOOGLE_CSE_ID: &str = "GOOGLE_CSE_ID";
const DEFAULT_BASE: &str = "https://www.googleapis.com";

pub struct GoogleSearchProvider {
    descriptor: ProviderDescriptor,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleSearchProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let descriptor = ProviderDescriptor::new("google_search", "Google Search")
            .describe("Google Custom Search: titles, links and snippets")
            .requires(GOOGLE_API_KEY)
            .requires(GOOGLE_CSE_ID)
            .param(ParamSpec::string("query", "Search query").required())
            .param(
                ParamSpec::integer("num_results", "Number of results (1-10)")
                    .with_default(5)
                    .with_range(1, 10),
            );

        Self {
            descriptor,
            base_url: normalize_base(base_url),
            client: http_client(),
        }
    }
}

impl Default for GoogleSearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    num_results: u32,
}

#[async_trait]
impl CapabilityProvider for GoogleSearchProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        params: Parameters,
        credentials: &Credentials,
    ) -> Result<String, BoxError> {
        let args: SearchArgs = parse_args(params)?;
        let key = credential(credentials, GOOGLE_API_KEY)?;
        let cx = credential(credentials, GOOGLE_CSE_ID)?;
        let num = args.num_results.to_string();
        debug!("Google search: {}", args.query);

        let response = self
            .client
            .get(format!("{}/customsearch/v1", self.base_url))
            .query(&[
                ("key", key.as_str()),
                ("cx", cx.as_str()),
                ("q", args.query.as_str()),
                ("num", num.as_str()),
            ])
            .send()
            .await?;
        let data: Value = ensure_success(response).await?.json().await?;

        if let Some(message) = data.pointer("/error/message").and_then(Value::as_str) {
            return Err(format!("Google API error: {}", message).into());
        }

        let items = match data.get("items").and_then(Value::as_array) {
            Some(items) if !items.is_empty() => items,
            _ => return Ok(format!("No results for: {}", args.query)),
        };

        let mut lines = vec![format!("Results for: {}", args.query)];
        for (i, item) in items.iter().take(args.num_results as usize).enumerate() {
            lines.push(format!("{}. {}", i + 1, field(item, "title", "No Title")));
            lines.push(format!("   {}", field(item, "link", "No Link")));
            let snippet = field(item, "snippet", "");
            if !snippet.is_empty() {
                lines.push(format!("   {}", snippet.replace('\n', " ")));
            }
        }
        Ok(lines.join("\n"))
    }
}
