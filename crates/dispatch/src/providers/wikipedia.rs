//! Wikipedia: MediaWiki search with plain-text intro extracts

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{ensure_success, field, http_client, normalize_base, parse_args};
use crate::descriptor::{ParamSpec, ProviderDescriptor};
use crate::registry::CapabilityProvider;
use crate::{BoxError, Parameters};
use taskwire_config::Credentials;

const DEFAULT_BASE: &str = "https://en.wikipedia.org";

pub struct WikipediaProvider {
    descriptor: ProviderDescriptor,
    base_url: String,
    client: reqwest::Client,
}

impl WikipediaProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let descriptor = ProviderDescriptor::new("wikipedia", "Wikipedia")
            .describe("Wikipedia article summaries")
            .param(ParamSpec::string("query", "Topic or keyword").required())
            .param(
                ParamSpec::integer("num_results", "Number of articles (1-5)")
                    .with_default(2)
                    .with_range(1, 5),
            )
            .param(
                ParamSpec::integer("max_chars", "Character budget for all articles")
                    .with_default(4000)
                    .with_range(100, 8000),
            );

        Self {
            descriptor,
            base_url: normalize_base(base_url),
            client: http_client(),
        }
    }
}

impl Default for WikipediaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct WikiArgs {
    query: String,
    num_results: u32,
    max_chars: usize,
}

#[async_trait]
impl CapabilityProvider for WikipediaProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        params: Parameters,
        _credentials: &Credentials,
    ) -> Result<String, BoxError> {
        let args: WikiArgs = parse_args(params)?;
        let limit = args.num_results.to_string();
        debug!("Wikipedia: {}", args.query);

        // generator=search returns the search hits with their extracts in one call
        let response = self
            .client
            .get(format!("{}/w/api.php", self.base_url))
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", args.query.as_str()),
                ("gsrlimit", limit.as_str()),
                ("prop", "extracts|info"),
                ("inprop", "url"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exlimit", "max"),
            ])
            .send()
            .await?;
        let data: Value = ensure_success(response).await?.json().await?;

        if let Some(info) = data.pointer("/error/info").and_then(Value::as_str) {
            return Err(format!("MediaWiki error: {}", info).into());
        }

        let mut pages: Vec<&Value> = data
            .pointer("/query/pages")
            .and_then(Value::as_object)
            .map(|pages| pages.values().collect())
            .unwrap_or_default();
        if pages.is_empty() {
            return Ok(format!("No Wikipedia articles found for '{}'", args.query));
        }
        pages.sort_by_key(|p| p.get("index").and_then(Value::as_i64).unwrap_or(i64::MAX));

        let sections: Vec<String> = pages
            .iter()
            .take(args.num_results as usize)
            .map(|page| {
                let mut section = format!("Page: {}", field(page, "title", "Untitled"));
                let url = field(page, "fullurl", "");
                if !url.is_empty() {
                    section.push_str(&format!("\nURL: {}", url));
                }
                section.push_str(&format!("\nSummary: {}", field(page, "extract", "").trim()));
                section
            })
            .collect();

        Ok(truncate(&sections.join("\n\n"), args.max_chars))
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
