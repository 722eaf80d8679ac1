//! Apify website content crawler

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{credential, ensure_success, field, http_client, normalize_base, parse_args};
use crate::descriptor::{ParamSpec, ProviderDescriptor};
use crate::registry::CapabilityProvider;
use crate::{BoxError, Parameters};
use taskwire_config::Credentials;

pub const APIFY_API_TOKEN: &str = "APIFY_API_TOKEN";
const DEFAULT_BASE: &str = "https://api.apify.com";
const ACTOR: &str = "apify~website-content-crawler";
const EXCERPT_CHARS: usize = 500;

pub struct ApifyCrawlerProvider {
    descriptor: ProviderDescriptor,
    base_url: String,
    client: reqwest::Client,
}

impl ApifyCrawlerProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        // Synchronous actor runs take minutes, not seconds
        let descriptor = ProviderDescriptor::new("apify_crawler", "Apify Website Crawler")
            .describe("Crawls a website and returns the text of each page")
            .requires(APIFY_API_TOKEN)
            .with_timeout(Duration::from_secs(300))
            .param(ParamSpec::string("query", "Start URL").required())
            .param(
                ParamSpec::integer("max_pages", "Maximum pages to crawl (1-100)")
                    .with_default(10)
                    .with_range(1, 100),
            );

        Self {
            descriptor,
            base_url: normalize_base(base_url),
            client: http_client(),
        }
    }
}

impl Default for ApifyCrawlerProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct CrawlArgs {
    query: String,
    max_pages: u32,
}

#[async_trait]
impl CapabilityProvider for ApifyCrawlerProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        params: Parameters,
        credentials: &Credentials,
    ) -> Result<String, BoxError> {
        let args: CrawlArgs = parse_args(params)?;
        let start_url = args.query.trim();
        if !(start_url.starts_with("http://") || start_url.starts_with("https://")) {
            return Err(format!("start URL must begin with http:// or https://, got '{}'", start_url).into());
        }
        let token = credential(credentials, APIFY_API_TOKEN)?;
        debug!("Apify crawl: {} (max {} pages)", start_url, args.max_pages);

        let response = self
            .client
            .post(format!(
                "{}/v2/acts/{}/run-sync-get-dataset-items",
                self.base_url, ACTOR
            ))
            .bearer_auth(token)
            .json(&json!({
                "startUrls": [{ "url": start_url }],
                "maxCrawlPages": args.max_pages,
            }))
            .send()
            .await?;
        let data: Value = ensure_success(response).await?.json().await?;

        let pages = data.as_array().cloned().unwrap_or_default();
        if pages.is_empty() {
            return Ok(format!("No content crawled from: {}", start_url));
        }

        let mut lines = vec![format!("Crawled {} pages from: {}", pages.len(), start_url)];
        for (i, page) in pages.iter().enumerate() {
            let title = page
                .pointer("/metadata/title")
                .and_then(Value::as_str)
                .unwrap_or("No Title");
            lines.push(format!("{}. {}", i + 1, title));
            lines.push(format!("   {}", field(page, "url", "No URL")));

            let text = field(page, "text", "");
            let excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
            if !excerpt.is_empty() {
                let more = if text.chars().count() > EXCERPT_CHARS { "..." } else { "" };
                lines.push(format!("   {}{}", excerpt.split_whitespace().collect::<Vec<_>>().join(" "), more));
            }
        }
        Ok(lines.join("\n"))
    }
}
