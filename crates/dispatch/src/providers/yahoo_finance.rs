//! Yahoo Finance news by ticker symbol

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{ensure_success, field, http_client, normalize_base, parse_args};
use crate::descriptor::{ParamSpec, ProviderDescriptor};
use crate::registry::CapabilityProvider;
use crate::{BoxError, Parameters};
use taskwire_config::Credentials;

const DEFAULT_BASE: &str = "https://query1.finance.yahoo.com";

pub struct YahooFinanceNewsProvider {
    descriptor: ProviderDescriptor,
    base_url: String,
    client: reqwest::Client,
}

impl YahooFinanceNewsProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let descriptor = ProviderDescriptor::new("yahoo_finance_news", "Yahoo Finance News")
            .describe("Recent financial news for a ticker symbol")
            .param(ParamSpec::string("query", "Ticker symbol, e.g. AAPL").required())
            .param(
                ParamSpec::integer("num_results", "Number of articles (1-10)")
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

impl Default for YahooFinanceNewsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct FinanceArgs {
    query: String,
    num_results: u32,
}

#[async_trait]
impl CapabilityProvider for YahooFinanceNewsProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        params: Parameters,
        _credentials: &Credentials,
    ) -> Result<String, BoxError> {
        let args: FinanceArgs = parse_args(params)?;
        let ticker = args.query.trim().to_uppercase();
        let count = args.num_results.to_string();
        debug!("Yahoo Finance: {}", ticker);

        let response = self
            .client
            .get(format!("{}/v1/finance/search", self.base_url))
            .query(&[
                ("q", ticker.as_str()),
                ("quotesCount", "0"),
                ("newsCount", count.as_str()),
            ])
            .send()
            .await?;
        let data: Value = ensure_success(response).await?.json().await?;

        let news = data
            .get("news")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if news.is_empty() {
            return Ok(format!(
                "No financial news found for ticker symbol '{}'. Please verify the ticker symbol is correct.",
                ticker
            ));
        }

        let mut lines = vec![format!("Financial news for {}:", ticker)];
        for (i, article) in news.iter().take(args.num_results as usize).enumerate() {
            lines.push(format!("{}. {}", i + 1, field(article, "title", "No Title")));
            let publisher = field(article, "publisher", "Unknown");
            match article
                .get("providerPublishTime")
                .and_then(Value::as_i64)
                .and_then(published_at)
            {
                Some(when) => lines.push(format!("   {} | {}", publisher, when)),
                None => lines.push(format!("   {}", publisher)),
            }
            lines.push(format!("   {}", field(article, "link", "No Link")));
        }
        Ok(lines.join("\n"))
    }
}

fn published_at(unix_secs: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(unix_secs, 0).map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
}
