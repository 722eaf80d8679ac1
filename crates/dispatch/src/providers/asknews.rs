//! AskNews search over a lookback window

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{credential, ensure_success, field, http_client, normalize_base, parse_args};
use crate::descriptor::{ParamSpec, ProviderDescriptor};
use crate::registry::CapabilityProvider;
use crate::{BoxError, Parameters};
use taskwire_config::Credentials;

pub const ASKNEWS_CLIENT_ID: &str = "ASKNEWS_CLIENT_ID";
pub const ASKNEWS_CLIENT_SECRET: &str = "ASKNEWS_CLIENT_SECRET";
const DEFAULT_API_BASE: &str = "https://api.asknews.app";
const DEFAULT_AUTH_BASE: &str = "https://auth.asknews.app";
const SUMMARY_CHARS: usize = 300;

pub struct AskNewsProvider {
    descriptor: ProviderDescriptor,
    api_base: String,
    auth_base: String,
    client: reqwest::Client,
}

impl AskNewsProvider {
    pub fn new() -> Self {
        Self::with_base_urls(DEFAULT_API_BASE, DEFAULT_AUTH_BASE)
    }

    /// Token and search endpoints on one host
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        Self::with_base_urls(base.clone(), base)
    }

    pub fn with_base_urls(api_base: impl Into<String>, auth_base: impl Into<String>) -> Self {
        let descriptor = ProviderDescriptor::new("asknews", "AskNews")
            .describe("News articles from a lookback window, with summaries")
            .requires(ASKNEWS_CLIENT_ID)
            .requires(ASKNEWS_CLIENT_SECRET)
            .param(ParamSpec::string("query", "News query").required())
            .param(
                ParamSpec::integer("num_results", "Number of articles (1-10)")
                    .with_default(5)
                    .with_range(1, 10),
            )
            .param(
                ParamSpec::integer("hours_back", "Lookback window in hours (1-720)")
                    .with_default(168)
                    .with_range(1, 720),
            );

        Self {
            descriptor,
            api_base: normalize_base(api_base),
            auth_base: normalize_base(auth_base),
            client: http_client(),
        }
    }

    /// Client-credentials grant for the `news` scope
    async fn access_token(&self, client_id: &str, secret: &str) -> Result<String, BoxError> {
        let response = self
            .client
            .post(format!("{}/oauth2/token", self.auth_base))
            .basic_auth(client_id, Some(secret))
            .form(&[("grant_type", "client_credentials"), ("scope", "news")])
            .send()
            .await?;
        let data: Value = ensure_success(response).await?.json().await?;

        data.get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "token response has no access_token".into())
    }
}

impl Default for AskNewsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct AskNewsArgs {
    query: String,
    num_results: u32,
    hours_back: u32,
}

#[async_trait]
impl CapabilityProvider for AskNewsProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        params: Parameters,
        credentials: &Credentials,
    ) -> Result<String, BoxError> {
        let args: AskNewsArgs = parse_args(params)?;
        let client_id = credential(credentials, ASKNEWS_CLIENT_ID)?;
        let secret = credential(credentials, ASKNEWS_CLIENT_SECRET)?;
        debug!("AskNews: {} ({}h back)", args.query, args.hours_back);

        let token = self.access_token(&client_id, &secret).await?;
        let count = args.num_results.to_string();
        let hours = args.hours_back.to_string();

        let response = self
            .client
            .get(format!("{}/v1/news/search", self.api_base))
            .bearer_auth(token)
            .query(&[
                ("query", args.query.as_str()),
                ("n_articles", count.as_str()),
                ("hours_back", hours.as_str()),
                ("return_type", "dicts"),
                ("method", "kw"),
            ])
            .send()
            .await?;
        let data: Value = ensure_success(response).await?.json().await?;

        let articles = data
            .get("as_dicts")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if articles.is_empty() {
            return Ok(format!(
                "No news found for: {} (last {}h)",
                args.query, args.hours_back
            ));
        }

        let mut lines = vec![format!(
            "News from the last {}h for: {}",
            args.hours_back, args.query
        )];
        for (i, article) in articles.iter().take(args.num_results as usize).enumerate() {
            let title = article
                .get("eng_title")
                .or_else(|| article.get("title"))
                .and_then(Value::as_str)
                .unwrap_or("No Title");
            lines.push(format!("{}. {}", i + 1, title));
            lines.push(format!(
                "   {} | {}",
                field(article, "source_id", "Unknown"),
                field(article, "pub_date", "")
            ));
            lines.push(format!("   {}", field(article, "article_url", "No URL")));

            let summary: String = field(article, "summary", "").chars().take(SUMMARY_CHARS).collect();
            if !summary.is_empty() {
                lines.push(format!("   {}", summary));
            }
        }
        Ok(lines.join("\n"))
    }
}
