//! serper.dev Google results: web search and news

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{credential, ensure_success, field, http_client, normalize_base, parse_args};
use crate::descriptor::{ParamSpec, ProviderDescriptor};
use crate::registry::CapabilityProvider;
use crate::{BoxError, Parameters};
use taskwire_config::Credentials;

pub const SERPER_API_KEY: &str = "SERPER_API_KEY";
const DEFAULT_BASE: &str = "https://google.serper.dev";

async fn post_serper(
    client: &reqwest::Client,
    url: String,
    api_key: &str,
    body: Value,
) -> Result<Value, BoxError> {
    let response = client
        .post(url)
        .header("X-API-KEY", api_key)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;
    Ok(ensure_success(response).await?.json().await?)
}

fn format_news(lines: &mut Vec<String>, articles: &[Value], limit: usize) {
    for (i, article) in articles.iter().take(limit).enumerate() {
        lines.push(format!("{}. {}", i + 1, field(article, "title", "No Title")));
        lines.push(format!(
            "   Source: {} | Date: {}",
            field(article, "source", "Unknown"),
            field(article, "date", "Unknown")
        ));
        lines.push(format!("   {}", field(article, "link", "No Link")));
        let snippet = field(article, "snippet", "");
        if !snippet.is_empty() {
            lines.push(format!("   {}", snippet));
        }
    }
}

pub struct SerperSearchProvider {
    descriptor: ProviderDescriptor,
    base_url: String,
    client: reqwest::Client,
}

impl SerperSearchProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let descriptor = ProviderDescriptor::new("serper_search", "Serper Search")
            .describe("Google results via serper.dev: web, images, news or places")
            .requires(SERPER_API_KEY)
            .param(ParamSpec::string("query", "Search query").required())
            .param(
                ParamSpec::integer("num_results", "Number of results (1-10)")
                    .with_default(5)
                    .with_range(1, 10),
            )
            .param(
                ParamSpec::string("result_type", "search, images, news or places")
                    .with_default("search")
                    .one_of(["search", "images", "news", "places"]),
            );

        Self {
            descriptor,
            base_url: normalize_base(base_url),
            client: http_client(),
        }
    }
}

impl Default for SerperSearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    num_results: u32,
    result_type: String,
}

#[async_trait]
impl CapabilityProvider for SerperSearchProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        params: Parameters,
        credentials: &Credentials,
    ) -> Result<String, BoxError> {
        let args: SearchArgs = parse_args(params)?;
        let api_key = credential(credentials, SERPER_API_KEY)?;
        let limit = args.num_results as usize;
        debug!("Serper {}: {}", args.result_type, args.query);

        let data = post_serper(
            &self.client,
            format!("{}/{}", self.base_url, args.result_type),
            &api_key,
            json!({ "q": args.query, "num": args.num_results }),
        )
        .await?;

        let mut lines = vec![format!("Results for: {}", args.query)];

        if let Some(kg) = data.get("knowledgeGraph") {
            lines.push(format!(
                "Knowledge graph: {} ({})",
                field(kg, "title", "N/A"),
                field(kg, "type", "N/A")
            ));
            let description = field(kg, "description", "");
            if !description.is_empty() {
                lines.push(format!("   {}", description));
            }
        }

        let key = match args.result_type.as_str() {
            "images" => "images",
            "news" => "news",
            "places" => "places",
            _ => "organic",
        };
        let items = data
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        if items.is_empty() && lines.len() == 1 {
            return Ok(format!("No results for: {}", args.query));
        }

        match key {
            "news" => format_news(&mut lines, items, limit),
            "images" => {
                for (i, image) in items.iter().take(limit).enumerate() {
                    lines.push(format!("{}. {}", i + 1, field(image, "title", "No Title")));
                    lines.push(format!("   Image: {}", field(image, "imageUrl", "No URL")));
                    lines.push(format!("   Source: {}", field(image, "source", "Unknown")));
                }
            }
            "places" => {
                for (i, place) in items.iter().take(limit).enumerate() {
                    lines.push(format!("{}. {}", i + 1, field(place, "title", "No Title")));
                    lines.push(format!("   Address: {}", field(place, "address", "No Address")));
                    if let Some(rating) = place.get("rating").and_then(Value::as_f64) {
                        let count = place.get("ratingCount").and_then(Value::as_u64).unwrap_or(0);
                        lines.push(format!("   Rating: {} ({} reviews)", rating, count));
                    }
                }
            }
            _ => {
                for (i, result) in items.iter().take(limit).enumerate() {
                    lines.push(format!("{}. {}", i + 1, field(result, "title", "No Title")));
                    lines.push(format!("   {}", field(result, "link", "No Link")));
                    let snippet = field(result, "snippet", "");
                    if !snippet.is_empty() {
                        lines.push(format!("   {}", snippet));
                    }
                }
            }
        }
        Ok(lines.join("\n"))
    }
}

pub struct SerperNewsProvider {
    descriptor: ProviderDescriptor,
    base_url: String,
    client: reqwest::Client,
}

impl SerperNewsProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let descriptor = ProviderDescriptor::new("serper_news", "Serper News")
            .describe("Recent news articles via serper.dev")
            .requires(SERPER_API_KEY)
            .param(ParamSpec::string("query", "News query").required())
            .param(
                ParamSpec::integer("num_results", "Number of articles (1-10)")
                    .with_default(7)
                    .with_range(1, 10),
            )
            .param(
                ParamSpec::string("time_filter", "h, d, w, m or empty for any time")
                    .with_default("")
                    .one_of(["", "h", "d", "w", "m"]),
            );

        Self {
            descriptor,
            base_url: normalize_base(base_url),
            client: http_client(),
        }
    }
}

impl Default for SerperNewsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct NewsArgs {
    query: String,
    num_results: u32,
    #[serde(default)]
    time_filter: String,
}

#[async_trait]
impl CapabilityProvider for SerperNewsProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        params: Parameters,
        credentials: &Credentials,
    ) -> Result<String, BoxError> {
        let args: NewsArgs = parse_args(params)?;
        let api_key = credential(credentials, SERPER_API_KEY)?;
        debug!("Serper news: {}", args.query);

        let mut body = json!({ "q": args.query, "num": args.num_results });
        if !args.time_filter.is_empty() {
            body["tbs"] = Value::String(format!("qdr:{}", args.time_filter));
        }

        let data = post_serper(
            &self.client,
            format!("{}/news", self.base_url),
            &api_key,
            body,
        )
        .await?;

        let articles = data
            .get("news")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        if articles.is_empty() {
            return Ok(format!("No news found for: {}", args.query));
        }

        let mut lines = vec![format!("News for: {}", args.query)];
        format_news(&mut lines, articles, args.num_results as usize);
        Ok(lines.join("\n"))
    }
}
