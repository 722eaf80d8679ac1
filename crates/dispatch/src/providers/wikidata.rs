//! Wikidata entity search

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{ensure_success, field, http_client, normalize_base, parse_args};
use crate::descriptor::{ParamSpec, ProviderDescriptor};
use crate::registry::CapabilityProvider;
use crate::{BoxError, Parameters};
use taskwire_config::Credentials;

const DEFAULT_BASE: &str = "https://www.wikidata.org";

pub struct WikidataProvider {
    descriptor: ProviderDescriptor,
    base_url: String,
    client: reqwest::Client,
}

impl WikidataProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let descriptor = ProviderDescriptor::new("wikidata", "Wikidata")
            .describe("Structured facts about people, places and organizations")
            .param(ParamSpec::string("query", "Entity name").required())
            .param(
                ParamSpec::integer("num_results", "Number of entities (1-5)")
                    .with_default(3)
                    .with_range(1, 5),
            );

        Self {
            descriptor,
            base_url: normalize_base(base_url),
            client: http_client(),
        }
    }
}

impl Default for WikidataProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct WikidataArgs {
    query: String,
    num_results: u32,
}

#[async_trait]
impl CapabilityProvider for WikidataProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        params: Parameters,
        _credentials: &Credentials,
    ) -> Result<String, BoxError> {
        let args: WikidataArgs = parse_args(params)?;
        let limit = args.num_results.to_string();
        debug!("Wikidata: {}", args.query);

        let response = self
            .client
            .get(format!("{}/w/api.php", self.base_url))
            .query(&[
                ("action", "wbsearchentities"),
                ("search", args.query.as_str()),
                ("language", "en"),
                ("type", "item"),
                ("format", "json"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;
        let data: Value = ensure_success(response).await?.json().await?;

        if let Some(info) = data.pointer("/error/info").and_then(Value::as_str) {
            return Err(format!("Wikidata error: {}", info).into());
        }

        let entities = data
            .get("search")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if entities.is_empty() {
            return Ok(format!("No Wikidata information found for '{}'", args.query));
        }

        let mut lines = vec![format!("Wikidata results for: {}", args.query)];
        for (i, entity) in entities.iter().take(args.num_results as usize).enumerate() {
            let id = field(entity, "id", "?");
            lines.push(format!("{}. {} ({})", i + 1, field(entity, "label", id), id));
            let description = field(entity, "description", "");
            if !description.is_empty() {
                lines.push(format!("   {}", description));
            }
            let url = entity
                .get("concepturi")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("https://www.wikidata.org/wiki/{}", id));
            lines.push(format!("   {}", url));
        }
        Ok(lines.join("\n"))
    }
}
