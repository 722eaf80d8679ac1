//! Wolfram Alpha short-answer API

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{credential, http_client, normalize_base, parse_args};
use crate::descriptor::{ParamSpec, ProviderDescriptor};
use crate::registry::CapabilityProvider;
use crate::{BoxError, Parameters};
use taskwire_config::Credentials;

pub const WOLFRAM_ALPHA_APPID: &str = "WOLFRAM_ALPHA_APPID";
const DEFAULT_BASE: &str = "https://api.wolframalpha.com";

pub struct WolframAlphaProvider {
    descriptor: ProviderDescriptor,
    base_url: String,
    client: reqwest::Client,
}

impl WolframAlphaProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let descriptor = ProviderDescriptor::new("wolfram_alpha", "Wolfram Alpha")
            .describe("Computations and factual answers from Wolfram Alpha")
            .requires(WOLFRAM_ALPHA_APPID)
            .param(ParamSpec::string("query", "Question or expression").required());

        Self {
            descriptor,
            base_url: normalize_base(base_url),
            client: http_client(),
        }
    }
}

impl Default for WolframAlphaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct WolframArgs {
    query: String,
}

#[async_trait]
impl CapabilityProvider for WolframAlphaProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        params: Parameters,
        credentials: &Credentials,
    ) -> Result<String, BoxError> {
        let args: WolframArgs = parse_args(params)?;
        let appid = credential(credentials, WOLFRAM_ALPHA_APPID)?;
        debug!("Wolfram Alpha: {}", args.query);

        let response = self
            .client
            .get(format!("{}/v1/result", self.base_url))
            .query(&[("appid", appid.as_str()), ("i", args.query.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let body = body.trim();

        // 501: the input was understood but has no short answer
        if status == reqwest::StatusCode::NOT_IMPLEMENTED {
            return Err(format!("no short answer available: {}", body).into());
        }
        if !status.is_success() {
            return Err(format!("API returned {}: {}", status, body).into());
        }
        if body.is_empty() {
            return Err("empty answer".into());
        }

        Ok(format!("Q: {}\nA: {}", args.query, body))
    }
}
