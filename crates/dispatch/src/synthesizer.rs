//! Optional LLM pass over a finished report

use tracing::{debug, info};

use crate::classifier::RequestKind;
use crate::report::Report;
use taskwire_llm::{ChatParams, CompletionBackend, LlmError, Message};

/// Answers a request from a report's gathered material
pub struct Synthesizer<B: CompletionBackend> {
    backend: B,
    model: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl<B: CompletionBackend> Synthesizer<B> {
    pub fn new(backend: B) -> Self {
        let defaults = ChatParams::default();
        Self {
            backend,
            model: None,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        }
    }

    /// Empty model names keep the backend default
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.model = (!model.trim().is_empty()).then_some(model);
        self
    }

    pub fn with_limits(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// System prompt and user message for one report
    pub fn build_messages(&self, report: &Report) -> Vec<Message> {
        let role = system_prompt(report.kind);
        let intent = if report.raw_intent.is_empty() {
            "Summarize the findings below."
        } else {
            report.raw_intent.as_str()
        };

        let user = format!(
            "{}\n\nUse only the provider results below. Mention which provider each fact came from. \
             If every provider failed, say so plainly.\n\n---\n\n{}",
            intent,
            report.render()
        );

        vec![Message::system(role), Message::user(user)]
    }

    pub async fn synthesize(&self, report: &Report) -> taskwire_llm::Result<String> {
        if !self.backend.is_configured() {
            return Err(LlmError::NoApiKey);
        }

        let params = ChatParams {
            model: self
                .model
                .clone()
                .unwrap_or_else(|| self.backend.default_model()),
            messages: self.build_messages(report),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        debug!("◆ SYNTHESIZING WITH {}", params.model);

        let response = self.backend.complete(params).await?;
        let text = response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::InvalidResponse)?;

        info!(
            "◆ SYNTHESIS DONE ({} tokens)",
            response.usage.total_tokens
        );
        Ok(text)
    }
}

fn system_prompt(kind: Option<RequestKind>) -> String {
    let (role, focus) = match kind {
        Some(RequestKind::News) | Some(RequestKind::Historical) => (
            "News Research Specialist",
            "Report the most recent developments first, with dates and sources.",
        ),
        Some(RequestKind::Knowledge) => (
            "Wikidata Knowledge Specialist",
            "Present the key facts and relationships of each entity in an organized format.",
        ),
        Some(RequestKind::Finance) => (
            "Financial News Analyst",
            "Summarize the headlines, then the likely impact on market sentiment and the stock.",
        ),
        Some(RequestKind::Crawl) => (
            "Web Data Extraction Specialist",
            "Summarize what each crawled page contains and where the useful data is.",
        ),
        Some(RequestKind::Academic) => (
            "Scientific Research Specialist",
            "Summarize each paper's contribution, authors and publication date.",
        ),
        Some(RequestKind::Comprehensive) => (
            "Research Analyst",
            "Cross-reference the sources, note where they agree or conflict, and give a structured overview.",
        ),
        Some(RequestKind::Compute) => (
            "Computational Mathematics Expert",
            "State the computed answer first, then any assumptions behind it.",
        ),
        Some(RequestKind::Quick) => (
            "Web Research Specialist",
            "Answer in one or two sentences.",
        ),
        Some(RequestKind::General) | Some(RequestKind::Detailed) | None => (
            "Web Research Specialist",
            "Give a well-organized summary with links to the most relevant sources.",
        ),
    };

    format!(
        "You are a {}. You are given the raw results of one or more information providers. {}",
        role, focus
    )
}
