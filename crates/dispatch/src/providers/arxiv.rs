//! arXiv Atom API

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::debug;

use super::{ensure_success, http_client, normalize_base, parse_args};
use crate::descriptor::{ParamSpec, ProviderDescriptor};
use crate::registry::CapabilityProvider;
use crate::{BoxError, Parameters};
use taskwire_config::Credentials;

const DEFAULT_BASE: &str = "https://export.arxiv.org";
const SUMMARY_CHARS: usize = 500;

pub struct ArxivProvider {
    descriptor: ProviderDescriptor,
    base_url: String,
    client: reqwest::Client,
}

impl ArxivProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let descriptor = ProviderDescriptor::new("arxiv", "arXiv")
            .describe("Scholarly preprints from arXiv")
            .param(ParamSpec::string("query", "Search terms").required())
            .param(
                ParamSpec::integer("num_results", "Number of papers (1-10)")
                    .with_default(3)
                    .with_range(1, 10),
            );

        Self {
            descriptor,
            base_url: normalize_base(base_url),
            client: http_client(),
        }
    }
}

impl Default for ArxivProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct ArxivArgs {
    query: String,
    num_results: u32,
}

#[derive(Debug, Default, PartialEq)]
struct Paper {
    id: String,
    title: String,
    authors: Vec<String>,
    published: String,
    summary: String,
}

#[async_trait]
impl CapabilityProvider for ArxivProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        params: Parameters,
        _credentials: &Credentials,
    ) -> Result<String, BoxError> {
        let args: ArxivArgs = parse_args(params)?;
        let search = format!("all:{}", args.query);
        let max = args.num_results.to_string();
        debug!("arXiv: {}", args.query);

        let response = self
            .client
            .get(format!("{}/api/query", self.base_url))
            .query(&[
                ("search_query", search.as_str()),
                ("start", "0"),
                ("max_results", max.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?;
        let feed = ensure_success(response).await?.text().await?;

        let papers = parse_feed(&feed)?;
        if papers.is_empty() {
            return Ok(format!("No papers found for: {}", args.query));
        }

        let mut lines = vec![format!("arXiv results for: {}", args.query)];
        for (i, paper) in papers.iter().take(args.num_results as usize).enumerate() {
            lines.push(format!("{}. {}", i + 1, paper.title));
            lines.push(format!("   Authors: {}", paper.authors.join(", ")));
            lines.push(format!("   Published: {} | arXiv: {}", paper.published, paper.id));
            lines.push(format!("   {}", paper.summary));
            lines.push(format!("   PDF: https://arxiv.org/pdf/{}.pdf", paper.id));
        }
        Ok(lines.join("\n"))
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    Author,
}

impl Paper {
    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Id => {
                self.id = value.rsplit("/abs/").next().unwrap_or(&value).to_string();
            }
            Field::Title => self.title = value,
            Field::Summary => {
                self.summary = value;
                if let Some((cut, _)) = self.summary.char_indices().nth(SUMMARY_CHARS) {
                    self.summary.truncate(cut);
                    self.summary.push_str("...");
                }
            }
            Field::Published => self.published = value.chars().take(10).collect(),
            Field::Author => self.authors.push(value),
        }
    }
}

/// Pull entries out of an Atom feed; text is unescaped by the reader
fn parse_feed(feed: &str) -> Result<Vec<Paper>, quick_xml::Error> {
    let mut reader = Reader::from_str(feed);
    reader.trim_text(true);

    let mut papers = Vec::new();
    let mut entry: Option<Paper> = None;
    let mut in_author = false;
    let mut field: Option<Field> = None;
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"entry" => entry = Some(Paper::default()),
                b"author" if entry.is_some() => in_author = true,
                name if entry.is_some() => {
                    field = match name {
                        b"id" => Some(Field::Id),
                        b"title" => Some(Field::Title),
                        b"summary" => Some(Field::Summary),
                        b"published" => Some(Field::Published),
                        b"name" if in_author => Some(Field::Author),
                        _ => None,
                    };
                    text.clear();
                }
                _ => {}
            },
            Event::Text(e) if field.is_some() => {
                text.push(' ');
                text.push_str(&e.unescape()?);
            }
            Event::CData(e) if field.is_some() => {
                text.push(' ');
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Event::End(e) => match e.name().as_ref() {
                b"entry" => papers.extend(entry.take()),
                b"author" => in_author = false,
                _ => {
                    if let (Some(f), Some(paper)) = (field.take(), entry.as_mut()) {
                        paper.set(f, collapse_whitespace(&text));
                    }
                }
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(papers)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
