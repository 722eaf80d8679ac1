//! taskwire command implementations

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use taskwire_config::{self, Config, Credentials, GEMINI_API_KEY};
use taskwire_dispatch::{
    builtin_registry, CredentialGate, Dispatcher, Parameters, ProviderRegistry, Report,
    RequestKind, RoutingTable, Synthesizer,
};
use taskwire_llm::OpenAiCompatBackend;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Request kind: name or menu number (see `taskwire kinds`)
    #[arg(short, long, default_value = "general")]
    pub kind: String,

    /// Query text
    #[arg(short, long)]
    pub query: Option<String>,

    /// Extra parameter as name=value (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Ask the language model to answer from the report
    #[arg(long)]
    pub synthesize: bool,
}

/// `name=value`; numbers and booleans are typed, anything else is a string
fn parse_param(raw: &str) -> std::result::Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty parameter name in '{}'", raw));
    }

    let value = value.trim();
    let parsed = match serde_json::from_str::<Value>(value) {
        Ok(v @ (Value::Number(_) | Value::Bool(_))) => v,
        _ => Value::String(value.to_string()),
    };
    Ok((name.to_string(), parsed))
}

/// Config plus credentials for every registered provider and the LLM key
async fn load_environment() -> Result<(Config, ProviderRegistry, Credentials)> {
    let config = Config::load()
        .await
        .context("Failed to load ~/.taskwire/config.json")?;
    let registry = builtin_registry();

    let mut names = registry.credential_names();
    names.push(GEMINI_API_KEY.to_string());
    let credentials = Credentials::load(&config.credentials, &names);
    debug!("◆ {} CREDENTIALS LOADED", credentials.len());

    Ok((config, registry, credentials))
}

/// Initialize config
pub async fn init_command() -> Result<()> {
    println!("◆ Initializing taskwire...");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    taskwire_config::init().await?;

    println!("\n◆ taskwire initialized");
    println!("\nNext steps:");
    println!(
        "  1. Export provider keys (see `taskwire providers`) or add them under \"credentials\" in {}",
        taskwire_config::config_path().display()
    );
    println!("  2. Run a request: taskwire run --kind news --query \"rust 2024 edition\"");

    Ok(())
}

#[derive(Serialize)]
struct RunOutput<'a> {
    report: &'a Report,
    #[serde(skip_serializing_if = "Option::is_none")]
    synthesis: Option<String>,
}

/// Dispatch one request
pub async fn run_command(args: RunArgs) -> Result<()> {
    let (config, registry, credentials) = load_environment().await?;

    let mut parameters = Parameters::new();
    for (name, value) in args.params {
        parameters.insert(name, value);
    }
    if let Some(query) = args.query {
        parameters.insert("query".to_string(), Value::String(query));
    }

    let dispatcher = Dispatcher::from_config(&config, registry, credentials);
    dispatcher.validate()?;

    let report = dispatcher.dispatch(&args.kind, parameters).await?;
    info!("◆ REPORT {} READY", report.invocation_id);

    let synthesis = if args.synthesize {
        synthesize(&config, dispatcher.credentials(), &report).await
    } else {
        None
    };

    if args.json {
        let output = RunOutput {
            report: &report,
            synthesis,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", report.render());
        if let Some(answer) = synthesis {
            println!("\n◆ Synthesis");
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("{}", answer);
        }
    }

    Ok(())
}

/// Failure is a warning; the report is printed either way
async fn synthesize(config: &Config, credentials: &Credentials, report: &Report) -> Option<String> {
    let Some(api_key) = config.llm_api_key(credentials) else {
        warn!("◆ SYNTHESIS SKIPPED: set {} or llm.api_key", GEMINI_API_KEY);
        return None;
    };

    let backend = OpenAiCompatBackend::new(
        api_key,
        config.llm.api_base.clone(),
        Some(config.llm.model.clone()),
    );
    let synthesizer = Synthesizer::new(backend)
        .with_model(config.llm.model.clone())
        .with_limits(config.llm.max_tokens, config.llm.temperature);

    match synthesizer.synthesize(report).await {
        Ok(answer) => Some(answer),
        Err(e) => {
            warn!("◆ SYNTHESIS FAILED: {}", e);
            None
        }
    }
}

/// List providers with availability
pub async fn providers_command() -> Result<()> {
    let (_config, registry, credentials) = load_environment().await?;
    let gate = CredentialGate::new(&credentials);

    println!("◆ Providers");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for descriptor in registry.descriptors() {
        let missing = gate.missing(descriptor);
        let state = if missing.is_empty() {
            "[Available]".to_string()
        } else {
            format!("[Missing: {}]", missing.join(", "))
        };
        println!("{:<15} {}", descriptor.id, state);
        println!("  {}", descriptor.description);
    }

    Ok(())
}

/// List request kinds and their routes
pub async fn kinds_command() -> Result<()> {
    let routes = RoutingTable::default();

    println!("◆ Request Kinds");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for (kind, route) in routes.routes() {
        println!(
            "{}. {:<14} {:<14} {}",
            kind.menu_number(),
            kind.as_str(),
            route.policy.to_string(),
            route.candidates.join(", ")
        );
    }
    println!(
        "\nUnknown kinds fall back to {} with \"{}\"",
        RequestKind::General,
        routes.fallback_template()
    );

    Ok(())
}

/// Show system status
pub async fn status_command() -> Result<()> {
    let config_path = taskwire_config::config_path();

    println!("◆ taskwire System Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!(
        "Config:    {} {}",
        config_path.display(),
        if config_path.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );

    let (config, registry, credentials) = load_environment().await?;
    println!("Model:     {}", config.llm.model);
    println!(
        "LLM Key:   {}",
        if config.has_llm_api_key(&credentials) {
            "[Set]"
        } else {
            "[Missing]"
        }
    );

    let available = registry
        .availability(&credentials)
        .into_iter()
        .filter(|(_, ok)| *ok)
        .count();
    println!("Providers: {} of {} available", available, registry.len());
    println!(
        "Limits:    timeout {}s, parallelism {}, payload {} chars",
        config.default_timeout().as_secs(),
        config.max_parallelism(),
        config.max_payload_chars()
    );

    Ok(())
}
