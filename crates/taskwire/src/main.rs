//! taskwire - tool-augmented task dispatcher

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{init_command, kinds_command, providers_command, run_command, status_command, RunArgs};

/// taskwire - route one request to the right information providers
#[derive(Parser)]
#[command(name = "taskwire")]
#[command(about = "◆ Tool-augmented task dispatcher")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config
    Init,
    /// Dispatch one request and print the report
    Run(RunArgs),
    /// List providers and their availability
    Providers,
    /// List request kinds and their routes
    Kinds,
    /// Show system status
    Status,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Init => {
            if let Err(e) = init_command().await {
                error!("Init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Run(args) => {
            if let Err(e) = run_command(args).await {
                error!("Run failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Providers => {
            if let Err(e) = providers_command().await {
                error!("Providers failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Kinds => {
            if let Err(e) = kinds_command().await {
                error!("Kinds failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Status => {
            if let Err(e) = status_command().await {
                error!("Status failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}
