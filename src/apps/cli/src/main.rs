//! FinChat CLI
//!
//! Terminal client for the FinChat stock analysis backend

mod chat;
mod config;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use finchat_core::infrastructure::api::{parse_date, AnalysisRequest};
use finchat_core::FinChatApiClient;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "finchat", version, about = "FinChat - stock analysis assistant", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/finchat/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend origin, e.g. http://localhost:8000
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Chat model id sent with every request
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat {
        /// Stock to ask about
        #[arg(short, long)]
        stock: Option<String>,
    },

    /// Ask a single question and print the streamed answer
    Ask {
        #[arg(short, long)]
        stock: Option<String>,

        message: String,
    },

    /// List models offered by the backend
    Models,

    /// Generate a markdown analysis report for a stock
    Analyze {
        #[arg(short, long)]
        stock: String,

        /// First day of the analysed range (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last day of the analysed range (YYYY-MM-DD)
        #[arg(long)]
        end: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let mut cli_config = CliConfig::load(cli.config.as_deref())?;
    cli_config.apply_env();
    cli_config.apply_overrides(cli.base_url, cli.model);
    let client_config = cli_config
        .to_client_config()
        .context("Invalid client configuration")?;
    debug!(
        "Using backend {} with model {}",
        client_config.base_url, client_config.chat_model
    );

    let client = FinChatApiClient::new(client_config.clone())?;

    match cli.command.unwrap_or(Commands::Chat { stock: None }) {
        Commands::Chat { stock } => {
            let stock = stock.or(cli_config.stock);
            info!("Starting interactive chat");
            chat::run_repl(client, &client_config, stock).await
        }
        Commands::Ask { stock, message } => {
            let stock = stock.or(cli_config.stock).unwrap_or_default();
            chat::ask_once(client, &client_config, &message, &stock).await
        }
        Commands::Models => {
            let models = client.list_models().await?;
            for model in models {
                let marker = if model.id == client_config.chat_model { "*" } else { " " };
                println!("{} {:<20} {}", marker, model.id, model.name);
            }
            Ok(())
        }
        Commands::Analyze { stock, start, end } => {
            let request = AnalysisRequest::new(
                stock,
                parse_date(&start)?,
                parse_date(&end)?,
                client_config.chat_model.clone(),
            )?;
            eprintln!(
                "Analyzing {} from {} to {}; this can take a few minutes...",
                request.stock_name, request.start_date, request.end_date
            );
            let report = client.analyze_stock(&request).await?;
            println!("{}", report.report);
            Ok(())
        }
    }
}
