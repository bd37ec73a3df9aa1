use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use voyage_agents::{MistralClient, ModelConfig, TravelAgent};
use voyage_observability::init_cli_tracing;

#[derive(Debug, Parser)]
#[command(name = "voyage")]
#[command(about = "Plan a trip from a plain-language request")]
struct Cli {
    /// Overrides VOYAGE_MODEL for this run
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the trip details extracted from the request
    Extract {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Plan the trip and narrate it day by day
    Plan {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Print the structured plan instead of the narration
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_cli_tracing("voyage_cli");
    let cli = Cli::parse();

    let agent = build_agent(cli.model)?;

    match cli.command {
        Command::Extract { query } => {
            let details = agent.extract_details(&query.join(" ")).await?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }
        Command::Plan { query, json } => {
            let plan = agent.plan_trip(&query.join(" ")).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                let mut fragments = agent.narrate(&plan).await?;
                let mut stdout = io::stdout();
                while let Some(fragment) = fragments.next().await {
                    stdout.write_all(fragment?.as_bytes())?;
                    stdout.flush()?;
                }
                writeln!(stdout)?;
            }
        }
    }

    Ok(())
}

fn build_agent(model_override: Option<String>) -> Result<TravelAgent<MistralClient>> {
    let mut config = ModelConfig::from_env().context("failed to read model configuration")?;
    if let Some(model) = model_override {
        config.model = model;
    }

    let client = MistralClient::new(config).context("failed to build model client")?;
    Ok(TravelAgent::new(Arc::new(client)))
}
