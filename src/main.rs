mod doctor;

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flowfusion_core::config::AppConfig;
use flowfusion_core::traits::Retriever;
use flowfusion_engine::{Workflow, WorkflowExecutor};
use flowfusion_gateway::GatewayServer;

#[derive(Parser)]
#[command(
    name = "flowfusion",
    version,
    about = "Run retrieval-augmented LLM workflows built in the FlowFusion editor"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "flowfusion.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway (default)
    Serve,
    /// Execute one workflow from a JSON file and print the response
    Run {
        /// Workflow file: {"nodes": [...], "edges": [...]}
        #[arg(short, long)]
        workflow: PathBuf,
        /// The query to answer (read from stdin when omitted)
        #[arg(trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Show current configuration
    Config,
    /// Run system health checks
    Doctor,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("flowfusion=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Some(Commands::Completions { shell }) = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "flowfusion", &mut std::io::stdout());
        return Ok(());
    }

    let (config, config_source) = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Config) => {
            println!("{}", toml::to_string_pretty(&config.redacted())?);
        }
        Some(Commands::Doctor) => {
            doctor::run_doctor(&config, config_source.as_deref());
        }
        Some(Commands::Run { workflow, query }) => {
            let text = if query.is_empty() {
                io::stdin()
                    .lock()
                    .lines()
                    .map_while(|l| l.ok())
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                query.join(" ")
            };
            let workflow = read_workflow(&workflow)?;
            let executor = build_executor(&config).await?;

            let cancel = shutdown_on_ctrl_c("Cancelling workflow run...");
            let outcome = executor.execute(&workflow, &text, &cancel).await?;
            println!("{}", outcome.response());
        }
        Some(Commands::Serve) | None => {
            let executor = build_executor(&config).await?;
            info!(bind = %config.gateway.bind, "Starting HTTP gateway");
            let server = GatewayServer::new(config.gateway.clone(), executor);

            let cancel = shutdown_on_ctrl_c("Shutting down gateway...");
            server.run(cancel).await?;
        }
        Some(Commands::Completions { .. }) => unreachable!("handled before config load"),
    }

    Ok(())
}

/// Load the config file, falling back to `~/.flowfusion/config.toml`, then to defaults.
fn load_config(path: &Path) -> anyhow::Result<(AppConfig, Option<PathBuf>)> {
    if path.exists() {
        return Ok((AppConfig::load(path)?, Some(path.to_path_buf())));
    }

    if let Some(home_config) = dirs_home().map(|h| h.join(".flowfusion").join("config.toml")) {
        if home_config.exists() {
            info!(path = %home_config.display(), "Loading config from home directory");
            return Ok((AppConfig::load(&home_config)?, Some(home_config)));
        }
    }

    warn!(
        path = %path.display(),
        "No config file found, using defaults (set OPENAI_API_KEY to enable generation)"
    );
    Ok((AppConfig::default(), None))
}

fn read_workflow(path: &Path) -> anyhow::Result<Workflow> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading workflow file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing workflow file {}", path.display()))
}

async fn build_executor(config: &AppConfig) -> anyhow::Result<Arc<WorkflowExecutor>> {
    let knowledge_base = flowfusion_memory::load_knowledge_base(config).await?;
    info!(
        documents = knowledge_base.len()?,
        embeddings = knowledge_base.has_embedder(),
        "Knowledge base ready"
    );
    let retriever: Arc<dyn Retriever> = Arc::new(knowledge_base);

    let generator = flowfusion_llm::create_generator(&config.model);
    if !generator.is_configured() {
        warn!("Generation service is not configured; runs will return an advisory");
    }

    Ok(Arc::new(WorkflowExecutor::new(
        retriever,
        generator,
        &config.engine,
    )))
}

fn shutdown_on_ctrl_c(message: &'static str) -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("{}", message);
        cancel_clone.cancel();
    });
    cancel
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
