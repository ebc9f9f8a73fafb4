use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

use kiln_agents::config::KilnConfig;
use kiln_agents::{AgentFactory, AgentKind, AgentStorage, InMemoryStorage, SqliteAgentStorage};
use kiln_tools::StdinPrompter;
use shared_types::SessionResponse;

#[derive(Parser, Debug)]
#[command(name = "kiln-runner", about = "Run one agent to completion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    agent: AgentCommand,

    /// The request to hand the agent
    #[arg(long, global = true)]
    prompt: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file_path: Option<String>,

    /// Keep the session in memory instead of the configured database
    #[arg(long, global = true)]
    memory: bool,

    /// Print the full session transcript as JSON instead of the final answer
    #[arg(long, global = true)]
    transcript: bool,
}

#[derive(Subcommand, Debug)]
enum AgentCommand {
    /// Explore a repository with read-only file tools
    CodebaseAnalysis {
        #[arg(long, value_name = "DIR", default_value = ".")]
        path: PathBuf,
    },
    /// Answer questions about a SQLite database
    SqliteReader {
        #[arg(long, value_name = "PATH")]
        db_path: PathBuf,
    },
    /// Extract text from an image with tesseract
    Tesseract {
        #[arg(long, value_name = "PATH")]
        image_path: PathBuf,
    },
    /// Clarify an automation request by asking questions on the terminal
    Requirements,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file_path.as_deref());

    let (config, config_path) = KilnConfig::load().context("Failed to load kiln config")?;
    tracing::debug!("Loaded config from {}", config_path.display());

    let client = config
        .build_client()
        .with_context(|| format!("Failed to create LLM client from {:?}", config_path))?;

    let storage: Arc<dyn AgentStorage> = if cli.memory {
        Arc::new(InMemoryStorage::new())
    } else {
        let db_path = config.db_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        Arc::new(
            SqliteAgentStorage::open(&db_path)
                .with_context(|| format!("Failed to open session database at {:?}", db_path))?,
        )
    };

    let mut factory =
        AgentFactory::new(client, storage.clone()).with_overrides(config.overrides());
    if let Some(timeout_secs) = config.bash_timeout_secs() {
        factory = factory.with_bash_timeout(timeout_secs);
    }

    let kind = match cli.agent {
        AgentCommand::CodebaseAnalysis { path } => AgentKind::CodebaseAnalysis { base_path: path },
        AgentCommand::SqliteReader { db_path } => {
            let db_path = if db_path.is_absolute() {
                db_path
            } else {
                std::env::current_dir()
                    .context("Failed to read the working directory")?
                    .join(db_path)
            };
            AgentKind::SqliteReader { db_path }
        }
        AgentCommand::Tesseract { image_path } => AgentKind::Tesseract { image_path },
        AgentCommand::Requirements => AgentKind::RequirementsGathering {
            user_prompter: Arc::new(StdinPrompter),
        },
    };

    let agent = factory
        .create(kind)
        .await
        .context("Failed to create agent")?;

    if let Some(pre_conditions) = agent.pre_conditions() {
        for condition in pre_conditions {
            eprintln!("note: {}", condition);
        }
    }

    let prompt = cli
        .prompt
        .unwrap_or_else(|| agent.objective().to_string());
    let outcome = agent.execute(&prompt).await;

    if cli.transcript {
        let session = storage
            .list_sessions()
            .await?
            .into_iter()
            .find(|session| session.agent_name == agent.name())
            .ok_or_else(|| anyhow::anyhow!("Session for {} was not recorded", agent.name()))?;
        let session_id = session
            .id
            .ok_or_else(|| anyhow::anyhow!("Session has no id"))?;
        let messages = storage.get_messages(session_id).await?;
        let tool_calls = storage.get_tool_calls(session_id).await?;
        let response = SessionResponse::from_parts(session, messages, tool_calls);
        println!("{}", serde_json::to_string_pretty(&response)?);
    }

    let result = outcome.context("Agent execution failed")?;
    if !cli.transcript {
        println!("{result}");
    }
    Ok(())
}

fn init_tracing(log_file_path: Option<&str>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(log_path) = log_file_path {
        let log_path = std::path::Path::new(log_path);
        let file_appender = tracing_appender::rolling::never(
            log_path.parent().unwrap_or(std::path::Path::new(".")),
            log_path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("kiln-runner.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
