#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use relaydesk::embeddings::create_embedder;
use relaydesk::memory::{MessageStore, Role};
use relaydesk::orchestrator::Orchestrator;
use relaydesk::providers::{create_provider, list_providers, ProviderConfig};
use relaydesk::sessions::SessionManager;
use relaydesk::store::create_store;
use relaydesk::tools::default_registry;
use relaydesk::{ChatError, Config};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful support assistant. \
Use the transferToHuman tool when the customer asks for a person.";

fn parse_temperature(s: &str) -> std::result::Result<f64, String> {
    let t: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=2.0).contains(&t) {
        return Err("temperature must be between 0.0 and 2.0".to_string());
    }
    Ok(t)
}

/// `relaydesk` - support-chat session core with human handoff.
#[derive(Parser, Debug)]
#[command(name = "relaydesk")]
#[command(version)]
#[command(about = "Support-chat sessions: memory, tools, and human handoff.", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a support chat session
    #[command(long_about = "\
Start a support chat session.

Runs an interactive conversation against the configured completion
provider. Use --message for a single turn without entering interactive
mode. Inside the interactive session, /takeover <agent-id> picks up a
queued handoff, /reply <text> answers as the assigned agent, /back hands
the session back to the AI, and /quit exits.

Examples:
  relaydesk chat                          # interactive session
  relaydesk chat -m \"where is my order?\"  # single turn
  relaydesk chat -p openai --model gpt-4o-mini")]
    Chat {
        /// Single message mode (don't enter interactive mode)
        #[arg(short, long)]
        message: Option<String>,

        /// Provider to use (openai, offline)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model to use
        #[arg(long)]
        model: Option<String>,

        /// Temperature (0.0 - 2.0)
        #[arg(short, long, default_value = "0.7", value_parser = parse_temperature)]
        temperature: f64,

        /// Resume an existing session instead of creating one
        #[arg(long)]
        session: Option<String>,

        /// User id owning the session
        #[arg(long, default_value = "local-user")]
        user: String,
    },

    /// Show resolved configuration
    Status,

    /// List supported completion providers
    Providers,

    /// Print the stored transcript for a session
    Transcript {
        session_id: String,

        /// Only show the last N messages
        #[arg(long)]
        recent: Option<usize>,
    },
}

fn build_orchestrator(config: &Config, provider_override: Option<&str>) -> Result<Orchestrator> {
    let store = create_store(&config.store_backend, &config.workspace_dir)?;
    let embedder = create_embedder(
        &config.embedding_backend,
        config.api_key.as_deref(),
        config.api_url.as_deref(),
    )?;
    let sessions = Arc::new(SessionManager::new(store.clone()));
    let memory = Arc::new(MessageStore::new(
        store,
        embedder,
        sessions.clone(),
        config.memory.clone(),
    ));
    let tools = Arc::new(default_registry(sessions.clone()));

    let provider_name = provider_override
        .or(config.default_provider.as_deref())
        .unwrap_or("offline");
    let provider = create_provider(
        provider_name,
        config.api_key.as_deref(),
        config.api_url.as_deref(),
    )?;

    Ok(Orchestrator::new(sessions, memory, tools, provider))
}

fn role_label(role: Role) -> console::StyledObject<&'static str> {
    match role {
        Role::User => style("you").green(),
        Role::Assistant => style("assistant").cyan(),
        Role::System => style("system").dim(),
        Role::Function => style("tool").yellow(),
        Role::HumanAgent => style("agent").magenta(),
    }
}

async fn prompt_line() -> Result<String> {
    tokio::task::spawn_blocking(|| {
        dialoguer::Input::<String>::new()
            .with_prompt("you")
            .allow_empty(true)
            .interact_text()
    })
    .await?
    .map_err(Into::into)
}

async fn run_chat(
    config: Config,
    message: Option<String>,
    provider: Option<String>,
    model: Option<String>,
    temperature: f64,
    session: Option<String>,
    user: String,
) -> Result<()> {
    let orchestrator = build_orchestrator(&config, provider.as_deref())?;

    let provider_config = ProviderConfig {
        provider: provider.clone(),
        model: model
            .or(config.default_model.clone())
            .unwrap_or_else(|| "gpt-4o-mini".to_string()),
        temperature,
        max_tokens: None,
    };

    let session_id = match session {
        Some(id) => {
            if orchestrator.session(&id).await?.is_none() {
                bail!("session not found: {id}");
            }
            id
        }
        None => {
            let id = orchestrator
                .create_session(&user, None, Some(DEFAULT_SYSTEM_PROMPT))
                .await?;
            println!("{} {id}", style("session").dim());
            id
        }
    };

    if let Some(text) = message {
        let outcome = orchestrator
            .send_message(&session_id, &text, &provider_config)
            .await?;
        println!(
            "{}: {}",
            role_label(outcome.response.role),
            outcome.response.content_str()
        );
        if let Some(handoff) = outcome.handoff {
            println!(
                "{} handoff requested ({})",
                style("→").yellow(),
                handoff.reason.as_deref().unwrap_or("no reason given")
            );
        }
        return Ok(());
    }

    println!("Type a message, or /takeover <agent-id>, /reply <text>, /back, /quit.");
    let mut current_agent: Option<String> = None;

    loop {
        let line = prompt_line().await?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        let result = if let Some(agent) = line.strip_prefix("/takeover") {
            let agent = agent.trim();
            if agent.is_empty() {
                eprintln!("usage: /takeover <agent-id>");
                continue;
            }
            match orchestrator.human_takeover(&session_id, agent, agent).await {
                Ok(_) => {
                    current_agent = Some(agent.to_string());
                    println!("{} {agent} joined the session", style("→").magenta());
                    continue;
                }
                Err(err) => Err(err),
            }
        } else if let Some(text) = line.strip_prefix("/reply") {
            let Some(agent) = current_agent.clone() else {
                eprintln!("no agent assigned; use /takeover first");
                continue;
            };
            match orchestrator
                .send_human_agent_message(&session_id, text.trim(), &agent, &agent)
                .await
            {
                Ok(()) => {
                    println!("{}: {}", role_label(Role::HumanAgent), text.trim());
                    continue;
                }
                Err(err) => Err(err),
            }
        } else if line == "/back" {
            let Some(agent) = current_agent.take() else {
                eprintln!("no agent assigned; use /takeover first");
                continue;
            };
            match orchestrator.transfer_to_ai(&session_id, &agent, None).await {
                Ok(_) => {
                    println!("{} session handed back to the AI", style("→").cyan());
                    continue;
                }
                Err(err) => Err(err),
            }
        } else {
            match orchestrator
                .send_message(&session_id, line, &provider_config)
                .await
            {
                Ok(outcome) => {
                    println!(
                        "{}: {}",
                        role_label(outcome.response.role),
                        outcome.response.content_str()
                    );
                    if let Some(handoff) = outcome.handoff {
                        println!(
                            "{} handoff requested ({})",
                            style("→").yellow(),
                            handoff.reason.as_deref().unwrap_or("no reason given")
                        );
                    }
                    continue;
                }
                Err(err) => Err(err),
            }
        };

        match result {
            Err(err @ (ChatError::InvalidState { .. } | ChatError::NotAssigned { .. })) => {
                eprintln!("{} {err}", style("error").red());
            }
            Err(err) => return Err(err.into()),
            Ok(()) => {}
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(config_dir) = &cli.config_dir {
        if config_dir.trim().is_empty() {
            bail!("--config-dir cannot be empty");
        }
        std::env::set_var("RELAYDESK_CONFIG_DIR", config_dir);
    }

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut config = Config::load_or_init().await?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Chat {
            message,
            provider,
            model,
            temperature,
            session,
            user,
        } => run_chat(config, message, provider, model, temperature, session, user).await,

        Commands::Status => {
            println!("relaydesk status");
            println!();
            println!("Version:     {}", env!("CARGO_PKG_VERSION"));
            println!("Config:      {}", config.config_path.display());
            println!("Workspace:   {}", config.workspace_dir.display());
            println!();
            println!(
                "Provider:    {}",
                config.default_provider.as_deref().unwrap_or("offline")
            );
            println!(
                "Model:       {}",
                config.default_model.as_deref().unwrap_or("(default)")
            );
            println!("Store:       {}", config.store_backend);
            println!("Embeddings:  {}", config.embedding_backend);
            println!();
            println!("Memory:");
            println!("  Max messages:        {}", config.memory.max_messages);
            println!("  Summarize threshold: {}", config.memory.summarize_threshold);
            println!("  TTL (seconds):       {}", config.memory.ttl_seconds);
            println!(
                "  Embeddings:          {}",
                if config.memory.use_embeddings { "on" } else { "off" }
            );
            Ok(())
        }

        Commands::Providers => {
            let providers = list_providers();
            let current = config
                .default_provider
                .as_deref()
                .unwrap_or("offline")
                .trim()
                .to_ascii_lowercase();
            println!("Supported providers ({} total):\n", providers.len());
            for p in &providers {
                let marker = if p.name.eq_ignore_ascii_case(&current) {
                    " (active)"
                } else {
                    ""
                };
                let local_tag = if p.local { " [local]" } else { "" };
                println!("  {:<10} {}{}{}", p.name, p.display_name, local_tag, marker);
            }
            println!("\nSet api_url in config to use any OpenAI-compatible endpoint.");
            Ok(())
        }

        Commands::Transcript { session_id, recent } => {
            let orchestrator = build_orchestrator(&config, None)?;
            let messages = match recent {
                Some(count) => orchestrator.recent_messages(&session_id, count).await?,
                None => orchestrator.messages(&session_id).await?,
            };
            if messages.is_empty() {
                println!("No messages stored for session {session_id}.");
                return Ok(());
            }
            for message in &messages {
                let label = role_label(message.role);
                match &message.name {
                    Some(name) => println!("{label} ({name}): {}", message.content_str()),
                    None => println!("{label}: {}", message.content_str()),
                }
            }
            Ok(())
        }
    }
}
