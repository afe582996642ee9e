use anyhow::Context;
use clap::{Parser, Subcommand};
use lib::adapter::{Adapter, AdapterOptions};
use lib::channels::{SlackTransport, Transport, TransportEvent};
use lib::config;
use lib::triggers::TriggerSet;
use std::sync::Arc;
use tokio::sync::mpsc;

mod actions;

#[derive(Parser)]
#[command(name = "slackline")]
#[command(about = "Slackline — relay Slack messages into host actions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: SLACKLINE_CONFIG_PATH or ~/.slackline/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Connect to Slack and relay matched messages as actions.
    Run {
        /// Config file path (default: SLACKLINE_CONFIG_PATH or ~/.slackline/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("slackline {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Run { config }) => {
            if let Err(e) = run_adapter(config).await {
                log::error!("run failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

const DEFAULT_CONFIG: &str = r#"{
  "slack": {
    "enabled": true,
    "triggerPatterns": ["(?i)^action\\s(\\w*).*$"],
    "messagesToSave": 100,
    "republishRoomName": null
  }
}
"#;

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(config::default_config_path);
    let config_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;
    if path.exists() {
        log::debug!("config already exists at {}, skipping", path.display());
    } else {
        std::fs::write(&path, DEFAULT_CONFIG)
            .with_context(|| format!("writing default config to {}", path.display()))?;
        log::info!("created default config at {}", path.display());
    }
    println!("initialized configuration at {}", path.display());
    Ok(())
}

async fn run_adapter(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let (config, path) = config::load_config(config_path)?;
    if !config.slack.enabled {
        log::warn!("slack adapter disabled in {}; nothing to do", path.display());
        return Ok(());
    }
    let token = config::resolve_slack_token(&config).ok_or_else(|| {
        anyhow::anyhow!("slack token not configured; set SLACK_BOT_TOKEN or slack.token")
    })?;
    let triggers = TriggerSet::compile(&config.slack.trigger_patterns)?;
    if triggers.is_empty() {
        log::warn!("no trigger patterns configured; messages will be recorded but never dispatched");
    }

    let transport = Arc::new(SlackTransport::new(token));
    let (events_tx, events_rx) = mpsc::channel::<TransportEvent>(64);
    let inbound_task = Arc::clone(&transport).start_inbound(events_tx);

    let transport_for_signal = Arc::clone(&transport);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("shutting down");
            transport_for_signal.stop();
        }
    });

    let adapter = Adapter::new(
        AdapterOptions {
            triggers,
            messages_to_save: config.slack.messages_to_save,
            republish_room: config.slack.republish_room_name.clone(),
        },
        Arc::clone(&transport) as Arc<dyn lib::channels::Transport>,
        Arc::new(actions::BuiltinDispatcher::new()),
        Arc::new(actions::LoggingRegistry),
    );
    let result = adapter.run(events_rx).await;
    let _ = inbound_task.await;
    result.map_err(Into::into)
}
