//! CLI entry point for the Direct Line bridge

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use directline_channels::{DirectLineSession, SessionHandle};
use directline_core::config::{validate_config, Config, ConfigLoader};
use directline_core::logging::init_logging;
use directline_manager::{run_server, AppState};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "directline")]
#[command(about = "Relay messages to a bot over the Direct Line API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP bridge
    Serve {
        /// Address to bind (overrides gateway.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides gateway.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send one message to the bot and print its reply
    Chat {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Sender id for the outbound activity (defaults to directline.user_id)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Show the effective configuration
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    let config = config_loader.load_unchecked()?;
    let _log_guard = init_logging(&config.logging);

    match cli.command {
        Commands::Serve { host, port } => {
            validate_config(&config)?;
            info!("Starting bridge");
            run_serve(config, host, port).await?;
        }
        Commands::Chat { message, user } => {
            validate_config(&config)?;
            run_chat(&config, &message, user).await?;
        }
        Commands::Status => {
            run_status(&config_loader, &config);
        }
    }

    Ok(())
}

async fn run_serve(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.gateway.host.clone());
    let port = port.unwrap_or(config.gateway.port);
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid bind address: {}", host))?;
    let addr = SocketAddr::new(ip, port);

    // Fail fast: no token, no server.
    let session = DirectLineSession::connect(&config.directline)
        .await
        .context("Failed to initialize Direct Line session")?;
    info!("Direct Line API initialized.");

    let (handle, session_task) = SessionHandle::spawn(session);
    let state = AppState::new(handle, &config.gateway);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let server = tokio::spawn(run_server(state, addr, shutdown_rx));

    println!("{}", style("Direct Line bridge is running.").bold().cyan());
    println!("Listening on http://{}", addr);
    println!("{}", style("Press Ctrl+C to stop.").green());

    tokio::signal::ctrl_c().await?;
    println!("\n{}", style("Shutting down...").yellow());
    let _ = shutdown_tx.send(());

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Server error: {}", e),
        Err(e) => error!("Server task failed: {}", e),
    }

    // An in-flight reply poll would otherwise keep the session task alive.
    session_task.abort();
    let _ = session_task.await;

    Ok(())
}

async fn run_chat(config: &Config, message: &str, user: Option<String>) -> Result<()> {
    // The sender also becomes the local user so its own echo is never taken as the reply.
    let mut directline = config.directline.clone();
    if let Some(user) = user {
        directline.user_id = user;
    }

    let mut session = DirectLineSession::connect(&directline)
        .await
        .context("Failed to initialize Direct Line session")?;

    session.send_message(message, None).await?;

    let cancel = CancellationToken::new();
    let cancel_on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_ctrl_c.cancel();
        }
    });

    let reply = session.await_reply(&cancel).await?;

    println!("{} {}", style("Bot:").bold().green(), reply.text);
    println!("{} {}", style("Conversation:").dim(), reply.conversation_id);
    if let Some(citation) = reply.citation {
        println!(
            "{} {}",
            style("Citation:").dim(),
            serde_json::to_string_pretty(&citation)?
        );
    }
    Ok(())
}

fn run_status(loader: &ConfigLoader, config: &Config) {
    println!("{}", style("Direct Line bridge status").bold().cyan());
    println!("Config file: {}", loader.config_path().display());

    let directline = &config.directline;
    println!("Secret: {}", mask_secret(&directline.secret));
    println!("Bot endpoint: {}", or_unset(&directline.bot_endpoint));
    println!("Token endpoint: {}", directline.token_endpoint);
    println!("Local user id: {}", directline.user_id);
    println!("Poll interval: {} ms", directline.poll_interval_ms);
    println!("Token lifetime: {} s", directline.token_lifetime_secs);
    println!("Gateway: {}:{}", config.gateway.host, config.gateway.port);
    println!("Log dir: {} (level {})", config.logging.dir, config.logging.level);

    match validate_config(config) {
        Ok(()) => println!("{}", style("Configuration is valid").green()),
        Err(e) => println!("{} {}", style("Configuration is invalid:").red(), e),
    }
}

fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.is_empty() {
        "(not set)".to_string()
    } else if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

fn or_unset(value: &str) -> &str {
    if value.trim().is_empty() {
        "(not set)"
    } else {
        value
    }
}
