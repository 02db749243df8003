//! Remotely
//!
//! Websocket remote control. Connects to the server behind a page, sends a
//! text command for every button clicked and shows the connection status and
//! the last message the server sent.

mod config;
mod connection;
mod page;
mod ui;

use std::path::PathBuf;

use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{RemoteConfig, CONFIG_FILE};
use connection::{ConnectionController, TungsteniteFactory};
use ui::{ButtonPanel, MessageDisplay, StatusIndicator, TerminalAlert, TerminalElement};

/// Remotely
///
/// Websocket remote control for the mask installation
#[derive(Parser, Debug)]
#[command(name = "remotely")]
#[command(version, about, long_about = None)]
struct Args {
    /// Page location the websocket URL is derived from (overrides the config file)
    #[arg(long)]
    page: Option<String>,

    /// Layout configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr, the surfaces own stdout
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!("Remotely v{}", env!("CARGO_PKG_VERSION"));

    let config = RemoteConfig::load(&args.config)?;
    let page = args.page.unwrap_or_else(|| config.page.clone());

    let status = StatusIndicator::new(TerminalElement::stdout("status")).with_palette(config.status);
    let messages = MessageDisplay::new(TerminalElement::stdout("messages"));
    let mut controller = ConnectionController::new(status, messages);

    // The alert has already told the user what went wrong
    let mut alert = TerminalAlert::stderr();
    let Ok(events) = controller.open_page(&page, &TungsteniteFactory, &mut alert) else {
        std::process::exit(1);
    };

    let panel = ButtonPanel::new(config.buttons);
    println!("{}", panel.help_text());
    let clicks = panel.spawn_stdin();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Closing remote control");
        let _ = shutdown_tx.send(());
    });

    let controller = controller.run(events, clicks, shutdown_rx).await;

    match controller.url() {
        Some(url) => info!("Remote control for {} closed", url),
        None => info!("Remote control closed"),
    }
    Ok(())
}

/// Wait for SIGINT or SIGTERM
///
/// Either one ends the remote: the socket gets a close frame so the
/// installation sees the controller leave instead of a dropped connection.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, stopping remote"),
        _ = terminate => info!("Received SIGTERM, stopping remote"),
    }
}
