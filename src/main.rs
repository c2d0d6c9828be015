use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use job_invite_agent::classifier::Classifier;
use job_invite_agent::config::AgentConfig;
use job_invite_agent::error::Error;
use job_invite_agent::mailbox::ImapMailbox;
use job_invite_agent::notifier::TwilioWhatsApp;
use job_invite_agent::poller;
use job_invite_agent::state::Cursor;

/// Monitor a mailbox for job invite emails and send WhatsApp alerts via Twilio.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Run only one polling cycle and exit.
    #[arg(long)]
    once: bool,

    /// Path to a .env file.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Logging level (debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Already-set process variables win over the env file; a missing file
    // is fine.
    let _ = dotenvy::from_path(&cli.env_file);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_target(false)
        .init();

    // Install rustls crypto provider before any TLS usage.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        error!("Failed to install rustls crypto provider");
        return ExitCode::FAILURE;
    }

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", Error::from(e));
            return ExitCode::from(2);
        }
    };

    let cursor = match Cursor::load(&config.state_file).await {
        Ok(cursor) => cursor,
        Err(e) => {
            error!("{}", Error::from(e));
            return ExitCode::from(2);
        }
    };

    info!(
        poll_secs = config.poll_interval.as_secs(),
        state_file = %config.state_file.display(),
        ai_enabled = config.ai_enabled(),
        dry_run = config.dry_run,
        "Agent started"
    );

    let mailbox = ImapMailbox::new(&config);
    let classifier = Classifier::from_config(&config);
    let notifier = TwilioWhatsApp::new(&config);

    // An interrupt flips the channel instead of cancelling the cycle, so
    // an in-flight cursor save always completes before exit.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, finishing current cycle");
            let _ = shutdown_tx.send(true);
        }
    });

    poller::run_loop(
        &config,
        &mailbox,
        &classifier,
        &notifier,
        cursor,
        cli.once,
        shutdown_rx,
    )
    .await;

    info!("Agent stopped");
    ExitCode::SUCCESS
}
