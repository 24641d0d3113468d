use anyhow::{Context, Result};
use api::ApiClient;
use auth::{SessionController, SessionOptions, SessionPhase};
use clap::Parser;
use common::config::LabTracConfig;
use common::{StoreHandle, open_store};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Keep a LabTrac session alive until it expires or another tab logs out
#[derive(Debug, Parser)]
#[command(name = "labtrac-session", version)]
struct Args {
    /// Log in as this user before watching the session
    #[arg(long)]
    username: Option<String>,

    /// Password for --username
    #[arg(long, env = "LABTRAC_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = LabTracConfig::from_env()?;

    info!("Starting session watcher against {}", config.api_base_url);

    let tab = StoreHandle::new(open_store(&config).await?);
    let api = ApiClient::new(config.api_base_url.clone(), tab.clone());
    let session = SessionController::new(
        tab,
        SessionOptions {
            expiry_leeway: config.expiry_leeway(),
            ..SessionOptions::default()
        },
    );

    session.mount().await?;

    if let Some(username) = args.username.as_deref() {
        let password = args
            .password
            .as_deref()
            .context("LABTRAC_PASSWORD must be set to log in")?;
        session.login(&api, username, password).await?;
    }

    if !session.is_authenticated() {
        warn!("No active session; log in with --username");
        return Ok(());
    }

    let mut changes = session.subscribe();
    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = changes.borrow_and_update().clone();
                info!("Session is now {:?} (route {:?})", snapshot.phase, snapshot.route);
                if snapshot.phase == SessionPhase::Anonymous {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, logging out");
                session.logout().await;
                break;
            }
        }
    }

    session.unmount();
    info!("Session watcher stopped");
    Ok(())
}
