//! Avatar chat entry point
//!
//! Loads configuration (files, environment, then the remote config
//! endpoint), connects an avatar session, starts the liveness monitor and
//! runs an interactive line loop on stdin.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

use avatar_chat_client::AvatarSession;
use avatar_chat_config::{fetch_remote, load_settings, MonitorSettings, Settings};
use avatar_chat_pipeline::{LivenessMonitor, MonitorConfig, SessionEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let env = std::env::var("AVATAR_CHAT_ENV").ok();
    let mut settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Warning: failed to load config: {e}. Using defaults.");
            Settings::default()
        }
    };

    tracing::info!("Starting avatar chat v{}", env!("CARGO_PKG_VERSION"));

    let remote = fetch_remote(&settings.config_url)
        .await
        .with_context(|| format!("fetching remote config from {}", settings.config_url))?;
    settings.apply_remote(&remote);
    settings.validate().context("configuration incomplete")?;

    let (mut session, mut monitor_shutdown, mut events) =
        establish(settings.clone()).await.context("initial connect")?;
    println!("Connected. Type a message, or /clear, /stop, /quit.");

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                let line = line.trim();
                match line {
                    "" => continue,
                    "/quit" => break,
                    "/stop" => session.stop_speaking().await,
                    "/clear" => session.reset().await,
                    query => {
                        if !session.is_active() {
                            tracing::info!("session is down, reconnecting before the turn");
                            let _ = monitor_shutdown.send(true);
                            (session, monitor_shutdown, events) =
                                establish(settings.clone()).await.context("reconnect")?;
                        }
                        match session.handle_user_query(query, None).await {
                            Ok(reply) => println!("{reply}"),
                            Err(e) => tracing::error!(error = %e, "turn failed"),
                        }
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Some(SessionEvent::Reconnect) => {
                        tracing::warn!("session hung, reconnecting");
                        session.disconnect().await;
                        let _ = monitor_shutdown.send(true);
                        (session, monitor_shutdown, events) =
                            establish(settings.clone()).await.context("reconnect")?;
                    }
                    Some(SessionEvent::Teardown) => {
                        // The monitor keeps ticking; it is inert while the
                        // session is inactive and is replaced on reconnect.
                        tracing::info!("session idle, tearing down");
                        session.disconnect().await;
                    }
                    None => continue,
                }
            }
        }
    }

    session.disconnect().await;
    let _ = monitor_shutdown.send(true);
    Ok(())
}

/// Connect a session and attach a fresh liveness monitor to it
async fn establish(
    settings: Settings,
) -> anyhow::Result<(
    Arc<AvatarSession>,
    watch::Sender<bool>,
    mpsc::Receiver<SessionEvent>,
)> {
    let monitor_settings = settings.monitor.clone();
    let session = AvatarSession::connect(settings).await?;
    let (event_tx, event_rx) = mpsc::channel(4);
    let monitor = LivenessMonitor::new(
        monitor_config(&monitor_settings),
        session.liveness(),
        session.probe(),
        event_tx,
    );
    Ok((session, monitor.spawn(), event_rx))
}

fn monitor_config(settings: &MonitorSettings) -> MonitorConfig {
    MonitorConfig {
        poll_interval: Duration::from_secs(settings.poll_interval_secs),
        hang_window: Duration::from_secs(settings.hang_window_secs),
        idle_timeout: Duration::from_secs(settings.idle_timeout_secs),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "avatar_chat=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
