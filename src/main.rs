use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use adoption_notification_feed::config::Settings;
use adoption_notification_feed::{FeedController, FeedState, Identity};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    init_tracing();

    // Load configuration
    let settings = Settings::new()?;
    tracing::info!("Configuration loaded");

    let user_id = settings
        .session
        .user_id
        .clone()
        .context("session.user_id is not configured")?;
    let token = settings
        .session
        .token
        .clone()
        .context("session.token is not configured")?;

    let mut controller = FeedController::from_settings(&settings)?;

    controller.set_identity(Some(Identity::new(user_id, token)));

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
    tokio::spawn(shutdown_signal_handler(shutdown_tx));

    let (Some(mut feed), Some(mut state)) = (
        controller.subscribe(),
        controller.session().map(|s| s.watch_state()),
    ) else {
        anyhow::bail!("feed session could not be started");
    };

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            changed = feed.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = feed.borrow_and_update().clone();
                tracing::info!(
                    total = snapshot.len(),
                    unread = snapshot.unread_count(),
                    "Feed updated"
                );
                if let Some(latest) = snapshot.iter().next() {
                    tracing::debug!(
                        notification_id = latest.id,
                        kind = latest.kind.as_str(),
                        title = %latest.title,
                        "Most recent notification"
                    );
                };
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                if current == FeedState::Disconnected {
                    tracing::warn!("Push channel closed, feed will no longer update");
                    break;
                }
            }
        }
    }

    controller.shutdown().await;

    tracing::debug!(metrics = %adoption_notification_feed::metrics::encode_metrics(), "Final metrics");
    tracing::info!("Watcher stopped");
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down");
        }
    }

    let _ = shutdown_tx.send(());
}
