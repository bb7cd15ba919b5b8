use std::{net::SocketAddr, sync::Arc, time::Duration};

use mailer::{LogMailer, MailQueue};
use server_api::ApiContext;
use storage::Storage;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use api::build_router;
use app_state::AppState;
use config::{load_settings, prepare_database_url};

const MAIL_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let (mail_queue, mail_worker) =
        MailQueue::start(Arc::new(LogMailer), settings.mail_queue_config());
    let state = AppState {
        api: ApiContext {
            storage,
            mail_queue,
        },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match tokio::time::timeout(MAIL_DRAIN_TIMEOUT, mail_worker).await {
        Ok(Ok(())) => info!("mail queue drained"),
        Ok(Err(error)) => error!(%error, "mail worker failed"),
        Err(_) => warn!("mail queue still busy at shutdown; pending mails dropped"),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
