//! JENNIE - terminal chat client
//!
//! Sends what the user types to the JENNIE backend and shows the replies,
//! driven by a pure conversation state machine.

mod config;
mod gateway;
mod runtime;
mod session;
mod state_machine;
mod transcript;
mod tui;

use config::ChatConfig;
use gateway::{HttpGateway, LoggingGateway};
use session::SessionId;
use state_machine::ConvContext;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// JSON logs go to a file; the terminal belongs to the UI
fn init_logging(log_file: Option<&Path>) -> std::io::Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jennie=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration
    let config = ChatConfig::from_env()?;
    init_logging(config.log_file.as_deref())?;

    let session_id = SessionId::generate();
    tracing::info!(
        session = %session_id,
        backend = %config.api_url,
        policy = ?config.late_reply_policy,
        "Starting JENNIE"
    );

    let gateway = LoggingGateway::new(HttpGateway::new(config.api_url.clone()));
    let context = ConvContext::new(session_id, config.late_reply_policy);
    let chat = runtime::spawn(context, gateway);

    tui::run(chat, &config.api_url).await?;

    Ok(())
}
