//! Field objective binary: runs the controller against a terminal-simulated keypad and display.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use field_objective::{
    config::resolve_config_path,
    dao::settings_store::JsonFileStore,
    error::ControllerError,
    hw::{
        input,
        terminal::{TerminalAnnunciator, TerminalDisplay, spawn_stdin_reader},
    },
    services::session_service::Controller,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let path = resolve_config_path();
    info!(path = %path.display(), "using settings file");
    let store = Arc::new(JsonFileStore::new(&path));

    let (feeder, input) = input::channel();
    let reader = spawn_stdin_reader(feeder);

    let mut controller = Controller::new(
        store,
        input,
        Box::new(TerminalDisplay::new()),
        Box::new(TerminalAnnunciator::new()),
    )
    .with_context(|| format!("loading settings from {}", path.display()))?;

    let result = controller.run().await;
    reader.abort();
    match result {
        Ok(()) | Err(ControllerError::InputClosed) => {
            info!("input closed; shutting down");
            Ok(())
        }
        Err(err) => Err(err).context("controller stopped"),
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
