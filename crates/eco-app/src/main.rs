mod app;
mod backend;
mod capture;
mod error;
mod events;
mod headless;
mod state;
mod ui;

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use crate::backend::BackendConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = BackendConfig::load()?;

    match std::env::args_os().nth(1) {
        Some(image) => {
            headless::run(config, &PathBuf::from(image)).await?;
            Ok(())
        }
        None => app::App::start_gui(config),
    }
}
