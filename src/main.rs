//! Historian: read-only browser for device change records.
//! Used by: binary entrypoint.

pub mod config;
pub mod console;
pub mod error;
pub mod executor;
pub mod export;
pub mod handlers;
pub mod query;
pub mod server;
pub mod state;
pub mod store;
pub mod telemetry;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::Config::from_env();
    console::print_banner();
    console::print_startup(&config);

    let addr = config.bind_addr.clone();
    let state = state::build_state(config);
    tracing::info!("starting historian on {}", addr);

    server::run(state, &addr).await?;
    Ok(())
}
