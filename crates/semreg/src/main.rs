use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use semreg::server::create_router;
use semreg::types::AppState;
use semreg::{Workflow, WorkflowConfig};

/// Environment variable naming the JSON config file
const CONFIG_ENV: &str = "SEMREG_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = match std::env::var(CONFIG_ENV) {
        Ok(path) => WorkflowConfig::load_from_file(Path::new(&path))
            .with_context(|| format!("could not load config from {path}"))?,
        Err(_) => {
            info!("{} not set, using default configuration", CONFIG_ENV);
            WorkflowConfig::default()
        }
    };

    let workflow = Workflow::open(&config)
        .with_context(|| format!("could not open database {}", config.database_path))?;
    let state = Arc::new(AppState::new(workflow));
    let router = create_router(state);

    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("could not bind {address}"))?;
    info!("Listening on {}", address);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
