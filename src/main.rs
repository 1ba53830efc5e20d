use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use intake_api_rest::build_router;
use intake_core::{IntakeConfig, IntakeProcessor, resolve_template_dir};

/// Main entry point for the intake server
///
/// Resolves the deployment context once, then serves the REST router.
///
/// # Environment Variables
/// - `INTAKE_DATASET_ROOT`: git working directory receiving `input/<version>/` (required)
/// - `INTAKE_HOME`: directory whose `.gitconfig` names the committer (default: dataset root)
/// - `INTAKE_TEMPLATE_DIR`: directory containing `success.html.tera` (default: bundled)
/// - `INTAKE_REST_ADDR`: server address (default: "0.0.0.0:8000")
///
/// # Errors
/// Returns an error if the configuration is incomplete, the templates cannot be loaded, or
/// the server cannot bind or fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("intake_run=info".parse()?)
                .add_directive("intake_api_rest=info".parse()?)
                .add_directive("intake_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let dataset_root = std::env::var("INTAKE_DATASET_ROOT")
        .map(PathBuf::from)
        .context("INTAKE_DATASET_ROOT must be set")?;
    let home_dir = std::env::var("INTAKE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dataset_root.clone());
    let template_override = std::env::var("INTAKE_TEMPLATE_DIR").ok().map(PathBuf::from);
    let template_dir = resolve_template_dir(template_override)?;

    let config = IntakeConfig::new(dataset_root, home_dir, template_dir)?;
    for (key, value) in config.context_entries() {
        tracing::info!("-- {}: {}", key, value);
    }
    let processor = IntakeProcessor::from_config(config)?;

    let rest_addr = std::env::var("INTAKE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    tracing::info!("++ Starting intake REST on {}", rest_addr);

    let app = build_router(Arc::new(processor));
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
