use docmill::handlers::{router, AppState};
use docmill::{ConverterConfig, LibreOfficeEngine};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docmill=info,tower_http=info".into()),
        )
        .init();

    let config = ConverterConfig::from_env()?;
    info!(
        "Using LibreOffice at {} (worker process '{}')",
        config.soffice_path.display(),
        config.worker_name
    );

    let engine = LibreOfficeEngine::start(config).await?;
    if !engine.is_available().await {
        warn!("soffice did not answer --version; conversions will likely fail");
    }

    let state = Arc::new(AppState::new(engine));
    let app = router(state);

    let addr = std::env::var("DOCMILL_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("docmill running on http://{}", addr);
    info!("Convert files: POST http://{}/convert", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
