use std::{net::SocketAddr, sync::Arc};

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llama_serverless_adapter::{
    backend::llama::LlamaCppBackend, build_app, config::Config, readiness, state::AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,llama_serverless_adapter=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let backend = Arc::new(LlamaCppBackend::new(&config).map_err(std::io::Error::other)?);

    // Hard precondition: never accept requests against an unready backend.
    if !readiness::wait_for_backend(
        backend.as_ref(),
        config.ready_max_attempts,
        config.ready_delay,
    )
    .await
    {
        error!("inference server is not available; refusing to serve");
        std::process::exit(1);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let mode = config.mode;
    let state = AppState::new(config, backend);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, ?mode, "adapter listening");

    axum::serve(listener, app).await?;
    Ok(())
}
