//! Userstream entry-point: wires adapters, the ingestion pipeline and the
//! HTTP server.

mod server;

use actix_web::web;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use userstream::config::AppSettings;
use userstream::domain::ingestion::{IngestionPipeline, IngestionPorts};
use userstream::inbound::http::HealthState;

use server::{build_adapters, build_http_state, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings =
        AppSettings::load_from_args(std::env::args_os()).map_err(std::io::Error::other)?;
    let ingestion = settings.ingestion().map_err(std::io::Error::other)?;
    let channel_size = settings.channel_size().map_err(std::io::Error::other)?;
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;

    let adapters = build_adapters(&settings).await?;
    let http_state = build_http_state(&adapters, ingestion.timeouts);

    let pipeline = IngestionPipeline::new(
        IngestionPorts::new(
            adapters.source.clone(),
            adapters.store.clone(),
            adapters.cache.clone(),
            adapters.cipher.clone(),
        ),
        ingestion,
    );
    let health_state = web::Data::new(HealthState::new(pipeline.subscribe_state()));
    let running = pipeline
        .start(channel_size)
        .await
        .map_err(std::io::Error::other)?;

    let server = create_server(health_state.clone(), http_state, bind_addr)?;
    info!(%bind_addr, "http server listening");
    let served = server.await;

    health_state.mark_unhealthy();
    match running.shutdown().await {
        Ok(report) => info!(?report, "ingestion pipeline drained"),
        Err(err) => error!(error = %err, "ingestion pipeline failed during shutdown"),
    }
    served
}
