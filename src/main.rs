use anyhow::Context;
use askdocs::{api, config, logging, orchestrator::Orchestrator};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::init_config().context("Failed to load config from environment")?;
    logging::init_tracing("info", true);
    tracing::debug!(
        default_provider = %config.default_provider,
        fallback = ?config.fallback_credentials,
        overridden_base_urls = config.base_urls.len(),
        excerpt_char_budget = config.excerpt_char_budget,
        timeout_secs = config.request_timeout.as_secs(),
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    let orchestrator =
        Orchestrator::from_config(&config).context("Failed to build HTTP transport")?;
    let app = api::create_router(Arc::new(orchestrator));

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("Failed to bind listener")?;
    tracing::info!(port, default_provider = %config.default_provider, "Listening on http://0.0.0.0:{port}");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn bind_listener(server_port: Option<u16>) -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    if let Some(port) = server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 4100-4199",
    ))
}
