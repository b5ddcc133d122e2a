use std::net::{IpAddr, SocketAddr};

use tracing_subscriber::EnvFilter;

use stablehair_api_proxy::{api, config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env before the filter so RUST_LOG can live there too
    config::Config::dotenv_load();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stablehair_api_proxy=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::Config::new()?;
    config.log_summary();

    let app = api::build_app(&config)?;

    // Run with safe parsing of the bind address
    let ip: IpAddr = config.api_host.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid API_HOST '{}', falling back to 127.0.0.1", config.api_host);
        IpAddr::from([127, 0, 0, 1])
    });
    let port: u16 = config.api_port.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid API_PORT '{}', falling back to 8189", config.api_port);
        8189
    });
    let socket_address = SocketAddr::new(ip, port);
    tracing::info!("listening on {}{}", socket_address, config.api_prefix);

    axum::Server::bind(&socket_address)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
