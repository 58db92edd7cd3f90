use std::{net::SocketAddr, sync::Arc, time::Duration};

use clap::Parser;
use mcp_chart_rs::{
    http,
    service::WeatherChartRouter,
    tools::{
        render::{DEFAULT_CHART_BASE_URL, RenderSettings, UrlRenderer},
        weather::{DEFAULT_WEATHERAPI_BASE_URL, WeatherApiClient, WeatherApiConfig},
    },
};
use mcp_server_rs::sse::SseApp;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, env = "WEATHER_SERVER_BIND", default_value = "127.0.0.1:3000")]
    bind: SocketAddr,

    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = http::DEFAULT_TIMEOUT_SECS)]
    http_timeout_secs: u64,

    /// weatherapi.com key
    #[arg(long, env = "WEATHERAPI_KEY", hide_env_values = true)]
    weatherapi_key: String,

    #[arg(long, env = "WEATHERAPI_BASE_URL", default_value = DEFAULT_WEATHERAPI_BASE_URL)]
    weatherapi_base_url: String,

    #[arg(long, env = "CHART_BASE_URL", default_value = DEFAULT_CHART_BASE_URL)]
    chart_base_url: String,
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("info,{}=debug,mcp_chart_rs=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    let args = Args::parse();
    let client = http::client(Duration::from_secs(args.http_timeout_secs))?;

    let source = WeatherApiClient::new(
        client,
        WeatherApiConfig::new(args.weatherapi_key).with_base_url(args.weatherapi_base_url),
    );
    let renderer = UrlRenderer::new(RenderSettings::default().with_base_url(args.chart_base_url));
    let router = WeatherChartRouter::new(Arc::new(source), Arc::new(renderer));

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!("weather chart server listening on {}", listener.local_addr()?);
    axum::serve(listener, SseApp::new(router).into_router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
