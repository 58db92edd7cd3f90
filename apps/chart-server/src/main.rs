use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, ValueEnum};
use mcp_chart_rs::{
    http,
    service::ChartRouter,
    sweep::{ChartSweeper, SweepConfig},
    tools::render::{
        ChartRenderer, DEFAULT_CHART_BASE_URL, RenderSettings, StoredImageRenderer, UrlRenderer,
    },
};
use mcp_server_rs::sse::SseApp;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RenderMode {
    /// Return a URL that renders the chart on request
    Url,
    /// Render now and serve the PNG from the charts directory
    File,
}

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, env = "CHART_SERVER_BIND", default_value = "127.0.0.1:3001")]
    bind: SocketAddr,

    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = http::DEFAULT_TIMEOUT_SECS)]
    http_timeout_secs: u64,

    #[arg(long, env = "CHART_RENDER_MODE", value_enum, default_value_t = RenderMode::Url)]
    render_mode: RenderMode,

    #[arg(long, env = "CHART_BASE_URL", default_value = DEFAULT_CHART_BASE_URL)]
    chart_base_url: String,

    #[arg(long, env = "CHARTS_DIR", default_value = "charts")]
    charts_dir: PathBuf,

    /// Base of the URLs handed out for stored charts; defaults to http://<bind>
    #[arg(long, env = "PUBLIC_BASE_URL")]
    public_base_url: Option<String>,

    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 12 * 60 * 60)]
    sweep_interval_secs: u64,

    #[arg(long, env = "RETENTION_DAYS", default_value_t = 7)]
    retention_days: u32,
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
    let settings = RenderSettings::default().with_base_url(args.chart_base_url.clone());

    let mut sweeper = None;
    let renderer: Arc<dyn ChartRenderer> = match args.render_mode {
        RenderMode::Url => Arc::new(UrlRenderer::new(settings)),
        RenderMode::File => {
            tokio::fs::create_dir_all(&args.charts_dir).await?;
            let public_base_url = args
                .public_base_url
                .clone()
                .unwrap_or_else(|| format!("http://{}", args.bind));
            let client = http::client(Duration::from_secs(args.http_timeout_secs))?;

            let mut chart_sweeper = ChartSweeper::new(
                SweepConfig::new(&args.charts_dir)
                    .with_interval(Duration::from_secs(args.sweep_interval_secs))
                    .with_retention_days(args.retention_days),
            );
            chart_sweeper.start();
            sweeper = Some(chart_sweeper);

            Arc::new(StoredImageRenderer::new(
                client,
                settings,
                &args.charts_dir,
                public_base_url,
            ))
        }
    };

    let mut app = SseApp::new(ChartRouter::new(renderer)).into_router();
    if args.render_mode == RenderMode::File {
        app = app.nest_service("/charts", ServeDir::new(&args.charts_dir));
    }

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(
        mode = ?args.render_mode,
        "chart server listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(mut sweeper) = sweeper {
        sweeper.stop();
    }
    Ok(())
}
