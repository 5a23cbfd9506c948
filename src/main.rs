use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use pdfgate::api;
use pdfgate::models::{ConversionRequest, Length, RenderOptions, ServiceConfig};
use pdfgate::server;
use pdfgate::services::{ChromeLauncher, Converter, RendererHandle};

#[derive(Parser)]
#[command(name = "pdfgate")]
#[command(about = "HTML to PDF conversion service backed by headless Chrome")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Convert a local HTML file to PDF without starting the server
    Render {
        /// HTML file to render
        #[arg(short, long)]
        input: PathBuf,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Paper format (A0-A6, Letter, Legal, Tabloid, Ledger)
        #[arg(short, long)]
        format: Option<String>,

        /// Margin applied to all four sides (e.g. "20mm", "1in")
        #[arg(short, long)]
        margin: Option<String>,

        /// Omit background colors and images
        #[arg(long)]
        no_background: bool,
    },
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "pdfgate API",
        description = "HTML to PDF conversion backed by headless Chrome",
        version = "0.1.0",
        license(name = "MIT")
    ),
    paths(api::handle_convert, api::handle_health, api::handle_info),
    components(schemas(
        pdfgate::models::ConversionRequest,
        pdfgate::models::RenderOptions,
        api::ErrorResponse,
        api::HealthResponse,
    )),
    tags(
        (name = "Conversion", description = "HTML to PDF rendering"),
        (name = "Status", description = "Liveness and service information")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let started_at = Instant::now();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(started_at).await,
        Commands::Render {
            input,
            output,
            format,
            margin,
            no_background,
        } => run_render_command(input, output, format, margin, no_background).await,
    }
}

/// Render a local HTML file directly to a PDF file (no server needed)
async fn run_render_command(
    input: PathBuf,
    output: PathBuf,
    format: Option<String>,
    margin: Option<String>,
    no_background: bool,
) -> anyhow::Result<()> {
    // Minimal logging for CLI
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdfgate=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let html = tokio::fs::read_to_string(&input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let margin = margin.map(Length::Text);
    let request = ConversionRequest {
        html: Some(html),
        filename: output
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        options: Some(RenderOptions {
            format,
            margin_top: margin.clone(),
            margin_right: margin.clone(),
            margin_bottom: margin.clone(),
            margin_left: margin,
            print_background: Some(!no_background),
        }),
    };
    let job = request
        .into_job(chrono::Utc::now())
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let config = ServiceConfig::from_env();
    let renderer = Arc::new(RendererHandle::new(ChromeLauncher::new(config.chrome_path)));
    renderer.start().await.context("Renderer failed to start")?;

    let converter = Converter::new(renderer.clone());
    let rendered = converter.convert(job).await;
    renderer.shutdown().await;
    let artifact = rendered.map_err(|e| anyhow::anyhow!("Render error: {e}"))?;

    tokio::fs::write(&output, &artifact.bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Rendered {} ({} bytes)",
        output.display(),
        artifact.bytes.len()
    );

    Ok(())
}

/// Run the HTTP server
async fn run_server(started_at: Instant) -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdfgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();
    let chrome = config
        .chrome_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "auto-detect".to_string());
    tracing::info!(
        port = config.port,
        host = %config.host,
        %chrome,
        "Configuration loaded"
    );

    // The service has no purpose without a browser: fail before listening.
    let renderer = Arc::new(RendererHandle::new(ChromeLauncher::new(
        config.chrome_path.clone(),
    )));
    renderer.start().await.context("Renderer failed to start")?;

    let state = server::create_app_state(renderer.clone(), started_at);
    let app = server::build_router(state)
        // OpenAPI documentation (production only)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let served = serve(app, &config).await;

    renderer.shutdown().await;
    tracing::info!("Server shutdown complete");

    served
}

async fn serve(app: axum::Router, config: &ServiceConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "pdfgate listening");
    tracing::info!("Health: http://{addr}/health");
    tracing::info!("Convert: POST http://{addr}/convert");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(%e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(%e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
