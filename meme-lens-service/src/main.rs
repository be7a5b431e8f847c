use anyhow::Context;
use clap::Parser;
use meme_lens::{AppConfig, Pipeline};
use meme_lens_service::{cli, create_app};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "meme-lens", version, about = "Meme likelihood analysis service")]
struct Args {
    /// Run the interactive credibility prompt instead of the HTTP server
    #[arg(long)]
    cli: bool,

    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "SERVER_PORT", default_value_t = 5000)]
    port: u16,
}

/// Pretty or JSON logs depending on LOG_FORMAT. Logs go to stderr so CLI output stays clean.
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "meme_lens=debug,meme_lens_service=debug,tower_http=debug".into());

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_tracing();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    if args.cli {
        let pipeline = Pipeline::from_config(&config);
        return cli::run_cli(&pipeline).await;
    }

    let app = create_app(&config);
    let listener = TcpListener::bind((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", args.host, args.port))?;
    let addr = listener.local_addr()?;

    info!("Meme Lens starting on {}", addr);
    info!("Model: {}", config.gemini_model);
    info!("Analysis endpoint: POST http://{}/analyze-image", addr);
    info!("Health check endpoint: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
