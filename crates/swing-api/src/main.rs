use clap::Parser;
use std::net::IpAddr;
use std::sync::Arc;
use swing_api::{serve, ApiConfig, AppState};

#[derive(Parser)]
#[command(name = "swing-server")]
#[command(about = "Golf swing analysis server: batch analysis and streaming sessions")]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Server host, overrides the configured bind address
    #[arg(long)]
    host: Option<IpAddr>,

    /// Server port, overrides the configured bind address
    #[arg(short, long)]
    port: Option<u16>,

    /// Logging level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    let mut config = match &args.config {
        Some(path) => ApiConfig::from_file(path)?,
        None => ApiConfig::from_env()?,
    };
    if let Some(host) = args.host {
        config.http.bind_addr.set_ip(host);
    }
    if let Some(port) = args.port {
        config.http.bind_addr.set_port(port);
    }

    tracing::info!(
        max_sessions = config.sessions.max_sessions,
        stride = config.sessions.session.stride,
        "Starting swing analysis server"
    );

    let state = Arc::new(AppState::new(config));
    serve(state).await?;
    Ok(())
}
