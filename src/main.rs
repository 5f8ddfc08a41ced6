//! Medprep daemon
//!
//! Serves the progression and practice-attempt API next to the web app.
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults
//! medprep
//!
//! # Custom config and port
//! medprep --config /etc/medprep/config.toml --http-port 8096
//!
//! # Load a question bank before serving
//! medprep --seed ./catalog.json
//! ```

use anyhow::Context;
use clap::Parser;
use medprep::db::{catalog, CatalogImport};
use medprep::services::events::spawn_logging_listener;
use medprep::{Config, HttpServer, PracticeDb, Services};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "medprep")]
#[command(about = "XP progression and practice attempt service")]
struct Args {
    /// Path to config file
    #[arg(short, long, env = "MEDPREP_CONFIG")]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long, env = "MEDPREP_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, env = "MEDPREP_HTTP_PORT")]
    http_port: Option<u16>,

    /// JSON catalog of exams, topics and questions to import at startup
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("medprep=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    // CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }

    info!(
        storage_dir = %config.storage_dir.display(),
        http_port = config.http_port,
        max_attempt_questions = config.max_attempt_questions,
        "Starting medprep"
    );

    tokio::fs::create_dir_all(&config.storage_dir).await?;

    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    let db = Arc::new(PracticeDb::open(&config.db_path())?);

    if let Some(seed_path) = args.seed {
        let raw = tokio::fs::read_to_string(&seed_path)
            .await
            .with_context(|| format!("Failed to read seed {}", seed_path.display()))?;
        let seed: CatalogImport = serde_json::from_str(&raw)?;
        db.with_conn_mut(|conn| catalog::import_catalog(conn, &seed))?;
    }

    let services = Arc::new(Services::new(db.clone(), &config));
    let listener = spawn_logging_listener(services.events.clone());

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let http_server = Arc::new(HttpServer::new(services, http_addr));

    info!("HTTP API available at http://{}", http_addr);
    info!("Press Ctrl+C to stop.");

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };

    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown => {}
    }

    listener.abort();

    if let Ok(stats) = db.stats() {
        info!(
            questions = stats.question_count,
            attempts = stats.attempt_count,
            "Final database stats"
        );
    }

    Ok(())
}
