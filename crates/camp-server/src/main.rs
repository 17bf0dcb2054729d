mod config;

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing::info;

use camp_api::AppStateInner;
use camp_api::seed::{SAMPLE_NAMES, build_sample_db};
use camp_db::Database;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "camp", about = "Camp registration server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Wipe the database and fill it with sample users
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camp_server=debug,camp_api=debug,camp_db=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let db = Database::open(&config.database_path())?;
    let state = AppStateInner::new(db, config.jwt_secret.clone());

    match cli.command.unwrap_or(Command::Serve) {
        Command::Seed => {
            let st = state.clone();
            tokio::task::spawn_blocking(move || build_sample_db(&st.identity, SAMPLE_NAMES))
                .await??;
            info!("Seeded {}", config.database_path().display());
        }
        Command::Serve => {
            config.warn_if_insecure();

            let app = camp_api::router(state).layer(TraceLayer::new_for_http());

            let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
            info!("Camp server listening on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
