use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use campus_feed::config::{Cli, Command, Config};
use campus_feed::state::{AppState, DbPool};
use campus_feed::storage::BlobClients;
use campus_feed::{db, routes, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Seed => {
            let report = seed::seed(&pool)?;
            tracing::info!(
                users = report.users_added,
                posts = report.posts_added,
                "Seeding done"
            );
            Ok(())
        }
        Command::Serve => serve(pool, config).await,
    }
}

async fn serve(pool: DbPool, config: Config) -> anyhow::Result<()> {
    let blobs = BlobClients::from_config(&config.storage)?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let app = routes::app(AppState::new(pool, config, blobs));

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
