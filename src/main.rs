mod cli;

use clap::Parser;
use cli::{Cli, Command};
use database::Database;
use reddit_client::RedditClient;
use subtop_core::{AppConfig, CoreError, DatabaseError, ErrorReporter};
use sync_service::SyncService;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "subtop=info,sync_service=info,reddit_client=info,database=info";

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    dotenvy::dotenv().ok();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    if let Err(e) = cli.validate() {
        e.exit();
    }

    run(cli).await.map_err(|e| {
        ErrorReporter::new().report_error(&e);
        e
    })
}

async fn run(cli: Cli) -> Result<(), CoreError> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;
    tracing::debug!("Loaded configuration: {:?}", config);

    let mut database = Database::new(config.database.clone()).with_dedupe(config.sync.dedupe);
    database.connect().await?;
    database.run_migrations().await?;

    match cli.command() {
        Command::ClearPosts => {
            let cleared = database.clear_all_posts().await;
            database.close().await;
            if !cleared {
                return Err(DatabaseError::QueryFailed {
                    query: "DELETE FROM posts".to_string(),
                }
                .into());
            }
        }
        Command::Sync(args) => {
            if args.execute {
                config.validate_credentials()?;
            }

            tracing::info!("Starting subtop sync (execute: {})", args.execute);
            let reddit = RedditClient::new(config.reddit.clone())?;
            let service = SyncService::new(reddit, database, config.sync.clone());
            let result = service.run(args.execute).await;
            service.database().close().await;
            result?;
        }
    }

    Ok(())
}
