use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use subtop_core::{AppConfig, TimePeriod};

#[derive(Parser, Debug)]
#[command(
    name = "subtop",
    version,
    about = "Store the top posts of a list of subreddits"
)]
pub struct Cli {
    /// TOML configuration file (defaults to ./subtop.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL, overrides configuration and DATABASE_URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Sync options accepted without the `sync` subcommand, e.g. `subtop --red`
    #[command(flatten)]
    pub sync: SyncArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List channels and, with --execute, fetch and store their top posts
    Sync(SyncArgs),
    /// Delete every stored post
    ClearPosts,
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct SyncArgs {
    /// Contact Reddit. Without this flag the run is a dry run.
    #[arg(short = 'x', long, alias = "red")]
    pub execute: bool,

    /// Ranking window: hour, day, week, month, year or all
    #[arg(long)]
    pub period: Option<TimePeriod>,

    /// Maximum number of posts requested per subreddit
    #[arg(long)]
    pub limit: Option<u32>,

    /// Skip posts whose permalink is already stored
    #[arg(long)]
    pub dedupe: bool,
}

impl Cli {
    /// Sync options given before a subcommand would be silently ignored.
    pub fn validate(&self) -> Result<(), clap::Error> {
        if self.command.is_some() && self.sync != SyncArgs::default() {
            return Err(<Self as CommandFactory>::command().error(
                ErrorKind::ArgumentConflict,
                "sync options go after `sync` or are used without a subcommand",
            ));
        }
        Ok(())
    }

    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Sync(self.sync.clone()))
    }

    /// Command line values take precedence over file and environment.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Command::Sync(args) = self.command() {
            if let Some(period) = args.period {
                config.sync.period = period;
            }
            if let Some(limit) = args.limit {
                config.sync.limit = limit;
            }
            if args.dedupe {
                config.sync.dedupe = true;
            }
        }
    }
}
