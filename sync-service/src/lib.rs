use database::Database;
use reddit_client::{ChannelSummary, RedditClient};
use subtop_core::{CoreError, SyncSettings};
use tracing::{info, warn};

#[cfg(test)]
mod tests;

/// Outcome of one [`SyncService::run`].
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub dry_run: bool,
    pub channels: Vec<String>,
    pub token_acquired: bool,
    pub summaries: Vec<ChannelSummary>,
}

impl SyncReport {
    pub fn fetched(&self) -> usize {
        self.summaries.iter().map(|s| s.fetched).sum()
    }

    pub fn inserted(&self) -> usize {
        self.summaries.iter().map(|s| s.inserted).sum()
    }

    pub fn rejected(&self) -> usize {
        self.summaries.iter().map(|s| s.rejected).sum()
    }

    pub fn skipped_channels(&self) -> Vec<&str> {
        self.summaries
            .iter()
            .filter(|s| s.is_skipped())
            .map(|s| s.channel.as_str())
            .collect()
    }
}

pub struct SyncService {
    reddit: RedditClient,
    database: Database,
    settings: SyncSettings,
}

impl SyncService {
    pub fn new(reddit: RedditClient, database: Database, settings: SyncSettings) -> Self {
        Self {
            reddit,
            database,
            settings,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Lists the stored channels and, when `execute` is set, acquires one token
    /// and syncs every channel in order.
    ///
    /// A dry run performs no network I/O. Channels that fail softly are
    /// recorded in the report and the run continues; any other error aborts it.
    pub async fn run(&self, execute: bool) -> Result<SyncReport, CoreError> {
        let channels: Vec<String> = self
            .database
            .list_channels()
            .await?
            .into_iter()
            .map(|channel| channel.name)
            .collect();

        info!("Channels: {:?}", channels);

        let mut report = SyncReport {
            dry_run: !execute,
            channels,
            ..SyncReport::default()
        };

        if !execute {
            info!("Dry run: not contacting Reddit");
            return Ok(report);
        }

        let token = self.reddit.acquire_token().await?;
        report.token_acquired = true;

        for channel in &report.channels {
            let summary = self
                .reddit
                .fetch_top_listings(
                    &self.database,
                    &token,
                    channel,
                    self.settings.period,
                    self.settings.limit,
                )
                .await?;
            report.summaries.push(summary);
        }

        let skipped = report.skipped_channels();
        if !skipped.is_empty() {
            warn!("Skipped channels: {:?}", skipped);
        }
        info!(
            "Sync finished: {} channels, {} posts fetched, {} stored, {} rejected",
            report.channels.len(),
            report.fetched(),
            report.inserted(),
            report.rejected()
        );

        Ok(report)
    }

    /// Maintenance operation; never part of a regular run.
    pub async fn clear_posts(&self) -> bool {
        self.database.clear_all_posts().await
    }
}
