pub mod api;
pub mod auth;


pub use api::{ChannelSummary, ListingFetch, RedditListing, TopPostData};
pub use auth::{BearerToken, RedditTokenResponse, RedditTokenType};

use auth::RedditOAuthClient;
use reqwest::Client;
use std::time::Duration;
use subtop_core::{CoreError, RedditSettings};

/// Client for the two Reddit endpoints used by a sync run: the password-grant
/// token exchange and the per-subreddit top listing.
pub struct RedditClient {
    http_client: Client,
    oauth_client: RedditOAuthClient,
    settings: RedditSettings,
}

impl RedditClient {
    pub fn new(settings: RedditSettings) -> Result<Self, CoreError> {
        let mut builder = Client::builder().user_agent(settings.user_agent.as_str());
        if settings.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(settings.request_timeout_secs));
        }
        let http_client = builder.build()?;
        let oauth_client = auth::build_oauth_client(&settings)?;

        Ok(Self {
            http_client,
            oauth_client,
            settings,
        })
    }

    pub fn settings(&self) -> &RedditSettings {
        &self.settings
    }
}
