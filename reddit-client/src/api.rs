use crate::{BearerToken, RedditClient};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use subtop_core::{epoch_to_timestamp, CoreError, ErrorExt, Post, PostSink, RedditApiError, TimePeriod};
use tracing::{debug, info, warn};
use url::Url;

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    #[serde(default)]
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    #[serde(default)]
    pub kind: String,
    pub data: T,
}

/// The subset of a link's fields that ends up in the `posts` table. A field
/// missing from one child is zero-filled rather than failing the listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopPostData {
    pub title: String,
    pub subreddit: String,
    pub upvote_ratio: f64,
    pub ups: i64,
    pub permalink: String,
    pub url: String,
    pub created: f64,
}

impl TryFrom<TopPostData> for Post {
    type Error = RedditApiError;

    fn try_from(data: TopPostData) -> Result<Self, Self::Error> {
        let created_at =
            epoch_to_timestamp(data.created).ok_or_else(|| RedditApiError::InvalidResponse {
                details: format!(
                    "post {} has an unrepresentable creation time {}",
                    data.permalink, data.created
                ),
            })?;

        Ok(Self {
            title: data.title,
            upvotes: data.ups,
            upvote_ratio: data.upvote_ratio,
            url: data.url,
            permalink: data.permalink,
            created_at,
            channel: data.subreddit,
        })
    }
}

/// Result of requesting one listing. Problems confined to a single subreddit
/// come back as `Skipped` so the run can move on.
#[derive(Debug)]
pub enum ListingFetch {
    Listing(RedditListing<TopPostData>),
    Skipped(RedditApiError),
}

/// What happened to one subreddit during a sync.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSummary {
    pub channel: String,
    pub fetched: usize,
    pub inserted: usize,
    pub rejected: usize,
    pub skipped: Option<RedditApiError>,
}

impl ChannelSummary {
    pub fn new(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            fetched: 0,
            inserted: 0,
            rejected: 0,
            skipped: None,
        }
    }

    pub fn skipped(channel: &str, reason: RedditApiError) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::new(channel)
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

impl RedditClient {
    pub(crate) fn listing_url(&self, channel: &str) -> Result<Url, RedditApiError> {
        let base = &self.settings.api_base_url;
        let build_error = |details: String| RedditApiError::RequestBuild {
            endpoint: format!("/r/{}/top", channel),
            details,
        };

        if channel.trim().is_empty() {
            return Err(build_error("subreddit name is empty".to_string()));
        }

        let mut url = Url::parse(base).map_err(|e| build_error(format!("{}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| build_error(format!("{} cannot be used as a base URL", base)))?
            .pop_if_empty()
            .extend(["r", channel, "top"]);

        Ok(url)
    }

    /// Requests the top listing of `channel` for `period`.
    ///
    /// Transport failures are errors. A non-success status, including an
    /// expired token or rate limiting, and an undecodable body are reported as
    /// [`ListingFetch::Skipped`].
    pub async fn get_top_listing(
        &self,
        token: &BearerToken,
        channel: &str,
        period: TimePeriod,
        limit: u32,
    ) -> Result<ListingFetch, CoreError> {
        let url = self.listing_url(channel)?;
        let endpoint = url.path().to_string();
        let limit_str = limit.to_string();

        info!(
            "Making Reddit API request: GET {} (t={}, limit={})",
            endpoint, period, limit
        );
        let response = self
            .http_client
            .get(url)
            .header(AUTHORIZATION, token.authorization())
            .query(&[("t", period.as_str()), ("limit", limit_str.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    CoreError::RedditApi(RedditApiError::RequestBuild {
                        endpoint: endpoint.clone(),
                        details: e.to_string(),
                    })
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = match status {
                StatusCode::UNAUTHORIZED => RedditApiError::InvalidToken,
                StatusCode::TOO_MANY_REQUESTS => RedditApiError::RateLimitExceeded {
                    retry_after: retry_after_secs(response.headers()),
                },
                StatusCode::FORBIDDEN => RedditApiError::Forbidden {
                    resource: format!("r/{}", channel),
                },
                StatusCode::NOT_FOUND => RedditApiError::SubredditNotFound {
                    subreddit: channel.to_string(),
                },
                s if s.is_server_error() => RedditApiError::ServerError {
                    status_code: s.as_u16(),
                },
                s => RedditApiError::UnexpectedStatus {
                    status_code: s.as_u16(),
                    endpoint,
                },
            };
            return Ok(ListingFetch::Skipped(reason));
        }

        let body = response.bytes().await?;

        match serde_json::from_slice::<RedditListing<TopPostData>>(&body) {
            Ok(listing) => {
                debug!(
                    "Retrieved {} posts from r/{}",
                    listing.data.children.len(),
                    channel
                );
                Ok(ListingFetch::Listing(listing))
            }
            Err(e) => Ok(ListingFetch::Skipped(RedditApiError::InvalidResponse {
                details: format!("Failed to parse top posts for r/{}: {}", channel, e),
            })),
        }
    }

    /// Fetches the top listing of `channel` and hands every post to `sink`,
    /// one at a time and in listing order.
    pub async fn fetch_top_listings<S: PostSink>(
        &self,
        sink: &S,
        token: &BearerToken,
        channel: &str,
        period: TimePeriod,
        limit: u32,
    ) -> Result<ChannelSummary, CoreError> {
        let listing = match self.get_top_listing(token, channel, period, limit).await? {
            ListingFetch::Listing(listing) => listing,
            ListingFetch::Skipped(reason) => {
                reason.log_warn();
                warn!("Skipping r/{}: nothing stored", channel);
                return Ok(ChannelSummary::skipped(channel, reason));
            }
        };

        let mut summary = ChannelSummary::new(channel);
        for child in listing.data.children {
            summary.fetched += 1;
            let post = match Post::try_from(child.data) {
                Ok(post) => post,
                Err(e) => {
                    e.log_warn();
                    summary.rejected += 1;
                    continue;
                }
            };

            if sink.insert_post(&post).await {
                summary.inserted += 1;
            } else {
                summary.rejected += 1;
            }
        }

        info!(
            "r/{}: fetched {}, stored {}, rejected {}",
            channel, summary.fetched, summary.inserted, summary.rejected
        );
        Ok(summary)
    }
}

fn retry_after_secs(headers: &HeaderMap) -> u64 {
    ["retry-after", "x-ratelimit-reset"]
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.trim().parse::<f64>().ok())
        .map(|secs| secs.ceil().max(0.0) as u64)
        .next()
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
