use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ConfigError;

/// A subreddit tracked in the `channels` table. Rows are managed outside this tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: i64,
    pub name: String,
}

/// One entry of a top listing, flattened for storage.
///
/// `channel` is the subreddit name reported by the API; the store resolves it
/// to a channel row when the post is inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub upvotes: i64,
    pub upvote_ratio: f64,
    pub url: String,
    pub permalink: String,
    pub created_at: DateTime<Utc>,
    pub channel: String,
}

/// Converts Reddit's floating point `created` field into a timestamp,
/// truncating toward zero to whole seconds.
pub fn epoch_to_timestamp(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() {
        return None;
    }
    DateTime::from_timestamp(epoch.trunc() as i64, 0)
}

/// Ranking window accepted by the `t` parameter of the top listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    Hour,
    Day,
    Week,
    Month,
    #[default]
    Year,
    All,
}

impl TimePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::Hour => "hour",
            TimePeriod::Day => "day",
            TimePeriod::Week => "week",
            TimePeriod::Month => "month",
            TimePeriod::Year => "year",
            TimePeriod::All => "all",
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimePeriod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(TimePeriod::Hour),
            "day" => Ok(TimePeriod::Day),
            "week" => Ok(TimePeriod::Week),
            "month" => Ok(TimePeriod::Month),
            "year" => Ok(TimePeriod::Year),
            "all" => Ok(TimePeriod::All),
            other => Err(ConfigError::InvalidValue {
                field: "period".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Destination for flattened posts.
///
/// Returns `false` when the post could not be stored; implementors log the
/// cause themselves so callers can keep going.
#[allow(async_fn_in_trait)]
pub trait PostSink {
    async fn insert_post(&self, post: &Post) -> bool;
}
