use chrono::{DateTime, Utc};
use sqlx::error::DatabaseError as _;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use subtop_core::{
    Channel, CoreError, DatabaseError, DatabaseSettings, ErrorExt, Post, PostSink,
};
use tracing::{debug, info, warn};


const INSERT_POST: &str = r#"
    INSERT INTO posts (title, upvotes, upvote_ratio, url, permalink, created_at, channel_id)
    VALUES (?, ?, ?, ?, ?, ?, (SELECT id FROM channels WHERE name = ?))
"#;

// Same row, but only when no post with this permalink exists yet.
const INSERT_POST_IF_NEW: &str = r#"
    INSERT INTO posts (title, upvotes, upvote_ratio, url, permalink, created_at, channel_id)
    SELECT ?, ?, ?, ?, ?, ?, (SELECT id FROM channels WHERE name = ?)
    WHERE NOT EXISTS (SELECT 1 FROM posts WHERE permalink = ?)
"#;

#[derive(sqlx::FromRow)]
struct ChannelRow {
    id: i64,
    name: String,
}

#[derive(sqlx::FromRow)]
struct PostRow {
    title: String,
    upvotes: i64,
    upvote_ratio: f64,
    url: String,
    permalink: String,
    created_at: DateTime<Utc>,
    channel: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            title: row.title,
            upvotes: row.upvotes,
            upvote_ratio: row.upvote_ratio,
            url: row.url,
            permalink: row.permalink,
            created_at: row.created_at,
            channel: row.channel,
        }
    }
}

/// Store adapter over the `channels` and `posts` tables.
///
/// One pool is opened by [`Database::connect`] and shared by every operation
/// of the run.
pub struct Database {
    settings: DatabaseSettings,
    dedupe: bool,
    pool: Option<SqlitePool>,
}

impl Database {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self {
            settings,
            dedupe: false,
            pool: None,
        }
    }

    /// Skip posts whose permalink is already stored instead of inserting a
    /// duplicate row.
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub async fn connect(&mut self) -> Result<(), CoreError> {
        let options = SqliteConnectOptions::from_str(&self.settings.url)
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: format!("{}: {}", self.settings.url, e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(self.settings.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        info!("Connected to database {}", self.settings.url);
        self.pool = Some(pool);
        Ok(())
    }

    pub async fn run_migrations(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(self.pool()?)
            .await
            .map_err(|e| DatabaseError::MigrationFailed {
                migration: e.to_string(),
            })?;
        debug!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> Result<&SqlitePool, CoreError> {
        self.pool
            .as_ref()
            .ok_or(CoreError::Database(DatabaseError::NotConnected))
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }

    /// All channels in insertion order.
    pub async fn list_channels(&self) -> Result<Vec<Channel>, CoreError> {
        let rows: Vec<ChannelRow> =
            sqlx::query_as("SELECT id, name FROM channels ORDER BY id")
                .fetch_all(self.pool()?)
                .await
                .map_err(DatabaseError::Sql)?;

        Ok(rows
            .into_iter()
            .map(|row| Channel {
                id: row.id,
                name: row.name,
            })
            .collect())
    }

    /// Inserts `post`, resolving its channel by name.
    ///
    /// Returns `Ok(false)` when dedupe is enabled and the permalink is already
    /// stored. A post naming an unknown channel is a constraint violation.
    pub async fn try_insert_post(&self, post: &Post) -> Result<bool, CoreError> {
        let pool = self.pool()?;

        let query = if self.dedupe {
            sqlx::query(INSERT_POST_IF_NEW)
        } else {
            sqlx::query(INSERT_POST)
        };
        let mut query = query
            .bind(&post.title)
            .bind(post.upvotes)
            .bind(post.upvote_ratio)
            .bind(&post.url)
            .bind(&post.permalink)
            .bind(post.created_at)
            .bind(&post.channel);
        if self.dedupe {
            query = query.bind(&post.permalink);
        }

        let result = query
            .execute(pool)
            .await
            .map_err(|e| insert_error(e, &post.channel))?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn try_clear_all_posts(&self) -> Result<u64, CoreError> {
        let result = sqlx::query("DELETE FROM posts")
            .execute(self.pool()?)
            .await
            .map_err(DatabaseError::Sql)?;
        Ok(result.rows_affected())
    }

    /// Removes every stored post. Channels are left untouched.
    pub async fn clear_all_posts(&self) -> bool {
        match self.try_clear_all_posts().await {
            Ok(removed) => {
                info!("Removed {} posts", removed);
                true
            }
            Err(e) => {
                e.log_error();
                false
            }
        }
    }

    /// Stored posts in insertion order, with their channel names.
    pub async fn get_posts(&self) -> Result<Vec<Post>, CoreError> {
        let rows: Vec<PostRow> = sqlx::query_as(
            r#"
            SELECT p.title, p.upvotes, p.upvote_ratio, p.url, p.permalink, p.created_at,
                   c.name AS channel
            FROM posts p
            JOIN channels c ON c.id = p.channel_id
            ORDER BY p.id
            "#,
        )
        .fetch_all(self.pool()?)
        .await
        .map_err(DatabaseError::Sql)?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    pub async fn count_posts(&self) -> Result<i64, CoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool()?)
            .await
            .map_err(DatabaseError::Sql)?;
        Ok(count)
    }
}

impl PostSink for Database {
    async fn insert_post(&self, post: &Post) -> bool {
        match self.try_insert_post(post).await {
            Ok(true) => true,
            Ok(false) => {
                debug!("Post {} already stored, skipping", post.permalink);
                true
            }
            Err(e) => {
                warn!("Error adding post {}", post.permalink);
                e.log_warn();
                false
            }
        }
    }
}

fn insert_error(error: sqlx::Error, channel: &str) -> CoreError {
    match error {
        sqlx::Error::Database(ref db_error) if db_error.message().contains("constraint failed") => {
            DatabaseError::ConstraintViolation {
                constraint: format!("{} (channel '{}')", db_error.message(), channel),
            }
            .into()
        }
        other => DatabaseError::Sql(other).into(),
    }
}
