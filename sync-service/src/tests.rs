#[cfg(test)]
mod tests {
    use crate::SyncService;
    use database::Database;
    use httpmock::prelude::*;
    use reddit_client::RedditClient;
    use serde_json::{json, Value};
    use std::env;
    use std::net::TcpListener;
    use std::time::Duration;
    use subtop_core::{
        CoreError, DatabaseSettings, RedditApiError, RedditSettings, SyncSettings, TimePeriod,
    };

    async fn setup_test_db(channels: &[&str]) -> Database {
        let db_path = env::temp_dir().join(format!("test_sync_{}.db", uuid::Uuid::new_v4()));
        let mut db = Database::new(DatabaseSettings {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 2,
        });
        db.connect()
            .await
            .expect("Failed to connect to test database");
        db.run_migrations().await.expect("Failed to run migrations");

        for name in channels {
            sqlx::query("INSERT INTO channels (name) VALUES (?)")
                .bind(*name)
                .execute(db.pool().unwrap())
                .await
                .expect("Failed to seed channel");
        }
        db
    }

    fn reddit_settings(server: &MockServer) -> RedditSettings {
        RedditSettings {
            username: "alice".to_string(),
            password: "hunter2".to_string(),
            user_agent: "subtop-test/1.0".to_string(),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            token_url: server.url("/api/v1/access_token"),
            authorize_url: server.url("/api/v1/authorize"),
            api_base_url: server.base_url(),
            request_timeout_secs: 5,
        }
    }

    fn sync_settings() -> SyncSettings {
        SyncSettings {
            period: TimePeriod::Week,
            limit: 10,
            dedupe: false,
        }
    }

    fn listing(subreddit: &str, titles: &[&str]) -> Value {
        let children: Vec<Value> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                json!({
                    "kind": "t3",
                    "data": {
                        "title": title,
                        "subreddit": subreddit,
                        "upvote_ratio": 0.9,
                        "ups": 100 - i as i64,
                        "permalink": format!("/r/{}/comments/{}/", subreddit, i),
                        "url": format!("https://example.com/{}/{}", subreddit, i),
                        "created": 1700000000.0 + i as f64
                    }
                })
            })
            .collect();
        json!({ "kind": "Listing", "data": { "children": children } })
    }

    fn token_body() -> Value {
        json!({
            "access_token": "abc123",
            "token_type": "bearer",
            "expires_in": 86400,
            "scope": "*"
        })
    }

    async fn mock_token(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/access_token");
                then.status(200).json_body(token_body());
            })
            .await;
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_requests() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/access_token");
                then.status(200).json_body(token_body());
            })
            .await;
        let listing_mock = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).json_body(listing("rust", &["unused"]));
            })
            .await;

        let db = setup_test_db(&["rust", "golang"]).await;
        let reddit = RedditClient::new(reddit_settings(&server)).unwrap();
        let service = SyncService::new(reddit, db, sync_settings());

        let report = service.run(false).await.unwrap();

        assert!(report.dry_run);
        assert!(!report.token_acquired);
        assert_eq!(report.channels, vec!["rust", "golang"]);
        assert!(report.summaries.is_empty());
        token_mock.assert_hits_async(0).await;
        listing_mock.assert_hits_async(0).await;
        assert_eq!(service.database().count_posts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_execute_syncs_every_channel() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/access_token");
                then.status(200).json_body(token_body());
            })
            .await;
        let rust_mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/r/rust/top")
                    .query_param("t", "week")
                    .query_param("limit", "10")
                    .header("authorization", "bearer abc123");
                then.status(200)
                    .json_body(listing("rust", &["borrowck", "async"]));
            })
            .await;
        let golang_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/r/golang/top");
                then.status(200).json_body(listing("golang", &["generics"]));
            })
            .await;

        let db = setup_test_db(&["rust", "golang"]).await;
        let reddit = RedditClient::new(reddit_settings(&server)).unwrap();
        let service = SyncService::new(reddit, db, sync_settings());

        let report = service.run(true).await.unwrap();

        token_mock.assert_hits_async(1).await;
        rust_mock.assert_hits_async(1).await;
        golang_mock.assert_hits_async(1).await;

        assert!(report.token_acquired);
        assert_eq!(report.fetched(), 3);
        assert_eq!(report.inserted(), 3);
        assert_eq!(report.rejected(), 0);
        assert!(report.skipped_channels().is_empty());

        let posts = service.database().get_posts().await.unwrap();
        let stored: Vec<(&str, &str)> = posts
            .iter()
            .map(|p| (p.channel.as_str(), p.title.as_str()))
            .collect();
        assert_eq!(
            stored,
            vec![
                ("rust", "borrowck"),
                ("rust", "async"),
                ("golang", "generics")
            ]
        );
    }

    #[tokio::test]
    async fn test_undecodable_channel_does_not_stop_the_run() {
        let server = MockServer::start_async().await;
        mock_token(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/r/broken/top");
                then.status(200).body("{\"data\": 42}");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/r/rust/top");
                then.status(200).json_body(listing("rust", &["still synced"]));
            })
            .await;

        let db = setup_test_db(&["broken", "rust"]).await;
        let reddit = RedditClient::new(reddit_settings(&server)).unwrap();
        let service = SyncService::new(reddit, db, sync_settings());

        let report = service.run(true).await.unwrap();

        assert_eq!(report.skipped_channels(), vec!["broken"]);
        assert!(matches!(
            report.summaries[0].skipped,
            Some(RedditApiError::InvalidResponse { .. })
        ));
        assert_eq!(report.inserted(), 1);
        assert_eq!(service.database().count_posts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_token_aborts_before_listing() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/access_token");
                then.status(200).json_body(json!({ "error": "invalid_grant" }));
            })
            .await;
        let listing_mock = server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(200).json_body(listing("rust", &["unused"]));
            })
            .await;

        let db = setup_test_db(&["rust"]).await;
        let reddit = RedditClient::new(reddit_settings(&server)).unwrap();
        let service = SyncService::new(reddit, db, sync_settings());

        let result = service.run(true).await;

        assert!(matches!(
            result,
            Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed { .. }))
        ));
        listing_mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_rejected_listing_status_skips_channel() {
        let server = MockServer::start_async().await;
        mock_token(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/r/rust/top");
                then.status(401);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/r/python/top");
                then.status(429).header("retry-after", "5");
            })
            .await;
        let golang_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/r/golang/top");
                then.status(200).json_body(listing("golang", &["generics"]));
            })
            .await;

        let db = setup_test_db(&["rust", "python", "golang"]).await;
        let reddit = RedditClient::new(reddit_settings(&server)).unwrap();
        let service = SyncService::new(reddit, db, sync_settings());

        let report = service.run(true).await.unwrap();

        golang_mock.assert_hits_async(1).await;
        assert_eq!(report.skipped_channels(), vec!["rust", "python"]);
        assert_eq!(report.summaries[0].skipped, Some(RedditApiError::InvalidToken));
        assert_eq!(
            report.summaries[1].skipped,
            Some(RedditApiError::RateLimitExceeded { retry_after: 5 })
        );
        assert_eq!(report.inserted(), 1);
        assert_eq!(service.database().count_posts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_token_endpoint_aborts_run() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let settings = RedditSettings {
            token_url: format!("{}/api/v1/access_token", base),
            authorize_url: format!("{}/api/v1/authorize", base),
            api_base_url: base,
            ..RedditSettings::default()
        };

        let db = setup_test_db(&["rust"]).await;
        let reddit = RedditClient::new(settings).unwrap();
        let service = SyncService::new(reddit, db, sync_settings());

        let result = service.run(true).await;

        assert!(
            matches!(result, Err(CoreError::Network(_))),
            "Expected network error, got {:?}",
            result
        );
        assert_eq!(service.database().count_posts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_listing_transport_failure_aborts_remaining_channels() {
        let server = MockServer::start_async().await;
        mock_token(&server).await;
        let rust_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/r/rust/top");
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .json_body(listing("rust", &["too late"]));
            })
            .await;
        let golang_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/r/golang/top");
                then.status(200).json_body(listing("golang", &["unused"]));
            })
            .await;

        let db = setup_test_db(&["rust", "golang"]).await;
        let reddit = RedditClient::new(RedditSettings {
            request_timeout_secs: 1,
            ..reddit_settings(&server)
        })
        .unwrap();
        let service = SyncService::new(reddit, db, sync_settings());

        let result = service.run(true).await;

        assert!(
            matches!(result, Err(CoreError::Network(_))),
            "Expected network error, got {:?}",
            result
        );
        rust_mock.assert_hits_async(1).await;
        golang_mock.assert_hits_async(0).await;
        assert_eq!(service.database().count_posts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_posts_for_unknown_channels_are_rejected_softly() {
        let server = MockServer::start_async().await;
        mock_token(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/r/rust/top");
                // Crossposted entries can report a different subreddit
                then.status(200).json_body(listing("elsewhere", &["foreign"]));
            })
            .await;

        let db = setup_test_db(&["rust"]).await;
        let reddit = RedditClient::new(reddit_settings(&server)).unwrap();
        let service = SyncService::new(reddit, db, sync_settings());

        let report = service.run(true).await.unwrap();

        assert_eq!(report.fetched(), 1);
        assert_eq!(report.inserted(), 0);
        assert_eq!(report.rejected(), 1);
        assert_eq!(service.database().count_posts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_posts() {
        let server = MockServer::start_async().await;
        mock_token(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/r/rust/top");
                then.status(200).json_body(listing("rust", &["a", "b"]));
            })
            .await;

        let db = setup_test_db(&["rust"]).await;
        let reddit = RedditClient::new(reddit_settings(&server)).unwrap();
        let service = SyncService::new(reddit, db, sync_settings());

        service.run(true).await.unwrap();
        assert_eq!(service.database().count_posts().await.unwrap(), 2);

        assert!(service.clear_posts().await);
        assert_eq!(service.database().count_posts().await.unwrap(), 0);
        assert_eq!(service.database().list_channels().await.unwrap().len(), 1);
    }
}
