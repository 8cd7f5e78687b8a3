//! # zs-db-sqlite Implementation
//!
//! SQLite implementation of `PostRepo`. Handy for single-box deployments and
//! for tests, where `sqlite::memory:` gives every run a fresh database.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};
use zs_core::filter::PostFilter;
use zs_core::models::{NewPost, Post};
use zs_core::traits::PostRepo;

const POST_COLUMNS: &str = "id, image_url, caption, author, location, latitude, longitude, created_at";

/// Columns added after the first release, with their SQLite types.
const LATE_COLUMNS: [(&str, &str); 3] = [("location", "TEXT"), ("latitude", "REAL"), ("longitude", "REAL")];

pub struct SqlitePostRepo {
    pool: SqlitePool,
}

impl SqlitePostRepo {
    /// Opens a pool for `url` (e.g. `sqlite:zski.db` or `sqlite::memory:`).
    ///
    /// # Developer Note
    /// Each connection to `:memory:` is its own database, so in-memory pools
    /// are pinned to one connection that never expires.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:");

        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        }
        .connect_with(options)
        .await?;

        info!(url, in_memory, "opened sqlite pool");
        Ok(Self { pool })
    }

    async fn existing_columns(&self) -> anyhow::Result<Vec<String>> {
        let rows = sqlx::query("PRAGMA table_info(posts)")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }
}

fn row_to_post(row: &SqliteRow) -> Result<Post, sqlx::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        image_url: row.try_get("image_url")?,
        caption: row.try_get("caption")?,
        author: row.try_get("author")?,
        location: row.try_get("location")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl PostRepo for SqlitePostRepo {
    /// SQLite has no `ADD COLUMN IF NOT EXISTS`, so late columns are checked
    /// against `PRAGMA table_info` first.
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                image_url TEXT NOT NULL,
                caption TEXT NOT NULL DEFAULT '',
                author TEXT NOT NULL DEFAULT 'Anonymous',
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%f+00:00', 'now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        let existing = self.existing_columns().await?;
        for (column, sql_type) in LATE_COLUMNS {
            if !existing.iter().any(|c| c == column) {
                debug!(column, "adding missing column");
                sqlx::query(&format!("ALTER TABLE posts ADD COLUMN {column} {sql_type}"))
                    .execute(&self.pool)
                    .await?;
            }
        }

        sqlx::query("CREATE INDEX IF NOT EXISTS posts_created_at_idx ON posts (created_at DESC)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_posts(&self, filter: &PostFilter) -> anyhow::Result<Vec<Post>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE 1 = 1"));

        if let Some(since) = filter.created_after {
            query.push(" AND created_at >= ").push_bind(since);
        }
        if let Some(pattern) = filter.location_pattern() {
            query
                .push(" AND LOWER(location) LIKE LOWER(")
                .push_bind(pattern)
                .push(") ESCAPE '\\'");
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_post).collect::<Result<_, _>>()?)
    }

    async fn insert_post(&self, post: NewPost) -> anyhow::Result<Post> {
        let row = sqlx::query(&format!(
            "INSERT INTO posts (image_url, caption, author, location, latitude, longitude, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(&post.image_url)
        .bind(&post.caption)
        .bind(&post.author)
        .bind(&post.location)
        .bind(post.latitude())
        .bind(post.longitude())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_post(&row)?)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta};
    use zs_core::models::Coordinates;

    async fn repo() -> SqlitePostRepo {
        let repo = SqlitePostRepo::connect("sqlite::memory:", 1).await.unwrap();
        repo.ensure_schema().await.unwrap();
        repo
    }

    fn new_post(author: &str, location: Option<&str>) -> NewPost {
        NewPost {
            author: author.to_string(),
            location: location.map(str::to_string),
            ..NewPost::new("data:image/jpeg;base64,/9j/")
        }
    }

    /// Backdates a row, which the public API cannot do.
    async fn insert_at(repo: &SqlitePostRepo, location: &str, created_at: DateTime<Utc>) {
        sqlx::query("INSERT INTO posts (image_url, location, created_at) VALUES ('u', ?, ?)")
            .bind(location)
            .bind(created_at)
            .execute(&repo.pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let repo = repo().await;
        let before = Utc::now();

        let post = repo
            .insert_post(NewPost {
                caption: "Powder!".into(),
                coordinates: Some(Coordinates { latitude: 39.19, longitude: -106.82 }),
                ..new_post("A", Some("Aspen"))
            })
            .await
            .unwrap();

        assert!(post.id > 0);
        assert!(post.created_at >= before);
        assert_eq!(post.caption, "Powder!");
        assert_eq!(post.location.as_deref(), Some("Aspen"));
        assert_eq!(post.coordinates(), Some(Coordinates { latitude: 39.19, longitude: -106.82 }));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let repo = repo().await;
        let first = repo.insert_post(new_post("one", None)).await.unwrap();
        let second = repo.insert_post(new_post("two", None)).await.unwrap();
        let third = repo.insert_post(new_post("three", None)).await.unwrap();

        let ids: Vec<i64> = repo
            .list_posts(&PostFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    #[tokio::test]
    async fn location_filter_is_case_insensitive_substring() {
        let repo = repo().await;
        repo.insert_post(new_post("A", Some("Aspen Highlands"))).await.unwrap();
        repo.insert_post(new_post("B", Some("Vail"))).await.unwrap();
        repo.insert_post(new_post("C", None)).await.unwrap();

        let filter = |loc: &str| PostFilter { location: Some(loc.into()), ..Default::default() };

        let aspen = repo.list_posts(&filter("aspen")).await.unwrap();
        assert_eq!(aspen.len(), 1);
        assert_eq!(aspen[0].author, "A");

        assert!(repo.list_posts(&filter("zermatt")).await.unwrap().is_empty());
        assert_eq!(repo.list_posts(&PostFilter::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn location_wildcards_match_literally() {
        let repo = repo().await;
        repo.insert_post(new_post("A", Some("Run_5"))).await.unwrap();
        repo.insert_post(new_post("B", Some("Runs"))).await.unwrap();

        let found = repo
            .list_posts(&PostFilter { location: Some("n_".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].author, "A");

        let percent = repo
            .list_posts(&PostFilter { location: Some("%".into()), ..Default::default() })
            .await
            .unwrap();
        assert!(percent.is_empty());
    }

    #[tokio::test]
    async fn created_after_bound_is_inclusive() {
        let repo = repo().await;
        let boundary = Utc::now() - TimeDelta::hours(3);
        insert_at(&repo, "before", boundary - TimeDelta::seconds(1)).await;
        insert_at(&repo, "exact", boundary).await;
        insert_at(&repo, "after", boundary + TimeDelta::minutes(5)).await;

        let found: Vec<Option<String>> = repo
            .list_posts(&PostFilter { created_after: Some(boundary), ..Default::default() })
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.location)
            .collect();
        assert_eq!(found, vec![Some("after".to_string()), Some("exact".to_string())]);
    }

    #[tokio::test]
    async fn created_at_defaults_to_now_when_omitted() {
        let repo = repo().await;
        let before = Utc::now() - TimeDelta::seconds(1);
        sqlx::query("INSERT INTO posts (image_url) VALUES ('u')")
            .execute(&repo.pool)
            .await
            .unwrap();
        let inserted = repo.insert_post(new_post("A", None)).await.unwrap();

        let posts = repo.list_posts(&PostFilter { created_after: Some(before), ..Default::default() }).await.unwrap();
        assert_eq!(posts.len(), 2);
        let defaulted = posts.iter().find(|p| p.id != inserted.id).unwrap();
        assert_eq!(defaulted.author, "Anonymous");
        assert!(defaulted.created_at >= before);
        assert!(defaulted.created_at <= Utc::now());
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent_and_migrates_old_tables() {
        let repo = SqlitePostRepo::connect("sqlite::memory:", 1).await.unwrap();
        // First-release layout without location or coordinates.
        sqlx::query(
            "CREATE TABLE posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                image_url TEXT NOT NULL,
                caption TEXT NOT NULL DEFAULT '',
                author TEXT NOT NULL DEFAULT 'Anonymous',
                created_at TEXT NOT NULL
            )",
        )
        .execute(&repo.pool)
        .await
        .unwrap();

        for _ in 0..3 {
            repo.ensure_schema().await.unwrap();
        }

        let mut columns = repo.existing_columns().await.unwrap();
        columns.sort();
        assert_eq!(
            columns,
            vec!["author", "caption", "created_at", "id", "image_url", "latitude", "location", "longitude"]
        );

        repo.insert_post(new_post("A", Some("Aspen"))).await.unwrap();
        repo.ensure_schema().await.unwrap();
        assert_eq!(repo.list_posts(&PostFilter::default()).await.unwrap().len(), 1);
    }
}
