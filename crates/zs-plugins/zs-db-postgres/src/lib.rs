//! # zs-db-postgres Implementation
//!
//! Postgres implementation of `PostRepo`, the default production store.
//! `id` and `created_at` are assigned by the database and read back with
//! `RETURNING`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::info;
use zs_core::filter::PostFilter;
use zs_core::models::{NewPost, Post};
use zs_core::traits::PostRepo;

const POST_COLUMNS: &str = "id, image_url, caption, author, location, latitude, longitude, created_at";

/// Run in order by `ensure_schema`. Every statement is safe to repeat.
///
/// Tables created by the first release (`SERIAL` ids, naive `TIMESTAMP`s
/// written in UTC, nullable text columns) are converged onto the current
/// types before anything reads them.
const SCHEMA: [&str; 10] = [
    "CREATE TABLE IF NOT EXISTS posts (
        id BIGSERIAL PRIMARY KEY,
        image_url TEXT NOT NULL,
        caption TEXT NOT NULL DEFAULT '',
        author TEXT NOT NULL DEFAULT 'Anonymous',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "ALTER TABLE posts ADD COLUMN IF NOT EXISTS location TEXT",
    "ALTER TABLE posts ADD COLUMN IF NOT EXISTS latitude DOUBLE PRECISION",
    "ALTER TABLE posts ADD COLUMN IF NOT EXISTS longitude DOUBLE PRECISION",
    "DO $$
    BEGIN
        IF EXISTS (
            SELECT 1 FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = 'posts'
              AND column_name = 'id' AND data_type = 'integer'
        ) THEN
            ALTER TABLE posts ALTER COLUMN id TYPE BIGINT;
            ALTER SEQUENCE IF EXISTS posts_id_seq AS BIGINT;
        END IF;
        IF EXISTS (
            SELECT 1 FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = 'posts'
              AND column_name = 'created_at' AND data_type = 'timestamp without time zone'
        ) THEN
            ALTER TABLE posts
                ALTER COLUMN created_at TYPE TIMESTAMPTZ USING created_at AT TIME ZONE 'UTC';
        END IF;
    END
    $$",
    "UPDATE posts SET caption = '' WHERE caption IS NULL",
    "UPDATE posts SET author = 'Anonymous' WHERE author IS NULL",
    "UPDATE posts SET created_at = NOW() WHERE created_at IS NULL",
    "ALTER TABLE posts
        ALTER COLUMN caption SET DEFAULT '',
        ALTER COLUMN caption SET NOT NULL,
        ALTER COLUMN author SET DEFAULT 'Anonymous',
        ALTER COLUMN author SET NOT NULL,
        ALTER COLUMN created_at SET DEFAULT NOW(),
        ALTER COLUMN created_at SET NOT NULL",
    "CREATE INDEX IF NOT EXISTS posts_created_at_idx ON posts (created_at DESC)",
];

pub struct PostgresPostRepo {
    pool: PgPool,
}

impl PostgresPostRepo {
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!(max_connections, "opened postgres pool");
        Ok(Self { pool })
    }
}

fn row_to_post(row: &PgRow) -> Result<Post, sqlx::Error> {
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
impl PostRepo for PostgresPostRepo {
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::raw_sql(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn list_posts(&self, filter: &PostFilter) -> anyhow::Result<Vec<Post>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE TRUE"));

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
            "INSERT INTO posts (image_url, caption, author, location, latitude, longitude)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(&post.image_url)
        .bind(&post.caption)
        .bind(&post.author)
        .bind(&post.location)
        .bind(post.latitude())
        .bind(post.longitude())
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_post(&row)?)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
