//! Persistence gateway. Wraps the shared Postgres pool and exposes the typed
//! operations the handlers need. Every write runs in its own transaction
//! with an explicit commit; reads are plain queries. `connect` brings the
//! schema up with idempotent statements before returning.

pub mod models;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::AppConfig;
use models::{GalleryItem, Photo, Session, User};

#[derive(Debug, Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    /// Open the connection pool and ensure the schema exists.
    pub async fn connect(config: &AppConfig) -> Result<Self, sqlx::Error> {
        tracing::info!("Initializing database connection pool...");

        let pool = PgPoolOptions::new()
            .max_connections(config.db_pool_max)
            .min_connections(config.db_pool_min)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .test_before_acquire(true)
            .connect(&config.database_url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;

        tracing::info!("Database connection pool initialized successfully");
        Ok(db)
    }

    /// Build a gateway around a pool that has not connected yet. Used by
    /// tests that only exercise paths which never reach the database.
    pub fn connect_lazy(url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().connect_lazy(url)?;
        Ok(Self { pool })
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                user_name TEXT UNIQUE NOT NULL,
                pwdhash TEXT NOT NULL,
                protected BOOLEAN NOT NULL DEFAULT false,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                last_login TIMESTAMPTZ
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_name TEXT NOT NULL,
                user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created TIMESTAMPTZ NOT NULL,
                max_age BIGINT NOT NULL
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_sessions_user_name ON sessions(user_name)
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS photos (
                file_name TEXT PRIMARY KEY
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS gallery_items (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                caption TEXT NOT NULL,
                project_info TEXT NOT NULL,
                thumbnail TEXT NOT NULL,
                embed_url TEXT
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS project_images (
                gallery_id TEXT NOT NULL REFERENCES gallery_items(id) ON DELETE CASCADE,
                file_name TEXT NOT NULL,
                PRIMARY KEY (gallery_id, file_name)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Database migrations completed successfully");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Photos
    // ------------------------------------------------------------------

    pub async fn add_photo(&self, file_name: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO photos (file_name) VALUES ($1)")
            .bind(file_name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    pub async fn get_photos(&self) -> Result<Vec<Photo>, sqlx::Error> {
        sqlx::query_as::<_, Photo>("SELECT file_name FROM photos ORDER BY file_name")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn remove_photo(&self, file_name: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM photos WHERE file_name = $1")
            .bind(file_name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    // ------------------------------------------------------------------
    // Gallery items and project images
    // ------------------------------------------------------------------

    pub async fn add_gallery_item(&self, item: &GalleryItem) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO gallery_items (id, title, caption, project_info, thumbnail, embed_url)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#,
        )
        .bind(&item.id)
        .bind(&item.title)
        .bind(&item.caption)
        .bind(&item.project_info)
        .bind(&item.thumbnail)
        .bind(&item.embed_url)
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }

    /// Fetch a single gallery item, including its associated images.
    pub async fn get_gallery_item(&self, id: &str) -> Result<Option<GalleryItem>, sqlx::Error> {
        let item = sqlx::query_as::<_, GalleryItem>(
            r#"
            SELECT id, title, caption, project_info, thumbnail, embed_url
            FROM gallery_items WHERE id = $1
        "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut item) = item else {
            return Ok(None);
        };

        item.images = self.get_project_images(id).await?;
        Ok(Some(item))
    }

    pub async fn get_gallery_items(&self) -> Result<Vec<GalleryItem>, sqlx::Error> {
        let mut items = sqlx::query_as::<_, GalleryItem>(
            r#"
            SELECT id, title, caption, project_info, thumbnail, embed_url
            FROM gallery_items ORDER BY id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        for item in &mut items {
            item.images = self.get_project_images(&item.id).await?;
        }

        Ok(items)
    }

    async fn get_project_images(&self, gallery_id: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT file_name FROM project_images WHERE gallery_id = $1",
        )
        .bind(gallery_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Update the descriptive fields of a gallery item. Thumbnail and images
    /// are managed by their own operations.
    pub async fn update_gallery_item(
        &self,
        id: &str,
        title: &str,
        caption: &str,
        project_info: &str,
        embed_url: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE gallery_items
            SET title = $1, caption = $2, project_info = $3, embed_url = $4
            WHERE id = $5
        "#,
        )
        .bind(title)
        .bind(caption)
        .bind(project_info)
        .bind(embed_url)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }

    pub async fn change_thumbnail(&self, id: &str, thumbnail: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE gallery_items SET thumbnail = $1 WHERE id = $2")
            .bind(thumbnail)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    /// Delete a gallery item. Associated `project_images` rows go with it
    /// via ON DELETE CASCADE.
    pub async fn remove_gallery_item(&self, id: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM gallery_items WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    pub async fn add_project_images(
        &self,
        gallery_id: &str,
        files: &[String],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for file in files {
            sqlx::query("INSERT INTO project_images (gallery_id, file_name) VALUES ($1, $2)")
                .bind(gallery_id)
                .bind(file)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await
    }

    /// Remove image associations, one statement per file inside a single
    /// transaction.
    pub async fn remove_project_images(
        &self,
        gallery_id: &str,
        files: &[String],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for file in files {
            sqlx::query("DELETE FROM project_images WHERE gallery_id = $1 AND file_name = $2")
                .bind(gallery_id)
                .bind(file)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Insert a user. The password hash is computed by the caller (bcrypt);
    /// plaintext never reaches this layer.
    pub async fn add_user(
        &self,
        username: &str,
        password_hash: &str,
        protected: bool,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO users (user_name, pwdhash, protected) VALUES ($1, $2, $3)")
            .bind(username)
            .bind(password_hash)
            .bind(protected)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    pub async fn get_user(&self, id: i64) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, user_name, pwdhash, protected, created_at, last_login
            FROM users WHERE id = $1
        "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_user_by_name(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, user_name, pwdhash, protected, created_at, last_login
            FROM users WHERE user_name = $1
        "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_users(&self) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, user_name, pwdhash, protected, created_at, last_login
            FROM users ORDER BY id
        "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_users(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Delete a user. Their sessions go with them via ON DELETE CASCADE.
    pub async fn remove_user(&self, id: i64) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    pub async fn update_login_time(&self, id: i64) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    pub async fn add_session(&self, session: &Session) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_name, user_id, created, max_age)
            VALUES ($1, $2, $3, $4, $5)
        "#,
        )
        .bind(&session.token)
        .bind(&session.username)
        .bind(session.user_id)
        .bind(session.created)
        .bind(session.max_age)
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }

    pub async fn get_session(&self, token: &str) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT token, user_name, user_id, created, max_age
            FROM sessions WHERE token = $1
        "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Idempotent: deleting an absent token is not an error.
    pub async fn remove_session(&self, token: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    /// Drop any existing session for a username. Enforces the
    /// one-session-per-user invariant before a new login is stored.
    pub async fn remove_session_for_name(&self, username: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM sessions WHERE user_name = $1")
            .bind(username)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    pub async fn update_session_max_age(
        &self,
        token: &str,
        max_age: i64,
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE sessions SET max_age = $1 WHERE token = $2")
            .bind(max_age)
            .bind(token)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }
}
