//! Session manager. Produces and validates login sessions on top of the
//! persistence gateway, owning the expiry policy and the
//! one-active-session-per-user invariant.

use chrono::Utc;
use uuid::Uuid;

use crate::db::models::Session;
use crate::db::Db;

/// Lifetime of a plain login.
const SHORT_MAX_AGE_SECS: i64 = 10 * 60;
/// Lifetime of an extended ("remember me") login.
const EXTENDED_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;
/// How far a refresh pushes the expiry past the current moment.
const REFRESH_WINDOW_SECS: i64 = 5 * 60;

/// Outcome of a token lookup. A missing or expired session is a normal
/// result, not an error; only storage failures are errors.
#[derive(Debug, Clone)]
pub enum SessionStatus {
    Valid(Session),
    Missing,
    Expired,
}

impl SessionStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionStatus::Valid(_))
    }
}

#[derive(Debug, Clone)]
pub struct SessionManager {
    db: Db,
}

impl SessionManager {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a session for a freshly authenticated user. Any session the
    /// user already had is removed first, so the previous token stops
    /// working as soon as the new login completes.
    pub async fn create(
        &self,
        user_id: i64,
        username: &str,
        extended: bool,
    ) -> Result<Session, sqlx::Error> {
        let max_age = if extended {
            EXTENDED_MAX_AGE_SECS
        } else {
            SHORT_MAX_AGE_SECS
        };

        let session = Session {
            token: Uuid::new_v4().to_string(),
            username: username.to_string(),
            user_id,
            created: Utc::now(),
            max_age,
        };

        self.db.remove_session_for_name(username).await?;
        self.db.add_session(&session).await?;

        Ok(session)
    }

    /// Look up a token. An expired session row is deleted before reporting
    /// `Expired`, so stale rows never outlive their first post-expiry use.
    pub async fn validate(&self, token: &str) -> Result<SessionStatus, sqlx::Error> {
        let Some(session) = self.db.get_session(token).await? else {
            return Ok(SessionStatus::Missing);
        };

        if session.is_expired() {
            self.db.remove_session(token).await?;
            tracing::debug!(username = %session.username, "removed expired session");
            return Ok(SessionStatus::Expired);
        }

        Ok(SessionStatus::Valid(session))
    }

    /// Delete a session. Deleting an absent token is not an error.
    pub async fn invalidate(&self, token: &str) -> Result<(), sqlx::Error> {
        self.db.remove_session(token).await
    }

    /// Extend a still-valid session so it expires `REFRESH_WINDOW_SECS` from
    /// now, and return the updated session for cookie re-issue. Returns
    /// `Missing`/`Expired` statuses unchanged.
    pub async fn refresh(&self, token: &str) -> Result<SessionStatus, sqlx::Error> {
        let status = self.validate(token).await?;
        let SessionStatus::Valid(mut session) = status else {
            return Ok(status);
        };

        // Keep the created+max_age model: move max_age so that
        // created + max_age lands at now + refresh window.
        let new_max_age =
            (Utc::now() - session.created).num_seconds() + REFRESH_WINDOW_SECS;

        // A refresh never shortens a session's remaining lifetime.
        let new_max_age = new_max_age.max(session.max_age + 1);

        self.db
            .update_session_max_age(token, new_max_age)
            .await?;
        session.max_age = new_max_age;

        Ok(SessionStatus::Valid(session))
    }

    /// Seconds a new session of the given kind lives, used for the cookie
    /// Max-Age attribute.
    pub fn lifetime_secs(extended: bool) -> i64 {
        if extended {
            EXTENDED_MAX_AGE_SECS
        } else {
            SHORT_MAX_AGE_SECS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_lifetime_extended_is_thirty_days() {
        assert_eq!(SessionManager::lifetime_secs(true), 30 * 24 * 60 * 60);
    }

    #[test]
    fn test_lifetime_short_is_ten_minutes() {
        assert_eq!(SessionManager::lifetime_secs(false), 600);
    }

    #[test]
    fn test_status_is_valid_only_for_valid() {
        let session = Session {
            token: "t".to_string(),
            username: "u".to_string(),
            user_id: 1,
            created: Utc::now(),
            max_age: 600,
        };
        assert!(SessionStatus::Valid(session).is_valid());
        assert!(!SessionStatus::Missing.is_valid());
        assert!(!SessionStatus::Expired.is_valid());
    }

    #[test]
    fn test_refresh_window_extends_past_short_expiry() {
        // A session refreshed near its original expiry must gain lifetime:
        // the recomputed max_age is strictly greater than the old one.
        let created = Utc::now() - ChronoDuration::seconds(SHORT_MAX_AGE_SECS - 10);
        let elapsed = (Utc::now() - created).num_seconds();
        let new_max_age = (elapsed + REFRESH_WINDOW_SECS).max(SHORT_MAX_AGE_SECS + 1);
        assert!(new_max_age > SHORT_MAX_AGE_SECS);
    }

    // Storage-backed tests below run only when TEST_DATABASE_URL points at a
    // disposable Postgres database; without it they are no-ops.

    async fn test_db() -> Option<Db> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;

        let tmp = std::env::temp_dir().join("portfolio-api-tests");
        let config = crate::config::AppConfig {
            database_url: url,
            image_dir: tmp.join("images"),
            resources_dir: tmp.join("resources"),
            host: "127.0.0.1".to_string(),
            port: 0,
            db_pool_max: 2,
            db_pool_min: 0,
        };

        Some(Db::connect(&config).await.expect("test database connection"))
    }

    async fn test_user(db: &Db) -> (i64, String) {
        let name = format!("session-test-{}", Uuid::new_v4());
        db.add_user(&name, "not-a-real-hash", false)
            .await
            .expect("insert test user");
        let user = db
            .get_user_by_name(&name)
            .await
            .expect("look up test user")
            .expect("test user exists");
        (user.id, name)
    }

    #[tokio::test]
    async fn test_relogin_invalidates_previous_session() {
        let Some(db) = test_db().await else { return };
        let manager = SessionManager::new(db.clone());
        let (user_id, name) = test_user(&db).await;

        let first = manager.create(user_id, &name, false).await.unwrap();
        let second = manager.create(user_id, &name, false).await.unwrap();

        assert!(matches!(
            manager.validate(&first.token).await.unwrap(),
            SessionStatus::Missing
        ));
        assert!(manager.validate(&second.token).await.unwrap().is_valid());

        // Cascade removes the remaining session with the user.
        db.remove_user(user_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_session_row_is_deleted_on_validation() {
        let Some(db) = test_db().await else { return };
        let manager = SessionManager::new(db.clone());
        let (user_id, name) = test_user(&db).await;

        let stale = Session {
            token: Uuid::new_v4().to_string(),
            username: name,
            user_id,
            created: Utc::now() - ChronoDuration::seconds(SHORT_MAX_AGE_SECS + 60),
            max_age: SHORT_MAX_AGE_SECS,
        };
        db.add_session(&stale).await.unwrap();

        assert!(matches!(
            manager.validate(&stale.token).await.unwrap(),
            SessionStatus::Expired
        ));
        assert!(db.get_session(&stale.token).await.unwrap().is_none());

        db.remove_user(user_id).await.unwrap();
    }
}
