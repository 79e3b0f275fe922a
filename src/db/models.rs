//! Database models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Administrator account. The password hash never leaves the server.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[sqlx(rename = "user_name")]
    pub username: String,
    #[serde(skip_serializing)]
    #[sqlx(rename = "pwdhash")]
    pub password_hash: String,
    pub protected: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// One authenticated browser session. `token` is the value handed to the
/// client in the `session_token` cookie and doubles as the primary key.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[sqlx(rename = "user_name")]
    pub username: String,
    pub user_id: i64,
    pub created: DateTime<Utc>,
    /// Lifetime in seconds, relative to `created`. Always positive.
    pub max_age: i64,
}

impl Session {
    /// Absolute expiry instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created + Duration::seconds(self.max_age)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// A registered photo. The filename is the identity; the bytes live on disk.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Photo {
    pub file_name: String,
}

/// A portfolio project shown in the gallery.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GalleryItem {
    pub id: String,
    pub title: String,
    pub caption: String,
    pub project_info: String,
    pub thumbnail: String,
    pub embed_url: Option<String>,
    /// Associated image filenames; loaded separately from `project_images`.
    #[sqlx(skip)]
    #[serde(default)]
    pub images: Vec<String>,
}

/// About-page info, stored as a JSON file rather than a table. A missing
/// file is an implicit empty instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct About {
    #[serde(default)]
    pub portrait: String,
    #[serde(default)]
    pub statement: String,
    #[serde(default)]
    pub resume: String,
}

/// Merge-update request for the about page. `None` and `""` both mean
/// "leave the stored value alone".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AboutUpdate {
    pub portrait: Option<String>,
    pub statement: Option<String>,
    pub resume: Option<String>,
}

impl About {
    /// Apply a merge update, keeping fields the update leaves empty.
    pub fn merged(mut self, update: AboutUpdate) -> Self {
        if let Some(portrait) = update.portrait.filter(|s| !s.is_empty()) {
            self.portrait = portrait;
        }
        if let Some(statement) = update.statement.filter(|s| !s.is_empty()) {
            self.statement = statement;
        }
        if let Some(resume) = update.resume.filter(|s| !s.is_empty()) {
            self.resume = resume;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_age(created: DateTime<Utc>, max_age: i64) -> Session {
        Session {
            token: "test-token".to_string(),
            username: "nicole".to_string(),
            user_id: 1,
            created,
            max_age,
        }
    }

    #[test]
    fn test_session_not_expired_within_max_age() {
        let now = Utc::now();
        let session = session_with_age(now, 600);
        assert!(!session.is_expired_at(now + Duration::seconds(599)));
    }

    #[test]
    fn test_session_expired_past_max_age() {
        let now = Utc::now();
        let session = session_with_age(now, 600);
        assert!(session.is_expired_at(now + Duration::seconds(601)));
    }

    #[test]
    fn test_expires_at_is_created_plus_max_age() {
        let created = Utc::now();
        let session = session_with_age(created, 300);
        assert_eq!(session.expires_at(), created + Duration::seconds(300));
    }

    #[test]
    fn test_about_merge_keeps_fields_on_empty_update() {
        let stored = About {
            portrait: "portrait.jpg".to_string(),
            statement: "designer statement".to_string(),
            resume: "resume.pdf".to_string(),
        };

        let merged = stored.clone().merged(AboutUpdate {
            portrait: None,
            statement: Some(String::new()),
            resume: None,
        });

        assert_eq!(merged, stored);
    }

    #[test]
    fn test_about_merge_replaces_nonempty_fields() {
        let stored = About {
            statement: "old".to_string(),
            ..About::default()
        };

        let merged = stored.merged(AboutUpdate {
            statement: Some("new statement".to_string()),
            ..AboutUpdate::default()
        });

        assert_eq!(merged.statement, "new statement");
        assert_eq!(merged.portrait, "");
    }

    #[test]
    fn test_user_serialization_omits_password_hash() {
        let user = User {
            id: 1,
            username: "nicole".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            protected: true,
            created_at: Utc::now(),
            last_login: None,
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("nicole"));
    }
}
