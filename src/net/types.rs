//! Wire types shared by the comics API and the identity backend.
//!
//! DESIGN
//! ======
//! Shapes mirror the JSON the services emit. Optional server fields use
//! `#[serde(default)]` so older or trimmed responses still parse.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// COMICS
// =============================================================================

/// A comic record as returned by `GET /comics` and `GET /comics/:id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comic {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub genre_id: Option<i64>,
    #[serde(default)]
    pub genre_name: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Only populated on the detail endpoint.
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: i64,
    pub chapter_number: f32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub pages: Vec<Page>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    pub image_url: String,
    pub page_number: i32,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body for `POST /comics` and `PUT /comics/:id`.
///
/// Absent fields are omitted from the JSON entirely. `title` is required by
/// the server on create and optional on update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComicInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
}

impl ComicInput {
    /// Input carrying only a title, the minimum accepted by create.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self { title: Some(title.into()), ..Self::default() }
    }

    /// Trim text fields and drop the ones left empty.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            title: clean(self.title.as_deref()),
            description: clean(self.description.as_deref()),
            author_name: clean(self.author_name.as_deref()),
            genre_id: self.genre_id,
            cover_image_url: clean(self.cover_image_url.as_deref()),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

/// The `{ "data": ... }` envelope the comics API wraps every payload in.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Coarse authorization label derived from user metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
    Other(String),
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for Role {
    fn from(raw: &str) -> Self {
        match raw {
            "admin" => Self::Admin,
            "user" => Self::User,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity-backend user record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub app_metadata: Map<String, Value>,
    #[serde(default)]
    pub user_metadata: Map<String, Value>,
    /// Linked login identities; empty while an email sign-up is unconfirmed
    /// on some backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identities: Option<Vec<Value>>,
}

impl User {
    /// Role from `app_metadata.role`, then `user_metadata.role`, else `user`.
    #[must_use]
    pub fn role(&self) -> Role {
        metadata_role(&self.app_metadata)
            .or_else(|| metadata_role(&self.user_metadata))
            .map_or(Role::User, Role::from)
    }

    #[must_use]
    pub fn has_identities(&self) -> bool {
        self.identities.as_ref().is_some_and(|ids| !ids.is_empty())
    }
}

/// Only non-empty string roles count; numbers, booleans and objects fall through.
fn metadata_role(bag: &Map<String, Value>) -> Option<&str> {
    bag.get("role").and_then(Value::as_str).filter(|r| !r.is_empty())
}

/// Server-issued proof of authentication with the embedded user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<User>,
}

impl Session {
    /// Whether the access token expires within `margin_secs` of `now`.
    /// Sessions without an expiry never report as expiring.
    #[must_use]
    pub fn expires_within(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now + margin_secs)
    }
}

/// Result of sign-in / sign-up: either half may be absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuthResponse {
    pub session: Option<Session>,
    pub user: Option<User>,
}
