//! Mock identity backend and navigator shared by store and router tests.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::{Map, Value, json};

use crate::net::identity::{IdentityBackend, IdentityError};
use crate::net::types::{AuthResponse, Session, User};
use crate::router::Navigator;

pub const PASSWORD: &str = "secret";

fn bag(role: Option<&str>) -> Map<String, Value> {
    let mut map = Map::new();
    if let Some(role) = role {
        map.insert("role".into(), json!(role));
    }
    map
}

pub fn user(email: &str, app_role: Option<&str>, user_role: Option<&str>) -> User {
    User {
        id: format!("id-{email}"),
        email: Some(email.to_owned()),
        app_metadata: bag(app_role),
        user_metadata: bag(user_role),
        identities: Some(vec![json!({ "provider": "email" })]),
    }
}

pub fn session_for(user: &User) -> Session {
    Session {
        access_token: format!("token-{}", user.id),
        refresh_token: "refresh".into(),
        token_type: Some("bearer".into()),
        expires_in: Some(3600),
        expires_at: None,
        user: Some(user.clone()),
    }
}

// =========================================================================
// MockIdentity
// =========================================================================

/// Accepts [`PASSWORD`] for any registered user and remembers the session
/// the way a real client's storage would.
#[derive(Default)]
pub struct MockIdentity {
    users: Mutex<HashMap<String, User>>,
    current: Mutex<Option<Session>>,
    get_error: Mutex<Option<String>>,
    sign_out_error: Mutex<Option<String>>,
    sign_up_response: Mutex<Option<AuthResponse>>,
    calls: Mutex<Vec<&'static str>>,
}

fn rejected(message: &str) -> IdentityError {
    IdentityError::Rejected { status: 400, message: message.to_owned() }
}

impl MockIdentity {
    pub fn with_user(self, user: User) -> Self {
        self.users.lock().unwrap().insert(user.email.clone().unwrap_or_default(), user);
        self
    }

    pub fn signed_in_as(self, user: &User) -> Self {
        *self.current.lock().unwrap() = Some(session_for(user));
        self
    }

    pub fn failing_get(self, message: &str) -> Self {
        *self.get_error.lock().unwrap() = Some(message.to_owned());
        self
    }

    pub fn failing_sign_out(self, message: &str) -> Self {
        *self.sign_out_error.lock().unwrap() = Some(message.to_owned());
        self
    }

    pub fn sign_up_returns(self, response: AuthResponse) -> Self {
        *self.sign_up_response.lock().unwrap() = Some(response);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl IdentityBackend for MockIdentity {
    async fn get_session(&self) -> Result<Option<Session>, IdentityError> {
        self.calls.lock().unwrap().push("get_session");
        if let Some(message) = self.get_error.lock().unwrap().clone() {
            return Err(rejected(&message));
        }
        Ok(self.current.lock().unwrap().clone())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthResponse, IdentityError> {
        self.calls.lock().unwrap().push("sign_in");
        let user = self.users.lock().unwrap().get(email).cloned();
        match user {
            Some(user) if password == PASSWORD => {
                let session = session_for(&user);
                *self.current.lock().unwrap() = Some(session.clone());
                Ok(AuthResponse { session: Some(session), user: Some(user) })
            }
            _ => Err(rejected("Invalid login credentials")),
        }
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<AuthResponse, IdentityError> {
        self.calls.lock().unwrap().push("sign_up");
        if self.users.lock().unwrap().contains_key(email) {
            return Err(rejected("User already registered"));
        }
        Ok(self.sign_up_response.lock().unwrap().clone().unwrap_or_default())
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.calls.lock().unwrap().push("sign_out");
        *self.current.lock().unwrap() = None;
        match self.sign_out_error.lock().unwrap().clone() {
            Some(message) => Err(IdentityError::Request(message)),
            None => Ok(()),
        }
    }
}

// =========================================================================
// RecordingNavigator
// =========================================================================

#[derive(Default)]
pub struct RecordingNavigator {
    pushes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn pushes(&self) -> Vec<String> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Navigator for RecordingNavigator {
    async fn push(&self, path: &str) {
        self.pushes.lock().unwrap().push(path.to_owned());
    }
}
