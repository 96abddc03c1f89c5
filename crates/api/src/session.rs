//! The session store: who is logged in, and the persisted token.
//!
//! The store holds the authenticated user and bearer token for the running
//! process. Across invocations only the opaque token string is persisted,
//! as a small JSON file under the operator's home directory; the user
//! record is whatever the last login returned and is not written to disk.
//! Logout clears the in-memory state and deletes the file.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{ApiError, ApiResult};

/// The authenticated operator, as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// In-memory session state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
}

/// What actually goes to disk: the token and nothing else.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    token: String,
}

/// Process-wide session state with token persistence.
///
/// Cheap to clone; clones share the same state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: Option<PathBuf>,
    state: Arc<RwLock<Session>>,
}

impl SessionStore {
    /// Opens the store at the default location (`~/.lis/session.json`),
    /// reconstructing the session from a previously persisted token.
    pub fn open() -> Self {
        let path = dirs::home_dir().map(|home| home.join(".lis").join("session.json"));
        Self::open_at(path)
    }

    /// Opens the store at an explicit location. `None` disables
    /// persistence entirely.
    pub fn open_at(path: Option<PathBuf>) -> Self {
        let mut session = Session::default();
        if let Some(ref path) = path {
            match Self::read_persisted(path) {
                Ok(Some(persisted)) => {
                    tracing::debug!("restored session token from {}", path.display());
                    session.token = Some(persisted.token);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!("ignoring unreadable session file: {}", err);
                }
            }
        }
        Self {
            path,
            state: Arc::new(RwLock::new(session)),
        }
    }

    fn read_persisted(path: &std::path::Path) -> ApiResult<Option<PersistedSession>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).map_err(ApiError::SessionRead)?;
        let persisted = serde_json::from_str(&contents).map_err(ApiError::SessionEncode)?;
        Ok(Some(persisted))
    }

    /// The current bearer token, if any.
    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    /// The current user, if a login happened in this process.
    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    /// Whether a token is held (persisted or from a fresh login).
    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.token.is_some()
    }

    /// Installs a fresh identity after login and persists the token.
    pub async fn establish(&self, user: User, token: String) -> ApiResult<()> {
        {
            let mut state = self.state.write().await;
            state.user = Some(user);
            state.token = Some(token.clone());
        }
        if let Some(ref path) = self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(ApiError::SessionWrite)?;
            }
            let json = serde_json::to_string_pretty(&PersistedSession { token })
                .map_err(ApiError::SessionEncode)?;
            std::fs::write(path, json).map_err(ApiError::SessionWrite)?;
            tracing::debug!("persisted session token to {}", path.display());
        }
        Ok(())
    }

    /// Clears the session and removes the persisted token.
    pub async fn clear(&self) {
        *self.state.write().await = Session::default();
        if let Some(ref path) = self.path {
            if path.exists() {
                if let Err(err) = std::fs::remove_file(path) {
                    tracing::warn!("failed to delete session file: {}", err);
                }
            }
        }
    }
}
