use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::models::{AuthContext, User};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("session file {path} is not valid: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write session file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// The signed-in user, as saved by `apply session set`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
    pub saved_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: String, user: Option<User>) -> Self {
        Self {
            token,
            user,
            saved_at: Utc::now(),
        }
    }

    /// A missing file means nobody is signed in.
    pub fn load(path: &Path) -> Result<Option<Self>, SessionError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no session file");
                return Ok(None);
            }
            Err(source) => {
                return Err(SessionError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let session = serde_json::from_str(&raw).map_err(|source| SessionError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(session))
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let write_err = |source: io::Error| SessionError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| write_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        std::fs::write(path, json).map_err(write_err)
    }

    /// Returns whether there was a session to remove.
    pub fn clear(path: &Path) -> Result<bool, SessionError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(SessionError::Write {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Signed in means a non-empty token.
pub fn auth_context(session: Option<&Session>) -> AuthContext {
    match session {
        Some(session) if !session.token.is_empty() => AuthContext {
            is_authorized: true,
            user: session.user.clone(),
        },
        _ => AuthContext::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn seeker() -> User {
        User {
            name: Some("Grace Hopper".to_string()),
            email: Some("grace@example.com".to_string()),
            role: Role::JobSeeker,
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let session = Session::new("tok".to_string(), Some(seeker()));
        session.save(&path).unwrap();

        let loaded = Session::load(&path).unwrap().unwrap();
        assert_eq!(loaded, session);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"role\": \"Job Seeker\""));
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Session::load(&dir.path().join("session.json")).unwrap().is_none());
    }

    #[test]
    fn test_load_garbage_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Session::load(&path), Err(SessionError::Parse { .. })));
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        Session::new("tok".to_string(), None).save(&path).unwrap();

        assert!(Session::clear(&path).unwrap());
        assert!(!Session::clear(&path).unwrap());
        assert!(Session::load(&path).unwrap().is_none());
    }

    #[test]
    fn test_auth_context() {
        assert_eq!(auth_context(None), AuthContext::default());

        let empty = Session::new(String::new(), Some(seeker()));
        assert!(!auth_context(Some(&empty)).is_authorized);

        let session = Session::new("tok".to_string(), Some(seeker()));
        let auth = auth_context(Some(&session));
        assert!(auth.is_authorized);
        assert_eq!(auth.user, Some(seeker()));
    }
}
