//! Session token persistence and the logged-in user's profile.
//!
//! # Design
//! The token lives in a `TokenStorage` under the fixed key [`TOKEN_KEY`] and
//! is read back on every call, so a token saved by an earlier run is picked
//! up without an explicit restore step. The profile is only cached in memory.
//!
//! `FileTokenStorage` keeps a small JSON object so other client-side values
//! of any shape can share the file without clobbering the token.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{AuthError, StorageError};
use crate::transport::{Connection, Transport};
use crate::types::{Credentials, Profile};

/// Storage key under which the session token is persisted.
pub const TOKEN_KEY: &str = "token";

/// Durable storage for the session token.
pub trait TokenStorage {
    fn load(&self) -> Result<Option<String>, StorageError>;
    fn save(&mut self, token: &str) -> Result<(), StorageError>;
    fn clear(&mut self) -> Result<(), StorageError>;
}

/// In-memory storage. Forgets everything when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStorage {
    token: Option<String>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.token.clone())
    }

    fn save(&mut self, token: &str) -> Result<(), StorageError> {
        self.token = Some(token.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.token = None;
        Ok(())
    }
}

/// JSON key/value file that survives process restarts.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Map<String, Value>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Map::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        // A non-string value under the key is not a token.
        match self.read_entries()?.remove(TOKEN_KEY) {
            Some(Value::String(token)) => Ok(Some(token)),
            _ => Ok(None),
        }
    }

    fn save(&mut self, token: &str) -> Result<(), StorageError> {
        let mut entries = self.read_entries()?;
        entries.insert(TOKEN_KEY.to_string(), Value::String(token.to_string()));
        self.write_entries(&entries)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        let mut entries = self.read_entries()?;
        if entries.remove(TOKEN_KEY).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

/// The current user's session: stored token plus cached profile.
#[derive(Debug)]
pub struct SessionStore<S> {
    storage: S,
    profile: Profile,
}

impl<S: TokenStorage> SessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            profile: Profile::default(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Last profile fetched, or the empty profile.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// The stored token, if any. Unreadable storage counts as logged out.
    pub fn token(&self) -> Option<String> {
        match self.storage.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "could not read session token");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Exchange credentials for a token and persist it.
    ///
    /// Storage is only written after the server accepts the credentials.
    pub fn login<T: Transport>(
        &mut self,
        conn: &Connection<T>,
        username: &str,
        password: &str,
    ) -> Result<String, AuthError> {
        let credentials = Credentials::new(username, password);
        let req = conn
            .client()
            .build_login(&credentials)
            .map_err(AuthError::Rejected)?;
        let token = conn
            .send(req)
            .and_then(|resp| conn.client().parse_login(resp))
            .map_err(AuthError::Rejected)?;
        self.storage.save(&token)?;
        info!(username, "logged in");
        Ok(token)
    }

    /// Create an account. Does not log in.
    pub fn register<T: Transport>(
        &self,
        conn: &Connection<T>,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let credentials = Credentials::new(username, password);
        let req = conn
            .client()
            .build_register(&credentials)
            .map_err(AuthError::Rejected)?;
        let created = conn
            .send(req)
            .and_then(|resp| conn.client().parse_register(resp))
            .map_err(AuthError::Rejected)?;
        info!(username = %created.username, id = created.id, "registered user");
        Ok(())
    }

    /// Forget the token. Never fails; storage errors are only logged.
    pub fn logout(&mut self) {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "could not clear session token");
        }
        self.profile = Profile::default();
        info!("logged out");
    }

    pub fn fetch_profile<T: Transport>(&mut self, conn: &Connection<T>) -> Result<Profile, AuthError> {
        let token = self.token().ok_or(AuthError::MissingToken)?;
        let req = conn.client().build_profile(Some(&token));
        let profile = conn
            .send(req)
            .and_then(|resp| conn.client().parse_profile(resp))
            .map_err(AuthError::Rejected)?;
        self.profile = profile.clone();
        Ok(profile)
    }
}
