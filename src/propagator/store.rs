use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use reqwest::cookie::{CookieStore, Jar};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use url::Url;

use super::PropagationError;

/// On-disk form of the persistent tier
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedSession {
    token: Option<String>,
    base_url: Option<String>,
    saved_at: Option<DateTime<Utc>>,
}

/// What each tier currently holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierSnapshot {
    pub persistent: Option<String>,
    pub session: Option<String>,
    pub cookie: Option<String>,
}

impl TierSnapshot {
    /// The token when every populated tier holds the same one
    pub fn agreed(&self) -> Result<Option<String>, PropagationError> {
        let mut populated = [&self.persistent, &self.session, &self.cookie]
            .into_iter()
            .flatten();

        let Some(first) = populated.next() else {
            return Ok(None);
        };
        if populated.all(|other| other == first) {
            Ok(Some(first.clone()))
        } else {
            Err(PropagationError::Diverged)
        }
    }
}

/// Three-tier token storage for one server
pub struct TokenStore {
    path: PathBuf,
    base_url: Url,
    cookie_name: String,
    session: RwLock<Option<String>>,
    jar: Arc<Jar>,
}

impl TokenStore {
    /// Open the store backed by `path`. A token already on disk seeds the
    /// session slot and the cookie jar.
    pub fn open(
        path: impl Into<PathBuf>,
        base_url: Url,
        cookie_name: impl Into<String>,
    ) -> Result<Self, PropagationError> {
        let store = Self {
            path: path.into(),
            base_url,
            cookie_name: cookie_name.into(),
            session: RwLock::new(None),
            jar: Arc::new(Jar::default()),
        };

        if let Some(token) = store.read_persistent()? {
            store.set_session(Some(token.clone()));
            store.set_cookie(&token);
        }

        Ok(store)
    }

    /// Server the session file at `path` was written for, if any
    pub fn saved_base_url(path: &Path) -> Result<Option<Url>, PropagationError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let persisted: PersistedSession = serde_json::from_str(&content)?;
        match persisted.base_url {
            Some(url) => Ok(Some(Url::parse(&url)?)),
            None => Ok(None),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Jar to hand to `reqwest::ClientBuilder::cookie_provider`
    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    /// Write `token` to every tier
    pub fn store(&self, token: &str) -> Result<(), PropagationError> {
        self.write_persistent(Some(token))?;
        self.set_session(Some(token.to_string()));
        self.set_cookie(token);
        tracing::debug!("Stored token for {}", self.base_url);
        Ok(())
    }

    /// The stored token, or `Diverged` if the tiers disagree
    pub fn current(&self) -> Result<Option<String>, PropagationError> {
        self.snapshot()?.agreed()
    }

    /// Repair the volatile tiers from the session file
    pub fn resync(&self) -> Result<Option<String>, PropagationError> {
        let token = self.read_persistent()?;
        match &token {
            Some(token) => self.set_cookie(token),
            None => self.expire_cookie(),
        }
        self.set_session(token.clone());
        tracing::debug!("Resynced token tiers for {} from {}", self.base_url, self.path.display());
        Ok(token)
    }

    /// Empty every tier
    pub fn clear(&self) -> Result<(), PropagationError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.set_session(None);
        self.expire_cookie();
        Ok(())
    }

    pub fn snapshot(&self) -> Result<TierSnapshot, PropagationError> {
        Ok(TierSnapshot {
            persistent: self.read_persistent()?,
            session: self.session.read().unwrap_or_else(|e| e.into_inner()).clone(),
            cookie: self.read_cookie(),
        })
    }

    /// Overwrite only the in-memory slot, leaving the other tiers alone
    pub fn set_session(&self, token: Option<String>) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    fn read_persistent(&self) -> Result<Option<String>, PropagationError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let persisted: PersistedSession = serde_json::from_str(&content)?;
        Ok(persisted.token.filter(|token| !token.is_empty()))
    }

    /// Owner-only temp file in the same directory, renamed over the old one
    fn write_persistent(&self, token: Option<&str>) -> Result<(), PropagationError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let persisted = PersistedSession {
            token: token.map(str::to_string),
            base_url: Some(self.base_url.to_string()),
            saved_at: Some(Utc::now()),
        };
        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut file, &persisted)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn set_cookie(&self, token: &str) {
        let cookie = format!("{}={}; Path=/", self.cookie_name, token);
        self.jar.add_cookie_str(&cookie, &self.base_url);
    }

    fn expire_cookie(&self) {
        let cookie = format!("{}=; Path=/; Max-Age=0", self.cookie_name);
        self.jar.add_cookie_str(&cookie, &self.base_url);
    }

    fn read_cookie(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let header = header.to_str().ok()?;
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.to_string())
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> TokenStore {
        TokenStore::open(
            dir.path().join("session.json"),
            Url::parse("http://localhost:3000").unwrap(),
            "auth-token",
        )
        .unwrap()
    }

    #[test]
    fn empty_store_has_no_token() {
        let dir = TempDir::new().unwrap();
        assert_eq!(open(&dir).current().unwrap(), None);
    }

    #[test]
    fn store_writes_every_tier() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.store("tok-1").unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.persistent.as_deref(), Some("tok-1"));
        assert_eq!(snapshot.session.as_deref(), Some("tok-1"));
        assert_eq!(snapshot.cookie.as_deref(), Some("tok-1"));
        assert_eq!(store.current().unwrap().as_deref(), Some("tok-1"));
    }

    #[test]
    fn reopen_seeds_volatile_tiers_from_file() {
        let dir = TempDir::new().unwrap();
        open(&dir).store("tok-1").unwrap();

        let saved = TokenStore::saved_base_url(&dir.path().join("session.json")).unwrap();
        assert_eq!(saved.unwrap().as_str(), "http://localhost:3000/");

        let reopened = open(&dir);
        let snapshot = reopened.snapshot().unwrap();
        assert_eq!(snapshot.session.as_deref(), Some("tok-1"));
        assert_eq!(snapshot.cookie.as_deref(), Some("tok-1"));
    }

    #[test]
    fn disagreement_is_reported_then_repaired() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.store("tok-1").unwrap();

        // Another process signs in again and rewrites the file
        open(&dir).store("tok-2").unwrap();

        assert!(matches!(store.current(), Err(PropagationError::Diverged)));
        assert_eq!(store.resync().unwrap().as_deref(), Some("tok-2"));
        assert_eq!(store.current().unwrap().as_deref(), Some("tok-2"));
    }

    #[test]
    fn stale_session_slot_diverges() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.store("tok-1").unwrap();
        store.set_session(Some("stale".to_string()));
        assert!(matches!(store.current(), Err(PropagationError::Diverged)));
    }

    #[test]
    fn clear_empties_every_tier() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.store("tok-1").unwrap();
        store.clear().unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot, TierSnapshot { persistent: None, session: None, cookie: None });
        assert!(!dir.path().join("session.json").exists());

        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn resync_after_file_removed_drops_volatile_tiers() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store.store("tok-1").unwrap();
        fs::remove_file(dir.path().join("session.json")).unwrap();

        assert_eq!(store.resync().unwrap(), None);
        assert_eq!(store.current().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let path = dir.path().join("session.json");

        // A pre-existing world-readable file is replaced, not rewritten in place
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        store.store("tok-1").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.current().unwrap().as_deref(), Some("tok-1"));

        // No temp files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        fs::write(dir.path().join("session.json"), "not json").unwrap();
        assert!(matches!(store.current(), Err(PropagationError::Serde(_))));
    }
}
