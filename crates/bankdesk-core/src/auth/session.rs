use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::Credential;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: Credential,
    /// Decoded from the token subject at login, cleared together with the token.
    pub display_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl SessionData {
    fn new(access_token: Credential) -> Self {
        Self {
            access_token,
            display_name: None,
            updated_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.updated_at
    }
}

/// Holder of the current access credential.
///
/// The request pipeline reads the credential before every send, the refresh
/// coordinator replaces it after a refresh and clears it when the session
/// cannot be recovered. A display name can only exist alongside a credential.
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Option<Credential>;

    fn set(&self, credential: Credential) -> Result<()>;

    fn display_name(&self) -> Option<String>;

    fn set_display_name(&self, name: Option<String>) -> Result<()>;

    fn clear(&self) -> Result<()>;

    fn snapshot(&self) -> Option<SessionData>;
}

/// Store a freshly issued login credential along with the display name
/// decoded from it. Returns the display name.
pub fn establish(store: &dyn SessionStore, credential: Credential) -> Result<Option<String>> {
    let display_name = credential.subject();
    store.set(credential)?;
    store.set_display_name(display_name.clone())?;
    Ok(display_name)
}

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    data: RwLock<Option<SessionData>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            data: RwLock::new(Some(SessionData::new(credential))),
        }
    }

    fn load(data: Option<SessionData>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<Credential> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        data.as_ref().map(|d| d.access_token.clone())
    }

    fn set(&self, credential: Credential) -> Result<()> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        match data.as_mut() {
            Some(existing) => {
                existing.access_token = credential;
                existing.updated_at = Utc::now();
            }
            None => *data = Some(SessionData::new(credential)),
        }
        Ok(())
    }

    fn display_name(&self) -> Option<String> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        data.as_ref().and_then(|d| d.display_name.clone())
    }

    fn set_display_name(&self, name: Option<String>) -> Result<()> {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = data.as_mut() {
            existing.display_name = name;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn snapshot(&self) -> Option<SessionData> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Session store persisted as JSON in the cache directory, so a login
/// survives across process restarts.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    inner: MemorySessionStore,
}

impl FileSessionStore {
    /// Open the store, loading any session saved by a previous run.
    pub fn open(cache_dir: &Path) -> Result<Self> {
        let path = cache_dir.join(SESSION_FILE);
        let data = if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read session file")?;
            match serde_json::from_str::<SessionData>(&contents) {
                Ok(data) => {
                    debug!(path = %path.display(), "Session loaded");
                    Some(data)
                }
                Err(e) => {
                    // An unreadable session is the same as no session; login replaces it.
                    warn!(path = %path.display(), error = %e, "Discarding corrupt session file");
                    if let Err(e) = std::fs::remove_file(&path) {
                        warn!(error = %e, "Failed to remove corrupt session file");
                    }
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            path,
            inner: MemorySessionStore::load(data),
        })
    }

    fn save(&self) -> Result<()> {
        let Some(data) = self.inner.snapshot() else {
            return Ok(());
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&data)?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<Credential> {
        self.inner.get()
    }

    fn set(&self, credential: Credential) -> Result<()> {
        self.inner.set(credential)?;
        self.save()
    }

    fn display_name(&self) -> Option<String> {
        self.inner.display_name()
    }

    fn set_display_name(&self, name: Option<String>) -> Result<()> {
        self.inner.set_display_name(name)?;
        self.save()
    }

    fn clear(&self) -> Result<()> {
        self.inner.clear()?;
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    fn snapshot(&self) -> Option<SessionData> {
        self.inner.snapshot()
    }
}
