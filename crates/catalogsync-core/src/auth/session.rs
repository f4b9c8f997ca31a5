use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub user: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

impl SessionIdentity {
    pub fn new(user: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            session_id: session_id.into(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user.is_empty() && self.session_id.is_empty()
    }
}

/// Supplies the identity attached to outgoing requests.
pub trait SessionContext: Send + Sync {
    fn identity(&self) -> SessionIdentity;
}

/// Fixed identity, for tools and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSession(pub SessionIdentity);

impl SessionContext for StaticSession {
    fn identity(&self) -> SessionIdentity {
        self.0.clone()
    }
}

/// Identity read from the `session.json` left by the console login.
pub struct FileSession {
    cache_dir: PathBuf,
    pub data: Option<SessionIdentity>,
}

impl FileSession {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load session from disk
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read session file")?;
            let data: SessionIdentity =
                serde_json::from_str(&contents).context("Failed to parse session file")?;
            self.data = Some(data);
            return Ok(true);
        }
        Ok(false)
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

impl SessionContext for FileSession {
    fn identity(&self) -> SessionIdentity {
        self.data.clone().unwrap_or_default()
    }
}
