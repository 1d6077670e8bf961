use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lifecycle::RetryPolicy;
use crate::types::BucketSpec;

/// File looked up in the data directory when no explicit path is given.
pub const CONFIG_FILE: &str = "stagehand.toml";

pub const DEFAULT_DATA_DIR: &str = "./data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Bucket root; `<data_dir>/storage` when unset.
    pub root: Option<PathBuf>,
    pub cache_ttl_secs: u64,
    /// Whether an elevated storage credential is available. Without it,
    /// bucket creation falls back to manual setup instructions.
    pub elevated: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: None,
            cache_ttl_secs: 60,
            elevated: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    /// Database file name, relative to `data_dir`.
    pub database: String,
    /// Directory of `*.sql` migration files. The built-in platform units are
    /// used when unset.
    pub migrations_dir: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    pub retry: RetrySettings,
    pub storage: StorageSettings,
    pub bucket: BucketSpec,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            database: "stagehand.db".to_string(),
            migrations_dir: None,
            host: "127.0.0.1".to_string(),
            port: 8080,
            retry: RetrySettings::default(),
            storage: StorageSettings::default(),
            bucket: BucketSpec::default(),
        }
    }
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Reads `path` if given, otherwise `<data_dir>/stagehand.toml` when it
    /// exists, otherwise defaults. An explicit `data_dir` always wins over
    /// the file's own value.
    pub fn load(data_dir: Option<&Path>, path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let dir = data_dir.unwrap_or(Path::new(DEFAULT_DATA_DIR));
                let candidate = dir.join(CONFIG_FILE);
                let mut settings = if candidate.is_file() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                };
                settings.data_dir = dir.to_path_buf();
                settings
            }
        };
        if let Some(dir) = data_dir {
            settings.data_dir = dir.to_path_buf();
        }
        Ok(settings)
    }

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.database)
    }

    #[must_use]
    pub fn storage_root(&self) -> PathBuf {
        self.storage
            .root
            .clone()
            .unwrap_or_else(|| self.data_dir.join("storage"))
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.storage.cache_ttl_secs)
    }
}
