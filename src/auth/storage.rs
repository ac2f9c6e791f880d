use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

use super::token::Token;

const TOKEN_FILE_VERSION: u32 = 1;

/// Persistence capability behind a [`super::TokenStore`].
pub trait TokenStorage: Send + Sync {
    fn read(&self) -> Result<Option<Token>, AuthError>;
    fn write(&self, token: &Token) -> Result<(), AuthError>;
    fn clear(&self) -> Result<(), AuthError>;
}

/// Process-local storage; state is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    token: Mutex<Option<Token>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(token: Token) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

impl TokenStorage for MemoryStorage {
    fn read(&self) -> Result<Option<Token>, AuthError> {
        let guard = self
            .token
            .lock()
            .map_err(|_| AuthError::Storage("memory storage lock poisoned".to_string()))?;
        Ok(guard.clone())
    }

    fn write(&self, token: &Token) -> Result<(), AuthError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| AuthError::Storage("memory storage lock poisoned".to_string()))?;
        *guard = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| AuthError::Storage("memory storage lock poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Configuration for file-backed token storage.
#[derive(Debug, Clone)]
pub struct FileStorageConfig {
    pub base_dir: PathBuf,
    pub profile: String,
}

impl FileStorageConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            profile: "default".to_string(),
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn default_dir() -> PathBuf {
        default_authkeep_dir()
    }
}

/// File-backed storage using one TOML file per profile.
///
/// # Example
/// ```no_run
/// use authkeep::auth::{FileStorage, FileStorageConfig, Token, TokenStorage};
///
/// let storage = FileStorage::new(FileStorageConfig::new(std::path::PathBuf::from("/tmp/authkeep")));
/// storage.write(&Token::new(Some("access".to_string()), None))?;
/// # Ok::<(), authkeep::error::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    profile: String,
}

impl FileStorage {
    pub fn new(config: FileStorageConfig) -> Self {
        let profile = normalize_label(&config.profile);
        let name = if profile == "default" {
            "session.toml".to_string()
        } else {
            format!("session.{profile}.toml")
        };
        Self {
            path: config.base_dir.join(name),
            profile,
        }
    }

    pub fn new_default() -> Self {
        Self::new(FileStorageConfig::new(default_authkeep_dir()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(path: &Path) -> Result<(), AuthError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl TokenStorage for FileStorage {
    fn read(&self) -> Result<Option<Token>, AuthError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Storage(err.to_string())),
        };
        let file: TokenFile = toml::from_str(&raw)?;
        if file.version != TOKEN_FILE_VERSION {
            return Err(AuthError::Storage(format!(
                "unsupported token file version {} at {}",
                file.version,
                self.path.display()
            )));
        }
        Ok(Some(file.token))
    }

    fn write(&self, token: &Token) -> Result<(), AuthError> {
        Self::ensure_parent(&self.path)?;
        let file = TokenFile {
            version: TOKEN_FILE_VERSION,
            profile: self.profile.clone(),
            saved_at: Utc::now(),
            token: token.clone(),
        };
        let serialized = toml::to_string(&file)?;
        fs::write(&self.path, serialized)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Storage(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    version: u32,
    profile: String,
    saved_at: DateTime<Utc>,
    token: Token,
}

fn default_authkeep_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".authkeep"))
        .unwrap_or_else(|| PathBuf::from(".authkeep"))
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}
