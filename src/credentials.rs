// src/credentials.rs

//! Storage for the elevated service-role key.
//!
//! Each admin keeps at most one key, stored under its own namespace so it can
//! never be confused with a regular session token. The key is read on every
//! privileged-client construction and cleared on logout or explicit reset.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    path::PathBuf,
    sync::{Arc, LazyLock},
};

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Namespace used for regular user sessions. Service-role keys never live here.
pub const SESSION_NAMESPACE: &str = "mar.auth.session";

/// Prefix of the per-owner service-role namespace.
pub const SERVICE_ROLE_NAMESPACE: &str = "mar.admin.service-role";

/// Service-role keys are JWTs: three base64url segments, header starting with `eyJ`.
static KEY_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^eyJ[A-Za-z0-9_-]*\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+$")
        .expect("service-role key pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    Empty,
    InvalidFormat,
    Storage(String),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::Empty => write!(f, "Service role key must not be empty"),
            CredentialError::InvalidFormat => {
                write!(f, "Service role key does not look like a valid JWT")
            }
            CredentialError::Storage(msg) => write!(f, "Credential storage error: {}", msg),
        }
    }
}

impl std::error::Error for CredentialError {}

/// Checks the key shape and returns the trimmed key.
pub fn validate_service_role_key(raw: &str) -> Result<String, CredentialError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(CredentialError::Empty);
    }
    if !KEY_SHAPE.is_match(key) {
        return Err(CredentialError::InvalidFormat);
    }
    Ok(key.to_string())
}

/// Backend for persisted credentials, keyed by namespace.
#[async_trait]
pub trait KeyStorage: Send + Sync {
    async fn load(&self, namespace: &str) -> Result<Option<String>, CredentialError>;
    async fn save(&self, namespace: &str, value: &str) -> Result<(), CredentialError>;
    async fn remove(&self, namespace: &str) -> Result<(), CredentialError>;
}

/// Process-local storage. Used in tests and when no persistence is wanted.
#[derive(Default)]
pub struct MemoryKeyStorage {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyStorage for MemoryKeyStorage {
    async fn load(&self, namespace: &str) -> Result<Option<String>, CredentialError> {
        Ok(self.entries.lock().await.get(namespace).cloned())
    }

    async fn save(&self, namespace: &str, value: &str) -> Result<(), CredentialError> {
        self.entries
            .lock()
            .await
            .insert(namespace.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, namespace: &str) -> Result<(), CredentialError> {
        self.entries.lock().await.remove(namespace);
        Ok(())
    }
}

/// A single JSON object on disk mapping namespace to value.
pub struct FileKeyStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl FileKeyStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>, CredentialError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| CredentialError::Storage(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(CredentialError::Storage(e.to_string())),
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CredentialError::Storage(e.to_string()))?;
        }

        let raw = serde_json::to_string_pretty(map)
            .map_err(|e| CredentialError::Storage(e.to_string()))?;

        // Atomic replace.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| CredentialError::Storage(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CredentialError::Storage(e.to_string()))
    }
}

#[async_trait]
impl KeyStorage for FileKeyStorage {
    async fn load(&self, namespace: &str) -> Result<Option<String>, CredentialError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.remove(namespace))
    }

    async fn save(&self, namespace: &str, value: &str) -> Result<(), CredentialError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(namespace.to_string(), value.to_string());
        self.write_map(&map).await
    }

    async fn remove(&self, namespace: &str) -> Result<(), CredentialError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(namespace).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }
}

/// Configuration service owning every admin's service-role key.
///
/// Cheap to clone; clones share the storage and the read cache.
#[derive(Clone)]
pub struct ServiceRoleStore {
    storage: Arc<dyn KeyStorage>,
    cache: Arc<RwLock<HashMap<String, Option<String>>>>,
}

impl ServiceRoleStore {
    pub fn new(storage: Arc<dyn KeyStorage>) -> Self {
        Self {
            storage,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyStorage::default()))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileKeyStorage::new(path)))
    }

    /// The key slot belonging to one admin.
    pub fn for_owner(&self, owner: Uuid) -> ServiceRoleConfig {
        ServiceRoleConfig {
            store: self.clone(),
            namespace: format!("{}.{}", SERVICE_ROLE_NAMESPACE, owner),
        }
    }
}

/// One owner's optional service-role key.
pub struct ServiceRoleConfig {
    store: ServiceRoleStore,
    namespace: String,
}

impl ServiceRoleConfig {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn get(&self) -> Result<Option<String>, CredentialError> {
        if let Some(cached) = self.store.cache.read().await.get(&self.namespace) {
            return Ok(cached.clone());
        }

        let loaded = self.store.storage.load(&self.namespace).await?;
        self.store
            .cache
            .write()
            .await
            .insert(self.namespace.clone(), loaded.clone());
        Ok(loaded)
    }

    pub async fn exists(&self) -> Result<bool, CredentialError> {
        Ok(self.get().await?.is_some())
    }

    /// Validates and persists a key, replacing any previous one.
    pub async fn set(&self, raw: &str) -> Result<(), CredentialError> {
        let key = validate_service_role_key(raw)?;
        self.store.storage.save(&self.namespace, &key).await?;
        self.store
            .cache
            .write()
            .await
            .insert(self.namespace.clone(), Some(key));
        Ok(())
    }

    /// Forgets the key. The cache entry goes too, so clearing leaves nothing behind.
    pub async fn clear(&self) -> Result<(), CredentialError> {
        self.store.storage.remove(&self.namespace).await?;
        self.store.cache.write().await.remove(&self.namespace);
        Ok(())
    }
}
