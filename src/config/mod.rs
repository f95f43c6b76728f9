//! Server configuration
//!
//! Resolves the backend base address. The address is a validated IPv4 string
//! combined with a fixed port; users can override the built-in default and
//! the override is persisted in the key-value store under `server_ip`.
//!
//! The config is an explicit object passed into the API gateway rather than
//! ambient global state; `load` is the explicit reload operation.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::storage::KvStore;

/// Storage key for the persisted address override
pub const SERVER_IP_KEY: &str = "server_ip";

/// Built-in backend address used when no valid override is stored
pub const DEFAULT_IP: &str = "192.168.216.72";

/// Backend port; not user-configurable in the client
pub const DEFAULT_PORT: u16 = 8080;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(String),
}

/// Check that `input` is exactly four dot-separated decimal octets 0-255.
pub fn is_valid_ip(input: &str) -> bool {
    let trimmed = input.trim();
    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    parts.iter().all(|part| {
        !part.is_empty()
            && part.len() <= 3
            && part.bytes().all(|b| b.is_ascii_digit())
            && part.parse::<u16>().map(|n| n <= 255).unwrap_or(false)
    })
}

/// Resolves and persists the backend server address.
pub struct ConfigStore {
    store: Arc<dyn KvStore>,
    address: RwLock<String>,
    port: u16,
}

impl ConfigStore {
    /// Create a config store with the built-in default address and port
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_port(store, DEFAULT_PORT)
    }

    /// Create a config store targeting a non-default port
    pub fn with_port(store: Arc<dyn KvStore>, port: u16) -> Self {
        Self {
            store,
            address: RwLock::new(DEFAULT_IP.to_string()),
            port,
        }
    }

    /// Reload the persisted override. An invalid or missing stored value
    /// keeps the current address; storage faults are logged and swallowed.
    /// Returns the address now in effect.
    pub async fn load(&self) -> String {
        match self.store.get(SERVER_IP_KEY).await {
            Ok(Some(stored)) if is_valid_ip(&stored) => {
                let mut address = self.address.write().await;
                *address = stored.trim().to_string();
                address.clone()
            }
            Ok(stored) => {
                if let Some(stored) = stored {
                    tracing::warn!(%stored, "ignoring invalid stored server address");
                }
                self.address.read().await.clone()
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load server address");
                self.address.read().await.clone()
            }
        }
    }

    /// The address currently in effect
    pub async fn address(&self) -> String {
        self.address.read().await.clone()
    }

    /// Base URL for API requests, `http://{address}:{port}`
    pub async fn base_url(&self) -> String {
        format!("http://{}:{}", self.address.read().await, self.port)
    }

    /// Validate and apply a new address, then persist it.
    ///
    /// Validation happens before any store write; persistence failures keep
    /// the in-memory value and are logged.
    pub async fn set_address(&self, ip: &str) -> Result<(), ConfigError> {
        if !is_valid_ip(ip) {
            return Err(ConfigError::InvalidAddress(ip.to_string()));
        }

        let trimmed = ip.trim().to_string();
        *self.address.write().await = trimmed.clone();

        if let Err(err) = self.store.set(SERVER_IP_KEY, &trimmed).await {
            tracing::error!(error = %err, "failed to persist server address");
        }
        Ok(())
    }

    /// Reset to the built-in default and remove the stored override
    pub async fn clear_address(&self) {
        *self.address.write().await = DEFAULT_IP.to_string();
        if let Err(err) = self.store.remove(SERVER_IP_KEY).await {
            tracing::error!(error = %err, "failed to clear server address");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid_ip("0.0.0.0"));
        assert!(is_valid_ip("192.168.1.1"));
        assert!(is_valid_ip("255.255.255.255"));
        assert!(is_valid_ip("  10.0.0.1  "));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(!is_valid_ip("999.1.1.1"));
        assert!(!is_valid_ip("256.0.0.1"));
        assert!(!is_valid_ip("1.2.3"));
        assert!(!is_valid_ip("1.2.3.4.5"));
        assert!(!is_valid_ip("1.2.3."));
        assert!(!is_valid_ip("a.b.c.d"));
        assert!(!is_valid_ip("1.2.3.4x"));
        assert!(!is_valid_ip(""));
    }

    #[tokio::test]
    async fn test_rejected_address_is_never_written() {
        let store = Arc::new(MemoryStore::new());
        let config = ConfigStore::new(store.clone());

        let result = config.set_address("999.1.1.1").await;
        assert!(matches!(result, Err(ConfigError::InvalidAddress(_))));
        assert_eq!(store.get(SERVER_IP_KEY).await.unwrap(), None);
        assert_eq!(config.address().await, DEFAULT_IP);
    }

    #[tokio::test]
    async fn test_set_address_persists_and_applies() {
        let store = Arc::new(MemoryStore::new());
        let config = ConfigStore::new(store.clone());

        config.set_address("10.1.2.3").await.unwrap();
        assert_eq!(config.address().await, "10.1.2.3");
        assert_eq!(
            store.get(SERVER_IP_KEY).await.unwrap(),
            Some("10.1.2.3".to_string())
        );
        assert_eq!(config.base_url().await, "http://10.1.2.3:8080");
    }

    #[tokio::test]
    async fn test_load_applies_valid_override_only() {
        let store = Arc::new(MemoryStore::new());
        store.set(SERVER_IP_KEY, "10.9.8.7").await.unwrap();

        let config = ConfigStore::new(store.clone());
        assert_eq!(config.load().await, "10.9.8.7");

        store.set(SERVER_IP_KEY, "not-an-ip").await.unwrap();
        assert_eq!(config.load().await, "10.9.8.7");
    }

    #[tokio::test]
    async fn test_clear_address_resets_default() {
        let store = Arc::new(MemoryStore::new());
        let config = ConfigStore::new(store.clone());

        config.set_address("10.1.2.3").await.unwrap();
        config.clear_address().await;

        assert_eq!(config.address().await, DEFAULT_IP);
        assert_eq!(store.get(SERVER_IP_KEY).await.unwrap(), None);
    }
}
