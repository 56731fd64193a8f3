use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::{KeyValueStore, StorageError};
use crate::models::{Chats, Notification, ServiceRequest, UserMode, UserProfile};

// Durable cache keys
pub const KEY_USER_MODE: &str = "userMode";
pub const KEY_USER: &str = "user";
pub const KEY_REQUESTS: &str = "requests";
pub const KEY_NOTIFICATIONS: &str = "notifications";
pub const KEY_CHATS: &str = "chats";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        crate::utils::format_age_minutes(self.age_minutes())
    }
}

/// Typed access to the durable cache, one load/save pair per collection.
#[derive(Clone)]
pub struct CacheManager {
    backend: Arc<dyn KeyValueStore>,
}

impl CacheManager {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CachedData<T>>, StorageError> {
        let Some(contents) = self.backend.get(key)? else {
            return Ok(None);
        };

        match serde_json::from_str::<CachedData<T>>(&contents) {
            Ok(cached) => Ok(Some(cached)),
            Err(envelope_err) => {
                // Values written without the envelope are still readable
                match serde_json::from_str::<T>(&contents) {
                    Ok(data) => {
                        debug!(key, "Loaded bare cache value without envelope");
                        Ok(Some(CachedData::new(data)))
                    }
                    Err(_) => Err(StorageError::serialization(key, envelope_err)),
                }
            }
        }
    }

    fn save<T: Serialize>(&self, key: &str, data: &T) -> Result<(), StorageError> {
        let cached = CachedData::new(data);
        let contents =
            serde_json::to_string_pretty(&cached).map_err(|e| StorageError::serialization(key, e))?;
        self.backend.set(key, &contents)
    }

    // ===== Mode =====

    pub fn load_mode(&self) -> Result<Option<CachedData<UserMode>>, StorageError> {
        self.load(KEY_USER_MODE)
    }

    pub fn save_mode(&self, mode: UserMode) -> Result<(), StorageError> {
        self.save(KEY_USER_MODE, &mode)
    }

    // ===== User =====

    pub fn load_user(&self) -> Result<Option<CachedData<UserProfile>>, StorageError> {
        self.load(KEY_USER)
    }

    pub fn save_user(&self, user: &UserProfile) -> Result<(), StorageError> {
        self.save(KEY_USER, user)
    }

    pub fn remove_user(&self) -> Result<(), StorageError> {
        self.backend.remove(KEY_USER)
    }

    // ===== Requests =====

    pub fn load_requests(&self) -> Result<Option<CachedData<Vec<ServiceRequest>>>, StorageError> {
        self.load(KEY_REQUESTS)
    }

    pub fn save_requests(&self, requests: &[ServiceRequest]) -> Result<(), StorageError> {
        self.save(KEY_REQUESTS, &requests)
    }

    // ===== Notifications =====

    pub fn load_notifications(
        &self,
    ) -> Result<Option<CachedData<Vec<Notification>>>, StorageError> {
        self.load(KEY_NOTIFICATIONS)
    }

    pub fn save_notifications(&self, notifications: &[Notification]) -> Result<(), StorageError> {
        self.save(KEY_NOTIFICATIONS, &notifications)
    }

    // ===== Chats =====

    pub fn load_chats(&self) -> Result<Option<CachedData<Chats>>, StorageError> {
        self.load(KEY_CHATS)
    }

    pub fn save_chats(&self, chats: &Chats) -> Result<(), StorageError> {
        self.save(KEY_CHATS, chats)
    }

    // ===== Cache Age Information =====

    /// Helper to load cache and log errors without failing
    fn load_age<T>(
        &self,
        name: &str,
        loader: impl FnOnce() -> Result<Option<CachedData<T>>, StorageError>,
    ) -> Option<String> {
        match loader() {
            Ok(Some(cached)) => Some(cached.age_display()),
            Ok(None) => None,
            Err(e) => {
                debug!(cache = name, error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    pub fn cache_ages(&self) -> CacheAges {
        CacheAges {
            user: self.load_age(KEY_USER, || self.load_user()),
            requests: self.load_age(KEY_REQUESTS, || self.load_requests()),
            notifications: self.load_age(KEY_NOTIFICATIONS, || self.load_notifications()),
            chats: self.load_age(KEY_CHATS, || self.load_chats()),
        }
    }
}

#[derive(Debug, Default)]
pub struct CacheAges {
    pub user: Option<String>,
    pub requests: Option<String>,
    pub notifications: Option<String>,
    pub chats: Option<String>,
}

impl CacheAges {
    pub fn requests_age(&self) -> String {
        self.requests.clone().unwrap_or_else(|| "never".to_string())
    }

    /// Returns the first known save time, checking the busiest collections first
    pub fn last_updated(&self) -> String {
        let ages = [&self.requests, &self.notifications, &self.chats, &self.user];

        if let Some(a) = ages.iter().copied().flatten().next() {
            return a.clone();
        }

        "never".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
