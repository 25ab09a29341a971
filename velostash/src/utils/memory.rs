use std::collections::BTreeMap;

use crate::{KeyValueStore, StoreError, utils::encoding::stored_size};

/// A memory-based storage implementation using a [`BTreeMap`].
///
/// Mirrors a browser storage area: entries are accounted as UTF-16 text, and an
/// optional quota makes writes fail with [`StoreError::QuotaExceeded`] once the
/// total would go over it. Also serves as the session-scoped store of the gateway.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
    quota: Option<u64>,
    used: u64,
    fail_next: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that rejects writes once `quota` bytes are in use.
    pub fn with_quota(quota: u64) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    pub fn set_quota(&mut self, quota: Option<u64>) {
        self.quota = quota;
    }

    pub fn quota(&self) -> Option<u64> {
        self.quota
    }

    /// Bytes currently accounted against the quota.
    pub fn used_bytes(&self) -> u64 {
        self.used
    }

    /// Makes the next `count` writes fail as if the store were full, regardless of quota.
    pub fn reject_next_writes(&mut self, count: usize) {
        self.fail_next = count;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let needed = stored_size(key, value);
        let released = self
            .entries
            .get(key)
            .map_or(0, |previous| stored_size(key, previous));
        let remaining = self
            .quota
            .map_or(u64::MAX, |quota| quota.saturating_sub(self.used));

        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(StoreError::QuotaExceeded {
                key: key.to_string(),
                needed,
                remaining,
            });
        }

        let projected = self.used - released + needed;
        if let Some(quota) = self.quota
            && projected > quota
        {
            return Err(StoreError::QuotaExceeded {
                key: key.to_string(),
                needed,
                remaining,
            });
        }

        self.entries.insert(key.to_string(), value.to_string());
        self.used = projected;
        Ok(())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn remove_item(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let removed = self.entries.remove(key);
        if let Some(value) = &removed {
            self.used -= stored_size(key, value);
        }
        Ok(removed)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
