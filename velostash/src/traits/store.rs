use crate::StoreError;

/// A trait defining a string key-value storage backend.
///
/// This is the shape of the browser's persistent and session stores: flat string keys,
/// text values, and writes that may be rejected once the backend runs out of room.
/// Backends report rejections as [`StoreError::QuotaExceeded`] so the gateway can
/// tell capacity pressure apart from other failures.
pub trait KeyValueStore {
    /// Should store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::QuotaExceeded`] if the write would not fit, or another
    /// [`StoreError`] if the backend fails.
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Should return the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Should remove `key` and return its previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend fails while removing the entry.
    fn remove_item(&mut self, key: &str) -> Result<Option<String>, StoreError>;

    /// Should list every key currently stored, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be enumerated.
    fn keys(&self) -> Result<Vec<String>, StoreError>;

    /// Returns every key starting with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be enumerated.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set_item(key, value)
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_item(key)
    }

    fn remove_item(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).remove_item(key)
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        (**self).keys()
    }
}
