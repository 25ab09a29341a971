use serde::{Serialize, de::DeserializeOwned};

/// Length of `s` in UTF-16 code units, the unit browser storage measures text in.
pub fn utf16_len(s: &str) -> u64 {
    s.encode_utf16().count() as u64
}

/// Bytes an entry occupies in a UTF-16 backed storage area.
pub fn stored_size(key: &str, value: &str) -> u64 {
    (utf16_len(key) + utf16_len(value)) * 2
}

/// Encodes a record or collection to the text form kept in the store.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if the value cannot be represented as JSON.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Decodes text read from the store.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if the text is not valid JSON for `T`.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(text)
}
