//! Filesystem-safe names for storage keys.

use std::fmt::Write as _;

/// Percent-encodes a key so it can be used as a file name while staying readable.
///
/// Alphanumeric characters, hyphens, underscores and dots are preserved. Everything else
/// is encoded byte by byte from its UTF-8 form.
///
/// # Examples
///
/// ```
/// # use velostash_fs::encode_for_filename;
/// assert_eq!(encode_for_filename("users"), "users");
/// assert_eq!(
///     encode_for_filename("seenNotifications_ana@x.io"),
///     "seenNotifications_ana%40x.io"
/// );
/// ```
pub fn encode_for_filename(key: &str) -> String {
    key.bytes().fold(String::with_capacity(key.len()), |mut name, byte| {
        if is_kept(byte) {
            name.push(char::from(byte));
        } else {
            let _ = write!(name, "%{byte:02X}");
        }
        name
    })
}

fn is_kept(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.')
}

fn hex_digit(byte: u8) -> Option<u8> {
    char::from(byte).to_digit(16).and_then(|digit| u8::try_from(digit).ok())
}

/// Decodes a file name produced by [`encode_for_filename`].
///
/// Returns `None` if the name is malformed.
///
/// # Examples
///
/// ```
/// # use velostash_fs::decode_from_filename;
/// assert_eq!(decode_from_filename("ana%40x.io"), Some("ana@x.io".to_string()));
/// assert_eq!(decode_from_filename("broken%"), None);
/// ```
pub fn decode_from_filename(encoded: &str) -> Option<String> {
    let mut bytes = encoded.bytes();
    let mut key = Vec::with_capacity(encoded.len());
    while let Some(byte) = bytes.next() {
        if byte == b'%' {
            let high = hex_digit(bytes.next()?)?;
            let low = hex_digit(bytes.next()?)?;
            key.push(high << 4 | low);
        } else {
            key.push(byte);
        }
    }
    String::from_utf8(key).ok()
}
