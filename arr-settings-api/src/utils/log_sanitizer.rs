//! Log sanitization utilities
//!
//! Prevents sensitive data (API keys, usenet passwords, full settings
//! documents) from being fully exposed in debug/error logs.

/// Maximum number of characters to include in truncated log output.
const TRUNCATE_LIMIT: usize = 256;

/// Placeholder the backend uses for secrets it will not echo back.
pub const SECRET_MASK: &str = "********";

/// Number of trailing characters kept visible by [`mask_secret`].
const VISIBLE_TAIL: usize = 4;

/// MSRV-compatible replacement for `str::floor_char_boundary` (stable since 1.91.0).
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        s.len()
    } else {
        let mut i = index;
        while i > 0 && !s.is_char_boundary(i) {
            i -= 1;
        }
        i
    }
}

/// Truncate a string for safe logging.
///
/// Returns the original string if it's within the limit,
/// otherwise returns the first `TRUNCATE_LIMIT` characters with a suffix
/// indicating the total length.
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        s.to_string()
    } else {
        format!(
            "{}... [truncated, total {} bytes]",
            &s[..floor_char_boundary(s, TRUNCATE_LIMIT)],
            s.len()
        )
    }
}

/// Mask a secret for display, keeping only the last few characters.
///
/// Short secrets are fully masked.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return String::new();
    }
    if count <= VISIBLE_TAIL * 2 {
        return SECRET_MASK.to_string();
    }
    let tail: String = secret.chars().skip(count - VISIBLE_TAIL).collect();
    format!("{SECRET_MASK}{tail}")
}

/// Whether a value is a mask placeholder rather than a real secret.
///
/// Covers full masks and the tail-preserving form of [`mask_secret`].
pub fn is_masked(value: &str) -> bool {
    value.starts_with(SECRET_MASK)
        || (!value.is_empty() && value.chars().all(|c| c == '*' || c == '•'))
}
