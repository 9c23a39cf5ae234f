pub const MIN_LEN: usize = 5;
pub const MAX_LEN: usize = 32;

/// Trimmed input without its single leading `@`.
pub fn normalize(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed)
}

pub fn significant_len(raw: &str) -> usize {
    normalize(raw).chars().count()
}

pub fn is_valid_shape(raw: &str) -> bool {
    let handle = normalize(raw);
    (MIN_LEN..=MAX_LEN).contains(&handle.len())
        && handle.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Lookups are case-insensitive, so the cache is too.
pub fn cache_key(raw: &str) -> String {
    normalize(raw).to_ascii_lowercase()
}
