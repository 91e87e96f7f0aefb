//! Pagination and keyword-matching helpers shared by list endpoints.

/// Default page size for template listings.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Maximum page size for template listings.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Clamp a caller-supplied limit into `1..=max`, defaulting when absent.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, max)
}

/// Clamp a caller-supplied offset to be non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Normalize a search keyword: trimmed, `None` when blank.
pub fn normalize_keyword(keyword: Option<&str>) -> Option<String> {
    keyword
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
}

/// Build an `ILIKE` substring pattern, escaping `%`, `_` and `\`.
///
/// ```
/// use procforge_core::search::like_pattern;
/// assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
/// ```
pub fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Case-insensitive substring match, the in-memory equivalent of
/// `ILIKE like_pattern(keyword)`.
pub fn matches_keyword(haystack: &str, keyword: &str) -> bool {
    haystack.to_lowercase().contains(&keyword.to_lowercase())
}
