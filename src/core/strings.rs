//! Utilities for dealing with strings.

const FALLBACK_NAME: &str = "upload";

/// Reduce an uploaded file name to a safe, flat name that can be used in a
/// storage path.
///
/// Directory components are dropped, whitespace becomes `_`, and any
/// character other than ASCII alphanumerics, `.`, `-` and `_` is removed.
/// Leading dots are stripped so the result is never hidden or relative.
#[must_use]
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return FALLBACK_NAME.to_string();
    }
    cleaned.to_string()
}
