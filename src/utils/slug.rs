//! URL slugification.
//!
//! Converts display names to URL-safe path segments.

/// Convert a display name to a URL-safe path segment.
///
/// Lowercases, replaces spaces with underscores, then percent-encodes
/// whatever is left that is unsafe in a path segment. Reapplying to a
/// string that is already lowercase, underscored and segment-safe is a
/// no-op.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase().replace(' ', "_");
    urlencoding::encode(&lowered).into_owned()
}
