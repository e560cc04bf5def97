//! Branch name derivation from request titles

/// Prefix for branches provisioned by Foreman
pub const BRANCH_PREFIX: &str = "feature/";

/// Convert a title to a ref-safe slug
///
/// Lower-case, runs of non-alphanumeric characters collapsed to a single
/// `-`, no leading or trailing separator. Deterministic and idempotent.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_separator = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Full branch name for a request title
pub fn branch_name(title: &str) -> String {
    format!("{}{}", BRANCH_PREFIX, slugify(title))
}
