//! Brand slug normalization and derived routes.

use unicode_normalization::UnicodeNormalization;

/// Combining diacritical marks block (U+0300..=U+036F).
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Strip diacritics from `input` after lowercasing it.
///
/// `"Café Ñandú"` becomes `"cafe nandu"`.
pub fn fold_diacritics(input: &str) -> String {
    input
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Turn a display name into a URL-safe key.
///
/// Lowercases, strips diacritics, collapses every run of characters
/// outside `[a-z0-9]` into a single `-`, and trims leading/trailing
/// hyphens. Input without any ASCII alphanumeric character yields an
/// empty string, which is never a valid tenant key.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for c in fold_diacritics(input).chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Owner dashboard route for a brand.
pub fn admin_path(brand_slug: &str) -> String {
    format!("/admin/{brand_slug}")
}

/// Public store route for a brand.
pub fn store_path(brand_slug: &str) -> String {
    format!("/{brand_slug}")
}
