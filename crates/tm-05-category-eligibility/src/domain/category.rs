//! Category id normalization.
//!
//! Ids arrive as free text from clients ("Math Tutor", "logo&branding").
//! They are stored and compared only in canonical slug form.

/// Known spellings mapped to their canonical id.
const ALIASES: &[(&str, &str)] = &[
    ("logo_design", "logo_branding"),
    ("branding_logo", "logo_branding"),
    ("math_tutor", "tutoring_math"),
    ("maths_tutor", "tutoring_math"),
    ("mathematics_tutor", "tutoring_math"),
];

/// Lowercase ASCII slug: runs of anything other than `[a-z0-9]` collapse to
/// one `_`, with no leading or trailing `_`.
#[must_use]
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for ch in raw.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(ch);
        } else {
            pending_sep = true;
        }
    }
    slug
}

/// Canonical category id, or an empty string when nothing usable remains.
#[must_use]
pub fn normalize_category_id(raw: &str) -> String {
    let slug = slugify(raw);
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == slug)
        .map_or(slug, |(_, canon)| (*canon).to_string())
}
