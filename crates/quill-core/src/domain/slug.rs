//! Slug derivation for post titles.

/// Derive a URL slug from a title.
///
/// The title is lowercased, everything except ASCII word characters and
/// spaces is dropped, and each run of spaces becomes a single hyphen.
/// The same title always yields the same slug.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut in_space = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        if c == ' ' {
            if !in_space {
                slug.push('-');
                in_space = true;
            }
        } else if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
            in_space = false;
        }
    }

    slug
}
