//! Slug derivation for vocabulary and term names.

/// Derive a URL-safe slug from a display name.
///
/// Lowercases the name and joins its alphanumeric runs with single
/// hyphens. Yields an empty string when the name contains no usable
/// characters; insert paths reject that case.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_separator = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Red"), "red");
        assert_eq!(slugify("Dark Red"), "dark-red");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("  C++  2024!  "), "c-2024");
        assert_eq!(slugify("a---b"), "a-b");
    }

    #[test]
    fn test_slugify_no_leading_or_trailing_hyphen() {
        assert_eq!(slugify("!hello!"), "hello");
    }

    #[test]
    fn test_slugify_empty_for_unusable_names() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_unicode() {
        assert_eq!(slugify("Café au lait"), "café-au-lait");
    }
}
