//! LIKE pattern helpers

/// Escape LIKE metacharacters (%, _, \) in a user term
///
/// Terms are matched literally; wildcards are added by the compiler only.
///
/// # Example
///
/// ```
/// use breedql::utils::pattern::escape_like_pattern;
///
/// assert_eq!(escape_like_pattern("50%_off"), "50\\%\\_off");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Position of the wildcards around an ILIKE term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeShape {
    Prefix,
    Infix,
    Suffix,
}

impl LikeShape {
    /// Build the bound pattern for a term: `term%`, `%term%` or `%term`
    pub fn pattern(&self, term: &str) -> String {
        let escaped = escape_like_pattern(term);
        match self {
            Self::Prefix => format!("{}%", escaped),
            Self::Infix => format!("%{}%", escaped),
            Self::Suffix => format!("%{}", escaped),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain() {
        assert_eq!(escape_like_pattern("Gala"), "Gala");
    }

    #[test]
    fn test_escape_metacharacters() {
        assert_eq!(escape_like_pattern("a_b%c\\d"), "a\\_b\\%c\\\\d");
    }

    #[test]
    fn test_escape_empty() {
        assert_eq!(escape_like_pattern(""), "");
    }

    #[test]
    fn test_like_shapes() {
        assert_eq!(LikeShape::Prefix.pattern("Ga"), "Ga%");
        assert_eq!(LikeShape::Infix.pattern("al"), "%al%");
        assert_eq!(LikeShape::Suffix.pattern("la"), "%la");
        assert_eq!(LikeShape::Infix.pattern("10%"), "%10\\%%");
    }
}
