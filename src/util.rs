//! Shared utility functions
//!
//! Naming helpers used by the extractor, the synthesizers and the CLI.

use regex::Regex;
use std::sync::OnceLock;

/// Go keywords; none of them can name a package, type or member
pub const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// Whether `s` is a valid Go identifier that is not a keyword
///
/// # Examples
/// ```
/// use counterfeit::util::is_identifier;
/// assert!(is_identifier("FakeStore"));
/// assert!(!is_identifier("2fast"));
/// assert!(!is_identifier("func"));
/// ```
pub fn is_identifier(s: &str) -> bool {
    static IDENT: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = IDENT.get_or_init(|| Regex::new(r"^[\p{L}_][\p{L}\p{Nd}_]*$").ok()) else {
        return false;
    };
    re.is_match(s) && !GO_KEYWORDS.contains(&s)
}

/// Convert PascalCase or camelCase to snake_case, keeping acronyms together
///
/// # Examples
/// ```
/// use counterfeit::util::to_snake_case;
/// assert_eq!(to_snake_case("FakeStore"), "fake_store");
/// assert_eq!(to_snake_case("FakeHTTPClient"), "fake_httpclient");
/// ```
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            result.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    result
}

/// Convert snake_case or kebab-case to PascalCase
///
/// # Examples
/// ```
/// use counterfeit::util::to_pascal_case;
/// assert_eq!(to_pascal_case("hello_world"), "HelloWorld");
/// assert_eq!(to_pascal_case("go-kit"), "GoKit");
/// ```
pub fn to_pascal_case(s: &str) -> String {
    s.split(['_', '-', '.'])
        .map(capitalize)
        .collect()
}

/// Upper-case the first letter
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lower-case the first letter
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("FakeStore"), "fake_store");
        assert_eq!(to_snake_case("fooBar"), "foo_bar");
        assert_eq!(to_snake_case("FakeDB2Conn"), "fake_db2_conn");
        assert_eq!(to_snake_case("HTTPClient"), "httpclient");
        assert_eq!(to_snake_case(""), "");
    }

    #[test]
    fn test_to_pascal_case() {
        assert_eq!(to_pascal_case("hello_world"), "HelloWorld");
        assert_eq!(to_pascal_case("sub"), "Sub");
        assert_eq!(to_pascal_case(""), "");
    }

    #[test]
    fn test_capitalize_and_lower_first() {
        assert_eq!(capitalize("store"), "Store");
        assert_eq!(lower_first("Get"), "get");
        assert_eq!(lower_first("URL"), "uRL");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("fakes"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("Größe"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("my-pkg"));
        assert!(!is_identifier("type"));
    }
}
