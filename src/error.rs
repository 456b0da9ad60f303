//! Error types for counterfeit

use crate::model::Location;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Counterfeit errors
///
/// Every variant is terminal for the current invocation: generation is
/// all-or-nothing and no partial source is ever returned.
#[derive(Error, Debug)]
pub enum Error {
    #[error("interface `{name}` not found in {}", .path.display())]
    NotFound { name: String, path: PathBuf },

    #[error("interface `{name}` is declared more than once: {}", join_locations(.locations))]
    Ambiguous {
        name: String,
        locations: Vec<Location>,
    },

    #[error("cyclic interface embedding: {}", .chain.join(" -> "))]
    CyclicEmbedding { chain: Vec<String> },

    #[error("cannot resolve type `{type_name}`{}{}", in_method(.method), at_location(.location))]
    UnresolvableType {
        type_name: String,
        method: Option<String>,
        location: Option<Location>,
    },

    #[error("method `{method}` is declared more than once in `{contract}`")]
    DuplicateMethodName { contract: String, method: String },

    #[error("`{name}` has no methods to generate")]
    EmptyContract { name: String },

    #[error("no exported functions found in {}", .dir.display())]
    NoExportedFunctions { dir: PathBuf },

    #[error("`{name}` at {location} is not an interface")]
    NotAnInterface { name: String, location: Location },

    #[error("`{name}` cannot be faked: {reason}")]
    Unsupported { name: String, reason: String },

    #[error("Code parse error: {0}")]
    CodeParse(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_norway::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Attach the method name to an unresolvable type that was raised
    /// without one. Other errors pass through untouched.
    pub fn in_method(self, name: &str, at: &Location) -> Self {
        match self {
            Error::UnresolvableType {
                type_name,
                method: None,
                location,
            } => Error::UnresolvableType {
                type_name,
                method: Some(name.to_string()),
                location: location.or_else(|| Some(at.clone())),
            },
            other => other,
        }
    }

    pub(crate) fn unresolvable(type_name: impl Into<String>) -> Self {
        Error::UnresolvableType {
            type_name: type_name.into(),
            method: None,
            location: None,
        }
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

fn join_locations(locations: &[Location]) -> String {
    locations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn in_method(method: &Option<String>) -> String {
    match method {
        Some(name) => format!(" in method `{}`", name),
        None => String::new(),
    }
}

fn at_location(location: &Option<Location>) -> String {
    match location {
        Some(loc) => format!(" ({})", loc),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolvable_message_with_method() {
        let at = Location::new("store.go", 12);
        let err = Error::unresolvable("foo.Bar").in_method("Get", &at);
        assert_eq!(
            err.to_string(),
            "cannot resolve type `foo.Bar` in method `Get` (store.go:12)"
        );
    }

    #[test]
    fn test_in_method_keeps_existing_method() {
        let at = Location::new("a.go", 1);
        let err = Error::UnresolvableType {
            type_name: "X".into(),
            method: Some("Inner".into()),
            location: None,
        }
        .in_method("Outer", &at);
        match err {
            Error::UnresolvableType { method, .. } => assert_eq!(method.as_deref(), Some("Inner")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ambiguous_lists_locations() {
        let err = Error::Ambiguous {
            name: "Store".into(),
            locations: vec![Location::new("a.go", 3), Location::new("b.go", 7)],
        };
        assert_eq!(
            err.to_string(),
            "interface `Store` is declared more than once: a.go:3, b.go:7"
        );
    }
}
