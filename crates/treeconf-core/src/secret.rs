//! Secret redaction
//!
//! A leaf is secret when any named segment of its path matches one of the
//! configured secret names. A segment matches when the whole segment, one of its
//! `-`/`_` separated parts, or one of its camel-case words equals a secret name,
//! ignoring case. `dbPassword`, `api-key` and `secrets.primary` all match.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::error::Result;
use crate::node::Node;
use crate::path::Path;
use crate::value::Scalar;

/// Names treated as secret by default
pub const DEFAULT_SECRET_NAMES: &[&str] = &[
    "password", "passwords", "secret", "secrets", "token", "tokens", "key", "keys", "apiKey",
    "apiKeys",
];

/// Marker written in place of secret values
pub const DEFAULT_REPLACEMENT: &str = "***";

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Z]?[a-z]+)|([A-Z])").expect("valid word regex"));

/// Replaces secret leaves with a fixed marker
#[derive(Debug, Clone, PartialEq)]
pub struct SecretRedactor {
    names: HashSet<String>,
    replacement: String,
}

impl Default for SecretRedactor {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET_NAMES.iter().copied(), DEFAULT_REPLACEMENT)
    }
}

impl SecretRedactor {
    pub fn new<I, S>(names: I, replacement: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|name| name.as_ref().to_lowercase())
                .collect(),
            replacement: replacement.into(),
        }
    }

    /// A redactor that never matches
    pub fn disabled() -> Self {
        Self::new(std::iter::empty::<&str>(), DEFAULT_REPLACEMENT)
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Check if a single path segment names a secret
    pub fn is_secret_name(&self, segment: &str) -> bool {
        if self.names.is_empty() {
            return false;
        }
        if self.names.contains(&segment.to_lowercase()) {
            return true;
        }
        segment
            .split(['-', '_'])
            .filter(|part| !part.is_empty())
            .any(|part| {
                self.names.contains(&part.to_lowercase())
                    || WORD
                        .find_iter(part)
                        .any(|word| self.names.contains(&word.as_str().to_lowercase()))
            })
    }

    /// Check if any named segment of `path` names a secret
    pub fn is_secret(&self, path: &Path) -> bool {
        path.names().any(|name| self.is_secret_name(name))
    }

    /// Copy of `root` with every secret leaf replaced. Unchanged subtrees are shared.
    pub fn redact(&self, root: &Node) -> Result<Node> {
        root.map_leaves(&Path::root(), &mut |path: &Path, value: &Scalar| {
            if self.is_secret(path) {
                Ok(Scalar::String(self.replacement.clone()))
            } else {
                Ok(value.clone())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn path(text: &str) -> Path {
        Path::parse(text).unwrap()
    }

    #[test]
    fn test_default_names() {
        let redactor = SecretRedactor::default();
        for secret in [
            "db.password",
            "dbPassword",
            "DB_PASSWORD",
            "api-key",
            "apiKey",
            "APIKEY",
            "secrets.primary",
            "auth.tokens[0]",
            "servers[1].accessToken",
        ] {
            assert!(redactor.is_secret(&path(secret)), "path: {}", secret);
        }
    }

    #[test]
    fn test_non_secret_names() {
        let redactor = SecretRedactor::default();
        for plain in ["db.host", "monkey", "keystore.type", "passwordless", "tokenizer"] {
            assert!(!redactor.is_secret(&path(plain)), "path: {}", plain);
        }
    }

    #[test]
    fn test_custom_names() {
        let redactor = SecretRedactor::new(["credential"], "<hidden>");
        assert!(redactor.is_secret(&path("aws.credential")));
        assert!(!redactor.is_secret(&path("db.password")));
        assert_eq!(redactor.replacement(), "<hidden>");
    }

    #[test]
    fn test_disabled() {
        assert!(!SecretRedactor::disabled().is_secret(&path("password")));
    }

    #[test]
    fn test_redact_tree() {
        let value: Value =
            serde_yaml::from_str("db:\n  host: x\n  password: hunter2\nsecrets:\n  - a\n  - b")
                .unwrap();
        let node = Node::from_value(&value).unwrap();
        let redacted = SecretRedactor::default().redact(&node).unwrap();

        let expected: Value =
            serde_yaml::from_str("db:\n  host: x\n  password: '***'\nsecrets: ['***', '***']")
                .unwrap();
        assert_eq!(redacted.to_value(), expected);
    }
}
