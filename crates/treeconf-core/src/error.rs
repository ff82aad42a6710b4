//! Error types for treeconf
//!
//! Every failure is a structured [`Error`] carrying its [`ErrorKind`], the config
//! path it relates to (when known), the underlying cause and an actionable help line.

use std::fmt;

/// Result type alias for treeconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for treeconf operations
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Path in the config where the error occurred (e.g., "database.port")
    pub path: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// Malformed path string: blank segment, bad brackets or a non-numeric index
    #[error("Invalid path")]
    InvalidPath,
    /// A required path is absent
    #[error("Missing config value")]
    MissingValue,
    /// A stored value could not be coerced to the requested type
    #[error("Value conversion failed")]
    ValueConversion,
    /// Malformed `${...}` template
    #[error("Parse error")]
    Parse,
    /// Fail-fast resolution met an expression without a satisfiable alternative
    #[error("Unresolved expression")]
    UnresolvedExpression,
    /// An audited config still holds values nobody read
    #[error("Unused config values")]
    UnusedValues,
    /// Internal error (bug in treeconf)
    #[error("Internal error")]
    Internal,
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: None,
            help: None,
            cause: None,
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            help: Some("Use dotted names with bracketed indexes, e.g. 'servers[0].host'".into()),
            cause: Some(message.into()),
            ..Self::new(ErrorKind::InvalidPath)
        }
    }

    /// Create a missing value error
    pub fn missing_value(path: impl Into<String>) -> Self {
        let path_str = path.into();
        Self {
            help: Some(format!(
                "Check that '{}' exists in the configuration",
                path_str
            )),
            path: Some(path_str),
            ..Self::new(ErrorKind::MissingValue)
        }
    }

    /// Create a value conversion error
    pub fn value_conversion(
        path: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self {
            path: Some(path.into()),
            help: Some(format!(
                "Ensure the value can be converted to {}",
                expected.into()
            )),
            cause: Some(format!("Got: {}", got.into())),
            ..Self::new(ErrorKind::ValueConversion)
        }
    }

    /// Create a template parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            cause: Some(message.into()),
            ..Self::new(ErrorKind::Parse)
        }
    }

    /// Create an unresolved expression error
    pub fn unresolved_expression(path: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            help: Some(
                "Define the referenced value or add a default alternative: ${name?default}".into(),
            ),
            cause: Some(format!("Expression: {}", template.into())),
            ..Self::new(ErrorKind::UnresolvedExpression)
        }
    }

    /// Create an unused values error listing the first few `paths`
    pub fn unused_values(paths: &[String]) -> Self {
        const LISTED: usize = 5;
        let mut listed = paths.iter().take(LISTED).cloned().collect::<Vec<_>>();
        if paths.len() > LISTED {
            listed.push("...".into());
        }
        Self {
            help: Some("Remove the values or read them before checking for unused ones".into()),
            cause: Some(format!("Unused paths:\n    {}", listed.join("\n    "))),
            ..Self::new(ErrorKind::UnusedValues)
        }
    }

    /// Create an internal error (bug in treeconf)
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            help: Some("This is likely a bug in treeconf. Please report it.".into()),
            cause: Some(message.into()),
            ..Self::new(ErrorKind::Internal)
        }
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
