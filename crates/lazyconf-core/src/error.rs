//! Error types for lazyconf
//!
//! Structured errors with context: the failing config path where known,
//! and an actionable help message.

use std::fmt;

/// Result type alias for lazyconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lazyconf operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Path in the config where the error occurred (e.g., "model.backbone")
    pub path: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Error parsing YAML/JSON or an interpolation expression
    Parse,
    /// Invalid lazy-call target at authoring time (fail fast)
    Construction,
    /// Error resolving a target identity against the factory registry
    Registry(RegistryErrorKind),
    /// Error accessing a path that doesn't exist or isn't a container
    PathNotFound,
    /// Circular interpolation reference detected
    CircularReference,
    /// Type coercion failed
    TypeCoercion,
    /// A value cannot be represented in the textual config format
    Serialization,
    /// A descriptor's target could not be invoked or isn't callable
    Instantiation,
    /// I/O error (file not found, etc.)
    Io,
    /// Internal error (bug in lazyconf)
    Internal,
}

/// Specific registry (target identity) error categories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryErrorKind {
    /// No factory registered under the given name
    TargetNotFound { name: String },
    /// Relative target names (leading dot) are rejected during loading
    RelativeTarget { name: String },
    /// Factory already registered under this name
    AlreadyRegistered { name: String },
}

impl Error {
    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Parse,
            path: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create a construction error (invalid lazy-call target)
    pub fn construction(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Construction,
            path: None,
            help: Some(
                "A lazy-call target must be a registered factory, a dotted name, or another lazy call"
                    .into(),
            ),
            cause: Some(message.into()),
        }
    }

    /// Create a path not found error
    pub fn path_not_found(path: impl Into<String>) -> Self {
        let path_str = path.into();
        Self {
            kind: ErrorKind::PathNotFound,
            path: Some(path_str.clone()),
            help: Some(format!(
                "Check that '{}' exists in the configuration and is a container",
                path_str
            )),
            cause: None,
        }
    }

    /// Create a target not found error
    pub fn target_not_found(name: impl Into<String>, config_path: Option<String>) -> Self {
        let n = name.into();
        Self {
            kind: ErrorKind::Registry(RegistryErrorKind::TargetNotFound { name: n.clone() }),
            path: config_path,
            help: Some(format!(
                "Register a factory under '{}' before instantiating",
                n
            )),
            cause: None,
        }
    }

    /// Create a relative target error
    pub fn relative_target(name: impl Into<String>) -> Self {
        let n = name.into();
        Self {
            kind: ErrorKind::Registry(RegistryErrorKind::RelativeTarget { name: n.clone() }),
            path: None,
            help: Some("Use the full dotted name; relative target names cannot be resolved".into()),
            cause: None,
        }
    }

    /// Create a factory already registered error
    pub fn already_registered(name: impl Into<String>) -> Self {
        let n = name.into();
        Self {
            kind: ErrorKind::Registry(RegistryErrorKind::AlreadyRegistered { name: n.clone() }),
            path: None,
            help: Some(format!(
                "Use register_with_force(..., force=true) to replace the '{}' factory",
                n
            )),
            cause: None,
        }
    }

    /// Create a circular reference error
    pub fn circular_reference(path: impl Into<String>, chain: Vec<String>) -> Self {
        let chain_str = chain.join(" -> ");
        Self {
            kind: ErrorKind::CircularReference,
            path: Some(path.into()),
            help: Some("Break the circular dependency by removing one of the references".into()),
            cause: Some(format!("Chain: {}", chain_str)),
        }
    }

    /// Create a type coercion error
    pub fn type_coercion(
        path: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::TypeCoercion,
            path: Some(path.into()),
            help: Some(format!(
                "Ensure the value can be converted to {}",
                expected.into()
            )),
            cause: Some(format!("Got: {}", got.into())),
        }
    }

    /// Create a serialization error (non-representable value).
    ///
    /// An empty path means the location is unknown or the root.
    pub fn serialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            kind: ErrorKind::Serialization,
            path: (!path.is_empty()).then_some(path),
            help: Some(
                "Only registered (named) factories and plain values can be saved; register the factory or replace it with its dotted name"
                    .into(),
            ),
            cause: Some(message.into()),
        }
    }

    /// Create an instantiation error
    pub fn instantiation(message: impl Into<String>, config_path: Option<String>) -> Self {
        Self {
            kind: ErrorKind::Instantiation,
            path: config_path,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Io,
            path: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an internal error (bug in lazyconf)
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            path: None,
            help: Some("This is likely a bug in lazyconf. Please report it.".into()),
            cause: Some(message.into()),
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
        // Main error message
        match &self.kind {
            ErrorKind::Parse => write!(f, "Parse error")?,
            ErrorKind::Construction => write!(f, "Invalid lazy-call target")?,
            ErrorKind::Registry(r) => match r {
                RegistryErrorKind::TargetNotFound { name } => {
                    write!(f, "Target not found in registry: {}", name)?
                }
                RegistryErrorKind::RelativeTarget { name } => {
                    write!(f, "Relative target name is not allowed: {}", name)?
                }
                RegistryErrorKind::AlreadyRegistered { name } => {
                    write!(f, "Factory '{}' is already registered", name)?
                }
            },
            ErrorKind::PathNotFound => write!(f, "Path not found")?,
            ErrorKind::CircularReference => write!(f, "Circular reference detected")?,
            ErrorKind::TypeCoercion => write!(f, "Type coercion failed")?,
            ErrorKind::Serialization => write!(f, "Value cannot be serialized")?,
            ErrorKind::Instantiation => write!(f, "Instantiation failed")?,
            ErrorKind::Io => write!(f, "I/O error")?,
            ErrorKind::Internal => write!(f, "Internal error")?,
        }

        // Path context
        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        // Cause
        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        // Help
        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
