//! Error taxonomy for router document operations

use std::fmt;
use std::path::PathBuf;

/// Which provider field collided with an existing record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    Name,
    BaseUrl,
}

impl DuplicateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::BaseUrl => "base URL",
        }
    }
}

/// Errors surfaced by the document store
///
/// Every variant is a distinct condition the CLI renders and maps to a
/// non-zero exit status. Nothing here is swallowed inside the store.
#[derive(Debug)]
pub enum StoreError {
    /// Backing file does not exist
    NotFound(PathBuf),
    /// Backing file exists but could not be read or written
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Content is not JSON, or a known section has the wrong shape
    MalformedDocument { path: PathBuf, message: String },
    /// A provider with the same name or base URL already exists
    DuplicateProvider { field: DuplicateField, value: String },
    ProviderNotFound(String),
    /// Model missing everywhere (`provider: None`) or from one provider
    ModelNotFound {
        model: String,
        provider: Option<String>,
    },
    PreconditionFailed(String),
    InvalidRouterType(String),
    /// Bare model name found in more than one provider
    AmbiguousModelReference {
        model: String,
        providers: Vec<String>,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "Config file not found: {}", path.display()),
            // Cause is reported through source()
            Self::Io { path, .. } => write!(f, "Cannot access config file {}", path.display()),
            Self::MalformedDocument { path, message } => {
                write!(f, "Invalid config file {}: {}", path.display(), message)
            }
            Self::DuplicateProvider { field, value } => {
                write!(f, "Provider with {} '{}' already exists", field.as_str(), value)
            }
            Self::ProviderNotFound(name) => write!(f, "Provider '{}' not found", name),
            Self::ModelNotFound {
                model,
                provider: Some(provider),
            } => write!(f, "Model '{}' not found in provider '{}'", model, provider),
            Self::ModelNotFound {
                model,
                provider: None,
            } => write!(f, "Model '{}' not found in any provider", model),
            Self::PreconditionFailed(msg) => write!(f, "{}", msg),
            Self::InvalidRouterType(name) => write!(f, "Invalid router type: {}", name),
            Self::AmbiguousModelReference { model, providers } => write!(
                f,
                "Model '{}' found in multiple providers: {}",
                model,
                providers.join(", ")
            ),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
