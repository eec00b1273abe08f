//! Error types for model registration

use std::path::PathBuf;

use thiserror::Error;

use crate::association::AssociationKind;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Top-level error returned by [`define_models`](crate::define_models).
///
/// Only loading and registration failures are errors. Invalid, unresolvable
/// or store-refused association declarations are skipped and reported
/// through [`ResolutionReport`](crate::ResolutionReport) instead.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Failure to list the model directory or read a definition file
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Cannot list model directory {}: {source}", path.display())]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read model definition {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid UTF-8 in {}: {source}", path.display())]
    Utf8 {
        path: PathBuf,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("Invalid TOML in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unsupported definition format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
}

/// A model definition the store refused to register
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistrationError {
    #[error("Model definition has an empty name")]
    EmptyName,

    #[error("Model {name} declares no columns")]
    MissingColumns { name: String },

    #[error("Model {name}: invalid column {column}: {reason}")]
    InvalidColumn {
        name: String,
        column: String,
        reason: String,
    },

    #[error("Model {name}: options must be an object")]
    InvalidOptions { name: String },

    #[error("Model already defined: {name}")]
    DuplicateName { name: String },
}

impl RegistrationError {
    /// Name of the offending definition, if it had one
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::EmptyName => None,
            Self::MissingColumns { name }
            | Self::InvalidColumn { name, .. }
            | Self::InvalidOptions { name }
            | Self::DuplicateName { name } => Some(name),
        }
    }
}

/// An association the store refused to establish. Resolution records it as
/// a skipped outcome.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssociationError {
    #[error("{source_model} already has an association named {alias} ({kind})")]
    DuplicateAlias {
        source_model: String,
        alias: String,
        kind: AssociationKind,
    },

    #[error("Unknown model handle: {0}")]
    UnknownHandle(usize),
}
