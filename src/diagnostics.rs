//! Diagnostics
//!
//! Every decision taken while loading models is a [`Diagnostic`]. Events
//! always go to `tracing`; when verbose they are also written as plain
//! lines to stdout (or captured in memory).

use std::fmt;

use crate::association::{AssociationKind, InvalidAssociation};

/// A single decision taken during load, registration or resolution
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// A definition file was loaded
    Loaded { name: String, path: String },
    /// A model is about to be registered
    DefiningModel { name: String },
    /// A model's associations are about to be processed
    ConfiguringAssociations { name: String },
    /// The source model of a definition is not registered
    SourceNotFound { name: String },
    /// An association declaration failed validation
    InvalidAssociation { source: String, reason: InvalidAssociation },
    /// The target model of an association is not registered
    RelationNotFound {
        target: String,
        suggestion: Option<String>,
    },
    /// An association is being established
    ConfiguringAssociation { kind: AssociationKind, target: String },
    /// The store refused to establish an association
    AssociationRejected { error: String },
}

impl Diagnostic {
    fn is_skip(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound { .. }
                | Self::InvalidAssociation { .. }
                | Self::RelationNotFound { .. }
                | Self::AssociationRejected { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded { name, path } => write!(f, "LOADED {} FROM {}", name, path),
            Self::DefiningModel { name } => write!(f, "DEFINING {} MODEL", name),
            Self::ConfiguringAssociations { name } => {
                write!(f, "CONFIGURING {} ASSOCIATIONS", name)
            }
            Self::SourceNotFound { name } => write!(f, "    Source ({}) not found", name),
            Self::InvalidAssociation { reason, .. } => write!(f, "    {}", reason),
            Self::RelationNotFound { target, suggestion } => {
                write!(f, "    Relation ({}) not found", target)?;
                if let Some(suggestion) = suggestion {
                    write!(f, " (did you mean {}?)", suggestion)?;
                }
                Ok(())
            }
            Self::ConfiguringAssociation { kind, target } => {
                write!(f, "    Configuring {}({}) association", kind.method_name(), target)
            }
            Self::AssociationRejected { error } => write!(f, "    Association rejected: {}", error),
        }
    }
}

#[derive(Debug)]
enum Sink {
    Stdout,
    Captured(Vec<String>),
}

/// Verbosity-gated diagnostics sink
#[derive(Debug)]
pub struct Diagnostics {
    verbose: bool,
    sink: Sink,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Diagnostics {
    /// Sink writing to stdout when `verbose`
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            sink: Sink::Stdout,
        }
    }

    /// Sink keeping lines in memory when `verbose`
    pub fn captured(verbose: bool) -> Self {
        Self {
            verbose,
            sink: Sink::Captured(Vec::new()),
        }
    }

    /// Record a decision
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_skip() {
            tracing::warn!("{}", diagnostic.to_string().trim_start());
        } else {
            tracing::debug!("{}", diagnostic.to_string().trim_start());
        }
        self.write_line(diagnostic.to_string());
    }

    /// Blank line between phases
    pub fn separator(&mut self) {
        self.write_line(String::new());
    }

    /// Lines captured so far (empty for the stdout sink)
    pub fn lines(&self) -> &[String] {
        match &self.sink {
            Sink::Stdout => &[],
            Sink::Captured(lines) => lines,
        }
    }

    fn write_line(&mut self, line: String) {
        if !self.verbose {
            return;
        }
        match &mut self.sink {
            Sink::Stdout => println!("{}", line),
            Sink::Captured(lines) => lines.push(line),
        }
    }
}
