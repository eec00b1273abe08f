//! Model Registry
//!
//! Registers a directory of model definitions with an entity store, then
//! wires up the associations they declare (one-to-one, one-to-many,
//! belongs-to, many-to-many) by model name.
//!
//! ## Load sequence
//!
//! ```text
//! models/                 load_definitions   (listing order)
//! ├── user.json     ──►   register_all       (pass 1: every model)
//! ├── post.json     ──►   resolve_all        (pass 2: every association)
//! └── tag.toml
//! ```
//!
//! Associations are resolved only once every model is registered, so a
//! definition may reference models declared in files listed after it.
//! Invalid declarations, unknown targets and associations the store refuses
//! are skipped and recorded in the [`ResolutionReport`]; load and
//! registration failures abort the whole load.
//!
//! ## Definition format
//!
//! ```json
//! {
//!   "name": "Post",
//!   "columns": { "title": "STRING", "body": { "type": "TEXT", "allowNull": false } },
//!   "options": { "timestamps": true },
//!   "associations": [
//!     { "type": "BelongsTo", "targetName": "User", "config": { "as": "author" } }
//!   ]
//! }
//! ```

pub mod association;
pub mod checksum;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod loader;
pub mod registrar;
pub mod resolver;
pub mod schema;
pub mod store;

use std::path::Path;

pub use association::{AssociationConfig, AssociationKind, AssociationSpec, InvalidAssociation};
pub use checksum::Checksum;
pub use config::RegistryConfig;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{AssociationError, LoadError, RegistrationError, RegistryError, Result};
pub use loader::{load_definitions, DefinitionSource, FsSource, LoadConfig};
pub use registrar::register_all;
pub use resolver::{
    resolve_all, resolve_definition, AssociationOutcome, AssociationStatus, ResolutionReport,
    SkipReason,
};
pub use schema::{Column, DataType, SchemaDefinition};
pub use store::{ModelId, ModelStore, RegisteredModel, Registry};

/// Load every definition in `dir`, register them all, then resolve their
/// associations.
///
/// When `verbose` is set, every decision is printed to stdout.
pub fn define_models<S: ModelStore + ?Sized>(
    store: &mut S,
    dir: impl AsRef<Path>,
    verbose: bool,
) -> Result<ResolutionReport> {
    define_models_with(
        store,
        &FsSource,
        dir.as_ref(),
        &LoadConfig::default(),
        &mut Diagnostics::new(verbose),
    )
}

/// [`define_models`] with an explicit definition source, loader options and
/// diagnostics sink
pub fn define_models_with<S, D>(
    store: &mut S,
    source: &D,
    dir: &Path,
    config: &LoadConfig,
    diagnostics: &mut Diagnostics,
) -> Result<ResolutionReport>
where
    S: ModelStore + ?Sized,
    D: DefinitionSource + ?Sized,
{
    let definitions = loader::load_definitions_from(source, dir, config, diagnostics)?;
    register_all(store, &definitions, diagnostics)?;
    Ok(resolve_all(store, &definitions, diagnostics))
}
