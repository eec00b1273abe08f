//! Model registration (first pass)

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::RegistrationError;
use crate::schema::SchemaDefinition;
use crate::store::ModelStore;

/// Register a single definition with the store
pub fn register<S: ModelStore + ?Sized>(
    store: &mut S,
    definition: &SchemaDefinition,
    diagnostics: &mut Diagnostics,
) -> Result<S::Handle, RegistrationError> {
    diagnostics.emit(Diagnostic::DefiningModel {
        name: definition.display_name(),
    });
    store.define(
        &definition.name,
        definition.columns.as_ref(),
        definition.options.as_ref(),
    )
}

/// Register every definition, in order.
///
/// Stops at the first failure: associations are only resolved against a
/// complete set of models, so a partially registered batch is not usable.
pub fn register_all<S: ModelStore + ?Sized>(
    store: &mut S,
    definitions: &[SchemaDefinition],
    diagnostics: &mut Diagnostics,
) -> Result<(), RegistrationError> {
    for definition in definitions {
        if let Err(err) = register(store, definition, diagnostics) {
            tracing::error!(model = %definition.display_name(), error = %err, "registration failed");
            return Err(err);
        }
    }
    diagnostics.separator();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Registry;
    use serde_json::json;

    fn def(name: &str) -> SchemaDefinition {
        SchemaDefinition::new(name, json!({"id": "INTEGER"}).as_object().cloned().unwrap())
    }

    #[test]
    fn test_register_all_in_order() {
        let mut registry = Registry::new();
        let mut diagnostics = Diagnostics::captured(true);
        register_all(&mut registry, &[def("User"), def("Post")], &mut diagnostics).unwrap();

        assert_eq!(registry.names(), ["User", "Post"]);
        assert_eq!(diagnostics.lines(), ["DEFINING User MODEL", "DEFINING Post MODEL", ""]);
    }

    #[test]
    fn test_first_failure_aborts_the_pass() {
        let mut registry = Registry::new();
        let defs = [def("User"), def("User"), def("Post")];
        let err = register_all(&mut registry, &defs, &mut Diagnostics::default()).unwrap_err();

        assert_eq!(err.name(), Some("User"));
        assert!(registry.lookup("Post").is_none());
    }

    #[test]
    fn test_missing_columns_surface_at_registration() {
        let mut registry = Registry::new();
        let nameless = SchemaDefinition { name: "Tag".to_string(), ..Default::default() };
        let err = register_all(&mut registry, &[nameless], &mut Diagnostics::default()).unwrap_err();
        assert_eq!(err, RegistrationError::MissingColumns { name: "Tag".to_string() });
    }
}
