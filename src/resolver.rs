//! Association resolution (second pass)
//!
//! Runs only after every definition has been registered, so an association
//! may name any model in the batch regardless of file order. Each declared
//! association ends in exactly one [`AssociationStatus`]; invalid,
//! unresolvable or store-refused declarations are skipped without stopping
//! the pass.

use serde::Serialize;

use crate::association::{self, AssociationKind, InvalidAssociation};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::schema::SchemaDefinition;
use crate::store::ModelStore;

/// Why an association declaration was not applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "skip", rename_all = "snake_case")]
pub enum SkipReason {
    /// The declaration failed structural validation
    Invalid { reason: InvalidAssociation },
    /// No model is registered under the target name
    TargetMissing {
        target: String,
        suggestion: Option<String>,
    },
    /// The declaring model itself is not registered
    SourceMissing,
    /// The store refused to establish the association
    Rejected { error: String },
}

/// Terminal state of a declared association
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssociationStatus {
    Applied,
    Skipped(SkipReason),
}

/// Outcome of one declared association
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssociationOutcome {
    /// Declaring model
    pub source: String,
    /// Position in the declaring model's association list
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<AssociationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub status: AssociationStatus,
}

impl AssociationOutcome {
    pub fn is_applied(&self) -> bool {
        self.status == AssociationStatus::Applied
    }
}

/// Outcomes of a resolution pass, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    outcomes: Vec<AssociationOutcome>,
}

impl ResolutionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> &[AssociationOutcome] {
        &self.outcomes
    }

    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.applied()
    }

    /// True when every declared association was applied
    pub fn is_clean(&self) -> bool {
        self.skipped() == 0
    }

    /// Outcomes declared by `source`, in declaration order
    pub fn for_source<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a AssociationOutcome> {
        self.outcomes.iter().filter(move |o| o.source == source)
    }

    /// Skipped outcomes only
    pub fn skips(&self) -> impl Iterator<Item = (&AssociationOutcome, &SkipReason)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            AssociationStatus::Skipped(reason) => Some((o, reason)),
            AssociationStatus::Applied => None,
        })
    }
}

/// Resolve and apply the associations of every definition, in load order
pub fn resolve_all<S: ModelStore + ?Sized>(
    store: &mut S,
    definitions: &[SchemaDefinition],
    diagnostics: &mut Diagnostics,
) -> ResolutionReport {
    let mut report = ResolutionReport::new();
    for definition in definitions.iter().filter(|d| d.has_associations()) {
        report
            .outcomes
            .extend(resolve_definition(store, definition, diagnostics));
    }
    tracing::info!(
        applied = report.applied(),
        skipped = report.skipped(),
        "resolved associations"
    );
    report
}

/// Resolve and apply the associations declared by one definition, in
/// declaration order.
///
/// Every model the associations may target must already be registered.
pub fn resolve_definition<S: ModelStore + ?Sized>(
    store: &mut S,
    definition: &SchemaDefinition,
    diagnostics: &mut Diagnostics,
) -> Vec<AssociationOutcome> {
    let name = &definition.name;
    let mut outcomes = Vec::with_capacity(definition.associations.len());

    // Registration already succeeded for every definition, so this only
    // happens when the store drops or renames models on its own.
    let Some(source) = store.lookup(name) else {
        diagnostics.emit(Diagnostic::SourceNotFound { name: definition.display_name() });
        for (index, declared) in definition.associations.iter().enumerate() {
            let spec = association::validate(declared).ok();
            outcomes.push(AssociationOutcome {
                source: name.clone(),
                index,
                kind: spec.as_ref().map(|s| s.kind),
                target: spec.map(|s| s.target_name),
                status: AssociationStatus::Skipped(SkipReason::SourceMissing),
            });
        }
        return outcomes;
    };

    diagnostics.emit(Diagnostic::ConfiguringAssociations { name: name.clone() });

    for (index, declared) in definition.associations.iter().enumerate() {
        let spec = match association::validate(declared) {
            Ok(spec) => spec,
            Err(reason) => {
                diagnostics.emit(Diagnostic::InvalidAssociation {
                    source: name.clone(),
                    reason: reason.clone(),
                });
                outcomes.push(AssociationOutcome {
                    source: name.clone(),
                    index,
                    kind: None,
                    target: None,
                    status: AssociationStatus::Skipped(SkipReason::Invalid { reason }),
                });
                continue;
            }
        };

        let mut outcome = AssociationOutcome {
            source: name.clone(),
            index,
            kind: Some(spec.kind),
            target: Some(spec.target_name.clone()),
            status: AssociationStatus::Applied,
        };

        match store.lookup(&spec.target_name) {
            None => {
                let suggestion = store.suggest(&spec.target_name);
                diagnostics.emit(Diagnostic::RelationNotFound {
                    target: spec.target_name.clone(),
                    suggestion: suggestion.clone(),
                });
                outcome.status = AssociationStatus::Skipped(SkipReason::TargetMissing {
                    target: spec.target_name,
                    suggestion,
                });
            }
            Some(target) => {
                diagnostics.emit(Diagnostic::ConfiguringAssociation {
                    kind: spec.kind,
                    target: spec.target_name.clone(),
                });
                if let Err(err) = store.associate(&source, spec.kind, &target, &spec.config) {
                    diagnostics.emit(Diagnostic::AssociationRejected {
                        error: err.to_string(),
                    });
                    outcome.status = AssociationStatus::Skipped(SkipReason::Rejected {
                        error: err.to_string(),
                    });
                }
            }
        }

        outcomes.push(outcome);
    }

    diagnostics.separator();
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registrar::register_all;
    use crate::store::Registry;
    use serde_json::json;

    fn def(name: &str) -> SchemaDefinition {
        SchemaDefinition::new(name, json!({"id": "INTEGER"}).as_object().cloned().unwrap())
    }

    fn registered(defs: &[SchemaDefinition]) -> Registry {
        let mut registry = Registry::new();
        register_all(&mut registry, defs, &mut Diagnostics::default()).unwrap();
        registry
    }

    #[test]
    fn test_declaration_order_is_kept() {
        let defs = [
            def("User"),
            def("Tag"),
            def("Post")
                .with_association(json!({"type": "BelongsTo", "targetName": "User"}))
                .with_association(json!({"type": "ManyToMany", "targetName": "Tag", "config": {"through": "PostTags"}})),
        ];
        let mut registry = registered(&defs);
        let report = resolve_all(&mut registry, &defs, &mut Diagnostics::default());

        assert!(report.is_clean());
        let post = registry.model("Post").unwrap();
        let targets: Vec<_> = post.associations.iter().map(|a| a.target_name.as_str()).collect();
        assert_eq!(targets, ["User", "Tag"]);
        assert_eq!(post.associations[1].kind, AssociationKind::ManyToMany);
    }

    #[test]
    fn test_skips_do_not_stop_siblings() {
        let defs = [
            def("User"),
            def("Post")
                .with_association(json!({"type": "BelongsTo", "targetName": "Ghost"}))
                .with_association(json!({"type": "bogus", "targetName": "User"}))
                .with_association(json!({"type": "BelongsTo", "targetName": "User"})),
            def("Comment").with_association(json!({"type": "BelongsTo", "targetName": "Post"})),
        ];
        let mut registry = registered(&defs);
        let report = resolve_all(&mut registry, &defs, &mut Diagnostics::default());

        assert_eq!(report.applied(), 2);
        assert_eq!(report.skipped(), 2);
        let statuses: Vec<_> = report.for_source("Post").map(|o| o.is_applied()).collect();
        assert_eq!(statuses, [false, false, true]);
        assert_eq!(registry.model("Comment").unwrap().associations.len(), 1);
    }

    #[test]
    fn test_missing_target_carries_suggestion() {
        let defs = [
            def("User"),
            def("Post").with_association(json!({"type": "hasOne", "model": "Usr"})),
        ];
        let mut registry = registered(&defs);
        let mut diagnostics = Diagnostics::captured(true);
        let report = resolve_all(&mut registry, &defs, &mut diagnostics);

        let (_, reason) = report.skips().next().unwrap();
        assert_eq!(
            reason,
            &SkipReason::TargetMissing {
                target: "Usr".to_string(),
                suggestion: Some("User".to_string()),
            }
        );
        assert!(diagnostics
            .lines()
            .contains(&"    Relation (Usr) not found (did you mean User?)".to_string()));
    }

    #[test]
    fn test_unregistered_source_is_skipped() {
        let defs = [
            def("User"),
            def("Post").with_association(json!({"type": "BelongsTo", "targetName": "User"})),
        ];
        let mut registry = registered(&defs[..1]);
        let report = resolve_all(&mut registry, &defs, &mut Diagnostics::default());

        let outcome = &report.outcomes()[0];
        assert_eq!(outcome.status, AssociationStatus::Skipped(SkipReason::SourceMissing));
        assert_eq!(outcome.target.as_deref(), Some("User"));
        assert_eq!(registry.association_count(), 0);
    }

    #[test]
    fn test_empty_associations_are_a_no_op() {
        let defs = [def("User"), def("Post")];
        let mut registry = registered(&defs);
        let mut diagnostics = Diagnostics::captured(true);

        for _ in 0..2 {
            let report = resolve_all(&mut registry, &defs, &mut diagnostics);
            assert!(report.outcomes().is_empty());
        }
        assert_eq!(registry.association_count(), 0);
        assert!(diagnostics.lines().is_empty());
    }

    #[test]
    fn test_store_rejection_is_skipped() {
        let defs = [
            def("User"),
            def("Post")
                .with_association(json!({"type": "BelongsTo", "targetName": "User"}))
                .with_association(json!({"type": "OneToOne", "targetName": "User"}))
                .with_association(json!({"type": "OneToOne", "targetName": "User", "config": {"as": "owner"}})),
        ];
        let mut registry = registered(&defs);
        let mut diagnostics = Diagnostics::captured(true);
        let report = resolve_all(&mut registry, &defs, &mut diagnostics);

        let statuses: Vec<_> = report.for_source("Post").map(|o| o.is_applied()).collect();
        assert_eq!(statuses, [true, false, true]);
        match &report.outcomes()[1].status {
            AssociationStatus::Skipped(SkipReason::Rejected { error }) => {
                assert!(error.contains("already has an association named User"));
            }
            other => panic!("Expected Rejected, got {:?}", other),
        }
        assert_eq!(registry.model("Post").unwrap().associations.len(), 2);
        assert!(diagnostics
            .lines()
            .iter()
            .any(|l| l.starts_with("    Association rejected:")));
    }

    #[test]
    fn test_resolve_single_definition() {
        let defs = [
            def("User"),
            def("Post").with_association(json!({"type": "BelongsTo", "targetName": "User"})),
        ];
        let mut registry = registered(&defs);
        let outcomes = resolve_definition(&mut registry, &defs[1], &mut Diagnostics::default());

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_applied());
        assert_eq!(outcomes[0].kind, Some(AssociationKind::BelongsTo));
        assert!(registry.model("User").unwrap().associations.is_empty());
    }
}
