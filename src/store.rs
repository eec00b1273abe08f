//! Model store
//!
//! [`ModelStore`] is the seam between the registration core and the entity
//! store that actually owns models. [`Registry`] is the in-memory store
//! shipped with the crate; it keeps typed columns and the associations
//! established on each model.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::association::{AssociationConfig, AssociationKind};
use crate::error::{AssociationError, RegistrationError};
use crate::schema::Column;

/// Capabilities the registration core needs from an entity store
pub trait ModelStore {
    /// Handle to a registered model
    type Handle: Clone;

    /// Register a model
    fn define(
        &mut self,
        name: &str,
        columns: Option<&Map<String, Value>>,
        options: Option<&Value>,
    ) -> Result<Self::Handle, RegistrationError>;

    /// Look up a registered model by name
    fn lookup(&self, name: &str) -> Option<Self::Handle>;

    /// Establish an association from `source` to `target`
    fn associate(
        &mut self,
        source: &Self::Handle,
        kind: AssociationKind,
        target: &Self::Handle,
        config: &AssociationConfig,
    ) -> Result<(), AssociationError>;

    /// Names of all registered models
    fn names(&self) -> Vec<String>;

    /// Closest registered name to `name`, if any is similar enough
    fn suggest(&self, name: &str) -> Option<String> {
        let matcher = SkimMatcherV2::default().ignore_case();
        self.names()
            .into_iter()
            .filter_map(|candidate| {
                let score = matcher
                    .fuzzy_match(&candidate, name)
                    .max(matcher.fuzzy_match(name, &candidate))?;
                Some((score, candidate))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, candidate)| candidate)
    }
}

/// Handle to a model registered in a [`Registry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ModelId(usize);

/// An association established on a registered model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Association {
    pub kind: AssociationKind,
    pub target: ModelId,
    pub target_name: String,
    /// Accessor name: the configured `as`, else the target name
    pub alias: String,
    pub config: AssociationConfig,
}

/// A model registered in a [`Registry`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredModel {
    pub id: ModelId,
    pub name: String,
    pub columns: Vec<Column>,
    pub options: Map<String, Value>,
    pub associations: Vec<Association>,
}

impl RegisteredModel {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Associations of the given kind, in the order they were established
    pub fn associations_of(&self, kind: AssociationKind) -> impl Iterator<Item = &Association> {
        self.associations.iter().filter(move |a| a.kind == kind)
    }
}

/// In-memory model store
#[derive(Debug, Default)]
pub struct Registry {
    models: Vec<RegisteredModel>,
    by_name: HashMap<String, ModelId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Get a registered model by handle
    pub fn get(&self, id: ModelId) -> Option<&RegisteredModel> {
        self.models.get(id.0)
    }

    /// Get a registered model by name
    pub fn model(&self, name: &str) -> Option<&RegisteredModel> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// All registered models, in registration order
    pub fn models(&self) -> impl Iterator<Item = &RegisteredModel> {
        self.models.iter()
    }

    /// Total number of established associations
    pub fn association_count(&self) -> usize {
        self.models.iter().map(|m| m.associations.len()).sum()
    }

    pub fn has_one(
        &mut self,
        source: ModelId,
        target: ModelId,
        config: &AssociationConfig,
    ) -> Result<(), AssociationError> {
        self.establish(source, AssociationKind::OneToOne, target, config)
    }

    pub fn has_many(
        &mut self,
        source: ModelId,
        target: ModelId,
        config: &AssociationConfig,
    ) -> Result<(), AssociationError> {
        self.establish(source, AssociationKind::OneToMany, target, config)
    }

    pub fn belongs_to(
        &mut self,
        source: ModelId,
        target: ModelId,
        config: &AssociationConfig,
    ) -> Result<(), AssociationError> {
        self.establish(source, AssociationKind::BelongsTo, target, config)
    }

    pub fn belongs_to_many(
        &mut self,
        source: ModelId,
        target: ModelId,
        config: &AssociationConfig,
    ) -> Result<(), AssociationError> {
        self.establish(source, AssociationKind::ManyToMany, target, config)
    }

    fn establish(
        &mut self,
        source: ModelId,
        kind: AssociationKind,
        target: ModelId,
        config: &AssociationConfig,
    ) -> Result<(), AssociationError> {
        let target_name = self
            .get(target)
            .ok_or(AssociationError::UnknownHandle(target.0))?
            .name
            .clone();
        let model = self
            .models
            .get_mut(source.0)
            .ok_or(AssociationError::UnknownHandle(source.0))?;

        let alias = config.alias().unwrap_or(&target_name).to_string();
        if model.associations.iter().any(|a| a.alias == alias) {
            return Err(AssociationError::DuplicateAlias {
                source_model: model.name.clone(),
                alias,
                kind,
            });
        }

        model.associations.push(Association {
            kind,
            target,
            target_name,
            alias,
            config: config.clone(),
        });
        Ok(())
    }
}

impl ModelStore for Registry {
    type Handle = ModelId;

    fn define(
        &mut self,
        name: &str,
        columns: Option<&Map<String, Value>>,
        options: Option<&Value>,
    ) -> Result<ModelId, RegistrationError> {
        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if self.by_name.contains_key(name) {
            return Err(RegistrationError::DuplicateName {
                name: name.to_string(),
            });
        }

        let specs = columns
            .filter(|c| !c.is_empty())
            .ok_or_else(|| RegistrationError::MissingColumns {
                name: name.to_string(),
            })?;
        let columns = specs
            .iter()
            .map(|(column, spec)| {
                Column::parse(column, spec).map_err(|reason| RegistrationError::InvalidColumn {
                    name: name.to_string(),
                    column: column.clone(),
                    reason,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let options = match options {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(options)) => options.clone(),
            Some(_) => {
                return Err(RegistrationError::InvalidOptions {
                    name: name.to_string(),
                })
            }
        };

        let id = ModelId(self.models.len());
        self.models.push(RegisteredModel {
            id,
            name: name.to_string(),
            columns,
            options,
            associations: Vec::new(),
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    fn lookup(&self, name: &str) -> Option<ModelId> {
        self.by_name.get(name).copied()
    }

    fn associate(
        &mut self,
        source: &ModelId,
        kind: AssociationKind,
        target: &ModelId,
        config: &AssociationConfig,
    ) -> Result<(), AssociationError> {
        match kind {
            AssociationKind::OneToOne => self.has_one(*source, *target, config),
            AssociationKind::OneToMany => self.has_many(*source, *target, config),
            AssociationKind::BelongsTo => self.belongs_to(*source, *target, config),
            AssociationKind::ManyToMany => self.belongs_to_many(*source, *target, config),
        }
    }

    fn names(&self) -> Vec<String> {
        self.models.iter().map(|m| m.name.clone()).collect()
    }
}
