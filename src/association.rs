//! Association declarations and their structural validation
//!
//! Association entries are kept as raw JSON until they are validated, so
//! malformed declarations can be reported and skipped instead of failing
//! the whole definition file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of relationship between two models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssociationKind {
    /// Source has exactly one target (`hasOne`)
    OneToOne,
    /// Source has many targets (`hasMany`)
    OneToMany,
    /// Source holds the foreign key of its target (`belongsTo`)
    BelongsTo,
    /// Source and target are joined through a link table (`belongsToMany`)
    ManyToMany,
}

impl AssociationKind {
    pub const ALL: [AssociationKind; 4] = [
        AssociationKind::OneToOne,
        AssociationKind::OneToMany,
        AssociationKind::BelongsTo,
        AssociationKind::ManyToMany,
    ];

    /// Parse a declared type name. Both the kind names and the store-native
    /// method names are accepted.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "OneToOne" | "hasOne" => Some(Self::OneToOne),
            "OneToMany" | "hasMany" => Some(Self::OneToMany),
            "BelongsTo" | "belongsTo" => Some(Self::BelongsTo),
            "ManyToMany" | "belongsToMany" => Some(Self::ManyToMany),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToOne => "OneToOne",
            Self::OneToMany => "OneToMany",
            Self::BelongsTo => "BelongsTo",
            Self::ManyToMany => "ManyToMany",
        }
    }

    /// Name of the store operation establishing this kind
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::OneToOne => "hasOne",
            Self::OneToMany => "hasMany",
            Self::BelongsTo => "belongsTo",
            Self::ManyToMany => "belongsToMany",
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options passed through to the store when an association is established
/// (`as`, `foreignKey`, `through`, `onDelete`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssociationConfig(Map<String, Value>);

impl AssociationConfig {
    pub fn new(options: Map<String, Value>) -> Self {
        Self(options)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Explicit association name (`as`), if configured
    pub fn alias(&self) -> Option<&str> {
        self.0.get("as").and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A structurally valid association declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationSpec {
    pub kind: AssociationKind,
    pub target_name: String,
    #[serde(default)]
    pub config: AssociationConfig,
}

/// Why an association declaration was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidAssociation {
    NotAnObject,
    InvalidType { found: Option<String> },
    MissingTarget,
    InvalidConfig,
}

impl fmt::Display for InvalidAssociation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAnObject => {
                write!(f, "Invalid association specification. Associations must be objects.")
            }
            Self::InvalidType { .. } => {
                let known: Vec<_> = AssociationKind::ALL.iter().map(|k| k.as_str()).collect();
                write!(f, "Invalid association type. Must be one of: {}", known.join(", "))
            }
            Self::MissingTarget => write!(f, "Missing target model name."),
            Self::InvalidConfig => write!(
                f,
                "Invalid association config. config must be an object of association options."
            ),
        }
    }
}

/// Validate a declared association.
///
/// Checks run in order and stop at the first failure: the declaration is an
/// object, `type` names a known kind, `targetName` (or `model`) is a
/// non-empty string, and `config` is an object when present.
pub fn validate(spec: &Value) -> Result<AssociationSpec, InvalidAssociation> {
    let obj = spec.as_object().ok_or(InvalidAssociation::NotAnObject)?;

    let type_name = obj.get("type").and_then(Value::as_str).unwrap_or_default();
    let kind = AssociationKind::parse(type_name).ok_or_else(|| InvalidAssociation::InvalidType {
        found: (!type_name.is_empty()).then(|| type_name.to_string()),
    })?;

    let target_name = obj
        .get("targetName")
        .or_else(|| obj.get("model"))
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or(InvalidAssociation::MissingTarget)?;

    let config = match obj.get("config") {
        None => AssociationConfig::default(),
        Some(Value::Object(options)) => AssociationConfig::new(options.clone()),
        Some(_) => return Err(InvalidAssociation::InvalidConfig),
    };

    Ok(AssociationSpec {
        kind,
        target_name: target_name.to_string(),
        config,
    })
}

/// Boolean form of [`validate`]
pub fn is_valid(spec: &Value) -> bool {
    validate(spec).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_and_target_only_is_valid() {
        let spec = validate(&json!({"type": "BelongsTo", "targetName": "User"})).unwrap();
        assert_eq!(spec.kind, AssociationKind::BelongsTo);
        assert_eq!(spec.target_name, "User");
        assert!(spec.config.is_empty());
    }

    #[test]
    fn test_config_is_carried() {
        let spec = validate(&json!({
            "type": "OneToMany",
            "targetName": "Post",
            "config": {"as": "articles", "onDelete": "cascade"}
        }))
        .unwrap();
        assert_eq!(spec.config.alias(), Some("articles"));
        assert_eq!(spec.config.get("onDelete"), Some(&json!("cascade")));
    }

    #[test]
    fn test_store_native_names_are_accepted() {
        let spec = validate(&json!({"type": "belongsToMany", "model": "Tag"})).unwrap();
        assert_eq!(spec.kind, AssociationKind::ManyToMany);
        assert_eq!(spec.target_name, "Tag");
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert_eq!(validate(&json!(null)), Err(InvalidAssociation::NotAnObject));
        assert_eq!(validate(&json!("BelongsTo")), Err(InvalidAssociation::NotAnObject));
        assert_eq!(validate(&json!([1, 2])), Err(InvalidAssociation::NotAnObject));
    }

    #[test]
    fn test_type_is_checked_before_target() {
        assert_eq!(
            validate(&json!({})),
            Err(InvalidAssociation::InvalidType { found: None })
        );
        assert_eq!(
            validate(&json!({"type": "invalidType", "targetName": "User"})),
            Err(InvalidAssociation::InvalidType { found: Some("invalidType".to_string()) })
        );
        assert_eq!(
            validate(&json!({"type": 3, "targetName": "User"})),
            Err(InvalidAssociation::InvalidType { found: None })
        );
    }

    #[test]
    fn test_missing_or_empty_target_is_rejected() {
        assert_eq!(
            validate(&json!({"type": "OneToOne"})),
            Err(InvalidAssociation::MissingTarget)
        );
        assert_eq!(
            validate(&json!({"type": "OneToOne", "targetName": ""})),
            Err(InvalidAssociation::MissingTarget)
        );
    }

    #[test]
    fn test_non_object_config_is_rejected() {
        for config in [json!(null), json!("cascade"), json!([]), json!(1)] {
            let spec = json!({"type": "OneToOne", "targetName": "User", "config": config});
            assert!(!is_valid(&spec), "config {config} should be rejected");
        }
    }

    #[test]
    fn test_validation_does_not_mutate_input() {
        let spec = json!({"type": "hasMany", "model": "Post"});
        let before = spec.clone();
        let _ = validate(&spec);
        assert_eq!(spec, before);
    }

    #[test]
    fn test_invalid_type_message_lists_kinds() {
        let msg = InvalidAssociation::InvalidType { found: None }.to_string();
        assert!(msg.contains("OneToOne, OneToMany, BelongsTo, ManyToMany"));
    }
}
