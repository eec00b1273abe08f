//! Model definition types and structures

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

use crate::checksum::Checksum;

/// A model definition as read from a definition file.
///
/// Fields are kept loosely typed: a missing `name` or `columns` is not a
/// load failure, it is reported by the store when the definition is
/// registered. Association entries stay raw JSON until validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Unique model name (e.g., "User", "Post")
    #[serde(default)]
    pub name: String,
    /// Column name to column spec
    #[serde(default, alias = "cols", skip_serializing_if = "Option::is_none")]
    pub columns: Option<Map<String, Value>>,
    /// Opaque model options forwarded to the store
    #[serde(default, alias = "opts", skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    /// Declared associations, in declaration order
    #[serde(
        default,
        alias = "refs",
        deserialize_with = "lenient_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub associations: Vec<Value>,
    /// Where this definition was loaded from
    #[serde(skip)]
    pub origin: Option<DefinitionOrigin>,
}

/// Source file and content checksum of a loaded definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionOrigin {
    pub path: PathBuf,
    pub checksum: Checksum,
}

impl SchemaDefinition {
    /// Create a definition with the given columns and no associations
    pub fn new(name: impl Into<String>, columns: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            columns: Some(columns),
            ..Self::default()
        }
    }

    /// Append an association declaration
    pub fn with_association(mut self, association: Value) -> Self {
        self.associations.push(association);
        self
    }

    /// Set the model options
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    pub fn has_associations(&self) -> bool {
        !self.associations.is_empty()
    }

    /// Display name for diagnostics, falling back to the source file
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        self.origin
            .as_ref()
            .map(|o| o.path.display().to_string())
            .unwrap_or_else(|| "<unnamed>".to_string())
    }
}

// Anything other than a list (null, an object, a string) means "no associations".
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items),
        _ => Ok(Vec::new()),
    }
}

/// Column data types understood by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    String,
    Text,
    Integer,
    BigInt,
    Float,
    Double,
    Decimal,
    Boolean,
    Date,
    DateOnly,
    Uuid,
    Json,
}

impl DataType {
    /// Parse a type name, ignoring case (`"STRING"`, `"string"`)
    pub fn parse(name: &str) -> Option<Self> {
        let parsed = match name.to_ascii_uppercase().as_str() {
            "STRING" => Self::String,
            "TEXT" => Self::Text,
            "INTEGER" => Self::Integer,
            "BIGINT" => Self::BigInt,
            "FLOAT" => Self::Float,
            "DOUBLE" => Self::Double,
            "DECIMAL" => Self::Decimal,
            "BOOLEAN" => Self::Boolean,
            "DATE" => Self::Date,
            "DATEONLY" => Self::DateOnly,
            "UUID" => Self::Uuid,
            "JSON" => Self::Json,
            _ => return None,
        };
        Some(parsed)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "STRING",
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Decimal => "DECIMAL",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::DateOnly => "DATEONLY",
            Self::Uuid => "UUID",
            Self::Json => "JSON",
        };
        f.write_str(name)
    }
}

/// A typed column of a registered model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub allow_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub auto_increment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl Column {
    /// Parse a column spec: either a bare type name or an object with a
    /// `type` key and optional `allowNull`, `primaryKey`, `unique`,
    /// `autoIncrement` and `defaultValue`.
    pub fn parse(name: &str, spec: &Value) -> Result<Self, String> {
        match spec {
            Value::String(type_name) => Ok(Self::with_type(name, parse_type(type_name)?)),
            Value::Object(attrs) => {
                let type_name = attrs
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| "missing \"type\"".to_string())?;
                let mut column = Self::with_type(name, parse_type(type_name)?);
                column.allow_null = flag(attrs, "allowNull", true)?;
                column.primary_key = flag(attrs, "primaryKey", false)?;
                column.unique = flag(attrs, "unique", false)?;
                column.auto_increment = flag(attrs, "autoIncrement", false)?;
                column.default_value = attrs.get("defaultValue").cloned();
                Ok(column)
            }
            other => Err(format!("expected a type name or an object, got {other}")),
        }
    }

    fn with_type(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            allow_null: true,
            primary_key: false,
            unique: false,
            auto_increment: false,
            default_value: None,
        }
    }
}

fn parse_type(name: &str) -> Result<DataType, String> {
    DataType::parse(name).ok_or_else(|| format!("unknown data type {name:?}"))
}

fn flag(attrs: &Map<String, Value>, key: &str, default: bool) -> Result<bool, String> {
    match attrs.get(key) {
        None => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(format!("\"{key}\" must be a boolean, got {other}")),
    }
}
