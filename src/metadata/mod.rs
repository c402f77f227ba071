//! Tenant data-model document as returned by the metadata API.
//!
//! Only the parts the graph builders read are modelled; every other key is
//! ignored. All fields are optional so any syntactically valid document
//! deserializes, and gaps are resolved by defaults at use sites.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::Result;

/// Storage tag of entities that can be visualized.
pub const ENTITY_STORAGE: &str = "ent";

/// Storage tag of relationships that are drawn.
pub const GRAPH_STORAGE: &str = "graph";

/// Locale used for display labels.
pub const LABEL_LOCALE: &str = "en";

/// The whole metadata document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataDocument {
    #[serde(rename = "businessEntity", default)]
    pub business_entities: Vec<BusinessEntity>,
    #[serde(rename = "relationship", default)]
    pub relationships: Vec<Relationship>,
}

impl MetadataDocument {
    /// Parse a document from JSON text
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read and parse a document saved on disk
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Entities eligible for visualization, in document order.
    pub fn eligible_entities(&self, exclude_guids: &HashSet<String>) -> Vec<BusinessEntity> {
        self.business_entities
            .iter()
            .filter(|e| e.is_eligible(exclude_guids))
            .cloned()
            .collect()
    }
}

/// A business entity (e.g. Person, Organization)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessEntity {
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(rename = "field", default)]
    pub fields: Vec<Field>,
}

impl BusinessEntity {
    /// Guid, or "" when absent
    pub fn guid(&self) -> &str {
        self.guid.as_deref().unwrap_or("")
    }

    /// Non-empty name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    /// Name, falling back to the guid
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or_else(|| self.guid())
    }

    /// Stored as "ent" and not explicitly excluded
    pub fn is_eligible(&self, exclude_guids: &HashSet<String>) -> bool {
        self.storage.as_deref() == Some(ENTITY_STORAGE)
            && !self
                .guid
                .as_ref()
                .is_some_and(|g| exclude_guids.contains(g))
    }
}

/// An entity field; lookups carry a `codeField`, field groups set `allowMany`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Field {
    #[serde(default)]
    pub label: Option<HashMap<String, Value>>,
    /// Present (even as null) on lookup fields.
    #[serde(
        rename = "codeField",
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub code_field: Option<Value>,
    #[serde(rename = "allowMany", default)]
    pub allow_many: Option<Value>,
    #[serde(rename = "field", default)]
    pub fields: Vec<Field>,
}

impl Field {
    /// The non-empty "en" label, if any
    pub fn display_label(&self) -> Option<&str> {
        self.label
            .as_ref()
            .and_then(|l| l.get(LABEL_LOCALE))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn is_lookup(&self) -> bool {
        self.code_field.is_some()
    }

    /// Only a literal `true` marks a repeatable group
    pub fn is_group(&self) -> bool {
        matches!(self.allow_many, Some(Value::Bool(true)))
    }
}

/// Maps a present key to `Some` even when its value is `null`.
fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A relationship between two business entities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub from: Option<Endpoint>,
    #[serde(default)]
    pub to: Option<Endpoint>,
    #[serde(default)]
    pub options: Option<RelationshipOptions>,
}

impl Relationship {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn is_graph(&self) -> bool {
        self.storage.as_deref() == Some(GRAPH_STORAGE)
    }

    pub fn from_guid(&self) -> Option<&str> {
        self.from.as_ref().and_then(Endpoint::guid)
    }

    pub fn to_guid(&self) -> Option<&str> {
        self.to.as_ref().and_then(Endpoint::guid)
    }

    pub fn direction(&self) -> Direction {
        Direction::parse(self.options.as_ref().and_then(|o| o.direction.as_deref()))
    }
}

/// One side of a relationship: `{"businessEntity": {"$ref": guid}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(rename = "businessEntity", default)]
    pub business_entity: Option<EntityRef>,
}

impl Endpoint {
    pub fn guid(&self) -> Option<&str> {
        self.business_entity
            .as_ref()
            .and_then(|r| r.reference.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "$ref", default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipOptions {
    #[serde(default)]
    pub direction: Option<String>,
}

/// Edge direction of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
    Bidirected,
}

impl Direction {
    /// Case-insensitive; absent or unrecognised values are Forward.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_uppercase).as_deref() {
            Some("FORWARD") => Direction::Forward,
            Some("BACKWARD") => Direction::Backward,
            Some("BIDIRECTED") => Direction::Bidirected,
            Some(other) => {
                log::debug!("Unrecognised relationship direction '{}', drawing forward", other);
                Direction::Forward
            }
            None => Direction::Forward,
        }
    }
}
