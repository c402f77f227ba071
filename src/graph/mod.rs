//! Graph builders: metadata in, Graphviz DOT out.
//!
//! Three independent builders share the DOT writer:
//! - the field graph of one entity (lookups and field groups),
//! - relationships among a selection of entities,
//! - relationships around a single entity.
//!
//! All builders are total over any parsed document; missing labels, names
//! and directions fall back to defaults instead of failing.

mod dot;
mod entity;
mod fields;
mod names;
mod relationships;

pub use dot::{escape_dot, DotGraph, Edge, Node};
pub use entity::{build_entity_graph, nested_lookup_id};
pub use fields::{classify_field, classify_fields, FieldClassification, FieldGroup, FieldKind};
pub use names::resolve_entity_names;
pub use relationships::{
    build_entity_relationships_graph, build_relationships_graph, build_single_entity_relationships_graph, relationship_edge,
};

use serde::{Deserialize, Serialize};

/// How entity nodes are identified in relationship graphs.
///
/// `DisplayName` keys nodes by name, so two entities sharing a name merge
/// into one node. `Guid` keys them by guid and shows the name as label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeIdentity {
    #[default]
    DisplayName,
    Guid,
}
