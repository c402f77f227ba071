//! Field graph of a single business entity.

use super::dot::{
    DotGraph, Edge, Node, FIELD_GROUP_COLOR, LOOKUP_COLOR, NESTED_LOOKUP_COLOR, ROOT_COLOR,
};
use super::fields::classify_fields;
use crate::metadata::BusinessEntity;

pub const ENTITY_GRAPH_NAME: &str = "ER";

const LOOKUP_EDGE: &str = "lookup";
const FIELD_GROUP_EDGE: &str = "field group";

/// Root name used when the entity has no name
pub const UNKNOWN_ENTITY: &str = "Unknown";

/// Node identity of a lookup nested in a field group
pub fn nested_lookup_id(group: &str, lookup: &str) -> String {
    format!("{}::{}", group, lookup)
}

/// Build the lookup / field-group graph rooted at `entity`.
///
/// Returns the graph and the root node name.
pub fn build_entity_graph(entity: &BusinessEntity) -> (DotGraph, String) {
    let root_name = entity.name().unwrap_or(UNKNOWN_ENTITY).to_string();
    let classification = classify_fields(&entity.fields);

    let mut graph = DotGraph::new(ENTITY_GRAPH_NAME);
    graph.add_node(Node::labeled(&root_name, &root_name).with_fill(ROOT_COLOR));

    for lookup in &classification.direct_lookups {
        graph.add_node(Node::labeled(lookup, lookup).with_fill(LOOKUP_COLOR));
        graph.add_edge(Edge::new(&root_name, lookup, LOOKUP_EDGE));
    }

    for group in &classification.field_groups {
        graph.add_node(Node::labeled(&group.name, &group.name).with_fill(FIELD_GROUP_COLOR));
        graph.add_edge(Edge::new(&root_name, &group.name, FIELD_GROUP_EDGE));

        for lookup in &group.lookups {
            let id = nested_lookup_id(&group.name, lookup);
            graph.add_node(Node::labeled(&id, lookup).with_fill(NESTED_LOOKUP_COLOR));
            graph.add_edge(Edge::new(&group.name, id, LOOKUP_EDGE));
        }
    }

    log::debug!(
        "Entity graph for {}: {} nodes, {} edges",
        root_name,
        graph.node_count(),
        graph.edge_count()
    );

    (graph, root_name)
}
