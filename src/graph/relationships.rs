//! Relationship graphs: among a selection of entities, or around one entity.

use std::collections::{HashMap, HashSet};

use super::dot::{DotGraph, Edge, Node, RELATIONSHIP_NODE_COLOR};
use super::names::resolve_entity_names;
use super::NodeIdentity;
use crate::metadata::{BusinessEntity, Direction, Relationship};

pub const RELATIONSHIPS_GRAPH_NAME: &str = "Relationships";
pub const SINGLE_ENTITY_GRAPH_NAME: &str = "SingleEntityRelationships";

/// Name shown for a focal guid that no entity carries
const UNKNOWN_ENTITY: &str = "Unknown";

/// Edge for `from -> to` under the relationship's direction.
pub fn relationship_edge(from: &str, to: &str, name: &str, direction: Direction) -> Edge {
    match direction {
        Direction::Forward => Edge::new(from, to, name),
        Direction::Backward => Edge::new(to, from, name),
        Direction::Bidirected => Edge::new(from, to, name).both_ways(),
    }
}

fn relationship_graph(name: &str) -> DotGraph {
    DotGraph::new(name).with_default_fill(RELATIONSHIP_NODE_COLOR)
}

/// Node for an entity under the chosen identity scheme
fn entity_node(identity: NodeIdentity, guid: &str, name: &str) -> Node {
    match identity {
        NodeIdentity::DisplayName => Node::bare(name),
        NodeIdentity::Guid => Node::labeled(guid, name),
    }
}

fn node_id<'a>(identity: NodeIdentity, guid: &'a str, name: &'a str) -> &'a str {
    match identity {
        NodeIdentity::DisplayName => name,
        NodeIdentity::Guid => guid,
    }
}

/// Relationships among exactly the selected entities.
///
/// Selected display names define the node set. A graph-stored relationship
/// becomes an edge only when both endpoints resolve to selected names.
pub fn build_relationships_graph(
    selected: &[String],
    entities: &[BusinessEntity],
    relationships: &[Relationship],
    identity: NodeIdentity,
) -> DotGraph {
    let names = resolve_entity_names(entities);
    let selected_names: HashSet<&str> = selected.iter().map(String::as_str).collect();
    let mut graph = relationship_graph(RELATIONSHIPS_GRAPH_NAME);

    match identity {
        NodeIdentity::DisplayName => {
            for name in selected {
                graph.add_node(Node::bare(name));
            }
        }
        NodeIdentity::Guid => {
            for name in selected {
                let mut matched = false;
                for entity in entities.iter().filter(|e| e.display_name() == name.as_str()) {
                    if let Some(guid) = entity.guid.as_deref() {
                        graph.add_node(Node::labeled(guid, name));
                        matched = true;
                    }
                }
                if !matched {
                    log::debug!("Selected entity '{}' has no guid, no node drawn", name);
                }
            }
        }
    }

    for rel in relationships.iter().filter(|r| r.is_graph()) {
        let (Some(from_guid), Some(to_guid)) = (rel.from_guid(), rel.to_guid()) else {
            continue;
        };
        let (Some(from_name), Some(to_name)) = (names.get(from_guid), names.get(to_guid)) else {
            continue;
        };
        if !selected_names.contains(from_name.as_str()) || !selected_names.contains(to_name.as_str()) {
            continue;
        }

        graph.add_edge(relationship_edge(
            node_id(identity, from_guid, from_name),
            node_id(identity, to_guid, to_name),
            rel.name(),
            rel.direction(),
        ));
    }

    log::debug!(
        "Relationship graph for {} selected entities: {} edges",
        selected.len(),
        graph.edge_count()
    );

    graph
}

/// Display name of a relationship endpoint; unknown guids show as themselves.
fn endpoint_name<'a>(names: &'a HashMap<String, String>, guid: Option<&'a str>) -> &'a str {
    match guid {
        Some(g) => names.get(g).map(String::as_str).unwrap_or(g),
        None => UNKNOWN_ENTITY,
    }
}

/// Every graph-stored relationship touching `focal_guid`, with its neighbours.
///
/// The focal entity is always a node; the far end of each touching
/// relationship is added once. Self-relationships draw a self-edge.
pub fn build_single_entity_relationships_graph(
    focal_guid: &str,
    entities: &[BusinessEntity],
    relationships: &[Relationship],
    identity: NodeIdentity,
) -> DotGraph {
    single_entity_graph(focal_guid, None, entities, relationships, identity)
}

/// Relationship graph around `entity`.
///
/// Same as [`build_single_entity_relationships_graph`], except that an entity
/// no guid resolves (it has none) keeps its own name on the focal node.
pub fn build_entity_relationships_graph(
    entity: &BusinessEntity,
    entities: &[BusinessEntity],
    relationships: &[Relationship],
    identity: NodeIdentity,
) -> DotGraph {
    single_entity_graph(entity.guid(), entity.name(), entities, relationships, identity)
}

fn single_entity_graph(
    focal_guid: &str,
    fallback_name: Option<&str>,
    entities: &[BusinessEntity],
    relationships: &[Relationship],
    identity: NodeIdentity,
) -> DotGraph {
    let names = resolve_entity_names(entities);
    let focal_name = names
        .get(focal_guid)
        .map(String::as_str)
        .or(fallback_name)
        .unwrap_or(UNKNOWN_ENTITY);
    let focal_id = if focal_guid.is_empty() { focal_name } else { focal_guid };

    let mut graph = relationship_graph(SINGLE_ENTITY_GRAPH_NAME);
    graph.add_node(entity_node(identity, focal_id, focal_name));

    for rel in relationships.iter().filter(|r| r.is_graph()) {
        let from_guid = rel.from_guid();
        let to_guid = rel.to_guid();
        if from_guid != Some(focal_guid) && to_guid != Some(focal_guid) {
            continue;
        }

        let from_name = endpoint_name(&names, from_guid);
        let to_name = endpoint_name(&names, to_guid);
        let from_id = node_id(identity, from_guid.unwrap_or(from_name), from_name);
        let to_id = node_id(identity, to_guid.unwrap_or(to_name), to_name);

        if from_guid != Some(focal_guid) {
            graph.add_node(entity_node(identity, from_id, from_name));
        }
        if to_guid != Some(focal_guid) {
            graph.add_node(entity_node(identity, to_id, to_name));
        }

        graph.add_edge(relationship_edge(from_id, to_id, rel.name(), rel.direction()));
    }

    log::debug!(
        "Relationship graph around {}: {} nodes, {} edges",
        focal_name,
        graph.node_count(),
        graph.edge_count()
    );

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entities() -> Vec<BusinessEntity> {
        serde_json::from_value(json!([
            {"guid": "g1", "name": "A", "storage": "ent"},
            {"guid": "g2", "name": "B", "storage": "ent"},
            {"guid": "g3", "name": "C", "storage": "ent"},
            {"guid": "g4", "storage": "ent"}
        ]))
        .unwrap()
    }

    fn rel(name: &str, storage: &str, from: &str, to: &str, direction: Option<&str>) -> Relationship {
        let mut value = json!({
            "name": name,
            "storage": storage,
            "from": {"businessEntity": {"$ref": from}},
            "to": {"businessEntity": {"$ref": to}}
        });
        if let Some(d) = direction {
            value["options"] = json!({"direction": d});
        }
        serde_json::from_value(value).unwrap()
    }

    fn selected(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn edge_pairs(graph: &DotGraph) -> Vec<(&str, &str, &str, bool)> {
        graph
            .edges()
            .map(|e| (e.from.as_str(), e.to.as_str(), e.label.as_str(), e.bidirectional))
            .collect()
    }

    #[test]
    fn test_direction_rule() {
        assert_eq!(
            relationship_edge("A", "B", "r", Direction::Forward),
            Edge::new("A", "B", "r")
        );
        assert_eq!(
            relationship_edge("A", "B", "r", Direction::Backward),
            Edge::new("B", "A", "r")
        );
        assert_eq!(
            relationship_edge("A", "B", "r", Direction::Bidirected),
            Edge::new("A", "B", "r").both_ways()
        );
    }

    #[test]
    fn test_multi_backward_scenario() {
        let graph = build_relationships_graph(
            &selected(&["A", "B"]),
            &entities(),
            &[rel("owns", "graph", "g1", "g2", Some("BACKWARD"))],
            NodeIdentity::DisplayName,
        );
        assert_eq!(graph.node_ids(), vec!["A", "B"]);
        assert_eq!(edge_pairs(&graph), vec![("B", "A", "owns", false)]);
        assert!(graph.to_dot().contains("  \"B\" -> \"A\" [label=\"owns\"];\n"));
    }

    #[test]
    fn test_multi_drops_unselected_endpoint() {
        let graph = build_relationships_graph(
            &selected(&["A", "B"]),
            &entities(),
            &[
                rel("knows", "graph", "g1", "g3", None),
                rel("ghost", "graph", "g1", "missing", None),
            ],
            NodeIdentity::DisplayName,
        );
        assert_eq!(graph.node_ids(), vec!["A", "B"]);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_multi_ignores_non_graph_storage() {
        let graph = build_relationships_graph(
            &selected(&["A", "B"]),
            &entities(),
            &[
                rel("hier", "hierarchy", "g1", "g2", None),
                rel("ent", "ent", "g1", "g2", None),
            ],
            NodeIdentity::DisplayName,
        );
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_multi_bidirected_and_default() {
        let graph = build_relationships_graph(
            &selected(&["A", "B", "C"]),
            &entities(),
            &[
                rel("pair", "graph", "g1", "g2", Some("bidirected")),
                rel("next", "graph", "g2", "g3", None),
                rel("odd", "graph", "g3", "g1", Some("UPWARD")),
            ],
            NodeIdentity::DisplayName,
        );
        assert_eq!(
            edge_pairs(&graph),
            vec![
                ("A", "B", "pair", true),
                ("B", "C", "next", false),
                ("C", "A", "odd", false),
            ]
        );
        assert!(graph.to_dot().contains("[dir=\"both\", label=\"pair\"]"));
    }

    #[test]
    fn test_multi_unnamed_entity_selected_by_guid() {
        let graph = build_relationships_graph(
            &selected(&["A", "g4"]),
            &entities(),
            &[rel("r", "graph", "g4", "g1", None)],
            NodeIdentity::DisplayName,
        );
        assert_eq!(edge_pairs(&graph), vec![("g4", "A", "r", false)]);
    }

    #[test]
    fn test_multi_guid_identity_separates_same_names() {
        let entities: Vec<BusinessEntity> = serde_json::from_value(json!([
            {"guid": "g1", "name": "Party"},
            {"guid": "g2", "name": "Party"},
            {"guid": "g3", "name": "Account"}
        ]))
        .unwrap();
        let graph = build_relationships_graph(
            &selected(&["Party", "Account"]),
            &entities,
            &[rel("holds", "graph", "g1", "g3", None), rel("holds", "graph", "g2", "g3", None)],
            NodeIdentity::Guid,
        );
        assert_eq!(graph.node_ids(), vec!["g1", "g2", "g3"]);
        assert_eq!(
            edge_pairs(&graph),
            vec![
                ("g1", "g3", "holds", false),
                ("g2", "g3", "holds", false),
            ]
        );
        assert!(graph.to_dot().contains("  \"g1\" [label=\"Party\"];\n"));

        let merged = build_relationships_graph(
            &selected(&["Party", "Account"]),
            &entities,
            &[rel("holds", "graph", "g1", "g3", None), rel("holds", "graph", "g2", "g3", None)],
            NodeIdentity::DisplayName,
        );
        assert_eq!(merged.node_ids(), vec!["Party", "Account"]);
        assert_eq!(merged.edge_count(), 2);
    }

    #[test]
    fn test_single_default_direction_scenario() {
        let graph = build_single_entity_relationships_graph(
            "g1",
            &entities(),
            &[
                rel("buys", "graph", "g1", "g2", None),
                rel("other", "graph", "g2", "g3", None),
            ],
            NodeIdentity::DisplayName,
        );
        assert_eq!(graph.name(), "SingleEntityRelationships");
        assert_eq!(graph.node_ids(), vec!["A", "B"]);
        assert_eq!(edge_pairs(&graph), vec![("A", "B", "buys", false)]);
    }

    #[test]
    fn test_single_adds_each_neighbour_once() {
        let graph = build_single_entity_relationships_graph(
            "g1",
            &entities(),
            &[
                rel("r1", "graph", "g1", "g2", None),
                rel("r2", "graph", "g2", "g1", Some("BACKWARD")),
                rel("r3", "graph", "g3", "g1", None),
            ],
            NodeIdentity::DisplayName,
        );
        assert_eq!(graph.node_ids(), vec!["A", "B", "C"]);
        assert_eq!(
            edge_pairs(&graph),
            vec![
                ("A", "B", "r1", false),
                ("A", "B", "r2", false),
                ("C", "A", "r3", false),
            ]
        );
    }

    #[test]
    fn test_single_self_relationship() {
        let graph = build_single_entity_relationships_graph(
            "g1",
            &entities(),
            &[rel("parent", "graph", "g1", "g1", None)],
            NodeIdentity::DisplayName,
        );
        assert_eq!(graph.node_ids(), vec!["A"]);
        assert_eq!(edge_pairs(&graph), vec![("A", "A", "parent", false)]);
    }

    #[test]
    fn test_single_ignores_non_graph_storage() {
        let graph = build_single_entity_relationships_graph(
            "g1",
            &entities(),
            &[rel("r", "hierarchy", "g1", "g2", None)],
            NodeIdentity::DisplayName,
        );
        assert_eq!(graph.node_ids(), vec!["A"]);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_single_unknown_neighbour_shows_guid() {
        let graph = build_single_entity_relationships_graph(
            "g1",
            &entities(),
            &[rel("r", "graph", "g1", "excluded.guid", None)],
            NodeIdentity::DisplayName,
        );
        assert_eq!(graph.node_ids(), vec!["A", "excluded.guid"]);
    }

    #[test]
    fn test_single_unknown_focal() {
        let graph = build_single_entity_relationships_graph("nope", &entities(), &[], NodeIdentity::DisplayName);
        assert_eq!(graph.node_ids(), vec!["Unknown"]);
    }

    #[test]
    fn test_entity_without_guid_keeps_its_name() {
        let draft: BusinessEntity =
            serde_json::from_value(json!({"name": "Draft", "storage": "ent"})).unwrap();
        let relationships = [rel("r", "graph", "g1", "g2", None)];

        let graph = build_entity_relationships_graph(&draft, &entities(), &relationships, NodeIdentity::DisplayName);
        assert_eq!(graph.node_ids(), vec!["Draft"]);
        assert_eq!(graph.edge_count(), 0);

        let graph = build_entity_relationships_graph(&draft, &entities(), &relationships, NodeIdentity::Guid);
        assert_eq!(graph.node_ids(), vec!["Draft"]);
    }

    #[test]
    fn test_entity_relationships_graph_matches_guid_variant() {
        let relationships = [rel("r", "graph", "g2", "g1", Some("BIDIRECTED"))];
        let all = entities();
        assert_eq!(
            build_entity_relationships_graph(&all[0], &all, &relationships, NodeIdentity::DisplayName).to_dot(),
            build_single_entity_relationships_graph("g1", &entities(), &relationships, NodeIdentity::DisplayName)
                .to_dot()
        );
    }

    #[test]
    fn test_single_guid_identity() {
        let graph = build_single_entity_relationships_graph(
            "g1",
            &entities(),
            &[rel("r", "graph", "g2", "g1", Some("BIDIRECTED"))],
            NodeIdentity::Guid,
        );
        assert_eq!(graph.node_ids(), vec!["g1", "g2"]);
        assert_eq!(edge_pairs(&graph), vec![("g2", "g1", "r", true)]);
        assert!(graph.to_dot().contains("  \"g2\" [label=\"B\"];\n"));
    }
}
