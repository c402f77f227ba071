//! Graphviz DOT text for the generated graphs.

use std::collections::HashSet;
use std::fmt;

/// Fill color of the entity at the root of a field graph.
pub const ROOT_COLOR: &str = "lightblue";
/// Fill color of a direct lookup.
pub const LOOKUP_COLOR: &str = "lightyellow";
/// Fill color of a field group.
pub const FIELD_GROUP_COLOR: &str = "#B39EB5";
/// Fill color of a lookup nested in a field group.
pub const NESTED_LOOKUP_COLOR: &str = "orange";
/// Fill color shared by every entity in a relationship graph.
pub const RELATIONSHIP_NODE_COLOR: &str = "#FACDA0";

/// A node declaration: `"id" [label="..", fillcolor=..];`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub label: Option<String>,
    pub fill_color: Option<String>,
}

impl Node {
    /// A node with no attributes of its own
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            fill_color: None,
        }
    }

    /// A node whose rendered label differs from its identity
    pub fn labeled(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
            fill_color: None,
        }
    }

    pub fn with_fill(mut self, color: &str) -> Self {
        self.fill_color = Some(color.to_string());
        self
    }
}

/// An edge declaration: `"from" -> "to" [label=".."];`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: String,
    /// Rendered with `dir="both"`
    pub bidirectional: bool,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            label: label.into(),
            bidirectional: false,
        }
    }

    pub fn both_ways(mut self) -> Self {
        self.bidirectional = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Statement {
    Node(Node),
    Edge(Edge),
}

/// An ordered directed-graph description, laid out left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotGraph {
    name: String,
    node_defaults: Vec<(String, String)>,
    statements: Vec<Statement>,
    declared: HashSet<String>,
}

impl DotGraph {
    /// New graph with the shared record/rounded node style
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            node_defaults: vec![
                ("shape".to_string(), "record".to_string()),
                ("style".to_string(), "filled,rounded".to_string()),
            ],
            statements: Vec::new(),
            declared: HashSet::new(),
        }
    }

    /// Set a fill color applied to every node without its own
    pub fn with_default_fill(mut self, color: &str) -> Self {
        self.node_defaults
            .push(("fillcolor".to_string(), color.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a node. Returns false, declaring nothing, if the id is already declared.
    pub fn add_node(&mut self, node: Node) -> bool {
        if !self.declared.insert(node.id.clone()) {
            return false;
        }
        self.statements.push(Statement::Node(node));
        true
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.statements.push(Statement::Edge(edge));
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.declared.contains(id)
    }

    /// Declared nodes in declaration order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Node(n) => Some(n),
            Statement::Edge(_) => None,
        })
    }

    /// Edges in emission order
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Edge(e) => Some(e),
            Statement::Node(_) => None,
        })
    }

    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes().map(|n| n.id.as_str()).collect()
    }

    pub fn node_count(&self) -> usize {
        self.declared.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    /// Render as DOT text (no trailing newline)
    pub fn to_dot(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DotGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph {} {{", self.name)?;
        writeln!(f, "  rankdir=LR;")?;

        let defaults = self
            .node_defaults
            .iter()
            .map(|(k, v)| format!("{}={}", k, attr_value(v)))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "  node [{}];", defaults)?;

        for statement in &self.statements {
            match statement {
                Statement::Node(node) => write_node(f, node)?,
                Statement::Edge(edge) => write_edge(f, edge)?,
            }
        }

        write!(f, "}}")
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &Node) -> fmt::Result {
    let mut attrs = Vec::new();
    if let Some(label) = &node.label {
        attrs.push(format!("label=\"{}\"", escape_dot(label)));
    }
    if let Some(color) = &node.fill_color {
        attrs.push(format!("fillcolor={}", attr_value(color)));
    }

    if attrs.is_empty() {
        writeln!(f, "  \"{}\";", escape_dot(&node.id))
    } else {
        writeln!(f, "  \"{}\" [{}];", escape_dot(&node.id), attrs.join(", "))
    }
}

fn write_edge(f: &mut fmt::Formatter<'_>, edge: &Edge) -> fmt::Result {
    let dir = if edge.bidirectional { "dir=\"both\", " } else { "" };
    writeln!(
        f,
        "  \"{}\" -> \"{}\" [{}label=\"{}\"];",
        escape_dot(&edge.from),
        escape_dot(&edge.to),
        dir,
        escape_dot(&edge.label)
    )
}

/// Bare identifiers stay unquoted, anything else is quoted.
fn attr_value(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        value.to_string()
    } else {
        format!("\"{}\"", escape_dot(value))
    }
}

/// Escape text for use inside a double-quoted DOT string
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
