//! Logged-in session: credentials, the fetched data model and the
//! visualize flow built on top of it.
//!
//! A session owns its metadata document for its whole life; nothing is
//! refreshed in the background. Dropping the session is the logout.

use std::collections::{HashMap, HashSet};

use crate::client::MdmClient;
use crate::config::{Config, Environment};
use crate::error::{MdmvizError, Result};
use crate::graph::{
    build_entity_graph, build_entity_relationships_graph, build_relationships_graph,
    DotGraph, NodeIdentity,
};
use crate::metadata::{BusinessEntity, MetadataDocument};

/// Number of choices preselected for a new session
pub const DEFAULT_SELECTION_SIZE: usize = 3;

/// Per-session graph settings
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub exclude_guids: HashSet<String>,
    pub node_identity: NodeIdentity,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            exclude_guids: config.exclude_guids(),
            node_identity: config.mdmviz.node_identity,
        }
    }

    pub fn with_node_identity(mut self, identity: NodeIdentity) -> Self {
        self.node_identity = identity;
        self
    }
}

/// A selectable entity: display name and the guid it maps to
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EntityChoice {
    pub name: String,
    pub guid: Option<String>,
}

/// Result of one visualize action
#[derive(Debug, Clone)]
pub enum Visualization {
    /// One entity chosen: its field graph plus its relationships
    Single {
        root_name: String,
        entity_graph: DotGraph,
        relationship_graph: DotGraph,
    },
    /// Several entities chosen: the relationships among them
    Multi { relationship_graph: DotGraph },
}

impl Visualization {
    /// Titled graphs in display order
    pub fn graphs(&self) -> Vec<(String, &DotGraph)> {
        match self {
            Visualization::Single {
                root_name,
                entity_graph,
                relationship_graph,
            } => vec![
                (format!("Entity: {}", root_name), entity_graph),
                ("Relationships of this entity".to_string(), relationship_graph),
            ],
            Visualization::Multi { relationship_graph } => vec![(
                "Relationships between selected entities".to_string(),
                relationship_graph,
            )],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Visualization::Single { .. } => "single",
            Visualization::Multi { .. } => "multi",
        }
    }
}

/// Session context passed to every visualize operation
pub struct Session {
    environment: Option<String>,
    session_id: Option<String>,
    metadata: MetadataDocument,
    options: SessionOptions,
    eligible: Vec<BusinessEntity>,
    choices: Vec<EntityChoice>,
}

impl Session {
    /// Log in to `environment` and load its data model once.
    pub async fn login(
        client: &MdmClient,
        environment: &Environment,
        username: &str,
        password: &str,
        options: SessionOptions,
    ) -> Result<Self> {
        if username.is_empty() || password.is_empty() {
            return Err(MdmvizError::InvalidInput(
                "Please enter both username and password.".to_string(),
            ));
        }

        let session_id = client
            .login(username, password, &environment.login_url)
            .await?;
        let metadata = client
            .fetch_metadata(&session_id, &environment.metadata_url)
            .await?;

        let mut session = Self::from_metadata(metadata, options);
        session.environment = Some(environment.name.clone());
        session.session_id = Some(session_id);
        Ok(session)
    }

    /// Session over an already available document (no login)
    pub fn from_metadata(metadata: MetadataDocument, options: SessionOptions) -> Self {
        let eligible = metadata.eligible_entities(&options.exclude_guids);
        let choices = entity_choices(&eligible);
        log::debug!(
            "{} of {} entities eligible for visualization",
            eligible.len(),
            metadata.business_entities.len()
        );

        Self {
            environment: None,
            session_id: None,
            metadata,
            options,
            eligible,
            choices,
        }
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Session id issued at login, if this session logged in
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn metadata(&self) -> &MetadataDocument {
        &self.metadata
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Entities stored as "ent" and not excluded, document order
    pub fn eligible_entities(&self) -> &[BusinessEntity] {
        &self.eligible
    }

    /// Distinct display names offered for selection
    pub fn entity_choices(&self) -> &[EntityChoice] {
        &self.choices
    }

    /// The first few choices, preselected for a new session
    pub fn default_selection(&self) -> Vec<String> {
        self.choices
            .iter()
            .take(DEFAULT_SELECTION_SIZE)
            .map(|c| c.name.clone())
            .collect()
    }

    fn choice(&self, name: &str) -> Result<&EntityChoice> {
        self.choices
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| MdmvizError::EntityNotFound(name.to_string()))
    }

    /// Build the graphs for the selected display names.
    ///
    /// One name yields the entity's field graph and its relationships; more
    /// yield the relationships among them.
    pub fn visualize(&self, selected: &[String]) -> Result<Visualization> {
        match selected {
            [] => Err(MdmvizError::NoSelection),
            [name] => {
                let guid = self.choice(name)?.guid.clone();
                let entity = self
                    .eligible
                    .iter()
                    .find(|e| e.guid == guid)
                    .ok_or_else(|| {
                        MdmvizError::EntityNotFound(guid.clone().unwrap_or_else(|| name.clone()))
                    })?;

                let (entity_graph, root_name) = build_entity_graph(entity);
                let relationship_graph = build_entity_relationships_graph(
                    entity,
                    &self.eligible,
                    &self.metadata.relationships,
                    self.options.node_identity,
                );

                log::info!("Visualized entity {}", root_name);
                Ok(Visualization::Single {
                    root_name,
                    entity_graph,
                    relationship_graph,
                })
            }
            names => {
                for name in names {
                    self.choice(name)?;
                }

                let relationship_graph = build_relationships_graph(
                    names,
                    &self.eligible,
                    &self.metadata.relationships,
                    self.options.node_identity,
                );

                log::info!(
                    "Visualized {} entities, {} relationships",
                    names.len(),
                    relationship_graph.edge_count()
                );
                Ok(Visualization::Multi { relationship_graph })
            }
        }
    }
}

/// Display name → guid choices for `entities`.
///
/// Display is the name, else the guid, else `Unknown-{index}`. A repeated
/// display name keeps its first position and takes the later guid.
pub fn entity_choices(entities: &[BusinessEntity]) -> Vec<EntityChoice> {
    let mut choices: Vec<EntityChoice> = Vec::with_capacity(entities.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (index, entity) in entities.iter().enumerate() {
        let name = entity
            .name()
            .or_else(|| entity.guid.as_deref().filter(|g| !g.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("Unknown-{}", index));

        match positions.get(&name) {
            Some(&pos) => choices[pos].guid = entity.guid.clone(),
            None => {
                positions.insert(name.clone(), choices.len());
                choices.push(EntityChoice {
                    name,
                    guid: entity.guid.clone(),
                });
            }
        }
    }

    choices
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn document() -> MetadataDocument {
        serde_json::from_value(json!({
            "businessEntity": [
                {"guid": "c360.person", "name": "Person", "storage": "ent", "field": [
                    {"label": {"en": "Gender"}, "codeField": {}},
                    {"label": {"en": "Phones"}, "allowMany": true,
                     "field": [{"label": {"en": "Phone Type"}, "codeField": {}}]}
                ]},
                {"guid": "c360.org", "name": "Organization", "storage": "ent"},
                {"guid": "c360.address", "storage": "ent"},
                {"guid": "p360.classification", "name": "Classification", "storage": "ent"},
                {"guid": "c360.country", "name": "Country", "storage": "ref"}
            ],
            "relationship": [
                {"name": "employs", "storage": "graph",
                 "from": {"businessEntity": {"$ref": "c360.org"}},
                 "to": {"businessEntity": {"$ref": "c360.person"}}},
                {"name": "livesAt", "storage": "graph",
                 "from": {"businessEntity": {"$ref": "c360.person"}},
                 "to": {"businessEntity": {"$ref": "c360.address"}},
                 "options": {"direction": "BIDIRECTED"}},
                {"name": "classifiedAs", "storage": "graph",
                 "from": {"businessEntity": {"$ref": "c360.org"}},
                 "to": {"businessEntity": {"$ref": "p360.classification"}}}
            ]
        }))
        .unwrap()
    }

    fn options() -> SessionOptions {
        SessionOptions {
            exclude_guids: ["p360.classification".to_string()].into_iter().collect(),
            node_identity: NodeIdentity::DisplayName,
        }
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_eligible_entities_and_choices() {
        let session = Session::from_metadata(document(), options());
        let guids: Vec<&str> = session.eligible_entities().iter().map(|e| e.guid()).collect();
        assert_eq!(guids, vec!["c360.person", "c360.org", "c360.address"]);

        let choice_names: Vec<&str> = session.entity_choices().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(choice_names, vec!["Person", "Organization", "c360.address"]);
        assert_eq!(session.default_selection(), names(&["Person", "Organization", "c360.address"]));
        assert!(session.session_id().is_none());
    }

    #[test]
    fn test_choices_unknown_and_duplicates() {
        let entities: Vec<BusinessEntity> = serde_json::from_value(json!([
            {"guid": "a1", "name": "Party"},
            {"name": ""},
            {"guid": "a2", "name": "Party"}
        ]))
        .unwrap();
        let choices = entity_choices(&entities);
        assert_eq!(
            choices,
            vec![
                EntityChoice { name: "Party".into(), guid: Some("a2".into()) },
                EntityChoice { name: "Unknown-1".into(), guid: None },
            ]
        );
    }

    #[test]
    fn test_visualize_nothing_selected() {
        let session = Session::from_metadata(document(), options());
        assert!(matches!(session.visualize(&[]), Err(MdmvizError::NoSelection)));
    }

    #[test]
    fn test_visualize_unknown_name() {
        let session = Session::from_metadata(document(), options());
        assert!(matches!(
            session.visualize(&names(&["Classification"])),
            Err(MdmvizError::EntityNotFound(_))
        ));
        assert!(matches!(
            session.visualize(&names(&["Person", "Country"])),
            Err(MdmvizError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_visualize_single_entity() {
        let session = Session::from_metadata(document(), options());
        let viz = session.visualize(&names(&["Person"])).unwrap();
        assert_eq!(viz.kind(), "single");

        let Visualization::Single { root_name, entity_graph, relationship_graph } = &viz else {
            panic!("expected single visualization");
        };
        assert_eq!(root_name, "Person");
        assert_eq!(
            entity_graph.node_ids(),
            vec!["Person", "Gender", "Phones", "Phones::Phone Type"]
        );
        assert_eq!(relationship_graph.node_ids(), vec!["Person", "Organization", "c360.address"]);
        assert_eq!(relationship_graph.edge_count(), 2);

        let titles: Vec<String> = viz.graphs().into_iter().map(|(t, _)| t).collect();
        assert_eq!(titles, vec!["Entity: Person", "Relationships of this entity"]);
    }

    #[test]
    fn test_visualize_entity_without_guid() {
        let metadata: MetadataDocument = serde_json::from_value(json!({
            "businessEntity": [{"name": "Draft", "storage": "ent",
                                "field": [{"label": {"en": "Status"}, "codeField": {}}]}]
        }))
        .unwrap();
        let session = Session::from_metadata(metadata, options());
        let viz = session.visualize(&names(&["Draft"])).unwrap();
        let Visualization::Single { root_name, relationship_graph, .. } = &viz else {
            panic!("expected single visualization");
        };
        assert_eq!(root_name, "Draft");
        assert_eq!(relationship_graph.node_ids(), vec!["Draft"]);
    }

    #[test]
    fn test_visualize_multi_drops_excluded_endpoints() {
        let session = Session::from_metadata(document(), options());
        let viz = session.visualize(&names(&["Organization", "Person"])).unwrap();
        let Visualization::Multi { relationship_graph } = &viz else {
            panic!("expected multi visualization");
        };
        assert_eq!(relationship_graph.node_ids(), vec!["Organization", "Person"]);
        let edges: Vec<(&str, &str)> = relationship_graph
            .edges()
            .map(|e| (e.from.as_str(), e.to.as_str()))
            .collect();
        assert_eq!(edges, vec![("Organization", "Person")]);
        assert_eq!(viz.graphs()[0].0, "Relationships between selected entities");
    }

    #[test]
    fn test_guid_identity_option() {
        let session = Session::from_metadata(
            document(),
            options().with_node_identity(NodeIdentity::Guid),
        );
        let viz = session.visualize(&names(&["Organization", "Person"])).unwrap();
        let Visualization::Multi { relationship_graph } = &viz else {
            panic!("expected multi visualization");
        };
        assert_eq!(relationship_graph.node_ids(), vec!["c360.org", "c360.person"]);
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let client = MdmClient::new(Duration::from_secs(1)).unwrap();
        let env = Environment {
            name: "Local".to_string(),
            login_url: "http://127.0.0.1:1/login".to_string(),
            metadata_url: "http://127.0.0.1:1/datamodel".to_string(),
        };
        let result = Session::login(&client, &env, "", "pw", options()).await;
        assert!(matches!(result, Err(MdmvizError::InvalidInput(_))));
    }
}
