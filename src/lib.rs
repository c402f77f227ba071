pub mod client;
pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod metadata;
pub mod server;
pub mod session;

pub use config::Config;
pub use error::{MdmvizError, Result};
pub use graph::{build_entity_graph, build_relationships_graph, build_single_entity_relationships_graph, DotGraph};
pub use metadata::MetadataDocument;
pub use session::{Session, SessionOptions, Visualization};
