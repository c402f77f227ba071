use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mdmviz::client::MdmClient;
use mdmviz::graph::NodeIdentity;
use mdmviz::server::HttpServer;
use mdmviz::{Config, MetadataDocument, Session, SessionOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "mdmviz")]
#[command(version, about = "Render MDM business entities and relationships as Graphviz DOT")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the entities that can be visualized
    Entities(SourceArgs),
    /// Print or write the DOT graphs for a selection of entities
    Render {
        #[command(flatten)]
        source: SourceArgs,

        /// Write one .dot file per graph into this directory instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Key relationship-graph nodes by guid instead of display name
        #[arg(long)]
        guid_ids: bool,

        /// Entity display names; defaults to the first three entities
        names: Vec<String>,
    },
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides http_server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// Where the metadata document comes from
#[derive(Args, Debug)]
struct SourceArgs {
    /// Read a saved metadata document instead of logging in
    #[arg(short, long)]
    metadata: Option<PathBuf>,

    /// Environment to log in to (defaults to the first configured one)
    #[arg(short, long)]
    env: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger first so configuration loading is visible
    mdmviz::logging::init();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Load configuration, then switch to its log level
    let config = Config::load()?;
    mdmviz::logging::apply_config(&config);

    match cli.command {
        Command::Entities(source) => {
            // One line per selectable entity: display name, then guid
            let session = open_session(&config, &source, SessionOptions::from_config(&config)).await?;
            for choice in session.entity_choices() {
                println!("{}\t{}", choice.name, choice.guid.as_deref().unwrap_or(""));
            }
        }
        Command::Render { source, out, guid_ids, names } => {
            // Graph settings from config, with CLI overrides
            let mut options = SessionOptions::from_config(&config);
            if guid_ids {
                options = options.with_node_identity(NodeIdentity::Guid);
            }
            let session = open_session(&config, &source, options).await?;

            // No names given: same preselection a new session starts with
            let selected = if names.is_empty() {
                session.default_selection()
            } else {
                names
            };
            render(&session, &selected, out.as_deref())?;
        }
        Command::Serve { port } => {
            // HTTP server mode
            let port = port.unwrap_or(config.http_server.port);
            let server = HttpServer::new(config)?;
            server.run(port).await?;
        }
    }

    Ok(())
}

/// Open a session from a saved document, or by logging in with env credentials
async fn open_session(config: &Config, source: &SourceArgs, options: SessionOptions) -> Result<Session> {
    if let Some(path) = &source.metadata {
        log::info!("Reading metadata from {}", path.display());
        let metadata = MetadataDocument::from_path(path)
            .with_context(|| format!("Failed to load metadata document {}", path.display()))?;
        return Ok(Session::from_metadata(metadata, options));
    }

    // Credentials come from the environment variables named in config
    let environment = config.resolve_environment(source.env.as_deref())?;
    let username = std::env::var(&config.credentials.username_env)
        .with_context(|| format!("Environment variable {} not set", config.credentials.username_env))?;
    let password = std::env::var(&config.credentials.password_env)
        .with_context(|| format!("Environment variable {} not set", config.credentials.password_env))?;

    let client = MdmClient::new(Duration::from_secs(config.mdmviz.request_timeout_secs))?;
    let session = Session::login(&client, environment, &username, &password, options).await?;
    Ok(session)
}

fn render(session: &Session, selected: &[String], out: Option<&Path>) -> Result<()> {
    let visualization = session.visualize(selected)?;

    match out {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            for (title, graph) in visualization.graphs() {
                let path = dir.join(format!("{}.dot", graph.name()));
                std::fs::write(&path, graph.to_dot())
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                log::info!("{} -> {}", title, path.display());
            }
        }
        None => {
            // Titles as DOT comments keep stdout valid input for `dot`
            for (title, graph) in visualization.graphs() {
                println!("// {}", title);
                println!("{}", graph.to_dot());
            }
        }
    }

    Ok(())
}
