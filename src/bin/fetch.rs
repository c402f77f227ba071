use anyhow::{Context, Result};
use clap::Parser;
use mdmviz::client::MdmClient;
use mdmviz::Config;
use serde_json::Value;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "fetch")]
#[command(about = "Log in and save the tenant data model as JSON for offline rendering")]
struct Args {
    /// Environment to log in to (defaults to the first configured one)
    #[arg(short, long)]
    env: Option<String>,

    /// Output file
    #[arg(short, long, default_value = "datamodel.json")]
    out: PathBuf,
}

/// Length of a top-level array in the saved document, 0 when absent
fn count(document: &Value, key: &str) -> usize {
    document[key].as_array().map_or(0, Vec::len)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    mdmviz::logging::init();

    let args = Args::parse();

    // Load configuration
    let config = Config::load()?;
    mdmviz::logging::apply_config(&config);

    let environment = config.resolve_environment(args.env.as_deref())?;
    log::info!("Environment: {}", environment.name);

    let username = std::env::var(&config.credentials.username_env)
        .with_context(|| format!("Environment variable {} not set", config.credentials.username_env))?;
    let password = std::env::var(&config.credentials.password_env)
        .with_context(|| format!("Environment variable {} not set", config.credentials.password_env))?;

    let start = Instant::now();
    let client = MdmClient::new(Duration::from_secs(config.mdmviz.request_timeout_secs))?;
    let session_id = client
        .login(&username, &password, &environment.login_url)
        .await?;

    // Save the document exactly as served, including keys mdmviz does not model
    let document = client
        .fetch_metadata_value(&session_id, &environment.metadata_url)
        .await?;

    let json = serde_json::to_string_pretty(&document)?;
    std::fs::write(&args.out, json)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;

    // Report final statistics
    log::info!("=== Fetch Complete ===");
    log::info!("Entities: {}", count(&document, "businessEntity"));
    log::info!("Relationships: {}", count(&document, "relationship"));
    log::info!("Saved to: {}", args.out.display());
    log::info!("Time: {:?}", start.elapsed());

    Ok(())
}
