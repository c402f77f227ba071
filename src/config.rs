use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::graph::NodeIdentity;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mdmviz: MdmvizConfig,
    #[serde(default = "default_environments")]
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// General settings
#[derive(Debug, Clone, Deserialize)]
pub struct MdmvizConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Entity guids never offered for visualization even when stored as "ent".
    #[serde(default = "default_exclude_guids")]
    pub exclude_guids: Vec<String>,
    /// How relationship-graph nodes are keyed.
    #[serde(default)]
    pub node_identity: NodeIdentity,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for MdmvizConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            exclude_guids: default_exclude_guids(),
            node_identity: NodeIdentity::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// A tenant environment: where to log in and where to read the data model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Environment {
    pub name: String,
    pub login_url: String,
    pub metadata_url: String,
}

/// Names of the environment variables holding login credentials (CLI only)
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_username_env")]
    pub username_env: String,
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            username_env: default_username_env(),
            password_env: default_password_env(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            port: default_http_port(),
            allowed_origins: Vec::new(),
            session_ttl_minutes: default_session_ttl_minutes(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_exclude_guids() -> Vec<String> {
    vec!["p360.classification".to_string()]
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_username_env() -> String {
    "MDM_USERNAME".to_string()
}

fn default_password_env() -> String {
    "MDM_PASSWORD".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_session_ttl_minutes() -> i64 {
    60
}

fn default_environments() -> Vec<Environment> {
    vec![
        Environment {
            name: "TechSales".to_string(),
            login_url: "https://dmp-us.informaticacloud.com/saas/public/core/v3/login".to_string(),
            metadata_url: "https://usw1-mdm.dmp-us.informaticacloud.com/metadata/api/v2/objects/tenantModel/datamodel".to_string(),
        },
        Environment {
            name: "Global Generic Demo".to_string(),
            login_url: "https://dm-us.informaticacloud.com/saas/public/core/v3/login".to_string(),
            metadata_url: "https://use6-mdm.dm-us.informaticacloud.com/metadata/api/v2/objects/tenantModel/datamodel".to_string(),
        },
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mdmviz: MdmvizConfig::default(),
            environments: default_environments(),
            credentials: CredentialsConfig::default(),
            http_server: HttpServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in MDMVIZ_CONFIG environment variable
    /// 2. ./config.toml in current directory
    ///
    /// Without MDMVIZ_CONFIG, a missing ./config.toml falls back to the built-in defaults.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        // so MDM_USERNAME / MDM_PASSWORD can live there
        let _ = dotenv::dotenv();

        // An explicit MDMVIZ_CONFIG must exist; ./config.toml may be absent
        let explicit = std::env::var("MDMVIZ_CONFIG").ok().map(PathBuf::from);
        let config_path = explicit.clone().unwrap_or_else(|| PathBuf::from("config.toml"));

        if explicit.is_none() && !config_path.exists() {
            log::debug!("No config.toml found, using built-in defaults");
            return Ok(Config::default());
        }

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        // Parse and validate configuration
        let config = Self::from_toml_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        log::debug!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Invalid TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.environments.is_empty() {
            anyhow::bail!("At least one [[environments]] entry is required");
        }

        let mut seen = HashSet::new();
        for env in &self.environments {
            if env.name.trim().is_empty() {
                anyhow::bail!("environments.name must not be empty");
            }
            if !seen.insert(env.name.as_str()) {
                anyhow::bail!("Duplicate environment name: {}", env.name);
            }
            url::Url::parse(&env.login_url)
                .with_context(|| format!("Invalid login_url for environment {}", env.name))?;
            url::Url::parse(&env.metadata_url)
                .with_context(|| format!("Invalid metadata_url for environment {}", env.name))?;
        }

        self.mdmviz
            .log_level
            .parse::<log::LevelFilter>()
            .with_context(|| format!("Invalid mdmviz.log_level: {}", self.mdmviz.log_level))?;

        if self.mdmviz.request_timeout_secs == 0 {
            anyhow::bail!("mdmviz.request_timeout_secs must be greater than 0");
        }

        if self.http_server.port == 0 {
            anyhow::bail!("http_server.port must be greater than 0");
        }

        if self.http_server.session_ttl_minutes <= 0 {
            anyhow::bail!("http_server.session_ttl_minutes must be greater than 0");
        }
        if chrono::Duration::try_minutes(self.http_server.session_ttl_minutes).is_none() {
            anyhow::bail!(
                "http_server.session_ttl_minutes is out of range: {}",
                self.http_server.session_ttl_minutes
            );
        }

        Ok(())
    }

    /// Look up an environment by exact name
    pub fn environment(&self, name: &str) -> Option<&Environment> {
        self.environments.iter().find(|e| e.name == name)
    }

    /// The environment used when none is named: the first one configured
    pub fn default_environment(&self) -> Option<&Environment> {
        self.environments.first()
    }

    /// Resolve an optional environment name, falling back to the default one
    pub fn resolve_environment(&self, name: Option<&str>) -> crate::Result<&Environment> {
        match name {
            Some(name) => self
                .environment(name)
                .ok_or_else(|| crate::MdmvizError::UnknownEnvironment(name.to_string())),
            None => self
                .default_environment()
                .ok_or_else(|| crate::MdmvizError::Config("no environments configured".to_string())),
        }
    }

    /// Exclusion set as owned strings
    pub fn exclude_guids(&self) -> HashSet<String> {
        self.mdmviz.exclude_guids.iter().cloned().collect()
    }
}
