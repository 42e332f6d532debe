use config::{Config, File};
use serde::{Deserialize, Serialize};

pub mod validator;

use crate::cli::Cli;
use crate::domain::auth::AuthConfig;
use crate::engine::DEFAULT_TABLE_PREFIX;
use crate::persistence::PersistenceConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub database: PersistenceConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub forms: FormsSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Settings for generated tables
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormsSettings {
    /// Prepended to a form's name to form its table name
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
}

fn default_table_prefix() -> String {
    DEFAULT_TABLE_PREFIX.to_string()
}

impl Default for FormsSettings {
    fn default() -> Self {
        Self {
            table_prefix: default_table_prefix(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        use clap::Parser;
        let cli = Cli::parse();
        Self::new_with_cli(&cli)
    }

    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(cli.config.clone()).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);

        Self::validated(settings)
    }

    /// Load from an explicit file without CLI overrides
    pub fn from_file(path: &std::path::Path) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(path).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .build()?;

        Self::validated(s.try_deserialize()?)
    }

    fn validated(settings: Settings) -> Result<Self, anyhow::Error> {
        validator::ConfigValidator::validate(&settings).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })?;

        Ok(settings)
    }

    /// Apply CLI argument overrides to settings
    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(url) = &cli.database_url {
            self.database.url = url.clone();
        }
        if let Some(max) = cli.max_connections {
            self.database.max_connections = max;
        }
        if let Some(tenant) = &cli.default_tenant {
            self.auth.default_tenant = Some(tenant.clone());
        }
    }
}
