use clap::Parser;
use std::path::PathBuf;

/// Dynaform - declarative forms backed by generated relational tables
#[derive(Parser, Debug, Clone)]
#[command(name = "dynaform", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "DYNAFORM_CONFIG", default_value = "dynaform.toml")]
    pub config: PathBuf,

    /// Server host address
    #[arg(long, env = "DYNAFORM_HOST")]
    pub host: Option<String>,

    /// Server port
    #[arg(long, env = "DYNAFORM_PORT")]
    pub port: Option<u16>,

    /// Database URL (sqlite://, postgres://, mysql://)
    #[arg(long, env = "DYNAFORM_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Maximum pooled database connections
    #[arg(long, env = "DYNAFORM_MAX_CONNECTIONS")]
    pub max_connections: Option<u32>,

    /// Tenant id used when authentication is disabled
    #[arg(long, env = "DYNAFORM_DEFAULT_TENANT")]
    pub default_tenant: Option<String>,
}
