use std::path::PathBuf;

use clap::{Args, Subcommand};

use mongoboot_core::MongoConfig;

pub mod connect;
pub mod validate;

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a config file and build the client settings without connecting
    Validate(validate::ValidateArgs),
    /// Create the shared client and ping the deployment
    Connect(connect::ConnectArgs),
}

/// Config source shared by every command.
#[derive(Args)]
pub struct ConfigArgs {
    /// Path to the YAML config file (keys under `mongodb:`)
    pub config: PathBuf,
    /// Override the resource root that holds `certs/`
    #[arg(long, env = "MONGODB_RESOURCE_ROOT")]
    pub resource_root: Option<PathBuf>,
}

impl ConfigArgs {
    pub fn load(&self) -> anyhow::Result<MongoConfig> {
        let mut config = MongoConfig::from_file(&self.config)?;
        if let Some(root) = &self.resource_root {
            config = config.with_resource_root(root);
        }
        Ok(config)
    }
}
