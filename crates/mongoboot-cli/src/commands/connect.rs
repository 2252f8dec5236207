use clap::Args;

use mongoboot_client::driver;
use mongoboot_client::registry::{ClientRegistry, ClientRole};

use super::ConfigArgs;

#[derive(Args)]
pub struct ConnectArgs {
    #[command(flatten)]
    pub source: ConfigArgs,
    /// Override the connection string from the config file
    #[arg(long, env = "MONGODB_URL")]
    pub url: Option<String>,
    /// Registry role to register the client under
    #[arg(long, default_value = ClientRole::DEFAULT)]
    pub role: String,
}

pub async fn execute(args: ConnectArgs) -> anyhow::Result<()> {
    let mut config = args.source.load()?;
    if let Some(url) = args.url {
        config = config.with_url(url);
    }

    let role = ClientRole::new(args.role);
    let client = ClientRegistry::global().bootstrap(role.clone(), &config).await?;
    tracing::info!(%role, "Client registered");

    driver::ping(&client).await?;
    println!("Connected: ping OK ({role})");
    Ok(())
}
