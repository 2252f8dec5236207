use clap::Args;

use mongoboot_client::driver::unenforced_settings;
use mongoboot_client::settings::{build_client_settings, Credential, TlsSettings};

use super::ConfigArgs;

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: ConfigArgs,
}

pub async fn execute(args: ValidateArgs) -> anyhow::Result<()> {
    println!("Validating {}...", args.source.config.display());

    let config = match args.source.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("  Config: INVALID - {e}");
            std::process::exit(1);
        }
    };
    println!("  YAML parsing: OK");

    let settings = match build_client_settings(&config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("  Settings: INVALID - {e}");
            std::process::exit(1);
        }
    };

    println!("  Construction path: {}", settings.path);
    match &settings.credential {
        Credential::ScramSha256 { username, source, .. } => {
            println!("  Credential: SCRAM-SHA-256 user '{username}' on '{source}'")
        }
        Credential::X509 { username } => println!(
            "  Credential: X.509 {}",
            username.as_deref().unwrap_or("(subject from certificate)")
        ),
    }
    match &settings.tls {
        TlsSettings::Disabled => println!("  TLS: disabled"),
        TlsSettings::Static(properties) => println!(
            "  TLS: static, trust store {}, key store {}",
            properties.trust_store().display(),
            properties.key_store().display()
        ),
        TlsSettings::Dynamic(context) => println!(
            "  TLS: dynamic ({} transport), trust store {}, key store {}",
            context.transport(),
            context.material().trust_store().display(),
            context.material().key_store().display()
        ),
    }
    if let Some(cluster) = &settings.cluster {
        println!(
            "  Cluster: {} / {}{}",
            cluster.required_cluster_type,
            cluster.mode,
            cluster
                .required_replica_set_name
                .as_deref()
                .map(|name| format!(" (replica set '{name}')"))
                .unwrap_or_default()
        );
    }
    println!(
        "  Timeouts: connect {:?}, read {:?}",
        settings.socket.connect_timeout, settings.socket.read_timeout
    );
    println!(
        "  Pool: max size {}, max connecting {}, max wait {:?}, max idle {:?}",
        settings.pool.max_size,
        settings.pool.max_connecting,
        settings.pool.max_wait_time,
        settings.pool.max_connection_idle_time
    );
    let compressors: Vec<String> = settings.compressors.iter().map(ToString::to_string).collect();
    println!("  Compressors: {}", compressors.join(", "));
    for note in unenforced_settings(&settings) {
        println!("  Note: {note}");
    }

    println!();
    println!("Validation PASSED");
    Ok(())
}
