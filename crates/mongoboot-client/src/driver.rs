//! Hand-off from [`ClientSettings`] to the MongoDB driver.

use std::path::Path;
use std::time::Duration;

use mongoboot_core::{BootstrapError, BootstrapResult, ClusterConnectionMode};
use mongodb::bson::doc;
use mongodb::options::{self, AuthMechanism, ClientOptions, Tls, TlsOptions};
use mongodb::Client;

use crate::settings::{ClientSettings, Compressor, Credential, TlsSettings};
use crate::static_tls;
use crate::tls::store;

pub async fn client_options(settings: &ClientSettings) -> BootstrapResult<ClientOptions> {
    let mut options = ClientOptions::parse(settings.url.as_str())
        .await
        .map_err(|e| BootstrapError::Configuration(format!("Invalid url: {e}")))?;

    options.connect_timeout = Some(settings.socket.connect_timeout);
    options.max_pool_size = Some(settings.pool.max_size);
    options.max_connecting = Some(settings.pool.max_connecting);
    options.max_idle_time = unlimited_if_zero(settings.pool.max_connection_idle_time);
    options.compressors = Some(
        settings
            .compressors
            .iter()
            .copied()
            .map(driver_compressor)
            .collect(),
    );

    if let Some(cluster) = &settings.cluster {
        options.direct_connection = Some(cluster.mode == ClusterConnectionMode::Single);
        if let Some(name) = &cluster.required_replica_set_name {
            options.repl_set_name = Some(name.clone());
        }
    }

    options.credential = driver_credential(&settings.credential);
    if let Some(tls) = driver_tls(&settings.tls)? {
        options.tls = Some(tls);
    }

    for note in unenforced_settings(settings) {
        tracing::debug!("{note}");
    }

    Ok(options)
}

/// Settings carried on [`ClientSettings`] that the driver transport does not
/// enforce. The driver has no socket read timeout or wait-queue timeout, and
/// it verifies host names regardless of the prebuilt TLS context.
pub fn unenforced_settings(settings: &ClientSettings) -> Vec<String> {
    let mut notes = vec![
        format!(
            "read-timeout {:?} is not enforced by the driver",
            settings.socket.read_timeout
        ),
        format!(
            "max-wait-time {:?} is not enforced by the driver",
            settings.pool.max_wait_time
        ),
    ];
    if settings
        .tls_context()
        .is_some_and(|context| context.allow_invalid_hostname())
    {
        notes.push(
            "invalid-host-name-allowed applies to the prebuilt TLS context only; \
             the driver transport still verifies host names"
                .to_string(),
        );
    }
    notes
}

/// Create the client. The driver connects lazily, so an unreachable
/// deployment surfaces on first use or through [`ping`].
pub async fn connect(settings: &ClientSettings) -> BootstrapResult<Client> {
    let options = client_options(settings).await?;
    Client::with_options(options).map_err(|e| BootstrapError::Driver(e.into()))
}

pub async fn ping(client: &Client) -> BootstrapResult<()> {
    client
        .database("admin")
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| BootstrapError::Driver(anyhow::anyhow!("MongoDB ping failed: {e}")))?;
    Ok(())
}

fn unlimited_if_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

fn driver_compressor(compressor: Compressor) -> options::Compressor {
    match compressor {
        Compressor::Zstd => options::Compressor::Zstd { level: None },
        Compressor::Snappy => options::Compressor::Snappy,
        Compressor::Zlib => options::Compressor::Zlib { level: None },
    }
}

fn driver_credential(credential: &Credential) -> Option<options::Credential> {
    let mut driver = options::Credential::default();
    match credential {
        Credential::ScramSha256 {
            username,
            source,
            password,
        } => {
            if username.is_empty() {
                tracing::debug!("No auth-user-name configured, connecting without credentials");
                return None;
            }
            driver.mechanism = Some(AuthMechanism::ScramSha256);
            driver.username = Some(username.clone());
            driver.source = Some(source.clone());
            driver.password = Some(password.clone());
        }
        Credential::X509 { username } => {
            driver.mechanism = Some(AuthMechanism::MongoDbX509);
            driver.username = username.clone();
        }
    }
    Some(driver)
}

fn driver_tls(tls: &TlsSettings) -> BootstrapResult<Option<Tls>> {
    match tls {
        TlsSettings::Disabled => Ok(None),
        TlsSettings::Static(_) => {
            // Resolved from the process-wide table, not from the settings.
            let properties = static_tls::current().ok_or_else(|| {
                BootstrapError::Configuration(
                    "static TLS mode selected but no TLS properties are installed".to_string(),
                )
            })?;
            let encrypted = store::key_is_encrypted(properties.key_store())?;
            Ok(Some(tls_options(
                properties.trust_store(),
                properties.key_store(),
                properties.key_store_password(),
                encrypted,
            )))
        }
        TlsSettings::Dynamic(context) => {
            if context.allow_invalid_hostname() {
                tracing::warn!(
                    "invalid-host-name-allowed is not applied to the driver transport"
                );
            }
            let material = context.material();
            Ok(Some(tls_options(
                material.trust_store(),
                material.key_store(),
                material.password(),
                material.key_encrypted(),
            )))
        }
    }
}

fn tls_options(trust_store: &Path, key_store: &Path, password: &str, encrypted: bool) -> Tls {
    let mut options = TlsOptions::builder()
        .ca_file_path(trust_store.to_path_buf())
        .cert_key_file_path(key_store.to_path_buf())
        .build();
    if encrypted {
        options.tls_certificate_key_file_password = Some(password.as_bytes().to_vec());
    }
    Tls::Enabled(options)
}
