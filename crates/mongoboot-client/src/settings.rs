use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use mongoboot_core::{
    BootstrapError, BootstrapResult, ClusterConnectionMode, ClusterType, MongoConfig,
};
use mongodb::options::ConnectionString;

use crate::static_tls::{self, StaticTlsProperties};
use crate::tls::{build_tls_context, TlsContext, TlsContextRequest};

/// Compressors offered to the server, most preferred first.
pub const COMPRESSORS: [Compressor; 3] = [Compressor::Zstd, Compressor::Snappy, Compressor::Zlib];

/// How the client is constructed. Selected once from the config flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructionPath {
    /// TLS material resolved from the process-wide properties.
    StaticTls,
    /// TLS material carried by a per-client context.
    DynamicTls,
    /// Username/password, no TLS.
    Default,
}

impl ConstructionPath {
    /// First match wins: static TLS, then dynamic TLS, then default.
    pub fn select(config: &MongoConfig) -> Self {
        if config.enable_ssl() && config.use_static_ssl_mode() {
            Self::StaticTls
        } else if config.enable_ssl() {
            Self::DynamicTls
        } else {
            Self::Default
        }
    }
}

impl fmt::Display for ConstructionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticTls => write!(f, "static-tls"),
            Self::DynamicTls => write!(f, "dynamic-tls"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    ScramSha256 {
        username: String,
        source: String,
        password: String,
    },
    /// Certificate-based. Without a username the server derives it from the
    /// client certificate subject.
    X509 { username: Option<String> },
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScramSha256 {
                username, source, ..
            } => f
                .debug_struct("ScramSha256")
                .field("username", username)
                .field("source", source)
                .field("password", &"<redacted>")
                .finish(),
            Self::X509 { username } => f.debug_struct("X509").field("username", username).finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_wait_time: Duration,
    pub max_connection_idle_time: Duration,
    pub max_connecting: u32,
    pub max_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSettings {
    pub mode: ClusterConnectionMode,
    pub required_cluster_type: ClusterType,
    pub required_replica_set_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compressor {
    Zstd,
    Snappy,
    Zlib,
}

impl fmt::Display for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zstd => write!(f, "zstd"),
            Self::Snappy => write!(f, "snappy"),
            Self::Zlib => write!(f, "zlib"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TlsSettings {
    Disabled,
    Static(StaticTlsProperties),
    Dynamic(Arc<TlsContext>),
}

/// Everything the driver needs to create a client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub url: String,
    pub path: ConstructionPath,
    pub credential: Credential,
    pub socket: SocketSettings,
    pub pool: PoolSettings,
    /// Only set on the TLS paths; the default path relies on the url.
    pub cluster: Option<ClusterSettings>,
    pub compressors: Vec<Compressor>,
    pub tls: TlsSettings,
}

impl ClientSettings {
    pub fn tls_context(&self) -> Option<&TlsContext> {
        match &self.tls {
            TlsSettings::Dynamic(context) => Some(context),
            _ => None,
        }
    }
}

/// Turn a config into client settings.
///
/// The static TLS path installs the process-wide TLS properties as a side
/// effect, see [`static_tls`]. The dynamic path reads and parses both stores
/// on every call.
pub fn build_client_settings(config: &MongoConfig) -> BootstrapResult<ClientSettings> {
    config.validate()?;
    ConnectionString::parse(config.url())
        .map_err(|e| BootstrapError::Configuration(format!("Invalid url: {e}")))?;

    let path = ConstructionPath::select(config);
    let (credential, cluster, tls) = match path {
        ConstructionPath::StaticTls => {
            let cluster = cluster_settings(config)?;
            let properties = StaticTlsProperties::from_config(config)?;
            static_tls::install(&properties);
            (
                x509_credential(config),
                Some(cluster),
                TlsSettings::Static(properties),
            )
        }
        ConstructionPath::DynamicTls => {
            let cluster = cluster_settings(config)?;
            let context = build_tls_context(&TlsContextRequest::from_config(config)?)?;
            (
                x509_credential(config),
                Some(cluster),
                TlsSettings::Dynamic(Arc::new(context)),
            )
        }
        ConstructionPath::Default => (
            Credential::ScramSha256 {
                username: config.auth_user_name().to_string(),
                source: config.auth_database().to_string(),
                password: config.auth_password().to_string(),
            },
            None,
            TlsSettings::Disabled,
        ),
    };

    tracing::debug!(%path, "Built MongoDB client settings");

    Ok(ClientSettings {
        url: config.url().to_string(),
        path,
        credential,
        socket: SocketSettings {
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
        },
        pool: PoolSettings {
            max_wait_time: config.max_wait_time(),
            max_connection_idle_time: config.max_connect_idle_time(),
            max_connecting: config.max_concurrent_connecting(),
            max_size: config.max_pool_size(),
        },
        cluster,
        compressors: COMPRESSORS.to_vec(),
        tls,
    })
}

fn x509_credential(config: &MongoConfig) -> Credential {
    let username = Some(config.auth_user_name())
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    Credential::X509 { username }
}

/// Cluster settings for the TLS paths. A replica-set cluster type needs a
/// replica-set name here; the default path leaves topology to the url.
fn cluster_settings(config: &MongoConfig) -> BootstrapResult<ClusterSettings> {
    let required_replica_set_name = config.replica_set_name().map(str::to_string);
    if config.cluster_type() == ClusterType::ReplicaSet && required_replica_set_name.is_none() {
        return Err(BootstrapError::Configuration(
            "repl-set-name is required when cluster-type is replica-set".to_string(),
        ));
    }
    Ok(ClusterSettings {
        mode: config.cluster_connection_mode(),
        required_cluster_type: config.cluster_type(),
        required_replica_set_name,
    })
}
