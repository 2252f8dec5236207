use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BootstrapError, BootstrapResult};

pub const DEFAULT_URL: &str = "mongodb://localhost:27017/test";
pub const DEFAULT_AUTH_DATABASE: &str = "admin";
pub const DEFAULT_RESOURCE_ROOT: &str = "resources";

/// Directory below the resource root that holds the key and trust stores.
pub const CERTS_DIR: &str = "certs";

/// Top-level config file structure. Connection keys live under `mongodb:`.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub mongodb: MongoConfig,
}

/// Connection parameters, loaded once at startup.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MongoConfig {
    url: String,
    repl_set_name: Option<String>,
    cluster_type: ClusterType,
    cluster_connection_mode: ClusterConnectionMode,
    /// Seconds.
    connect_timeout: u64,
    /// Seconds.
    read_timeout: u64,
    /// Milliseconds.
    max_wait_time: u64,
    /// Milliseconds.
    max_connect_idle_time: u64,
    max_conn: u32,
    max_size: u32,
    enable_ssl: bool,
    #[serde(rename = "use-static-mode")]
    use_static_ssl_mode: bool,
    #[serde(rename = "use-dynamic-netty-mode")]
    use_dynamic_native_transport: bool,
    #[serde(rename = "invalid-host-name-allowed")]
    allow_invalid_hostname: bool,
    auth_user_name: String,
    #[serde(rename = "password")]
    auth_password: String,
    #[serde(rename = "database")]
    auth_database: String,
    certs: Option<CertsConfig>,
    resource_root: PathBuf,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            repl_set_name: None,
            cluster_type: ClusterType::default(),
            cluster_connection_mode: ClusterConnectionMode::default(),
            connect_timeout: 10,
            read_timeout: 15,
            max_wait_time: 3000,
            max_connect_idle_time: 2000,
            max_conn: default_max_conn(),
            max_size: 200,
            enable_ssl: false,
            use_static_ssl_mode: false,
            use_dynamic_native_transport: false,
            allow_invalid_hostname: false,
            auth_user_name: String::new(),
            auth_password: String::new(),
            auth_database: DEFAULT_AUTH_DATABASE.to_string(),
            certs: None,
            resource_root: PathBuf::from(DEFAULT_RESOURCE_ROOT),
        }
    }
}

fn default_max_conn() -> u32 {
    u32::try_from(num_cpus::get()).unwrap_or(u32::MAX).max(1)
}

impl MongoConfig {
    /// Load the `mongodb` section of a YAML file. A relative `resource-root`
    /// is resolved against the directory holding the file.
    pub fn from_file(path: &Path) -> BootstrapResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BootstrapError::Configuration(format!("Cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_yaml_str(&content)?;
        if config.resource_root.is_relative() {
            if let Some(dir) = path.parent() {
                config.resource_root = dir.join(&config.resource_root);
            }
        }
        tracing::debug!(
            path = %path.display(),
            resource_root = %config.resource_root.display(),
            "Loaded MongoDB configuration"
        );
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> BootstrapResult<Self> {
        let document: ConfigDocument = serde_yaml::from_str(content)
            .map_err(|e| BootstrapError::Configuration(format!("Invalid YAML: {e}")))?;
        Ok(document.mongodb)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_root = root.into();
        self
    }

    pub fn validate(&self) -> BootstrapResult<()> {
        if self.url.trim().is_empty() {
            return Err(BootstrapError::Configuration(
                "url cannot be empty".to_string(),
            ));
        }
        for (key, value) in [
            ("connect-timeout", self.connect_timeout),
            ("read-timeout", self.read_timeout),
            ("max-conn", u64::from(self.max_conn)),
            ("max-size", u64::from(self.max_size)),
        ] {
            if value == 0 {
                return Err(BootstrapError::Configuration(format!(
                    "{key} must be a positive integer"
                )));
            }
        }
        if self.enable_ssl {
            self.require_certs()?;
        }
        Ok(())
    }

    /// The certs block, checked to be fully populated.
    pub fn require_certs(&self) -> BootstrapResult<&CertsConfig> {
        let certs = self.certs.as_ref().ok_or_else(|| {
            BootstrapError::Configuration(
                "certs block is required when enable-ssl is true".to_string(),
            )
        })?;
        certs.validate()?;
        Ok(certs)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn replica_set_name(&self) -> Option<&str> {
        self.repl_set_name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn cluster_type(&self) -> ClusterType {
        self.cluster_type
    }

    pub fn cluster_connection_mode(&self) -> ClusterConnectionMode {
        self.cluster_connection_mode
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub fn max_wait_time(&self) -> Duration {
        Duration::from_millis(self.max_wait_time)
    }

    pub fn max_connect_idle_time(&self) -> Duration {
        Duration::from_millis(self.max_connect_idle_time)
    }

    pub fn max_concurrent_connecting(&self) -> u32 {
        self.max_conn
    }

    pub fn max_pool_size(&self) -> u32 {
        self.max_size
    }

    pub fn enable_ssl(&self) -> bool {
        self.enable_ssl
    }

    pub fn use_static_ssl_mode(&self) -> bool {
        self.use_static_ssl_mode
    }

    pub fn use_dynamic_native_transport(&self) -> bool {
        self.use_dynamic_native_transport
    }

    pub fn allow_invalid_hostname(&self) -> bool {
        self.allow_invalid_hostname
    }

    pub fn auth_user_name(&self) -> &str {
        &self.auth_user_name
    }

    pub fn auth_password(&self) -> &str {
        &self.auth_password
    }

    pub fn auth_database(&self) -> &str {
        &self.auth_database
    }

    pub fn certs(&self) -> Option<&CertsConfig> {
        self.certs.as_ref()
    }

    pub fn resource_root(&self) -> &Path {
        &self.resource_root
    }

    /// `<resource-root>/certs`
    pub fn certs_dir(&self) -> PathBuf {
        self.resource_root.join(CERTS_DIR)
    }
}

impl fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoConfig")
            .field("url", &self.url)
            .field("repl_set_name", &self.repl_set_name)
            .field("cluster_type", &self.cluster_type)
            .field("cluster_connection_mode", &self.cluster_connection_mode)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("max_wait_time", &self.max_wait_time)
            .field("max_connect_idle_time", &self.max_connect_idle_time)
            .field("max_conn", &self.max_conn)
            .field("max_size", &self.max_size)
            .field("enable_ssl", &self.enable_ssl)
            .field("use_static_ssl_mode", &self.use_static_ssl_mode)
            .field("use_dynamic_native_transport", &self.use_dynamic_native_transport)
            .field("allow_invalid_hostname", &self.allow_invalid_hostname)
            .field("auth_user_name", &self.auth_user_name)
            .field("auth_password", &"<redacted>")
            .field("auth_database", &self.auth_database)
            .field("certs", &self.certs)
            .field("resource_root", &self.resource_root)
            .finish()
    }
}

/// Client certificate stores, resolved below `<resource-root>/certs`.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CertsConfig {
    /// Shared by both stores.
    #[serde(rename = "password")]
    store_password: String,
    #[serde(rename = "trust-store-name")]
    trust_store_file_name: String,
    #[serde(rename = "key-store-name")]
    key_store_file_name: String,
}

impl CertsConfig {
    pub fn new(
        store_password: impl Into<String>,
        trust_store_file_name: impl Into<String>,
        key_store_file_name: impl Into<String>,
    ) -> Self {
        Self {
            store_password: store_password.into(),
            trust_store_file_name: trust_store_file_name.into(),
            key_store_file_name: key_store_file_name.into(),
        }
    }

    pub fn validate(&self) -> BootstrapResult<()> {
        for (key, value) in [
            ("certs.password", &self.store_password),
            ("certs.trust-store-name", &self.trust_store_file_name),
            ("certs.key-store-name", &self.key_store_file_name),
        ] {
            if value.is_empty() {
                return Err(BootstrapError::Configuration(format!(
                    "{key} is required when enable-ssl is true"
                )));
            }
        }
        Ok(())
    }

    pub fn store_password(&self) -> &str {
        &self.store_password
    }

    pub fn trust_store_file_name(&self) -> &str {
        &self.trust_store_file_name
    }

    pub fn key_store_file_name(&self) -> &str {
        &self.key_store_file_name
    }
}

impl fmt::Debug for CertsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertsConfig")
            .field("store_password", &"<redacted>")
            .field("trust_store_file_name", &self.trust_store_file_name)
            .field("key_store_file_name", &self.key_store_file_name)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterType {
    #[default]
    #[serde(alias = "STANDALONE")]
    Standalone,
    #[serde(alias = "REPLICA_SET", alias = "replica_set")]
    ReplicaSet,
    #[serde(alias = "SHARDED")]
    Sharded,
    #[serde(alias = "UNKNOWN")]
    Unknown,
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::ReplicaSet => write!(f, "replica-set"),
            Self::Sharded => write!(f, "sharded"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Whether the driver talks to one node directly or discovers a topology.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterConnectionMode {
    #[default]
    #[serde(alias = "SINGLE")]
    Single,
    #[serde(alias = "MULTIPLE")]
    Multiple,
}

impl fmt::Display for ClusterConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Multiple => write!(f, "multiple"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"
mongodb:
  url: mongodb://db1:27017,db2:27017/orders
  repl-set-name: rs0
  cluster-type: replica-set
  cluster-connection-mode: multiple
  connect-timeout: 5
  read-timeout: 20
  max-wait-time: 1500
  max-connect-idle-time: 0
  max-conn: 4
  max-size: 50
  enable-ssl: true
  use-static-mode: false
  use-dynamic-netty-mode: true
  invalid-host-name-allowed: true
  auth-user-name: svc
  password: s3cret
  database: orders
  resource-root: /etc/app
  certs:
    password: changeit
    trust-store-name: truststore.pem
    key-store-name: keystore.pem
"#;

    #[test]
    fn defaults_match_documented_values() {
        let config = MongoConfig::default();
        assert_eq!(config.url(), DEFAULT_URL);
        assert_eq!(config.replica_set_name(), None);
        assert_eq!(config.cluster_type(), ClusterType::Standalone);
        assert_eq!(config.cluster_connection_mode(), ClusterConnectionMode::Single);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.read_timeout(), Duration::from_secs(15));
        assert_eq!(config.max_wait_time(), Duration::from_millis(3000));
        assert_eq!(config.max_connect_idle_time(), Duration::from_millis(2000));
        assert_eq!(config.max_concurrent_connecting() as usize, num_cpus::get());
        assert_eq!(config.max_pool_size(), 200);
        assert!(!config.enable_ssl());
        assert!(!config.use_static_ssl_mode());
        assert!(!config.use_dynamic_native_transport());
        assert!(!config.allow_invalid_hostname());
        assert_eq!(config.auth_user_name(), "");
        assert_eq!(config.auth_password(), "");
        assert_eq!(config.auth_database(), "admin");
        assert!(config.certs().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_section_yields_defaults() {
        let config = MongoConfig::from_yaml_str("other: 1\n").unwrap();
        assert_eq!(config.url(), DEFAULT_URL);
        assert_eq!(config.max_pool_size(), 200);
    }

    #[test]
    fn parses_every_key() {
        let config = MongoConfig::from_yaml_str(FULL).unwrap();
        assert_eq!(config.url(), "mongodb://db1:27017,db2:27017/orders");
        assert_eq!(config.replica_set_name(), Some("rs0"));
        assert_eq!(config.cluster_type(), ClusterType::ReplicaSet);
        assert_eq!(config.cluster_connection_mode(), ClusterConnectionMode::Multiple);
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.read_timeout(), Duration::from_secs(20));
        assert_eq!(config.max_wait_time(), Duration::from_millis(1500));
        assert_eq!(config.max_connect_idle_time(), Duration::ZERO);
        assert_eq!(config.max_concurrent_connecting(), 4);
        assert_eq!(config.max_pool_size(), 50);
        assert!(config.enable_ssl());
        assert!(!config.use_static_ssl_mode());
        assert!(config.use_dynamic_native_transport());
        assert!(config.allow_invalid_hostname());
        assert_eq!(config.auth_user_name(), "svc");
        assert_eq!(config.auth_password(), "s3cret");
        assert_eq!(config.auth_database(), "orders");
        assert_eq!(config.certs_dir(), PathBuf::from("/etc/app/certs"));

        let certs = config.certs().unwrap();
        assert_eq!(certs.store_password(), "changeit");
        assert_eq!(certs.trust_store_file_name(), "truststore.pem");
        assert_eq!(certs.key_store_file_name(), "keystore.pem");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn accepts_constant_style_enum_names() {
        let config = MongoConfig::from_yaml_str(
            "mongodb:\n  cluster-type: SHARDED\n  cluster-connection-mode: MULTIPLE\n",
        )
        .unwrap();
        assert_eq!(config.cluster_type(), ClusterType::Sharded);
        assert_eq!(config.cluster_connection_mode(), ClusterConnectionMode::Multiple);
    }

    #[test]
    fn rejects_negative_durations() {
        let err = MongoConfig::from_yaml_str("mongodb:\n  max-wait-time: -1\n").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn ssl_without_certs_is_a_configuration_error() {
        let config = MongoConfig::from_yaml_str("mongodb:\n  enable-ssl: true\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("certs block"));
    }

    #[test]
    fn ssl_with_partial_certs_is_a_configuration_error() {
        let config = MongoConfig::from_yaml_str(
            "mongodb:\n  enable-ssl: true\n  certs:\n    password: x\n    trust-store-name: t.pem\n",
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("certs.key-store-name"));
    }

    #[test]
    fn certs_are_not_required_without_ssl() {
        let config = MongoConfig::from_yaml_str("mongodb:\n  certs:\n    password: x\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn replica_set_name_is_not_checked_by_validate() {
        let config =
            MongoConfig::from_yaml_str("mongodb:\n  cluster-type: replica-set\n").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.replica_set_name(), None);
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let config = MongoConfig::from_yaml_str("mongodb:\n  max-size: 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max-size"));
    }

    #[test]
    fn empty_url_is_rejected() {
        let config = MongoConfig::default().with_url("  ");
        assert!(config.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn from_file_resolves_relative_resource_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mongo.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "mongodb:\n  resource-root: res").unwrap();

        let config = MongoConfig::from_file(&path).unwrap();
        assert_eq!(config.resource_root(), dir.path().join("res"));
        assert_eq!(config.certs_dir(), dir.path().join("res").join(CERTS_DIR));
    }

    #[test]
    fn from_file_reports_unreadable_files() {
        let err = MongoConfig::from_file(Path::new("/nonexistent/mongo.yaml")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn debug_output_redacts_passwords() {
        let config = MongoConfig::from_yaml_str(FULL).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("changeit"));
        assert!(rendered.contains("<redacted>"));
    }
}
