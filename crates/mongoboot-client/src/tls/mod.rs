//! Per-client TLS context construction for the dynamic TLS path.

mod native;
mod standard;
pub mod store;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mongoboot_core::{BootstrapResult, MongoConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlsTransport {
    /// Platform TLS library through `native-tls`.
    Native,
    /// `rustls`, pinned to TLS 1.2.
    Standard,
}

impl TlsTransport {
    pub fn from_config(config: &MongoConfig) -> Self {
        if config.use_dynamic_native_transport() {
            Self::Native
        } else {
            Self::Standard
        }
    }
}

impl fmt::Display for TlsTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Standard => write!(f, "standard"),
        }
    }
}

/// Inputs for [`build_tls_context`].
#[derive(Clone)]
pub struct TlsContextRequest {
    pub certs_dir: PathBuf,
    pub trust_store_name: String,
    pub key_store_name: String,
    pub password: String,
    /// Start TLS immediately on connect instead of negotiating an upgrade.
    pub start_tls: bool,
    pub allow_invalid_hostname: bool,
    pub transport: TlsTransport,
}

impl TlsContextRequest {
    pub fn from_config(config: &MongoConfig) -> BootstrapResult<Self> {
        let certs = config.require_certs()?;
        Ok(Self {
            certs_dir: config.certs_dir(),
            trust_store_name: certs.trust_store_file_name().to_string(),
            key_store_name: certs.key_store_file_name().to_string(),
            password: certs.store_password().to_string(),
            start_tls: config.enable_ssl(),
            allow_invalid_hostname: config.allow_invalid_hostname(),
            transport: TlsTransport::from_config(config),
        })
    }
}

/// Where the context's key material came from.
#[derive(Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    trust_store: PathBuf,
    key_store: PathBuf,
    password: String,
    key_encrypted: bool,
}

impl TlsMaterial {
    pub fn trust_store(&self) -> &Path {
        &self.trust_store
    }

    pub fn key_store(&self) -> &Path {
        &self.key_store
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn key_encrypted(&self) -> bool {
        self.key_encrypted
    }
}

impl fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("trust_store", &self.trust_store)
            .field("key_store", &self.key_store)
            .field("password", &"<redacted>")
            .field("key_encrypted", &self.key_encrypted)
            .finish()
    }
}

#[derive(Clone)]
pub enum TlsConnector {
    Native(native_tls::TlsConnector),
    Standard(Arc<rustls::ClientConfig>),
}

/// A client-mode TLS context with mutual authentication.
#[derive(Clone)]
pub struct TlsContext {
    transport: TlsTransport,
    start_tls: bool,
    allow_invalid_hostname: bool,
    material: TlsMaterial,
    connector: TlsConnector,
}

impl TlsContext {
    pub fn transport(&self) -> TlsTransport {
        self.transport
    }

    pub fn start_tls(&self) -> bool {
        self.start_tls
    }

    pub fn allow_invalid_hostname(&self) -> bool {
        self.allow_invalid_hostname
    }

    pub fn material(&self) -> &TlsMaterial {
        &self.material
    }

    pub fn connector(&self) -> &TlsConnector {
        &self.connector
    }

    pub fn native_connector(&self) -> Option<&native_tls::TlsConnector> {
        match &self.connector {
            TlsConnector::Native(connector) => Some(connector),
            TlsConnector::Standard(_) => None,
        }
    }

    pub fn rustls_config(&self) -> Option<Arc<rustls::ClientConfig>> {
        match &self.connector {
            TlsConnector::Standard(config) => Some(Arc::clone(config)),
            TlsConnector::Native(_) => None,
        }
    }
}

/// Two contexts are equal when built from the same material with the same
/// options. The connector objects themselves are not compared.
impl PartialEq for TlsContext {
    fn eq(&self, other: &Self) -> bool {
        self.transport == other.transport
            && self.start_tls == other.start_tls
            && self.allow_invalid_hostname == other.allow_invalid_hostname
            && self.material == other.material
    }
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContext")
            .field("transport", &self.transport)
            .field("start_tls", &self.start_tls)
            .field("allow_invalid_hostname", &self.allow_invalid_hostname)
            .field("material", &self.material)
            .finish_non_exhaustive()
    }
}

/// Load both stores from disk and build the requested transport's context.
/// Runs on every call; nothing is cached.
pub fn build_tls_context(request: &TlsContextRequest) -> BootstrapResult<TlsContext> {
    let trust_path = store::store_path(&request.certs_dir, &request.trust_store_name);
    let key_path = store::store_path(&request.certs_dir, &request.key_store_name);

    let trust_store = store::load_trust_store(&trust_path)?;
    let key_store = store::load_key_store(&key_path, &request.password)?;

    let connector = match request.transport {
        TlsTransport::Native => TlsConnector::Native(native::connector(
            &trust_store,
            &key_store,
            request.allow_invalid_hostname,
        )?),
        TlsTransport::Standard => TlsConnector::Standard(standard::client_config(
            &trust_store,
            &key_store,
            request.allow_invalid_hostname,
        )?),
    };

    tracing::info!(
        transport = %request.transport,
        trust_store = %trust_path.display(),
        key_store = %key_path.display(),
        "Built TLS context"
    );

    Ok(TlsContext {
        transport: request.transport,
        start_tls: request.start_tls,
        allow_invalid_hostname: request.allow_invalid_hostname,
        material: TlsMaterial {
            trust_store: trust_path,
            key_store: key_path,
            password: request.password.clone(),
            key_encrypted: key_store.is_encrypted(),
        },
        connector,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn builds_standard_context() {
        let context = build_tls_context(&request(TlsTransport::Standard, "keystore.pem")).unwrap();
        assert_eq!(context.transport(), TlsTransport::Standard);
        assert!(context.start_tls());
        assert!(context.rustls_config().is_some());
        assert!(context.native_connector().is_none());
        assert_eq!(context.material().trust_store(), fixture("truststore.pem"));
        assert_eq!(context.material().key_store(), fixture("keystore.pem"));
        assert!(!context.material().key_encrypted());
    }

    #[test]
    fn builds_native_context() {
        let context =
            build_tls_context(&request(TlsTransport::Native, "keystore-encrypted.pem")).unwrap();
        assert_eq!(context.transport(), TlsTransport::Native);
        assert!(context.native_connector().is_some());
        assert!(context.rustls_config().is_none());
        assert!(context.material().key_encrypted());
    }

    #[test]
    fn lenient_hostname_still_builds() {
        let mut req = request(TlsTransport::Standard, "keystore-encrypted.pem");
        req.allow_invalid_hostname = true;
        let context = build_tls_context(&req).unwrap();
        assert!(context.allow_invalid_hostname());
    }

    #[test]
    fn missing_key_store_is_a_certificate_error() {
        let err = build_tls_context(&request(TlsTransport::Native, "missing.pem"))
            .err()
            .unwrap();
        assert!(err.is_certificate_load());
    }

    #[test]
    fn wrong_password_is_a_certificate_error() {
        let mut req = request(TlsTransport::Standard, "keystore-encrypted.pem");
        req.password = "wrong".to_string();
        let err = build_tls_context(&req).err().unwrap();
        assert!(err.is_certificate_load());
    }

    #[test]
    fn rebuilding_yields_an_equal_context() {
        let req = request(TlsTransport::Standard, "keystore.pem");
        let first = build_tls_context(&req).unwrap();
        let second = build_tls_context(&req).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn debug_output_redacts_password() {
        let context = build_tls_context(&request(TlsTransport::Standard, "keystore.pem")).unwrap();
        assert!(!format!("{context:?}").contains(STORE_PASSWORD));
    }
}
