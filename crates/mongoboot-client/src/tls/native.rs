use mongoboot_core::{BootstrapError, BootstrapResult};
use native_tls::{Certificate, Identity, Protocol};

use super::store::{KeyStore, TrustStore};

/// Build a connector on the platform TLS library (OpenSSL on Linux).
pub(super) fn connector(
    trust_store: &TrustStore,
    key_store: &KeyStore,
    allow_invalid_hostname: bool,
) -> BootstrapResult<native_tls::TlsConnector> {
    let identity = Identity::from_pkcs8(
        key_store.chain_pem().as_bytes(),
        key_store.key_pem().as_bytes(),
    )
    .map_err(|e| {
        BootstrapError::certificate(key_store.path(), format!("native TLS rejected key store: {e}"))
    })?;

    let mut builder = native_tls::TlsConnector::builder();
    builder
        .identity(identity)
        .disable_built_in_roots(true)
        .min_protocol_version(Some(Protocol::Tlsv12))
        .danger_accept_invalid_hostnames(allow_invalid_hostname);

    for der in trust_store.certificates() {
        let certificate = Certificate::from_der(der.as_ref()).map_err(|e| {
            BootstrapError::certificate(
                trust_store.path(),
                format!("native TLS rejected trust certificate: {e}"),
            )
        })?;
        builder.add_root_certificate(certificate);
    }

    builder.build().map_err(|e| {
        BootstrapError::certificate(key_store.path(), format!("cannot build native TLS context: {e}"))
    })
}
