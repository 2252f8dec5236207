use std::sync::Arc;

use mongoboot_core::{BootstrapError, BootstrapResult};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{CertificateError, ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use super::store::{KeyStore, TrustStore};

/// Build a TLS 1.2 client config on the ring provider, whose randomness comes
/// from the operating system's secure generator.
pub(super) fn client_config(
    trust_store: &TrustStore,
    key_store: &KeyStore,
    allow_invalid_hostname: bool,
) -> BootstrapResult<Arc<ClientConfig>> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let mut roots = RootCertStore::empty();
    for der in trust_store.certificates() {
        roots.add(der.clone()).map_err(|e| {
            BootstrapError::certificate(trust_store.path(), format!("invalid trust anchor: {e}"))
        })?;
    }
    let roots = Arc::new(roots);

    let builder = ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_protocol_versions(&[&rustls::version::TLS12])
        .map_err(|e| {
            BootstrapError::certificate(trust_store.path(), format!("TLS 1.2 unavailable: {e}"))
        })?;

    let builder = if allow_invalid_hostname {
        let inner = WebPkiServerVerifier::builder_with_provider(roots, provider)
            .build()
            .map_err(|e| {
                BootstrapError::certificate(trust_store.path(), format!("invalid trust store: {e}"))
            })?;
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AnyHostnameVerifier { inner }))
    } else {
        builder.with_root_certificates(roots)
    };

    let config = builder
        .with_client_auth_cert(
            key_store.chain().to_vec(),
            PrivateKeyDer::Pkcs8(key_store.key().clone_key()),
        )
        .map_err(|e| {
            BootstrapError::certificate(key_store.path(), format!("unusable client key: {e}"))
        })?;
    Ok(Arc::new(config))
}

/// Validates the chain like webpki but accepts a certificate issued for a
/// different host name.
#[derive(Debug)]
struct AnyHostnameVerifier {
    inner: Arc<WebPkiServerVerifier>,
}

impl ServerCertVerifier for AnyHostnameVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Err(rustls::Error::InvalidCertificate(
                CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. },
            )) => {
                tracing::debug!(server = ?server_name, "Accepting certificate with mismatched host name");
                Ok(ServerCertVerified::assertion())
            }
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
