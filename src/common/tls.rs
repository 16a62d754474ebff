//! TLS configuration with caller-controlled trust decisions.
//!
//! Certificates are first checked against the bundled WebPKI roots. When that
//! check fails because the chain is not trusted (self-signed, unknown issuer,
//! expired, …) the decision is delegated to a [`CertificateTrust`], which lets an
//! interactive application offer "trust this certificate anyway". The hostname
//! is always checked against the presented certificate, whatever the trust
//! decision.

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::{WebPkiServerVerifier, verify_server_name};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::server::ParsedCertificate;
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::fmt;
use std::sync::Arc;

use crate::error::{DavError, Result};

/// Decides whether to accept a certificate chain the platform roots rejected.
pub trait CertificateTrust: fmt::Debug + Send + Sync {
    /// `end_entity` failed regular verification for `host`. Return `true` to
    /// accept the connection anyway.
    fn accept_untrusted(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        host: &str,
    ) -> bool;
}

/// Only platform-trusted certificates are accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectUntrusted;

impl CertificateTrust for RejectUntrusted {
    fn accept_untrusted(&self, _: &CertificateDer<'_>, _: &[CertificateDer<'_>], _: &str) -> bool {
        false
    }
}

/// Accepts untrusted certificates that exactly match one of the pinned DER blobs.
#[derive(Debug, Default, Clone)]
pub struct AcceptedCertificates {
    pinned: Vec<Vec<u8>>,
}

impl AcceptedCertificates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, der: impl Into<Vec<u8>>) {
        let der = der.into();
        if !self.pinned.contains(&der) {
            self.pinned.push(der);
        }
    }

    pub fn is_pinned(&self, der: &[u8]) -> bool {
        self.pinned.iter().any(|p| p.as_slice() == der)
    }
}

impl CertificateTrust for AcceptedCertificates {
    fn accept_untrusted(&self, end_entity: &CertificateDer<'_>, _: &[CertificateDer<'_>], host: &str) -> bool {
        let accepted = self.is_pinned(end_entity.as_ref());
        if accepted {
            tracing::debug!(host, "accepting pinned certificate");
        }
        accepted
    }
}

#[derive(Debug)]
struct DelegatingVerifier {
    platform: Arc<WebPkiServerVerifier>,
    trust: Arc<dyn CertificateTrust>,
}

impl ServerCertVerifier for DelegatingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        // Hostname verification is independent of any trust decision below.
        let parsed = ParsedCertificate::try_from(end_entity)?;
        verify_server_name(&parsed, server_name)?;

        match self.platform.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Ok(verified) => Ok(verified),
            Err(err @ rustls::Error::InvalidCertificate(_)) => {
                let host = server_name.to_str();
                if self.trust.accept_untrusted(end_entity, intermediates, &host) {
                    Ok(ServerCertVerified::assertion())
                } else {
                    tracing::warn!(host = %host, error = %err, "rejecting untrusted certificate");
                    Err(err)
                }
            }
            Err(err) => Err(err),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.platform.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.platform.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.platform.supported_verify_schemes()
    }
}

/// Build the rustls client configuration used by the transport.
///
/// Only TLS 1.3 and 1.2 are enabled; SSL 3.0 and TLS 1.0/1.1 are not
/// implemented by rustls at all. SNI is always sent. The cipher suites are the
/// full default set of the crypto provider.
pub fn client_config(
    trust: Arc<dyn CertificateTrust>,
    extra_roots: &[CertificateDer<'static>],
) -> Result<ClientConfig> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    for root in extra_roots {
        roots
            .add(root.clone())
            .map_err(|e| DavError::Tls(format!("invalid extra root: {e}")))?;
    }

    let platform = WebPkiServerVerifier::builder(Arc::new(roots))
        .build()
        .map_err(|e| DavError::Tls(e.to_string()))?;

    let mut config = ClientConfig::builder_with_protocol_versions(&[
        &rustls::version::TLS13,
        &rustls::version::TLS12,
    ])
    .dangerous()
    .with_custom_certificate_verifier(Arc::new(DelegatingVerifier { platform, trust }))
    .with_no_client_auth();
    config.enable_sni = true;

    Ok(config)
}
