// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! TLS connector setup for `https` receivers.
//!
//! Splunk's management port ships with a self-signed certificate, so by default the server
//! certificate is accepted without verification. Setting [`Config::verify_certificate`] switches
//! to the native root store, optionally extended with the PEM file at
//! [`Config::ca_cert_path`].

use crate::config::{split_host_port, Config};
use crate::error::StreamError;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{ring, verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::io;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

/// Directly usable settings for the TLS connector
#[derive(Clone)]
pub struct TlsSettings {
    connector: TlsConnector,
    verify_certificate: bool,
}

impl TlsSettings {
    pub fn from_config(config: &Config) -> Result<Self, StreamError> {
        let provider = Arc::new(ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| StreamError::Config(format!("unsupported TLS configuration: {e}")))?;

        let client_config = if config.verify_certificate {
            builder
                .with_root_certificates(root_store(config)?)
                .with_no_client_auth()
        } else {
            warn!(
                host = %config.host(),
                "TLS certificate verification is DISABLED, this may lead to security vulnerabilities"
            );
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoCertificateVerification(provider)))
                .with_no_client_auth()
        };

        Ok(Self {
            connector: TlsConnector::from(Arc::new(client_config)),
            verify_certificate: config.verify_certificate,
        })
    }

    pub fn verify_certificate(&self) -> bool {
        self.verify_certificate
    }

    /// Runs the client handshake over an established TCP stream.
    ///
    /// The SNI name is the host part of `addr`; IP literals are accepted.
    pub async fn connect(&self, addr: &str, stream: TcpStream) -> io::Result<TlsStream<TcpStream>> {
        let host = split_host_port(addr).map_or(addr, |(host, _)| host);
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        self.connector.connect(server_name, stream).await
    }
}

fn root_store(config: &Config) -> Result<RootCertStore, StreamError> {
    let mut store = RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        debug!("Failed to load native certificate: {err}");
    }
    let (added, ignored) = store.add_parsable_certificates(native.certs);
    debug!(added, ignored, "Loaded native root certificates");

    if let Some(path) = &config.ca_cert_path {
        let certs = CertificateDer::pem_file_iter(path)
            .and_then(|iter| iter.collect::<Result<Vec<_>, _>>())
            .map_err(|e| {
                StreamError::Config(format!(
                    "unable to read CA certificates from {}: {e}",
                    path.display()
                ))
            })?;
        if certs.is_empty() {
            return Err(StreamError::Config(format!(
                "no CA certificates found in {}",
                path.display()
            )));
        }
        for cert in certs {
            store.add(cert).map_err(|e| {
                StreamError::Config(format!(
                    "invalid CA certificate in {}: {e}",
                    path.display()
                ))
            })?;
        }
    }

    Ok(store)
}

/// Accepts any server certificate. Handshake signatures are still checked so the peer has
/// to hold the private key of the certificate it presents.
#[derive(Debug)]
struct NoCertificateVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
