//! Short-lived TLS connections with certificate verification disabled.
//!
//! rustls drives TLS 1.2 / 1.3 handshakes with explicit version, cipher suite and ALPN
//! pinning; the platform TLS library (native-tls) covers TLS 1.0 / 1.1.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::trace;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::{
    ClientConfig, DigitallySignedStruct, Error as RustlsError, ProtocolVersion, SignatureScheme,
    SupportedCipherSuite, SupportedProtocolVersion,
};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout};
use tokio_rustls::TlsConnector;

use crate::error::TlsProbeError;
use crate::services::runner::elapsed_millis;

/// Host and port of a TLS endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TlsTarget {
    pub host: String,
    pub port: u16,
}

/// Accepts any certificate so that untrusted, expired and self-signed chains can
/// still be inspected.
#[derive(Debug)]
struct AcceptAnyCertVerifier;

impl ServerCertVerifier for AcceptAnyCertVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
            SignatureScheme::ED448,
        ]
    }
}

/// Records the OCSP response stapled into the handshake, then defers to `inner`.
#[derive(Debug)]
struct OcspCapturingVerifier {
    inner: Arc<dyn ServerCertVerifier>,
    ocsp_response: Arc<Mutex<Vec<u8>>>,
}

impl ServerCertVerifier for OcspCapturingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, RustlsError> {
        if !ocsp_response.is_empty()
            && let Ok(mut stored) = self.ocsp_response.lock()
        {
            *stored = ocsp_response.to_vec();
        }
        self.inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, RustlsError> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// What to offer in a rustls ClientHello.
#[derive(Debug, Clone)]
pub(crate) struct HandshakeSpec {
    pub versions: Vec<&'static SupportedProtocolVersion>,
    /// `None` offers every suite of the ring provider.
    pub cipher_suites: Option<Vec<SupportedCipherSuite>>,
    pub alpn: Vec<String>,
}

impl HandshakeSpec {
    /// TLS 1.2 + 1.3 with every suite and the given ALPN list.
    pub(crate) fn default_with_alpn(alpn: &[String]) -> Self {
        Self {
            versions: vec![&rustls::version::TLS13, &rustls::version::TLS12],
            cipher_suites: None,
            alpn: alpn.to_vec(),
        }
    }

    pub(crate) fn version(version: &'static SupportedProtocolVersion) -> Self {
        Self {
            versions: vec![version],
            cipher_suites: None,
            alpn: vec![],
        }
    }

    /// Exactly one cipher suite, pinned to the suite's protocol version.
    pub(crate) fn single_suite(suite: SupportedCipherSuite) -> Self {
        Self {
            versions: vec![suite.version()],
            cipher_suites: Some(vec![suite]),
            alpn: vec![],
        }
    }
}

/// Observations from one completed rustls handshake.
#[derive(Debug, Clone, Default)]
pub(crate) struct HandshakeInfo {
    pub protocol: Option<String>,
    pub cipher: Option<String>,
    pub alpn: Option<String>,
    /// Peer certificates (DER) in the order the server sent them.
    pub certificates: Vec<Vec<u8>>,
    /// Stapled OCSP response (empty when none was sent).
    pub ocsp_response: Vec<u8>,
    pub handshake_time: u64,
}

fn build_config(
    spec: &HandshakeSpec,
    ocsp_response: Arc<Mutex<Vec<u8>>>,
) -> Result<ClientConfig, TlsProbeError> {
    let mut provider: CryptoProvider = rustls::crypto::ring::default_provider();
    if let Some(suites) = &spec.cipher_suites {
        provider.cipher_suites.clone_from(suites);
    }

    let verifier = OcspCapturingVerifier {
        inner: Arc::new(AcceptAnyCertVerifier),
        ocsp_response,
    };
    let mut config = ClientConfig::builder_with_provider(Arc::new(provider))
        .with_protocol_versions(&spec.versions)
        .map_err(|e| TlsProbeError::Configuration(e.to_string()))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();
    config.alpn_protocols = spec.alpn.iter().map(|p| p.as_bytes().to_vec()).collect();
    Ok(config)
}

/// Resolve `target` and open a TCP connection to its first address.
///
/// Resolution failure is [`TlsProbeError::HostNotFound`], a refused connection is
/// [`TlsProbeError::ConnectionRefused`] and the timer is [`TlsProbeError::Timeout`].
pub(crate) async fn connect_tcp(
    target: &TlsTarget,
    limit: Duration,
) -> Result<TcpStream, TlsProbeError> {
    let addr = resolve(target).await?;
    match timeout(limit, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
            Err(TlsProbeError::ConnectionRefused)
        }
        Ok(Err(e)) => Err(TlsProbeError::ConnectionFailed(e.to_string())),
        Err(_) => Err(TlsProbeError::Timeout),
    }
}

async fn resolve(target: &TlsTarget) -> Result<SocketAddr, TlsProbeError> {
    let mut addrs = tokio::net::lookup_host((target.host.as_str(), target.port))
        .await
        .map_err(|e| TlsProbeError::HostNotFound(format!("{}: {e}", target.host)))?;
    addrs
        .next()
        .ok_or_else(|| TlsProbeError::HostNotFound(target.host.clone()))
}

/// Complete one rustls handshake against `target`.
pub(crate) async fn rustls_handshake(
    target: &TlsTarget,
    spec: &HandshakeSpec,
    limit: Duration,
) -> Result<HandshakeInfo, TlsProbeError> {
    let ocsp_response = Arc::new(Mutex::new(Vec::new()));
    let config = build_config(spec, Arc::clone(&ocsp_response))?;
    let connector = TlsConnector::from(Arc::new(config));
    let server_name = ServerName::try_from(target.host.clone())
        .map_err(|_| TlsProbeError::Configuration(format!("Invalid server name: {}", target.host)))?;

    let stream = connect_tcp(target, limit).await?;
    let start = Instant::now();
    let tls_stream = match timeout(limit, connector.connect(server_name, stream)).await {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => return Err(TlsProbeError::HandshakeFailed(e.to_string())),
        Err(_) => return Err(TlsProbeError::Timeout),
    };
    let handshake_time = elapsed_millis(start);

    let (_, connection) = tls_stream.get_ref();
    let info = HandshakeInfo {
        protocol: connection.protocol_version().map(protocol_name),
        cipher: connection
            .negotiated_cipher_suite()
            .map(|cs| iana_name(cs.suite())),
        alpn: connection
            .alpn_protocol()
            .map(|p| String::from_utf8_lossy(p).into_owned()),
        certificates: connection
            .peer_certificates()
            .map(|certs| certs.iter().map(|c| c.as_ref().to_vec()).collect())
            .unwrap_or_default(),
        ocsp_response: ocsp_response
            .lock()
            .map(|captured| captured.clone())
            .unwrap_or_default(),
        handshake_time,
    };
    trace!(
        "[TLS] {}:{} negotiated {:?} / {:?} in {}ms",
        target.host, target.port, info.protocol, info.cipher, info.handshake_time
    );
    Ok(info)
}

/// Complete one handshake through the platform TLS library, pinned to `protocol`.
pub(crate) async fn native_handshake(
    target: &TlsTarget,
    protocol: native_tls::Protocol,
    limit: Duration,
) -> Result<(), TlsProbeError> {
    let is_ip = target.host.parse::<std::net::IpAddr>().is_ok();
    let connector = native_tls::TlsConnector::builder()
        .min_protocol_version(Some(protocol))
        .max_protocol_version(Some(protocol))
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .use_sni(!is_ip)
        .build()
        .map_err(|e| TlsProbeError::Configuration(e.to_string()))?;
    let connector = tokio_native_tls::TlsConnector::from(connector);

    let stream = connect_tcp(target, limit).await?;
    match timeout(limit, connector.connect(&target.host, stream)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(TlsProbeError::HandshakeFailed(e.to_string())),
        Err(_) => Err(TlsProbeError::Timeout),
    }
}

/// `TLSv1.2`-style name of a rustls protocol version.
pub(crate) fn protocol_name(version: ProtocolVersion) -> String {
    match version {
        ProtocolVersion::TLSv1_3 => "TLSv1.3".to_string(),
        ProtocolVersion::TLSv1_2 => "TLSv1.2".to_string(),
        ProtocolVersion::TLSv1_1 => "TLSv1.1".to_string(),
        ProtocolVersion::TLSv1_0 => "TLSv1".to_string(),
        other => format!("{other:?}"),
    }
}

/// IANA name of a cipher suite (rustls spells TLS 1.3 suites `TLS13_*`).
pub(crate) fn iana_name(suite: rustls::CipherSuite) -> String {
    let name = format!("{suite:?}");
    match name.strip_prefix("TLS13_") {
        Some(rest) => format!("TLS_{rest}"),
        None => name,
    }
}

/// The ring provider's suite with the given IANA name.
pub(crate) fn find_suite(name: &str) -> Option<SupportedCipherSuite> {
    rustls::crypto::ring::ALL_CIPHER_SUITES
        .iter()
        .copied()
        .find(|suite| iana_name(suite.suite()) == name)
}
