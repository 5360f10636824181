//! Certificate, protocol version, ALPN and OCSP stapling probes.

use log::debug;

use crate::error::{ProbeError, ProbeResult, TlsProbeError};
use crate::services::run_bounded;
use crate::settings::ProbeSettings;
use crate::types::{
    AlpnResult, OcspStaplingResult, ProbeOutcome, TlsCertificateResult, TlsVersionSupport,
    TlsVersionsResult, timestamp_now,
};

use super::certificate::{build_chain, parse_all};
use super::connector::{HandshakeSpec, TlsTarget, native_handshake, rustls_handshake};

/// ALPN protocols offered when the caller does not supply a list.
pub(crate) const DEFAULT_ALPN: [&str; 2] = ["h2", "http/1.1"];

/// Protocol versions probed, oldest first.
const VERSIONS: [&str; 4] = ["TLSv1", "TLSv1.1", "TLSv1.2", "TLSv1.3"];

pub(crate) fn default_alpn() -> Vec<String> {
    DEFAULT_ALPN.iter().map(ToString::to_string).collect()
}

/// Fetch the certificate chain and negotiated parameters.
pub(crate) async fn tls_certificate(
    settings: &ProbeSettings,
    target: &TlsTarget,
) -> ProbeResult<TlsCertificateResult> {
    let spec = HandshakeSpec::default_with_alpn(&default_alpn());
    let info = rustls_handshake(target, &spec, settings.tls_timeout())
        .await
        .map_err(|e| network_error(target, &e))?;

    let certificates = parse_all(&info.certificates).map_err(|e| {
        ProbeError::NetworkError(format!("{}:{}: {e}", target.host, target.port))
    })?;
    let chain = build_chain(certificates);
    debug!(
        "[TLS] {}:{} presented {} certificate(s), chain length {}",
        target.host,
        target.port,
        info.certificates.len(),
        chain.len()
    );

    Ok(TlsCertificateResult {
        host: target.host.clone(),
        port: target.port,
        protocol: info.protocol,
        cipher: info.cipher,
        alpn_protocol: info.alpn,
        ocsp_stapled: !info.ocsp_response.is_empty(),
        chain,
        handshake_time: info.handshake_time,
        timestamp: timestamp_now(),
    })
}

/// Probe each of TLS 1.0 - 1.3 with the version pinned.
pub(crate) async fn tls_versions(
    settings: &ProbeSettings,
    target: &TlsTarget,
) -> ProbeResult<TlsVersionsResult> {
    let limit = settings.version_probe_timeout();
    let operations: Vec<_> = VERSIONS
        .iter()
        .map(|version| probe_version(target, version, limit))
        .collect();
    let outcomes = run_bounded(operations, limit, settings.concurrency).await?;

    let versions: Vec<TlsVersionSupport> = VERSIONS
        .iter()
        .zip(outcomes)
        .map(|(version, outcome)| TlsVersionSupport {
            version: (*version).to_string(),
            supported: outcome.is_success(),
            error: failure_message(&outcome),
        })
        .collect();

    let supported_versions: Vec<String> = versions
        .iter()
        .filter(|v| v.supported)
        .map(|v| v.version.clone())
        .collect();
    debug!(
        "[TLS] {}:{} supports {supported_versions:?}",
        target.host, target.port
    );

    Ok(TlsVersionsResult {
        host: target.host.clone(),
        port: target.port,
        min_version: supported_versions.first().cloned(),
        max_version: supported_versions.last().cloned(),
        versions,
        supported_versions,
        timestamp: timestamp_now(),
    })
}

async fn probe_version(
    target: &TlsTarget,
    version: &str,
    limit: std::time::Duration,
) -> Result<(), TlsProbeError> {
    let spec = match version {
        "TLSv1.3" => HandshakeSpec::version(&rustls::version::TLS13),
        "TLSv1.2" => HandshakeSpec::version(&rustls::version::TLS12),
        "TLSv1.1" => return native_handshake(target, native_tls::Protocol::Tlsv11, limit).await,
        _ => return native_handshake(target, native_tls::Protocol::Tlsv10, limit).await,
    };
    rustls_handshake(target, &spec, limit).await.map(|_| ())
}

/// Offer `protocols` via ALPN and report what the server picked.
pub(crate) async fn tls_alpn(
    settings: &ProbeSettings,
    target: &TlsTarget,
    protocols: Vec<String>,
) -> ProbeResult<AlpnResult> {
    let spec = HandshakeSpec::default_with_alpn(&protocols);
    let (negotiated_protocol, protocol, error) =
        match rustls_handshake(target, &spec, settings.tls_timeout()).await {
            Ok(info) => (info.alpn, info.protocol, None),
            // The server may abort with no_application_protocol; that is an answer too.
            Err(TlsProbeError::HandshakeFailed(detail)) => (None, None, Some(detail)),
            Err(e) => return Err(network_error(target, &e)),
        };

    Ok(AlpnResult {
        host: target.host.clone(),
        port: target.port,
        offered: protocols,
        negotiated: negotiated_protocol.is_some(),
        negotiated_protocol,
        protocol,
        error,
        timestamp: timestamp_now(),
    })
}

/// Check whether the server staples an OCSP response into the handshake.
pub(crate) async fn tls_ocsp(
    settings: &ProbeSettings,
    target: &TlsTarget,
) -> ProbeResult<OcspStaplingResult> {
    let spec = HandshakeSpec::default_with_alpn(&[]);
    let info = rustls_handshake(target, &spec, settings.tls_timeout())
        .await
        .map_err(|e| network_error(target, &e))?;

    let stapled = !info.ocsp_response.is_empty();
    Ok(OcspStaplingResult {
        host: target.host.clone(),
        port: target.port,
        stapled,
        response_size: info.ocsp_response.len(),
        recommendation: (!stapled).then(|| {
            "Enable OCSP stapling so clients receive revocation status in the handshake"
                .to_string()
        }),
        timestamp: timestamp_now(),
    })
}

pub(crate) fn network_error(target: &TlsTarget, e: &TlsProbeError) -> ProbeError {
    ProbeError::NetworkError(format!("{}:{}: {e}", target.host, target.port))
}

fn failure_message<T>(outcome: &ProbeOutcome<T>) -> Option<String> {
    match outcome {
        ProbeOutcome::Success { .. } => None,
        ProbeOutcome::Refused { .. } => Some("Connection refused".to_string()),
        ProbeOutcome::Timeout { elapsed_ms } => Some(format!("Timed out after {elapsed_ms}ms")),
        ProbeOutcome::NetworkError { detail, .. } | ProbeOutcome::AmbiguousError { detail, .. } => {
            Some(detail.clone())
        }
    }
}
