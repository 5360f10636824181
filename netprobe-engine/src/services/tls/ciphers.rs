//! Cipher preset assessment and grading.

use log::debug;
use rustls::{ProtocolVersion, SupportedCipherSuite};

use crate::error::ProbeResult;
use crate::services::run_bounded;
use crate::settings::ProbeSettings;
use crate::types::{CipherAssessmentResult, CipherPreset, CipherPresetResult, timestamp_now};

use super::connector::{
    HandshakeSpec, TlsTarget, connect_tcp, find_suite, native_handshake, rustls_handshake,
};
use super::probes::network_error;

/// Assess every configured preset with genuine handshakes and grade the server.
///
/// Presets whose suites rustls implements get one handshake per suite. The rest are
/// negotiated through the platform TLS library once the AEAD presets are known.
pub(crate) async fn tls_cipher_assessment(
    settings: &ProbeSettings,
    target: &TlsTarget,
) -> ProbeResult<CipherAssessmentResult> {
    connect_tcp(target, settings.tls_timeout())
        .await
        .map_err(|e| network_error(target, &e))?;

    let mut assessed: Vec<Option<CipherPresetResult>> = Vec::new();
    let mut tls12_aead_accepted = false;
    for preset in &settings.cipher_presets {
        let suites: Vec<(String, SupportedCipherSuite)> = preset
            .ciphers
            .iter()
            .filter_map(|name| find_suite(name).map(|suite| (name.clone(), suite)))
            .collect();
        if suites.is_empty() {
            assessed.push(None);
            continue;
        }

        let accepted = accepted_suites(settings, target, &suites).await?;
        tls12_aead_accepted |= accepted
            .iter()
            .any(|(_, suite)| suite.version().version == ProtocolVersion::TLSv1_2);
        let accepted_ciphers: Vec<String> = accepted.into_iter().map(|(name, _)| name).collect();
        debug!(
            "[TLS] {}:{} accepted {} of {} {} suite(s)",
            target.host,
            target.port,
            accepted_ciphers.len(),
            suites.len(),
            preset.name
        );
        assessed.push(Some(preset_result(preset, accepted_ciphers, vec![])));
    }

    let mut presets = Vec::with_capacity(assessed.len());
    for (preset, result) in settings.cipher_presets.iter().zip(assessed) {
        let result = match result {
            Some(result) => result,
            None => assess_native(settings, target, preset, tls12_aead_accepted).await?,
        };
        presets.push(result);
    }

    let grade = grade(&presets).to_string();
    debug!("[TLS] {}:{} graded {grade}", target.host, target.port);

    Ok(CipherAssessmentResult {
        host: target.host.clone(),
        port: target.port,
        presets,
        grade,
        timestamp: timestamp_now(),
    })
}

/// One single-suite handshake per suite; returns the accepted ones in input order.
async fn accepted_suites(
    settings: &ProbeSettings,
    target: &TlsTarget,
    suites: &[(String, SupportedCipherSuite)],
) -> ProbeResult<Vec<(String, SupportedCipherSuite)>> {
    let limit = settings.tls_timeout();
    let operations: Vec<_> = suites
        .iter()
        .map(|(_, suite)| async move {
            rustls_handshake(target, &HandshakeSpec::single_suite(*suite), limit)
                .await
                .map(|_| ())
        })
        .collect();
    let outcomes = run_bounded(operations, limit, settings.concurrency).await?;

    Ok(suites
        .iter()
        .zip(outcomes)
        .filter(|(_, outcome)| outcome.is_success())
        .map(|((name, suite), _)| (name.clone(), *suite))
        .collect())
}

/// Negotiate the preset's protocol versions through the platform TLS library.
async fn assess_native(
    settings: &ProbeSettings,
    target: &TlsTarget,
    preset: &CipherPreset,
    tls12_aead_accepted: bool,
) -> ProbeResult<CipherPresetResult> {
    let limit = settings.tls_timeout();
    let protocols: Vec<(&String, native_tls::Protocol)> = preset
        .protocols
        .iter()
        .filter_map(|name| native_protocol(name).map(|p| (name, p)))
        .collect();
    let operations: Vec<_> = protocols
        .iter()
        .map(|(_, protocol)| native_handshake(target, *protocol, limit))
        .collect();
    let outcomes = run_bounded(operations, limit, settings.concurrency).await?;

    let accepted_protocols: Vec<String> = protocols
        .iter()
        .zip(outcomes)
        .filter(|(_, outcome)| outcome.is_success())
        .map(|((name, _), _)| (*name).clone())
        .collect();
    let mut result = preset_result(preset, vec![], accepted_protocols);
    result.supported = legacy_supported(&result.accepted_protocols, tls12_aead_accepted);
    Ok(result)
}

fn native_protocol(name: &str) -> Option<native_tls::Protocol> {
    match name {
        "TLSv1" => Some(native_tls::Protocol::Tlsv10),
        "TLSv1.1" => Some(native_tls::Protocol::Tlsv11),
        "TLSv1.2" => Some(native_tls::Protocol::Tlsv12),
        _ => None,
    }
}

/// A TLS 1.2 handshake only counts when no TLS 1.2 AEAD suite was accepted, since
/// the platform library would otherwise have picked one of those.
fn legacy_supported(accepted_protocols: &[String], tls12_aead_accepted: bool) -> bool {
    accepted_protocols.iter().any(|p| match p.as_str() {
        "TLSv1" | "TLSv1.1" => true,
        "TLSv1.2" => !tls12_aead_accepted,
        _ => false,
    })
}

fn preset_result(
    preset: &CipherPreset,
    accepted_ciphers: Vec<String>,
    accepted_protocols: Vec<String>,
) -> CipherPresetResult {
    CipherPresetResult {
        name: preset.name.clone(),
        description: preset.description.clone(),
        protocols: preset.protocols.clone(),
        ciphers: preset.ciphers.clone(),
        supported: !accepted_ciphers.is_empty(),
        accepted_ciphers,
        accepted_protocols,
    }
}

/// A if Modern is supported, else B for Intermediate, D for Legacy, otherwise F.
pub(crate) fn grade(presets: &[CipherPresetResult]) -> &'static str {
    let supported = |name: &str| presets.iter().any(|p| p.name == name && p.supported);
    if supported("Modern") {
        "A"
    } else if supported("Intermediate") {
        "B"
    } else if supported("Legacy") {
        "D"
    } else {
        "F"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ProbeError;

    fn result(name: &str, supported: bool) -> CipherPresetResult {
        CipherPresetResult {
            name: name.to_string(),
            description: String::new(),
            protocols: vec![],
            ciphers: vec![],
            supported,
            accepted_ciphers: vec![],
            accepted_protocols: vec![],
        }
    }

    #[test]
    fn test_grade_thresholds() {
        let all = |m, i, l| {
            vec![
                result("Modern", m),
                result("Intermediate", i),
                result("Legacy", l),
            ]
        };
        assert_eq!(grade(&all(true, true, true)), "A");
        assert_eq!(grade(&all(true, false, false)), "A");
        assert_eq!(grade(&all(false, true, true)), "B");
        assert_eq!(grade(&all(false, false, true)), "D");
        assert_eq!(grade(&all(false, false, false)), "F");
        assert_eq!(grade(&[]), "F");
    }

    #[test]
    fn test_legacy_supported() {
        let protocols = |names: &[&str]| names.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert!(legacy_supported(&protocols(&["TLSv1"]), true));
        assert!(legacy_supported(&protocols(&["TLSv1.1", "TLSv1.2"]), true));
        assert!(legacy_supported(&protocols(&["TLSv1.2"]), false));
        assert!(!legacy_supported(&protocols(&["TLSv1.2"]), true));
        assert!(!legacy_supported(&[], false));
    }

    #[test]
    fn test_native_protocol_names() {
        assert!(native_protocol("TLSv1").is_some());
        assert!(native_protocol("TLSv1.2").is_some());
        assert!(native_protocol("TLSv1.3").is_none());
    }

    #[test]
    fn test_preset_result_supported_follows_accepted_ciphers() {
        let preset = &crate::settings::default_cipher_presets()[0];
        assert!(!preset_result(preset, vec![], vec![]).supported);
        let r = preset_result(preset, vec!["TLS_AES_128_GCM_SHA256".to_string()], vec![]);
        assert!(r.supported);
        assert_eq!(r.ciphers, preset.ciphers);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let target = TlsTarget {
            host: "127.0.0.1".to_string(),
            port,
        };
        let err = tls_cipher_assessment(&ProbeSettings::default(), &target)
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::NetworkError(ref m) if m.contains("refused")));
    }

    // ==================== integration tests ====================

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_cipher_assessment_modern_host_real() {
        let target = TlsTarget {
            host: "cloudflare.com".to_string(),
            port: 443,
        };
        let result = tls_cipher_assessment(&ProbeSettings::default(), &target)
            .await
            .unwrap();
        assert_eq!(result.presets.len(), 3);
        assert_eq!(result.grade, "A");
    }
}
