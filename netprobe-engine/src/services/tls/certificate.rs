//! X.509 parsing and chain ordering.

use std::collections::HashSet;
use std::net::{Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Utc};
use log::warn;
use sha2::{Digest, Sha256, Sha512};
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::*;

use crate::types::CertificateInfo;

/// Maximum number of certificates followed from the leaf.
pub(crate) const MAX_CHAIN_DEPTH: usize = 10;

/// Parse the presented certificates, leaf first.
///
/// An unparsable leaf fails the whole chain; unparsable intermediates are skipped
/// (and logged) so the chain stops at the gap.
pub(crate) fn parse_all(certificates: &[Vec<u8>]) -> Result<Vec<CertificateInfo>, String> {
    let Some((leaf, rest)) = certificates.split_first() else {
        return Ok(vec![]);
    };
    let leaf = parse_certificate(leaf).map_err(|e| format!("Leaf certificate unreadable: {e}"))?;

    let mut parsed = vec![leaf];
    for (i, der) in rest.iter().enumerate() {
        match parse_certificate(der) {
            Ok(info) => parsed.push(info),
            Err(e) => warn!("[TLS] Skipping certificate #{}: {e}", i + 1),
        }
    }
    Ok(parsed)
}

/// Parse one DER certificate.
pub(crate) fn parse_certificate(der: &[u8]) -> Result<CertificateInfo, String> {
    let (_, cert) =
        X509Certificate::from_der(der).map_err(|e| format!("Certificate parsing failed: {e}"))?;

    let not_before = to_datetime(cert.validity().not_before)?;
    let not_after = to_datetime(cert.validity().not_after)?;

    Ok(CertificateInfo {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        subject_common_name: common_name(cert.subject()),
        issuer_common_name: common_name(cert.issuer()),
        not_before,
        not_after,
        serial_number: cert.serial.to_str_radix(16).to_uppercase(),
        fingerprint_sha256: fingerprint(&Sha256::digest(der)),
        fingerprint_sha512: fingerprint(&Sha512::digest(der)),
        subject_alt_names: subject_alt_names(&cert),
        key_usage: key_usage(&cert),
        signature_algorithm: signature_algorithm_name(
            &cert.signature_algorithm.algorithm.to_id_string(),
        ),
        is_ca: cert.is_ca(),
    })
}

fn to_datetime(time: ASN1Time) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp(time.timestamp(), 0)
        .ok_or_else(|| format!("Validity timestamp out of range: {time}"))
}

fn common_name(name: &X509Name<'_>) -> Option<String> {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(String::from)
}

/// Colon-separated upper-case hex.
fn fingerprint(digest: &[u8]) -> String {
    digest
        .iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(":")
}

fn subject_alt_names(cert: &X509Certificate<'_>) -> Vec<String> {
    cert.subject_alternative_name()
        .ok()
        .flatten()
        .map(|ext| {
            ext.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some((*dns).to_string()),
                    GeneralName::IPAddress(bytes) => ip_from_bytes(bytes),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn ip_from_bytes(bytes: &[u8]) -> Option<String> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        return Some(Ipv4Addr::from(octets).to_string());
    }
    <[u8; 16]>::try_from(bytes)
        .ok()
        .map(|octets| Ipv6Addr::from(octets).to_string())
}

/// Key usage flags followed by extended key usage purposes.
fn key_usage(cert: &X509Certificate<'_>) -> Vec<String> {
    let mut usages = Vec::new();

    if let Ok(Some(ku)) = cert.key_usage() {
        let ku = ku.value;
        let flags = [
            (ku.digital_signature(), "Digital Signature"),
            (ku.non_repudiation(), "Non Repudiation"),
            (ku.key_encipherment(), "Key Encipherment"),
            (ku.data_encipherment(), "Data Encipherment"),
            (ku.key_agreement(), "Key Agreement"),
            (ku.key_cert_sign(), "Certificate Sign"),
            (ku.crl_sign(), "CRL Sign"),
            (ku.encipher_only(), "Encipher Only"),
            (ku.decipher_only(), "Decipher Only"),
        ];
        usages.extend(
            flags
                .into_iter()
                .filter(|(set, _)| *set)
                .map(|(_, name)| name.to_string()),
        );
    }

    if let Ok(Some(eku)) = cert.extended_key_usage() {
        let eku = eku.value;
        let purposes = [
            (eku.server_auth, "TLS Web Server Authentication"),
            (eku.client_auth, "TLS Web Client Authentication"),
            (eku.code_signing, "Code Signing"),
            (eku.email_protection, "E-mail Protection"),
            (eku.time_stamping, "Time Stamping"),
            (eku.ocsp_signing, "OCSP Signing"),
            (eku.any, "Any Extended Key Usage"),
        ];
        usages.extend(
            purposes
                .into_iter()
                .filter(|(set, _)| *set)
                .map(|(_, name)| name.to_string()),
        );
    }

    usages
}

/// Common signature algorithm OIDs by name; unknown OIDs pass through.
fn signature_algorithm_name(oid: &str) -> String {
    let name = match oid {
        "1.2.840.113549.1.1.5" => "SHA1withRSA",
        "1.2.840.113549.1.1.11" => "SHA256withRSA",
        "1.2.840.113549.1.1.12" => "SHA384withRSA",
        "1.2.840.113549.1.1.13" => "SHA512withRSA",
        "1.2.840.113549.1.1.10" => "RSASSA-PSS",
        "1.2.840.10045.4.3.2" => "SHA256withECDSA",
        "1.2.840.10045.4.3.3" => "SHA384withECDSA",
        "1.2.840.10045.4.3.4" => "SHA512withECDSA",
        "1.3.101.112" => "Ed25519",
        "1.3.101.113" => "Ed448",
        other => other,
    };
    name.to_string()
}

/// Order `certificates` from the leaf (first entry) up to the detected root.
///
/// Follows issuer → subject links, stopping at a self-issued certificate, a missing
/// issuer, a certificate already on the path or [`MAX_CHAIN_DEPTH`] entries.
pub(crate) fn build_chain(certificates: Vec<CertificateInfo>) -> Vec<CertificateInfo> {
    let mut remaining = certificates.into_iter();
    let Some(leaf) = remaining.next() else {
        return vec![];
    };
    let mut pool: Vec<CertificateInfo> = remaining.collect();

    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(leaf.fingerprint_sha256.clone());
    let mut chain = vec![leaf];

    while chain.len() < MAX_CHAIN_DEPTH {
        let Some(current) = chain.last() else {
            break;
        };
        if current.is_self_issued() {
            break;
        }
        let Some(position) = pool.iter().position(|candidate| {
            candidate.subject == current.issuer
                && !visited.contains(&candidate.fingerprint_sha256)
        }) else {
            break;
        };
        let next = pool.swap_remove(position);
        visited.insert(next.fingerprint_sha256.clone());
        chain.push(next);
    }

    chain
}
