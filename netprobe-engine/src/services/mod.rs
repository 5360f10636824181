//! Probe service façade exposing every probe operation.
//!
//! [`ProbeService`] validates input before any network I/O and dispatches to the
//! individual probers with its injected, read-only [`ProbeSettings`].

mod blacklist;
mod dns;
pub(crate) mod resolver;
mod resolver_performance;
pub(crate) mod runner;
mod tls;
mod zone_transfer;

use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use tokio::time::Instant;

use crate::error::{DnsError, ProbeError, ProbeResult};
use crate::settings::ProbeSettings;
use crate::types::{
    AlpnResult, BlacklistCheckResult, CipherAssessmentResult, DnsQueryResult, DnsQueryType,
    OcspStaplingResult, ProbeTarget, ResolverPerformanceResult, TargetKind, TlsCertificateResult,
    TlsVersionsResult, ZoneTransferResult, timestamp_now,
};

pub use runner::run_bounded;

use dns::DnsClient;
use tls::TlsTarget;

/// Port probed when the caller names none.
const DEFAULT_TLS_PORT: u16 = 443;

/// Longest ALPN protocol identifier the wire format can carry.
const MAX_ALPN_LENGTH: usize = 255;

/// Validate and normalise a domain name or IP address input.
///
/// Trims whitespace, passes through valid IP addresses unchanged, converts
/// internationalised domain names (IDN) to ASCII via IDNA 2008, and rejects
/// empty or overlong inputs.
fn validate_domain(domain: &str) -> ProbeResult<String> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(ProbeError::ValidationError(
            "Domain name is required".to_string(),
        ));
    }
    if domain.parse::<IpAddr>().is_ok() {
        return Ok(domain.to_string());
    }
    let ascii_domain = idna::domain_to_ascii_strict(domain.trim_end_matches('.'))
        .map_err(|_| ProbeError::ValidationError(format!("Invalid domain name: {domain}")))?;
    if ascii_domain.len() > 253 {
        return Err(ProbeError::ValidationError(format!(
            "Domain name exceeds maximum length of 253 characters (got {})",
            ascii_domain.len()
        )));
    }
    Ok(ascii_domain)
}

/// Classify a blacklist target as IPv4, IPv6 or domain by its format.
fn classify_target(input: &str) -> ProbeResult<ProbeTarget> {
    let input = input.trim();
    let target = match input.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => ProbeTarget {
            value: ip.to_string(),
            kind: TargetKind::Ipv4,
        },
        Ok(IpAddr::V6(ip)) => ProbeTarget {
            value: ip.to_string(),
            kind: TargetKind::Ipv6,
        },
        Err(_) => ProbeTarget {
            value: validate_domain(input)?,
            kind: TargetKind::Domain,
        },
    };
    Ok(target)
}

/// Parse a resolver or nameserver address.
pub(crate) fn parse_resolver(resolver: &str) -> ProbeResult<IpAddr> {
    resolver.trim().parse().map_err(|_| {
        ProbeError::ValidationError(format!("Invalid resolver address: {resolver}"))
    })
}

fn parse_record_type(record_type: &str) -> ProbeResult<DnsQueryType> {
    record_type.parse().map_err(ProbeError::ValidationError)
}

/// Split `host` / `host:port` / `[v6]` / `[v6]:port` and apply `port` (default 443).
///
/// A port given both inline and explicitly must agree.
fn parse_host_port(host: &str, port: Option<u16>) -> ProbeResult<TlsTarget> {
    let host = host.trim();
    let (host, inline_port) = if let Ok(addr) = host.parse::<SocketAddr>() {
        (addr.ip().to_string(), Some(addr.port()))
    } else if host.parse::<IpAddr>().is_ok() {
        (host.to_string(), None)
    } else if let Some(inner) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
        let ip: Ipv6Addr = inner.parse().map_err(|_| {
            ProbeError::ValidationError(format!("Invalid IPv6 address: {inner}"))
        })?;
        (ip.to_string(), None)
    } else if let Some((name, port_text)) = host.rsplit_once(':') {
        let inline: u16 = port_text.parse().map_err(|_| {
            ProbeError::ValidationError(format!("Invalid port: {port_text}"))
        })?;
        (name.to_string(), Some(inline))
    } else {
        (host.to_string(), None)
    };

    let port = match (inline_port, port) {
        (Some(a), Some(b)) if a != b => {
            return Err(ProbeError::ValidationError(format!(
                "Conflicting ports: {a} in host, {b} given"
            )));
        }
        (Some(p), _) | (None, Some(p)) => p,
        (None, None) => DEFAULT_TLS_PORT,
    };
    if port == 0 {
        return Err(ProbeError::ValidationError(
            "Port must be between 1 and 65535".to_string(),
        ));
    }

    Ok(TlsTarget {
        host: validate_domain(&host)?,
        port,
    })
}

/// Entries must be non-empty and fit the 255-byte ALPN length field.
fn validate_alpn(protocols: Option<Vec<String>>) -> ProbeResult<Vec<String>> {
    let protocols = match protocols {
        Some(list) if !list.is_empty() => list,
        _ => return Ok(tls::default_alpn()),
    };
    for protocol in &protocols {
        if protocol.is_empty() || protocol.len() > MAX_ALPN_LENGTH {
            return Err(ProbeError::ValidationError(format!(
                "ALPN protocol must be 1-{MAX_ALPN_LENGTH} bytes: {protocol:?}"
            )));
        }
    }
    Ok(protocols)
}

/// Entry point for all probe operations.
///
/// Cheap to clone; the settings are shared behind an [`Arc`].
///
/// ```rust,no_run
/// use netprobe_engine::{ProbeService, ProbeSettings};
/// # async fn demo() -> netprobe_engine::ProbeResult<()> {
/// let service = ProbeService::new(ProbeSettings::default());
/// let axfr = service.zone_transfer_check("example.com", None).await?;
/// assert_eq!(axfr.summary.vulnerable, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ProbeService {
    settings: Arc<ProbeSettings>,
}

impl Default for ProbeService {
    fn default() -> Self {
        Self::new(ProbeSettings::default())
    }
}

impl ProbeService {
    pub fn new(settings: ProbeSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Query one record type against one resolver (the default resolver when `None`).
    ///
    /// An empty answer yields an empty record list; a nonexistent domain is a
    /// resolution error.
    pub async fn query_record(
        &self,
        domain: &str,
        record_type: &str,
        resolver: Option<&str>,
    ) -> ProbeResult<DnsQueryResult> {
        let domain = validate_domain(domain)?;
        let record_type = parse_record_type(record_type)?;
        let resolver = parse_resolver(resolver.unwrap_or(&self.settings.default_resolver))?;

        let start = Instant::now();
        let records = match DnsClient::new(self.settings.dns_timeout())
            .query_record(resolver, &domain, record_type)
            .await
        {
            Ok(records) => records,
            Err(DnsError::NoData) => vec![],
            Err(e @ DnsError::DomainNotFound) => {
                return Err(ProbeError::ResolutionError(format!("{domain}: {e}")));
            }
            Err(e) => {
                return Err(ProbeError::NetworkError(format!(
                    "{record_type} {domain} @{resolver}: {e}"
                )));
            }
        };

        Ok(DnsQueryResult {
            domain,
            record_type,
            resolver: resolver.to_string(),
            records,
            response_time: runner::elapsed_millis(start),
            timestamp: timestamp_now(),
        })
    }

    /// Compare response times of the configured public resolvers.
    pub async fn resolver_performance(
        &self,
        domain: &str,
        record_type: &str,
    ) -> ProbeResult<ResolverPerformanceResult> {
        let domain = validate_domain(domain)?;
        let record_type = parse_record_type(record_type)?;
        resolver_performance::resolver_performance(&self.settings, &domain, record_type).await
    }

    /// Attempt AXFR against the domain's nameservers, or only `nameserver` when given.
    pub async fn zone_transfer_check(
        &self,
        domain: &str,
        nameserver: Option<&str>,
    ) -> ProbeResult<ZoneTransferResult> {
        let domain = validate_domain(domain)?;
        let nameserver = nameserver
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(validate_domain)
            .transpose()?;
        zone_transfer::zone_transfer_check(&self.settings, &domain, nameserver.as_deref()).await
    }

    /// Check an IP address or domain against the configured blacklist zones.
    pub async fn blacklist_check(&self, target: &str) -> ProbeResult<BlacklistCheckResult> {
        let target = classify_target(target)?;
        blacklist::blacklist_check(&self.settings, &target).await
    }

    /// Retrieve the certificate chain and negotiated parameters.
    pub async fn tls_certificate(
        &self,
        host: &str,
        port: Option<u16>,
    ) -> ProbeResult<TlsCertificateResult> {
        let target = parse_host_port(host, port)?;
        tls::tls_certificate(&self.settings, &target).await
    }

    /// Report which of TLS 1.0 - 1.3 the server accepts.
    pub async fn tls_versions(
        &self,
        host: &str,
        port: Option<u16>,
    ) -> ProbeResult<TlsVersionsResult> {
        let target = parse_host_port(host, port)?;
        tls::tls_versions(&self.settings, &target).await
    }

    /// Offer `protocols` (default `h2`, `http/1.1`) and report the negotiated one.
    pub async fn tls_alpn(
        &self,
        host: &str,
        port: Option<u16>,
        protocols: Option<Vec<String>>,
    ) -> ProbeResult<AlpnResult> {
        let target = parse_host_port(host, port)?;
        let protocols = validate_alpn(protocols)?;
        tls::tls_alpn(&self.settings, &target, protocols).await
    }

    pub async fn tls_ocsp(&self, host: &str, port: Option<u16>) -> ProbeResult<OcspStaplingResult> {
        let target = parse_host_port(host, port)?;
        tls::tls_ocsp(&self.settings, &target).await
    }

    /// Grade the server against the Modern / Intermediate / Legacy cipher presets.
    pub async fn tls_cipher_assessment(
        &self,
        host: &str,
        port: Option<u16>,
    ) -> ProbeResult<CipherAssessmentResult> {
        let target = parse_host_port(host, port)?;
        tls::tls_cipher_assessment(&self.settings, &target).await
    }
}
