//! Public types returned by probe operations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// Current wall-clock time as an RFC 3339 / ISO 8601 string (UTC, millisecond precision).
pub(crate) fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// DNS record type accepted by single-record queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "schemars", derive(schemars::JsonSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsQueryType {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Mail exchange record.
    Mx,
    /// Text record.
    Txt,
    /// Name server record.
    Ns,
    /// Canonical name (alias) record.
    Cname,
    /// Start of authority record.
    Soa,
}

impl fmt::Display for DnsQueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::Aaaa => write!(f, "AAAA"),
            Self::Mx => write!(f, "MX"),
            Self::Txt => write!(f, "TXT"),
            Self::Ns => write!(f, "NS"),
            Self::Cname => write!(f, "CNAME"),
            Self::Soa => write!(f, "SOA"),
        }
    }
}

impl FromStr for DnsQueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "MX" => Ok(Self::Mx),
            "TXT" => Ok(Self::Txt),
            "NS" => Ok(Self::Ns),
            "CNAME" => Ok(Self::Cname),
            "SOA" => Ok(Self::Soa),
            _ => Err(format!("Unsupported DNS query type: {s}")),
        }
    }
}

// ==================== Targets & endpoints ====================

/// How a probe target was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Domain,
    Ipv4,
    Ipv6,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain => write!(f, "domain"),
            Self::Ipv4 => write!(f, "ipv4"),
            Self::Ipv6 => write!(f, "ipv6"),
        }
    }
}

/// A validated probe target. Classified once per request and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeTarget {
    /// Normalised target (ASCII domain or canonical IP text).
    pub value: String,
    /// Target classification.
    pub kind: TargetKind,
}

/// One remote party a probe is sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// IP address (or hostname) the probe connects to.
    pub address: String,
    /// Human-readable name (resolver name, nameserver host, zone).
    pub label: String,
    /// The zone or query name sent to this endpoint.
    pub zone_or_query: String,
}

/// Outcome of one operation executed by the task runner.
///
/// Every operation yields exactly one outcome. `Success` never carries an error detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ProbeOutcome<T> {
    #[serde(rename_all = "camelCase")]
    Success { value: T, elapsed_ms: u64 },
    #[serde(rename_all = "camelCase")]
    Refused { elapsed_ms: u64 },
    #[serde(rename_all = "camelCase")]
    Timeout { elapsed_ms: u64 },
    #[serde(rename_all = "camelCase")]
    NetworkError { detail: String, elapsed_ms: u64 },
    #[serde(rename_all = "camelCase")]
    AmbiguousError { detail: String, elapsed_ms: u64 },
}

impl<T> ProbeOutcome<T> {
    /// Wall-clock time spent on the operation.
    pub fn elapsed_ms(&self) -> u64 {
        match self {
            Self::Success { elapsed_ms, .. }
            | Self::Refused { elapsed_ms }
            | Self::Timeout { elapsed_ms }
            | Self::NetworkError { elapsed_ms, .. }
            | Self::AmbiguousError { elapsed_ms, .. } => *elapsed_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

// ==================== Resolver performance ====================

/// A public resolver from the performance roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicResolver {
    /// Human-readable name (e.g. `"Google DNS"`).
    pub name: String,
    /// Resolver IP address.
    pub ip: String,
    /// Operator of the resolver.
    pub provider: String,
}

/// Status of one resolver query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Success,
    Refused,
    Timeout,
    Error,
}

/// Result from a single resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverQueryResult {
    /// Resolver that was queried.
    pub resolver: PublicResolver,
    /// Query status.
    pub status: QueryStatus,
    /// Returned records, truncated for display.
    pub records: Vec<String>,
    /// Number of records actually returned.
    pub total_records: usize,
    /// Error message on failure.
    pub error: Option<String>,
    /// Query round-trip time in milliseconds.
    pub response_time: u64,
}

/// A resolver name paired with its response time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingEntry {
    pub resolver: String,
    pub time: u64,
}

/// Timing statistics over the successful resolvers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverStatistics {
    pub fastest: TimingEntry,
    pub slowest: TimingEntry,
    /// Arithmetic mean in milliseconds.
    pub average: f64,
    /// Median in milliseconds.
    pub median: f64,
    /// `round(successful / total * 100)`.
    pub success_rate: u32,
    pub successful: usize,
    pub total: usize,
}

/// Resolver performance comparison across the public resolver roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverPerformanceResult {
    pub domain: String,
    pub record_type: DnsQueryType,
    pub results: Vec<ResolverQueryResult>,
    pub statistics: ResolverStatistics,
    /// Total wall-clock time in milliseconds.
    pub total_time: u64,
    pub timestamp: String,
}

/// Result of a single-record query against one explicit resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsQueryResult {
    pub domain: String,
    pub record_type: DnsQueryType,
    pub resolver: String,
    pub records: Vec<String>,
    pub response_time: u64,
    pub timestamp: String,
}

// ==================== Zone transfer ====================

/// Classification of one AXFR attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Vulnerable,
    Refused,
    Timeout,
    Error,
}

/// Zone-transfer result for one nameserver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameserverResult {
    /// Nameserver host name (or IP when given explicitly).
    pub nameserver: String,
    /// Address the transfer was attempted against.
    pub ip: Option<String>,
    pub status: TransferStatus,
    pub vulnerable: bool,
    /// Number of resource records exposed (the true total, not the sample size).
    pub record_count: usize,
    /// First records of the exposed zone.
    pub records: Vec<String>,
    pub response_time: u64,
    pub error: Option<String>,
}

/// Aggregate counts; `vulnerable + secure + errors == total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneTransferSummary {
    pub total: usize,
    pub vulnerable: usize,
    pub secure: usize,
    pub errors: usize,
}

/// Zone-transfer vulnerability check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneTransferResult {
    pub domain: String,
    pub nameservers: Vec<NameserverResult>,
    pub summary: ZoneTransferSummary,
    pub timestamp: String,
}

// ==================== Blacklists ====================

/// What a blacklist zone is keyed on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    Ip,
    Domain,
}

/// A DNS blacklist zone from the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistZone {
    /// Zone name (e.g. `"zen.spamhaus.org"`).
    pub zone: String,
    pub zone_type: ZoneType,
    pub description: String,
    /// Zone-specific return codes that signal a refused query rather than a listing.
    #[serde(default)]
    pub refusal_codes: Vec<String>,
}

/// Verdict of one blacklist lookup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Listed,
    Clean,
    Error,
}

/// Result of a single blacklist zone lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistResult {
    pub zone: String,
    pub zone_type: ZoneType,
    /// The IP or domain this lookup is about.
    pub target: String,
    /// Full name that was queried (e.g. `"4.3.2.1.zen.spamhaus.org"`).
    pub query: String,
    pub status: ListingStatus,
    pub listed: bool,
    /// Addresses returned by the zone.
    pub return_codes: Vec<String>,
    /// TXT reason published by the zone, if any.
    pub reason: Option<String>,
    pub error: Option<String>,
    pub response_time: u64,
}

/// Aggregate counts; `listed_count + clean_count + error_count == total_checked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistSummary {
    pub total_checked: usize,
    pub listed_count: usize,
    pub clean_count: usize,
    pub error_count: usize,
    pub is_listed: bool,
}

/// Blacklist check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistCheckResult {
    pub target: ProbeTarget,
    /// Addresses the domain resolved to (empty for IP targets).
    pub resolved_ips: Vec<String>,
    pub results: Vec<BlacklistResult>,
    pub summary: BlacklistSummary,
    pub timestamp: String,
}

// ==================== TLS ====================

/// Parsed X.509 certificate.
///
/// Expiry-related fields are derived from the wall clock every time they are read
/// (and when serialized), never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub subject_common_name: Option<String>,
    pub issuer_common_name: Option<String>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    /// Serial number (upper-case hex).
    pub serial_number: String,
    pub fingerprint_sha256: String,
    pub fingerprint_sha512: String,
    pub subject_alt_names: Vec<String>,
    pub key_usage: Vec<String>,
    pub signature_algorithm: String,
    pub is_ca: bool,
}

impl CertificateInfo {
    pub fn days_until_expiry(&self) -> i64 {
        self.days_until_expiry_at(Utc::now())
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_not_yet_valid(&self) -> bool {
        self.is_not_yet_valid_at(Utc::now())
    }

    pub fn days_until_expiry_at(&self, now: DateTime<Utc>) -> i64 {
        (self.not_after - now).num_days()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.not_after
    }

    pub fn is_not_yet_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.not_before
    }

    /// Subject and issuer are the same name.
    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }
}

impl Serialize for CertificateInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let now = Utc::now();
        let mut s = serializer.serialize_struct("CertificateInfo", 17)?;
        s.serialize_field("subject", &self.subject)?;
        s.serialize_field("issuer", &self.issuer)?;
        s.serialize_field("subjectCommonName", &self.subject_common_name)?;
        s.serialize_field("issuerCommonName", &self.issuer_common_name)?;
        s.serialize_field(
            "validFrom",
            &self.not_before.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
        s.serialize_field(
            "validTo",
            &self.not_after.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
        s.serialize_field("daysUntilExpiry", &self.days_until_expiry_at(now))?;
        s.serialize_field("isExpired", &self.is_expired_at(now))?;
        s.serialize_field("isNotYetValid", &self.is_not_yet_valid_at(now))?;
        s.serialize_field("serialNumber", &self.serial_number)?;
        s.serialize_field("fingerprintSha256", &self.fingerprint_sha256)?;
        s.serialize_field("fingerprintSha512", &self.fingerprint_sha512)?;
        s.serialize_field("subjectAltNames", &self.subject_alt_names)?;
        s.serialize_field("keyUsage", &self.key_usage)?;
        s.serialize_field("signatureAlgorithm", &self.signature_algorithm)?;
        s.serialize_field("isCa", &self.is_ca)?;
        s.serialize_field("isSelfSigned", &self.is_self_issued())?;
        s.end()
    }
}

/// Certificate and handshake details of a TLS endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsCertificateResult {
    pub host: String,
    pub port: u16,
    /// Negotiated protocol (e.g. `"TLSv1.3"`).
    pub protocol: Option<String>,
    /// Negotiated cipher suite (IANA name).
    pub cipher: Option<String>,
    pub alpn_protocol: Option<String>,
    pub ocsp_stapled: bool,
    /// Certificate chain from leaf to the detected root.
    pub chain: Vec<CertificateInfo>,
    pub handshake_time: u64,
    pub timestamp: String,
}

/// Support for one pinned protocol version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsVersionSupport {
    pub version: String,
    pub supported: bool,
    pub error: Option<String>,
}

/// Protocol version probing result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsVersionsResult {
    pub host: String,
    pub port: u16,
    pub versions: Vec<TlsVersionSupport>,
    /// Versions that succeeded, oldest first.
    pub supported_versions: Vec<String>,
    pub min_version: Option<String>,
    pub max_version: Option<String>,
    pub timestamp: String,
}

/// ALPN negotiation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlpnResult {
    pub host: String,
    pub port: u16,
    pub offered: Vec<String>,
    pub negotiated_protocol: Option<String>,
    pub negotiated: bool,
    pub protocol: Option<String>,
    pub error: Option<String>,
    pub timestamp: String,
}

/// OCSP stapling check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcspStaplingResult {
    pub host: String,
    pub port: u16,
    pub stapled: bool,
    /// Size of the stapled DER response in bytes (0 when absent).
    pub response_size: usize,
    pub recommendation: Option<String>,
    pub timestamp: String,
}

/// A named cipher configuration from the preset roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherPreset {
    pub name: String,
    pub description: String,
    /// Protocol versions the preset covers (e.g. `["TLSv1.3"]`).
    pub protocols: Vec<String>,
    /// IANA cipher suite names.
    pub ciphers: Vec<String>,
}

/// Assessment of one preset against the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherPresetResult {
    pub name: String,
    pub description: String,
    pub protocols: Vec<String>,
    pub ciphers: Vec<String>,
    pub supported: bool,
    /// Suites the server accepted in a one-suite handshake.
    pub accepted_ciphers: Vec<String>,
    /// Protocol versions accepted by the platform TLS library (legacy preset only).
    pub accepted_protocols: Vec<String>,
}

/// Cipher preset assessment with the derived letter grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CipherAssessmentResult {
    pub host: String,
    pub port: u16,
    pub presets: Vec<CipherPresetResult>,
    /// `A` (Modern), `B` (Intermediate), `D` (Legacy only) or `F` (none).
    pub grade: String,
    pub timestamp: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn cert(not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> CertificateInfo {
        CertificateInfo {
            subject: "CN=example.com".to_string(),
            issuer: "CN=Example CA".to_string(),
            subject_common_name: Some("example.com".to_string()),
            issuer_common_name: Some("Example CA".to_string()),
            not_before,
            not_after,
            serial_number: "01".to_string(),
            fingerprint_sha256: String::new(),
            fingerprint_sha512: String::new(),
            subject_alt_names: vec![],
            key_usage: vec![],
            signature_algorithm: "SHA256withRSA".to_string(),
            is_ca: false,
        }
    }

    #[test]
    fn test_dns_query_type_round_trips_through_str() {
        for t in ["A", "aaaa", "Mx", "TXT", "ns", "CNAME", "soa"] {
            let parsed: DnsQueryType = t.parse().unwrap();
            assert_eq!(parsed.to_string(), t.to_uppercase());
        }
        assert!("PTR".parse::<DnsQueryType>().is_err());
        assert!("ALL".parse::<DnsQueryType>().is_err());
    }

    #[test]
    fn test_certificate_expiry_fields_follow_clock() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let info = cert(now - Duration::days(30), now + Duration::days(10));
        assert_eq!(info.days_until_expiry_at(now), 10);
        assert!(!info.is_expired_at(now));
        assert!(!info.is_not_yet_valid_at(now));

        let later = now + Duration::days(11);
        assert!(info.is_expired_at(later));
        assert!(info.days_until_expiry_at(later) < 0);

        let earlier = now - Duration::days(31);
        assert!(info.is_not_yet_valid_at(earlier));
    }

    #[test]
    fn test_certificate_serializes_derived_fields() {
        let now = Utc::now();
        let info = cert(now - Duration::days(1), now + Duration::days(5));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["isExpired"], false);
        assert_eq!(json["isNotYetValid"], false);
        assert_eq!(json["isSelfSigned"], false);
        assert!(json["daysUntilExpiry"].as_i64().unwrap() >= 4);
    }

    #[test]
    fn test_probe_outcome_serializes_tagged() {
        let outcome: ProbeOutcome<Vec<String>> = ProbeOutcome::Timeout { elapsed_ms: 5000 };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "timeout");
        assert_eq!(json["elapsedMs"], 5000);
    }
}
