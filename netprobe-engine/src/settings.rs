//! Probe configuration and the read-only rosters injected into [`ProbeService`](crate::ProbeService).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::services::resolver::SYSTEM_RESOLVER;
use crate::types::{BlacklistZone, CipherPreset, PublicResolver, ZoneType};

/// Settings shared by every probe of a [`ProbeService`](crate::ProbeService).
///
/// Built once and never mutated afterwards. All fields have defaults, so a partial
/// JSON document deserializes into a complete configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProbeSettings {
    /// Per-query timeout for resolver queries (milliseconds).
    pub dns_timeout_ms: u64,
    /// Per-connection timeout for TLS probes (milliseconds).
    pub tls_timeout_ms: u64,
    /// Per-version timeout for protocol version probing (milliseconds).
    pub version_probe_timeout_ms: u64,
    /// Per-lookup timeout for blacklist zones (milliseconds).
    pub blacklist_timeout_ms: u64,
    /// Per-nameserver timeout for zone transfers (milliseconds).
    pub zone_transfer_timeout_ms: u64,
    /// Maximum number of probes in flight for one request.
    pub concurrency: usize,
    /// Resolver used for NS discovery and address lookups.
    pub default_resolver: String,
    /// Maximum number of nameservers tested per zone-transfer check.
    pub max_nameservers: usize,
    /// Records kept per resolver result for display.
    pub max_display_records: usize,
    /// Records kept as a sample of an exposed zone.
    pub transfer_sample_lines: usize,
    pub resolvers: Vec<PublicResolver>,
    pub blacklist_zones: Vec<BlacklistZone>,
    pub cipher_presets: Vec<CipherPreset>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            dns_timeout_ms: 5_000,
            tls_timeout_ms: 10_000,
            version_probe_timeout_ms: 5_000,
            blacklist_timeout_ms: 2_000,
            zone_transfer_timeout_ms: 10_000,
            concurrency: 32,
            default_resolver: SYSTEM_RESOLVER.to_string(),
            max_nameservers: 10,
            max_display_records: 10,
            transfer_sample_lines: 50,
            resolvers: default_resolvers(),
            blacklist_zones: default_blacklist_zones(),
            cipher_presets: default_cipher_presets(),
        }
    }
}

impl ProbeSettings {
    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn tls_timeout(&self) -> Duration {
        Duration::from_millis(self.tls_timeout_ms)
    }

    pub fn version_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.version_probe_timeout_ms)
    }

    pub fn blacklist_timeout(&self) -> Duration {
        Duration::from_millis(self.blacklist_timeout_ms)
    }

    pub fn zone_transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.zone_transfer_timeout_ms)
    }
}

fn resolver(name: &str, ip: &str, provider: &str) -> PublicResolver {
    PublicResolver {
        name: name.to_string(),
        ip: ip.to_string(),
        provider: provider.to_string(),
    }
}

/// Public resolvers compared by the performance check.
pub fn default_resolvers() -> Vec<PublicResolver> {
    vec![
        resolver("Google DNS", "8.8.8.8", "Google"),
        resolver("Cloudflare DNS", "1.1.1.1", "Cloudflare"),
        resolver("Quad9 DNS", "9.9.9.9", "Quad9"),
        resolver("OpenDNS", "208.67.222.222", "Cisco"),
        resolver("AdGuard DNS", "94.140.14.14", "AdGuard"),
        resolver("CleanBrowsing", "185.228.168.9", "CleanBrowsing"),
        resolver("Comodo Secure DNS", "8.26.56.26", "Comodo"),
        resolver("Level3 DNS", "4.2.2.1", "Lumen"),
    ]
}

fn zone(zone: &str, zone_type: ZoneType, description: &str, refusal_codes: &[&str]) -> BlacklistZone {
    BlacklistZone {
        zone: zone.to_string(),
        zone_type,
        description: description.to_string(),
        refusal_codes: refusal_codes.iter().map(ToString::to_string).collect(),
    }
}

/// DNS blacklist zones queried by the blacklist check.
///
/// Refusal codes are the documented "query refused" answers of each zone
/// (public-resolver or rate-limit responses), which are not listings.
pub fn default_blacklist_zones() -> Vec<BlacklistZone> {
    vec![
        zone("zen.spamhaus.org", ZoneType::Ip, "Spamhaus ZEN", &[]),
        zone("bl.spamcop.net", ZoneType::Ip, "SpamCop Blocking List", &[]),
        zone("b.barracudacentral.org", ZoneType::Ip, "Barracuda Reputation Block List", &[]),
        zone("dnsbl.sorbs.net", ZoneType::Ip, "SORBS aggregate zone", &[]),
        zone("psbl.surriel.com", ZoneType::Ip, "Passive Spam Block List", &[]),
        zone("dnsbl-1.uceprotect.net", ZoneType::Ip, "UCEPROTECT Level 1", &[]),
        zone("bl.mailspike.net", ZoneType::Ip, "Mailspike Blacklist", &[]),
        zone("all.s5h.net", ZoneType::Ip, "s5h.net blacklist", &[]),
        zone("dnsbl.dronebl.org", ZoneType::Ip, "DroneBL", &[]),
        zone("ix.dnsbl.manitu.net", ZoneType::Ip, "NiX Spam", &[]),
        zone("dbl.spamhaus.org", ZoneType::Domain, "Spamhaus Domain Block List", &[]),
        zone("multi.surbl.org", ZoneType::Domain, "SURBL multi", &["127.0.0.1"]),
        zone("multi.uribl.com", ZoneType::Domain, "URIBL multi", &["127.0.0.1"]),
    ]
}

fn preset(name: &str, description: &str, protocols: &[&str], ciphers: &[&str]) -> CipherPreset {
    CipherPreset {
        name: name.to_string(),
        description: description.to_string(),
        protocols: protocols.iter().map(ToString::to_string).collect(),
        ciphers: ciphers.iter().map(ToString::to_string).collect(),
    }
}

/// Cipher configurations graded by the cipher assessment.
///
/// The names `Modern`, `Intermediate` and `Legacy` drive the grade.
pub fn default_cipher_presets() -> Vec<CipherPreset> {
    vec![
        preset(
            "Modern",
            "TLS 1.3 only with AEAD cipher suites",
            &["TLSv1.3"],
            &[
                "TLS_AES_128_GCM_SHA256",
                "TLS_AES_256_GCM_SHA384",
                "TLS_CHACHA20_POLY1305_SHA256",
            ],
        ),
        preset(
            "Intermediate",
            "TLS 1.2+ with forward-secret AEAD cipher suites",
            &["TLSv1.2", "TLSv1.3"],
            &[
                "TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256",
                "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256",
                "TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384",
                "TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384",
                "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256",
                "TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256",
            ],
        ),
        preset(
            "Legacy",
            "TLS 1.0+ including static RSA key exchange and CBC cipher suites",
            &["TLSv1", "TLSv1.1", "TLSv1.2"],
            &[
                "TLS_RSA_WITH_AES_128_CBC_SHA",
                "TLS_RSA_WITH_AES_256_CBC_SHA",
                "TLS_RSA_WITH_AES_128_GCM_SHA256",
                "TLS_RSA_WITH_3DES_EDE_CBC_SHA",
                "TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA",
                "TLS_ECDHE_RSA_WITH_AES_256_CBC_SHA",
            ],
        ),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resolvers_valid_ips() {
        let resolvers = default_resolvers();
        assert_eq!(resolvers.len(), 8);
        for r in &resolvers {
            assert!(
                r.ip.parse::<std::net::IpAddr>().is_ok(),
                "Invalid IP: {} for resolver {}",
                r.ip,
                r.name
            );
        }
    }

    #[test]
    fn test_default_blacklist_zones_have_both_types() {
        let zones = default_blacklist_zones();
        assert!(zones.iter().any(|z| z.zone_type == ZoneType::Ip));
        assert!(zones.iter().any(|z| z.zone_type == ZoneType::Domain));
        for z in &zones {
            for code in &z.refusal_codes {
                assert!(code.parse::<std::net::Ipv4Addr>().is_ok());
            }
        }
    }

    #[test]
    fn test_default_cipher_presets_names() {
        let names: Vec<String> = default_cipher_presets().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Modern", "Intermediate", "Legacy"]);
    }

    #[test]
    fn test_partial_settings_deserialize_with_defaults() {
        let settings: ProbeSettings =
            serde_json::from_str(r#"{"concurrency": 4, "defaultResolver": "1.1.1.1"}"#).unwrap();
        assert_eq!(settings.concurrency, 4);
        assert_eq!(settings.default_resolver, "1.1.1.1");
        assert_eq!(settings.dns_timeout(), Duration::from_secs(5));
        assert_eq!(settings.blacklist_timeout(), Duration::from_secs(2));
        assert_eq!(settings.resolvers.len(), 8);
    }
}
