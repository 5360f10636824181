//! MCP tool parameter schemas
//!
//! Defines the input parameter structures for all MCP tools.
//! All structs derive `Debug`, `Deserialize`, and `JsonSchema` as required by rmcp.

use netprobe_engine::DnsQueryType;
use schemars::JsonSchema;
use serde::Deserialize;

/// Parameters for `dns_query` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DnsQueryParams {
    /// The domain name to query.
    #[schemars(description = "The domain name to query")]
    pub domain: String,

    /// DNS record type (A, AAAA, MX, TXT, NS, CNAME, SOA).
    #[schemars(description = "DNS record type (A, AAAA, MX, TXT, NS, CNAME, SOA)")]
    pub record_type: DnsQueryType,

    /// Optional resolver IP address (defaults to the system resolver).
    #[schemars(description = "Optional resolver IP address (defaults to the system resolver)")]
    pub resolver: Option<String>,
}

/// Parameters for `resolver_performance` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResolverPerformanceParams {
    /// The domain name to resolve.
    #[schemars(description = "The domain name to resolve")]
    pub domain: String,

    /// DNS record type to query (default: A).
    #[schemars(description = "DNS record type to query (default: A)")]
    pub record_type: Option<DnsQueryType>,
}

/// Parameters for `zone_transfer_check` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ZoneTransferParams {
    /// The zone to test.
    #[schemars(description = "The zone (domain) to test for open AXFR")]
    pub domain: String,

    /// Optional single nameserver (hostname or IP) instead of the zone's NS set.
    #[schemars(
        description = "Optional single nameserver (hostname or IP) instead of the zone's NS set"
    )]
    pub nameserver: Option<String>,
}

/// Parameters for `blacklist_check` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct BlacklistCheckParams {
    /// IPv4, IPv6 address or domain name.
    #[schemars(description = "IPv4 address, IPv6 address or domain name to check")]
    pub target: String,
}

/// Parameters shared by the TLS tools.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TlsHostParams {
    /// Host name or IP, optionally with `:port`.
    #[schemars(description = "Host name or IP address, optionally with :port")]
    pub host: String,

    /// TCP port (default: 443).
    #[schemars(description = "TCP port (default: 443)")]
    pub port: Option<u16>,
}

/// Parameters for `tls_alpn` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TlsAlpnParams {
    #[schemars(description = "Host name or IP address, optionally with :port")]
    pub host: String,

    #[schemars(description = "TCP port (default: 443)")]
    pub port: Option<u16>,

    /// ALPN protocol identifiers to offer.
    #[schemars(description = "ALPN protocol identifiers to offer (default: [\"h2\", \"http/1.1\"])")]
    pub protocols: Option<Vec<String>>,
}
