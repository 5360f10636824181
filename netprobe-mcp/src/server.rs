//! MCP Server implementation for netprobe.
//!
//! Exposes 9 probe tools for AI agents. Every call is validated by the engine before
//! any network I/O and bounded by an outer per-tool timeout.

use async_trait::async_trait;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router,
};
use std::sync::Arc;
use tokio::time::{Duration, timeout};

use netprobe_engine::{
    AlpnResult, BlacklistCheckResult, CipherAssessmentResult, DnsQueryResult, DnsQueryType,
    OcspStaplingResult, ProbeError, ProbeResult, ProbeService, ResolverPerformanceResult,
    TlsCertificateResult, TlsVersionsResult, ZoneTransferResult,
};

use crate::schemas::{
    BlacklistCheckParams, DnsQueryParams, ResolverPerformanceParams, TlsAlpnParams,
    TlsHostParams, ZoneTransferParams,
};

// Outer timeouts per tool family
const DNS_QUERY_TIMEOUT_SECS: u64 = 30;
const RESOLVER_PERFORMANCE_TIMEOUT_SECS: u64 = 30;
const ZONE_TRANSFER_TIMEOUT_SECS: u64 = 90;
const BLACKLIST_TIMEOUT_SECS: u64 = 30;
const TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 30;
const TLS_SCAN_TIMEOUT_SECS: u64 = 90;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToolTimeouts {
    dns_query: Duration,
    resolver_performance: Duration,
    zone_transfer: Duration,
    blacklist: Duration,
    /// Single-handshake tools: certificate, ALPN, OCSP.
    tls_handshake: Duration,
    /// Multi-handshake tools: versions, cipher assessment.
    tls_scan: Duration,
}

impl Default for ToolTimeouts {
    fn default() -> Self {
        Self {
            dns_query: Duration::from_secs(DNS_QUERY_TIMEOUT_SECS),
            resolver_performance: Duration::from_secs(RESOLVER_PERFORMANCE_TIMEOUT_SECS),
            zone_transfer: Duration::from_secs(ZONE_TRANSFER_TIMEOUT_SECS),
            blacklist: Duration::from_secs(BLACKLIST_TIMEOUT_SECS),
            tls_handshake: Duration::from_secs(TLS_HANDSHAKE_TIMEOUT_SECS),
            tls_scan: Duration::from_secs(TLS_SCAN_TIMEOUT_SECS),
        }
    }
}

impl ToolTimeouts {
    /// The same outer timeout for every tool.
    pub fn uniform(limit: Duration) -> Self {
        Self {
            dns_query: limit,
            resolver_performance: limit,
            zone_transfer: limit,
            blacklist: limit,
            tls_handshake: limit,
            tls_scan: limit,
        }
    }
}

/// Seam between the MCP tools and the probe engine.
#[async_trait]
pub(crate) trait ProbeGateway: Send + Sync {
    async fn dns_query(
        &self,
        domain: &str,
        record_type: DnsQueryType,
        resolver: Option<&str>,
    ) -> ProbeResult<DnsQueryResult>;

    async fn resolver_performance(
        &self,
        domain: &str,
        record_type: DnsQueryType,
    ) -> ProbeResult<ResolverPerformanceResult>;

    async fn zone_transfer_check(
        &self,
        domain: &str,
        nameserver: Option<&str>,
    ) -> ProbeResult<ZoneTransferResult>;

    async fn blacklist_check(&self, target: &str) -> ProbeResult<BlacklistCheckResult>;

    async fn tls_certificate(
        &self,
        host: &str,
        port: Option<u16>,
    ) -> ProbeResult<TlsCertificateResult>;

    async fn tls_versions(&self, host: &str, port: Option<u16>) -> ProbeResult<TlsVersionsResult>;

    async fn tls_alpn(
        &self,
        host: &str,
        port: Option<u16>,
        protocols: Option<Vec<String>>,
    ) -> ProbeResult<AlpnResult>;

    async fn tls_ocsp(&self, host: &str, port: Option<u16>) -> ProbeResult<OcspStaplingResult>;

    async fn tls_cipher_assessment(
        &self,
        host: &str,
        port: Option<u16>,
    ) -> ProbeResult<CipherAssessmentResult>;
}

struct DefaultProbeGateway {
    service: ProbeService,
}

#[async_trait]
impl ProbeGateway for DefaultProbeGateway {
    async fn dns_query(
        &self,
        domain: &str,
        record_type: DnsQueryType,
        resolver: Option<&str>,
    ) -> ProbeResult<DnsQueryResult> {
        self.service
            .query_record(domain, &record_type.to_string(), resolver)
            .await
    }

    async fn resolver_performance(
        &self,
        domain: &str,
        record_type: DnsQueryType,
    ) -> ProbeResult<ResolverPerformanceResult> {
        self.service
            .resolver_performance(domain, &record_type.to_string())
            .await
    }

    async fn zone_transfer_check(
        &self,
        domain: &str,
        nameserver: Option<&str>,
    ) -> ProbeResult<ZoneTransferResult> {
        self.service.zone_transfer_check(domain, nameserver).await
    }

    async fn blacklist_check(&self, target: &str) -> ProbeResult<BlacklistCheckResult> {
        self.service.blacklist_check(target).await
    }

    async fn tls_certificate(
        &self,
        host: &str,
        port: Option<u16>,
    ) -> ProbeResult<TlsCertificateResult> {
        self.service.tls_certificate(host, port).await
    }

    async fn tls_versions(&self, host: &str, port: Option<u16>) -> ProbeResult<TlsVersionsResult> {
        self.service.tls_versions(host, port).await
    }

    async fn tls_alpn(
        &self,
        host: &str,
        port: Option<u16>,
        protocols: Option<Vec<String>>,
    ) -> ProbeResult<AlpnResult> {
        self.service.tls_alpn(host, port, protocols).await
    }

    async fn tls_ocsp(&self, host: &str, port: Option<u16>) -> ProbeResult<OcspStaplingResult> {
        self.service.tls_ocsp(host, port).await
    }

    async fn tls_cipher_assessment(
        &self,
        host: &str,
        port: Option<u16>,
    ) -> ProbeResult<CipherAssessmentResult> {
        self.service.tls_cipher_assessment(host, port).await
    }
}

/// Sanitize error messages to prevent sensitive information leakage.
///
/// Logs the full error to stderr but returns a generic message to the client.
fn sanitize_internal_error(error: impl std::fmt::Display, context: &str) -> McpError {
    log::error!("{context} error: {error}");
    McpError::internal_error(
        format!("{context} failed - check server logs for details"),
        None,
    )
}

/// Validation failures are the caller's fault; everything else is reported as internal.
fn map_probe_error(context: &str, error: &ProbeError) -> McpError {
    log::warn!("{context} error: {error}");
    match error {
        ProbeError::ValidationError(_) => McpError::invalid_params(error.to_string(), None),
        _ => McpError::internal_error(error.to_string(), None),
    }
}

/// Execute a probe with timeout, error mapping, and JSON serialization.
async fn run_probe_tool<T: serde::Serialize>(
    duration: Duration,
    future: impl std::future::Future<Output = ProbeResult<T>>,
    tool_name: &str,
) -> Result<CallToolResult, McpError> {
    let result = timeout(duration, future)
        .await
        .map_err(|_| McpError::internal_error(format!("{tool_name} timeout"), None))?
        .map_err(|e| map_probe_error(tool_name, &e))?;

    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| sanitize_internal_error(e, &format!("Serialize {tool_name} result")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// MCP Server for netprobe.
///
/// Provides AI agents with DNS and TLS diagnostics through the Model Context Protocol.
#[derive(Clone)]
pub struct NetprobeMcp {
    /// Probe gateway (the engine in production, a mock in tests).
    probes: Arc<dyn ProbeGateway>,
    /// Outer timeout configuration per tool.
    timeouts: ToolTimeouts,
    /// Tool router generated by macro.
    tool_router: ToolRouter<Self>,
}

impl NetprobeMcp {
    /// Create a new MCP server instance backed by `service`.
    #[must_use]
    pub fn new(service: ProbeService, timeouts: ToolTimeouts) -> Self {
        Self::with_gateway(Arc::new(DefaultProbeGateway { service }), timeouts)
    }

    fn with_gateway(probes: Arc<dyn ProbeGateway>, timeouts: ToolTimeouts) -> Self {
        Self {
            probes,
            timeouts,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl NetprobeMcp {
    /// Query one record type.
    #[tool(
        description = "Query one DNS record type (A, AAAA, MX, TXT, NS, CNAME, SOA) against an explicit or the default resolver"
    )]
    async fn dns_query(
        &self,
        Parameters(params): Parameters<DnsQueryParams>,
    ) -> Result<CallToolResult, McpError> {
        run_probe_tool(
            self.timeouts.dns_query,
            self.probes.dns_query(
                &params.domain,
                params.record_type,
                params.resolver.as_deref(),
            ),
            "DNS query",
        )
        .await
    }

    /// Benchmark public resolvers.
    #[tool(
        description = "Compare response times of 8 public DNS resolvers for a domain (fastest, slowest, average, median, success rate)"
    )]
    async fn resolver_performance(
        &self,
        Parameters(params): Parameters<ResolverPerformanceParams>,
    ) -> Result<CallToolResult, McpError> {
        run_probe_tool(
            self.timeouts.resolver_performance,
            self.probes.resolver_performance(
                &params.domain,
                params.record_type.unwrap_or(DnsQueryType::A),
            ),
            "Resolver performance",
        )
        .await
    }

    /// Test authoritative nameservers for open AXFR.
    #[tool(
        description = "Test a zone's authoritative nameservers for open zone transfers (AXFR)"
    )]
    async fn zone_transfer_check(
        &self,
        Parameters(params): Parameters<ZoneTransferParams>,
    ) -> Result<CallToolResult, McpError> {
        run_probe_tool(
            self.timeouts.zone_transfer,
            self.probes
                .zone_transfer_check(&params.domain, params.nameserver.as_deref()),
            "Zone transfer check",
        )
        .await
    }

    /// Check DNS blacklists.
    #[tool(
        description = "Check an IP address or domain against DNS blacklists (RBL/DBL zones such as Spamhaus)"
    )]
    async fn blacklist_check(
        &self,
        Parameters(params): Parameters<BlacklistCheckParams>,
    ) -> Result<CallToolResult, McpError> {
        run_probe_tool(
            self.timeouts.blacklist,
            self.probes.blacklist_check(&params.target),
            "Blacklist check",
        )
        .await
    }

    #[tool(
        description = "Retrieve a TLS server's certificate chain with negotiated protocol, cipher and ALPN"
    )]
    async fn tls_certificate(
        &self,
        Parameters(params): Parameters<TlsHostParams>,
    ) -> Result<CallToolResult, McpError> {
        run_probe_tool(
            self.timeouts.tls_handshake,
            self.probes.tls_certificate(&params.host, params.port),
            "TLS certificate",
        )
        .await
    }

    #[tool(description = "Probe which TLS protocol versions (1.0 to 1.3) a server accepts")]
    async fn tls_versions(
        &self,
        Parameters(params): Parameters<TlsHostParams>,
    ) -> Result<CallToolResult, McpError> {
        run_probe_tool(
            self.timeouts.tls_scan,
            self.probes.tls_versions(&params.host, params.port),
            "TLS versions",
        )
        .await
    }

    #[tool(description = "Offer ALPN protocols to a TLS server and report the negotiated one")]
    async fn tls_alpn(
        &self,
        Parameters(params): Parameters<TlsAlpnParams>,
    ) -> Result<CallToolResult, McpError> {
        run_probe_tool(
            self.timeouts.tls_handshake,
            self.probes
                .tls_alpn(&params.host, params.port, params.protocols),
            "TLS ALPN",
        )
        .await
    }

    #[tool(description = "Check whether a TLS server staples an OCSP response")]
    async fn tls_ocsp(
        &self,
        Parameters(params): Parameters<TlsHostParams>,
    ) -> Result<CallToolResult, McpError> {
        run_probe_tool(
            self.timeouts.tls_handshake,
            self.probes.tls_ocsp(&params.host, params.port),
            "TLS OCSP",
        )
        .await
    }

    #[tool(
        description = "Grade a TLS server (A/B/D/F) against Modern, Intermediate and Legacy cipher presets"
    )]
    async fn tls_cipher_assessment(
        &self,
        Parameters(params): Parameters<TlsHostParams>,
    ) -> Result<CallToolResult, McpError> {
        run_probe_tool(
            self.timeouts.tls_scan,
            self.probes.tls_cipher_assessment(&params.host, params.port),
            "TLS cipher assessment",
        )
        .await
    }
}

#[tool_handler]
impl ServerHandler for NetprobeMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "netprobe MCP Server - Network diagnostics probes. \
                 DNS tools: dns_query, resolver_performance, zone_transfer_check, blacklist_check. \
                 TLS tools: tls_certificate, tls_versions, tls_alpn, tls_ocsp, tls_cipher_assessment. \
                 Results are JSON with per-endpoint details, a summary and an ISO-8601 timestamp."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
#[path = "test_mocks.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
pub(crate) mod test_mocks;

#[cfg(test)]
#[path = "server_tests.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests;
