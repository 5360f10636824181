use super::*;

use netprobe_engine::{
    BlacklistSummary, ProbeTarget, ResolverStatistics, TargetKind, TimingEntry, ZoneTransferSummary,
};
use tokio::sync::Mutex;

const TIMESTAMP: &str = "2024-01-01T00:00:00.000Z";

/// Failure injected into every mock probe.
#[derive(Clone, Debug)]
pub enum MockFailure {
    Validation(String),
    Network(String),
}

impl MockFailure {
    fn to_error(&self) -> ProbeError {
        match self {
            Self::Validation(m) => ProbeError::ValidationError(m.clone()),
            Self::Network(m) => ProbeError::NetworkError(m.clone()),
        }
    }
}

/// Records every call and answers with fixed results.
#[derive(Default)]
pub struct MockProbeGateway {
    dns_query_calls: Mutex<Vec<(String, DnsQueryType, Option<String>)>>,
    calls: Mutex<Vec<(&'static str, String)>>,
    delay: Mutex<Option<Duration>>,
    failure: Mutex<Option<MockFailure>>,
}

impl MockProbeGateway {
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().await = delay;
    }

    pub async fn set_failure(&self, failure: Option<MockFailure>) {
        *self.failure.lock().await = failure;
    }

    pub async fn dns_query_calls(&self) -> Vec<(String, DnsQueryType, Option<String>)> {
        self.dns_query_calls.lock().await.clone()
    }

    /// `(tool, arguments)` for every call except `dns_query`.
    pub async fn calls(&self) -> Vec<(&'static str, String)> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, tool: &'static str, args: String) -> ProbeResult<()> {
        self.calls.lock().await.push((tool, args));
        self.behave().await
    }

    async fn behave(&self) -> ProbeResult<()> {
        if let Some(delay) = *self.delay.lock().await {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().await.as_ref() {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

fn host_port(host: &str, port: Option<u16>) -> String {
    format!("{host}:{}", port.unwrap_or(443))
}

#[async_trait]
impl ProbeGateway for MockProbeGateway {
    async fn dns_query(
        &self,
        domain: &str,
        record_type: DnsQueryType,
        resolver: Option<&str>,
    ) -> ProbeResult<DnsQueryResult> {
        self.dns_query_calls.lock().await.push((
            domain.to_string(),
            record_type,
            resolver.map(ToString::to_string),
        ));
        self.behave().await?;

        Ok(DnsQueryResult {
            domain: domain.to_string(),
            record_type,
            resolver: resolver.unwrap_or("127.0.0.53").to_string(),
            records: vec!["192.0.2.1".to_string()],
            response_time: 12,
            timestamp: TIMESTAMP.to_string(),
        })
    }

    async fn resolver_performance(
        &self,
        domain: &str,
        record_type: DnsQueryType,
    ) -> ProbeResult<ResolverPerformanceResult> {
        self.record("resolver_performance", format!("{domain} {record_type}"))
            .await?;
        let entry = TimingEntry {
            resolver: "Mock DNS".to_string(),
            time: 10,
        };
        Ok(ResolverPerformanceResult {
            domain: domain.to_string(),
            record_type,
            results: vec![],
            statistics: ResolverStatistics {
                fastest: entry.clone(),
                slowest: entry,
                average: 10.0,
                median: 10.0,
                success_rate: 100,
                successful: 1,
                total: 1,
            },
            total_time: 10,
            timestamp: TIMESTAMP.to_string(),
        })
    }

    async fn zone_transfer_check(
        &self,
        domain: &str,
        nameserver: Option<&str>,
    ) -> ProbeResult<ZoneTransferResult> {
        self.record(
            "zone_transfer_check",
            format!("{domain} {}", nameserver.unwrap_or("-")),
        )
        .await?;
        Ok(ZoneTransferResult {
            domain: domain.to_string(),
            nameservers: vec![],
            summary: ZoneTransferSummary {
                total: 0,
                vulnerable: 0,
                secure: 0,
                errors: 0,
            },
            timestamp: TIMESTAMP.to_string(),
        })
    }

    async fn blacklist_check(&self, target: &str) -> ProbeResult<BlacklistCheckResult> {
        self.record("blacklist_check", target.to_string()).await?;
        Ok(BlacklistCheckResult {
            target: ProbeTarget {
                value: target.to_string(),
                kind: TargetKind::Ipv4,
            },
            resolved_ips: vec![],
            results: vec![],
            summary: BlacklistSummary {
                total_checked: 0,
                listed_count: 0,
                clean_count: 0,
                error_count: 0,
                is_listed: false,
            },
            timestamp: TIMESTAMP.to_string(),
        })
    }

    async fn tls_certificate(
        &self,
        host: &str,
        port: Option<u16>,
    ) -> ProbeResult<TlsCertificateResult> {
        self.record("tls_certificate", host_port(host, port)).await?;
        Ok(TlsCertificateResult {
            host: host.to_string(),
            port: port.unwrap_or(443),
            protocol: Some("TLSv1.3".to_string()),
            cipher: Some("TLS_AES_128_GCM_SHA256".to_string()),
            alpn_protocol: Some("h2".to_string()),
            ocsp_stapled: false,
            chain: vec![],
            handshake_time: 20,
            timestamp: TIMESTAMP.to_string(),
        })
    }

    async fn tls_versions(&self, host: &str, port: Option<u16>) -> ProbeResult<TlsVersionsResult> {
        self.record("tls_versions", host_port(host, port)).await?;
        Ok(TlsVersionsResult {
            host: host.to_string(),
            port: port.unwrap_or(443),
            versions: vec![],
            supported_versions: vec!["TLSv1.2".to_string(), "TLSv1.3".to_string()],
            min_version: Some("TLSv1.2".to_string()),
            max_version: Some("TLSv1.3".to_string()),
            timestamp: TIMESTAMP.to_string(),
        })
    }

    async fn tls_alpn(
        &self,
        host: &str,
        port: Option<u16>,
        protocols: Option<Vec<String>>,
    ) -> ProbeResult<AlpnResult> {
        let offered = protocols.unwrap_or_default();
        self.record(
            "tls_alpn",
            format!("{} {}", host_port(host, port), offered.join(",")),
        )
        .await?;
        Ok(AlpnResult {
            host: host.to_string(),
            port: port.unwrap_or(443),
            negotiated_protocol: offered.first().cloned(),
            negotiated: !offered.is_empty(),
            offered,
            protocol: Some("TLSv1.3".to_string()),
            error: None,
            timestamp: TIMESTAMP.to_string(),
        })
    }

    async fn tls_ocsp(&self, host: &str, port: Option<u16>) -> ProbeResult<OcspStaplingResult> {
        self.record("tls_ocsp", host_port(host, port)).await?;
        Ok(OcspStaplingResult {
            host: host.to_string(),
            port: port.unwrap_or(443),
            stapled: true,
            response_size: 471,
            recommendation: None,
            timestamp: TIMESTAMP.to_string(),
        })
    }

    async fn tls_cipher_assessment(
        &self,
        host: &str,
        port: Option<u16>,
    ) -> ProbeResult<CipherAssessmentResult> {
        self.record("tls_cipher_assessment", host_port(host, port))
            .await?;
        Ok(CipherAssessmentResult {
            host: host.to_string(),
            port: port.unwrap_or(443),
            presets: vec![],
            grade: "A".to_string(),
            timestamp: TIMESTAMP.to_string(),
        })
    }
}

pub(super) fn build_server(probes: Arc<dyn ProbeGateway>, timeouts: ToolTimeouts) -> NetprobeMcp {
    NetprobeMcp::with_gateway(probes, timeouts)
}

/// Debug rendering of the first content item of a successful tool result.
pub(super) fn result_text(result: &CallToolResult) -> String {
    format!("{:?}", result.content[0])
}
