use super::test_mocks::*;
use super::*;

use crate::schemas::{
    BlacklistCheckParams, DnsQueryParams, ResolverPerformanceParams, TlsAlpnParams,
    TlsHostParams, ZoneTransferParams,
};

fn tls_params(host: &str, port: Option<u16>) -> Parameters<TlsHostParams> {
    Parameters(TlsHostParams {
        host: host.to_string(),
        port,
    })
}

#[test]
fn sanitize_internal_error_hides_error_details() {
    let error = sanitize_internal_error("sensitive: /etc/resolv.conf", "Serialize result");
    let message = error.to_string();
    assert!(message.contains("Serialize result failed"));
    assert!(!message.contains("resolv.conf"));
}

#[test]
fn tool_timeouts_uniform_applies_to_every_tool() {
    let limit = Duration::from_secs(7);
    let timeouts = ToolTimeouts::uniform(limit);
    assert_eq!(timeouts.dns_query, limit);
    assert_eq!(timeouts.zone_transfer, limit);
    assert_eq!(timeouts.tls_scan, limit);
    assert_ne!(ToolTimeouts::default(), timeouts);
}

#[tokio::test]
async fn dns_query_uses_gateway_arguments() {
    let probes = Arc::new(MockProbeGateway::default());
    let server = build_server(
        Arc::clone(&probes) as Arc<dyn ProbeGateway>,
        ToolTimeouts::default(),
    );

    let result = server
        .dns_query(Parameters(DnsQueryParams {
            domain: "example.com".to_string(),
            record_type: DnsQueryType::Mx,
            resolver: Some("1.1.1.1".to_string()),
        }))
        .await
        .unwrap();
    assert!(result_text(&result).contains("192.0.2.1"));

    let calls = probes.dns_query_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "example.com");
    assert_eq!(calls[0].1, DnsQueryType::Mx);
    assert_eq!(calls[0].2, Some("1.1.1.1".to_string()));
}

#[tokio::test]
async fn dns_query_network_error_message_is_returned() {
    let probes = Arc::new(MockProbeGateway::default());
    probes
        .set_failure(Some(MockFailure::Network(
            "mock resolver unreachable".to_string(),
        )))
        .await;
    let server = build_server(
        Arc::clone(&probes) as Arc<dyn ProbeGateway>,
        ToolTimeouts::default(),
    );

    let error = server
        .dns_query(Parameters(DnsQueryParams {
            domain: "example.com".to_string(),
            record_type: DnsQueryType::A,
            resolver: None,
        }))
        .await
        .unwrap_err();

    assert_eq!(error.code, rmcp::model::ErrorCode::INTERNAL_ERROR);
    assert!(error.to_string().contains("mock resolver unreachable"));
}

#[tokio::test]
async fn validation_error_maps_to_invalid_params() {
    let probes = Arc::new(MockProbeGateway::default());
    probes
        .set_failure(Some(MockFailure::Validation(
            "Invalid domain name: bad!".to_string(),
        )))
        .await;
    let server = build_server(
        Arc::clone(&probes) as Arc<dyn ProbeGateway>,
        ToolTimeouts::default(),
    );

    let error = server
        .blacklist_check(Parameters(BlacklistCheckParams {
            target: "bad!".to_string(),
        }))
        .await
        .unwrap_err();

    assert_eq!(error.code, rmcp::model::ErrorCode::INVALID_PARAMS);
    assert!(error.to_string().contains("Invalid domain name"));
}

#[tokio::test]
async fn slow_probe_returns_timeout_error() {
    let probes = Arc::new(MockProbeGateway::default());
    probes.set_delay(Some(Duration::from_millis(50))).await;

    let timeouts = ToolTimeouts {
        zone_transfer: Duration::from_millis(5),
        ..ToolTimeouts::default()
    };
    let server = build_server(Arc::clone(&probes) as Arc<dyn ProbeGateway>, timeouts);

    let error = server
        .zone_transfer_check(Parameters(ZoneTransferParams {
            domain: "example.com".to_string(),
            nameserver: None,
        }))
        .await
        .unwrap_err();

    assert!(error.to_string().contains("Zone transfer check timeout"));
}

#[tokio::test]
async fn resolver_performance_defaults_to_a_records() {
    let probes = Arc::new(MockProbeGateway::default());
    let server = build_server(
        Arc::clone(&probes) as Arc<dyn ProbeGateway>,
        ToolTimeouts::default(),
    );

    let result = server
        .resolver_performance(Parameters(ResolverPerformanceParams {
            domain: "example.com".to_string(),
            record_type: None,
        }))
        .await
        .unwrap();
    assert!(result_text(&result).contains("successRate"));

    assert_eq!(
        probes.calls().await,
        vec![("resolver_performance", "example.com A".to_string())]
    );
}

#[tokio::test]
async fn probe_tools_delegate_to_gateway() {
    let probes = Arc::new(MockProbeGateway::default());
    let server = build_server(
        Arc::clone(&probes) as Arc<dyn ProbeGateway>,
        ToolTimeouts::default(),
    );

    assert!(server
        .zone_transfer_check(Parameters(ZoneTransferParams {
            domain: "example.com".to_string(),
            nameserver: Some("ns1.example.com".to_string()),
        }))
        .await
        .is_ok());
    assert!(server
        .blacklist_check(Parameters(BlacklistCheckParams {
            target: "192.0.2.1".to_string(),
        }))
        .await
        .is_ok());
    assert!(server
        .tls_certificate(tls_params("example.com", None))
        .await
        .is_ok());
    assert!(server
        .tls_versions(tls_params("example.com", Some(8443)))
        .await
        .is_ok());
    assert!(server
        .tls_alpn(Parameters(TlsAlpnParams {
            host: "example.com".to_string(),
            port: None,
            protocols: Some(vec!["h2".to_string()]),
        }))
        .await
        .is_ok());
    assert!(server.tls_ocsp(tls_params("example.com", None)).await.is_ok());
    let assessment = server
        .tls_cipher_assessment(tls_params("example.com", None))
        .await
        .unwrap();
    assert!(result_text(&assessment).contains("grade"));

    assert_eq!(
        probes.calls().await,
        vec![
            ("zone_transfer_check", "example.com ns1.example.com".to_string()),
            ("blacklist_check", "192.0.2.1".to_string()),
            ("tls_certificate", "example.com:443".to_string()),
            ("tls_versions", "example.com:8443".to_string()),
            ("tls_alpn", "example.com:443 h2".to_string()),
            ("tls_ocsp", "example.com:443".to_string()),
            ("tls_cipher_assessment", "example.com:443".to_string()),
        ]
    );
}

#[tokio::test]
async fn get_info_lists_every_tool() {
    let server = build_server(
        Arc::new(MockProbeGateway::default()),
        ToolTimeouts::default(),
    );

    let info = server.get_info();

    assert_eq!(info.protocol_version, ProtocolVersion::LATEST);
    let instructions = info.instructions.unwrap_or_default();
    for tool in [
        "dns_query",
        "resolver_performance",
        "zone_transfer_check",
        "blacklist_check",
        "tls_certificate",
        "tls_versions",
        "tls_alpn",
        "tls_ocsp",
        "tls_cipher_assessment",
    ] {
        assert!(instructions.contains(tool), "missing {tool}");
    }
}

#[tokio::test]
async fn run_probe_tool_success_returns_json() {
    let future = async { Ok::<_, ProbeError>("hello".to_string()) };
    let result = run_probe_tool(Duration::from_secs(1), future, "test tool")
        .await
        .unwrap();
    assert!(result_text(&result).contains("hello"));
}

#[tokio::test]
async fn run_probe_tool_timeout_returns_error() {
    let future = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, ProbeError>("late".to_string())
    };
    let error = run_probe_tool(Duration::from_millis(5), future, "slow tool")
        .await
        .unwrap_err();
    assert!(error.to_string().contains("slow tool timeout"));
}

#[tokio::test]
async fn run_probe_tool_error_maps_probe_error() {
    let future = async { Err::<String, _>(ProbeError::ResolutionError("no NS records".into())) };
    let error = run_probe_tool(Duration::from_secs(1), future, "fail tool")
        .await
        .unwrap_err();
    assert!(error.to_string().contains("no NS records"));
}
