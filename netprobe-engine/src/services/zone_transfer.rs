//! Zone-transfer (AXFR) vulnerability check.

use std::net::IpAddr;
use std::time::Duration;

use log::{debug, warn};

use crate::error::{DnsError, ProbeError, ProbeResult};
use crate::settings::ProbeSettings;
use crate::types::{
    DnsQueryType, NameserverResult, ProbeOutcome, TransferStatus, ZoneTransferResult,
    ZoneTransferSummary, timestamp_now,
};

use super::dns::{DnsClient, classify_transfer, transport_error};
use super::{parse_resolver, run_bounded};

/// Attempt an AXFR of `domain` from each of its nameservers (or from `nameserver` only).
pub(crate) async fn zone_transfer_check(
    settings: &ProbeSettings,
    domain: &str,
    nameserver: Option<&str>,
) -> ProbeResult<ZoneTransferResult> {
    let resolver = parse_resolver(&settings.default_resolver)?;
    let lookup = DnsClient::new(settings.dns_timeout());
    let transfer = DnsClient::new(settings.zone_transfer_timeout());

    let nameservers = match nameserver {
        Some(ns) => vec![ns.to_string()],
        None => discover_nameservers(&lookup, resolver, domain, settings.max_nameservers).await?,
    };
    debug!("[AXFR] Testing {} nameserver(s) for {domain}", nameservers.len());

    let operations: Vec<_> = nameservers
        .iter()
        .map(|ns| async move {
            let ip = resolve_nameserver(&lookup, resolver, ns).await?;
            let transcript = transfer.zone_transfer(domain, ip).await;
            Ok::<_, DnsError>((ip, transcript))
        })
        .collect();

    // Leave room for the nameserver address lookup ahead of the transfer itself.
    let per_nameserver = settings.zone_transfer_timeout() + settings.dns_timeout();
    let outcomes = run_bounded(operations, per_nameserver, settings.concurrency).await?;

    let results: Vec<NameserverResult> = nameservers
        .into_iter()
        .zip(outcomes)
        .map(|(ns, outcome)| {
            to_result(ns, outcome, settings.transfer_sample_lines, per_nameserver)
        })
        .collect();

    let summary = summarize(&results);
    if summary.vulnerable > 0 {
        warn!(
            "[AXFR] {domain}: {} of {} nameserver(s) allow zone transfers",
            summary.vulnerable, summary.total
        );
    }

    Ok(ZoneTransferResult {
        domain: domain.to_string(),
        nameservers: results,
        summary,
        timestamp: timestamp_now(),
    })
}

/// NS host names of `domain`, deduplicated and capped at `limit`.
async fn discover_nameservers(
    client: &DnsClient,
    resolver: IpAddr,
    domain: &str,
    limit: usize,
) -> ProbeResult<Vec<String>> {
    let records = client
        .query_record(resolver, domain, DnsQueryType::Ns)
        .await
        .map_err(|e| {
            ProbeError::ResolutionError(format!("No NS records found for {domain}: {e}"))
        })?;

    let mut nameservers: Vec<String> = Vec::new();
    for ns in records {
        let ns = ns.to_lowercase();
        if !nameservers.contains(&ns) {
            nameservers.push(ns);
        }
    }
    nameservers.truncate(limit);

    if nameservers.is_empty() {
        return Err(ProbeError::ResolutionError(format!(
            "No NS records found for {domain}"
        )));
    }
    Ok(nameservers)
}

/// Address of a nameserver: taken as is when it is an IP, else A then AAAA.
async fn resolve_nameserver(
    client: &DnsClient,
    resolver: IpAddr,
    nameserver: &str,
) -> Result<IpAddr, DnsError> {
    if let Ok(ip) = nameserver.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addresses = match client
        .query_record(resolver, nameserver, DnsQueryType::A)
        .await
    {
        Ok(v4) => v4,
        Err(_) => client
            .query_record(resolver, nameserver, DnsQueryType::Aaaa)
            .await
            .map_err(|e| {
                DnsError::Protocol(format!("Could not resolve {nameserver}: {e}"))
            })?,
    };

    addresses
        .iter()
        .find_map(|a| a.parse().ok())
        .ok_or_else(|| DnsError::Protocol(format!("Could not resolve {nameserver}")))
}

fn to_result(
    nameserver: String,
    outcome: ProbeOutcome<(IpAddr, String)>,
    sample_lines: usize,
    limit: Duration,
) -> NameserverResult {
    let response_time = outcome.elapsed_ms();
    match outcome {
        ProbeOutcome::Success {
            value: (ip, transcript),
            ..
        } => {
            let classification = classify_transfer(&transcript, sample_lines);
            let vulnerable = classification.status == TransferStatus::Vulnerable;
            let error = if vulnerable {
                None
            } else {
                transport_error(&transcript)
            };
            let status = if error.is_some() {
                TransferStatus::Error
            } else {
                classification.status
            };
            NameserverResult {
                nameserver,
                ip: Some(ip.to_string()),
                status,
                vulnerable,
                record_count: classification.record_count,
                records: classification.sample,
                response_time,
                error,
            }
        }
        ProbeOutcome::Timeout { .. } => NameserverResult {
            nameserver,
            ip: None,
            status: TransferStatus::Timeout,
            vulnerable: false,
            record_count: 0,
            records: vec![],
            response_time,
            error: Some(format!("Timed out after {}s", limit.as_secs())),
        },
        ProbeOutcome::Refused { .. } => NameserverResult {
            nameserver,
            ip: None,
            status: TransferStatus::Error,
            vulnerable: false,
            record_count: 0,
            records: vec![],
            response_time,
            error: Some("Address lookup refused".to_string()),
        },
        ProbeOutcome::NetworkError { detail, .. } | ProbeOutcome::AmbiguousError { detail, .. } => {
            NameserverResult {
                nameserver,
                ip: None,
                status: TransferStatus::Error,
                vulnerable: false,
                record_count: 0,
                records: vec![],
                response_time,
                error: Some(detail),
            }
        }
    }
}

/// Partition results into vulnerable, secure and errored.
fn summarize(results: &[NameserverResult]) -> ZoneTransferSummary {
    let vulnerable = results.iter().filter(|r| r.vulnerable).count();
    let errors = results
        .iter()
        .filter(|r| !r.vulnerable && r.error.is_some())
        .count();
    ZoneTransferSummary {
        total: results.len(),
        vulnerable,
        secure: results.len() - vulnerable - errors,
        errors,
    }
}
