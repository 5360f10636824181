//! DNS blacklist (RBL / DBL) check.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use log::{debug, warn};

use crate::error::{ProbeError, ProbeFailure, ProbeResult};
use crate::settings::ProbeSettings;
use crate::types::{
    BlacklistCheckResult, BlacklistResult, BlacklistSummary, BlacklistZone, DnsQueryType,
    Endpoint, ListingStatus, ProbeOutcome, ProbeTarget, TargetKind, ZoneType, timestamp_now,
};

use super::dns::{DNS_PORT, DnsClient};
use super::{parse_resolver, run_bounded};

/// TXT fragments that mark an answer as the zone declining the query.
///
/// Listing reasons routinely say "blocked" or "not allowed" about the listed host,
/// so only phrases about the query or the querying resolver qualify.
const REFUSAL_PHRASES: &[&str] = &[
    "open resolver",
    "query refused",
    "queries refused",
    "access denied",
    "please use",
    "query blocked",
    "queries blocked",
    "query rate limit",
    "queries rate limited",
    "query not allowed",
    "queries not allowed",
    "not allowed to query",
];

/// Slack on top of the per-query timeout for one zone lookup.
const LOOKUP_MARGIN: Duration = Duration::from_millis(500);

/// One (zone, key) lookup sent to the resolver endpoint.
struct Lookup<'a> {
    zone: &'a BlacklistZone,
    target: String,
    endpoint: Endpoint,
}

/// Answer of one zone lookup that the zone did not decline.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ZoneAnswer {
    /// The zone returned listing addresses (and possibly TXT reasons).
    Listed { codes: Vec<String>, txt: Vec<String> },
    /// NXDOMAIN / NODATA.
    NotListed,
}

/// Check `target` against every applicable blacklist zone.
pub(crate) async fn blacklist_check(
    settings: &ProbeSettings,
    target: &ProbeTarget,
) -> ProbeResult<BlacklistCheckResult> {
    let resolver = parse_resolver(&settings.default_resolver)?;
    let client = DnsClient::new(settings.blacklist_timeout());

    let (ips, resolved_ips) = match target.kind {
        TargetKind::Domain => {
            let ips = resolve_domain(settings, resolver, &target.value).await?;
            let resolved = ips.iter().map(ToString::to_string).collect();
            (ips, resolved)
        }
        TargetKind::Ipv4 | TargetKind::Ipv6 => {
            let ip: IpAddr = target.value.parse().map_err(|_| {
                ProbeError::ValidationError(format!("Invalid IP address: {}", target.value))
            })?;
            (vec![ip], vec![])
        }
    };

    let lookups = build_lookups(&settings.blacklist_zones, target, &ips, resolver);
    debug!(
        "[RBL] {} lookup(s) for {} across {} zone(s)",
        lookups.len(),
        target.value,
        settings.blacklist_zones.len()
    );

    let server = SocketAddr::new(resolver, DNS_PORT);
    let operations: Vec<_> = lookups
        .iter()
        .map(|lookup| {
            lookup_zone(
                client,
                server,
                lookup.endpoint.zone_or_query.clone(),
                lookup.zone.refusal_codes.clone(),
            )
        })
        .collect();
    let outcomes = run_bounded(operations, lookup_budget(settings), settings.concurrency).await?;

    let results: Vec<BlacklistResult> = lookups
        .into_iter()
        .zip(outcomes)
        .map(|(lookup, outcome)| to_result(lookup, outcome))
        .collect();

    let summary = summarize(&results);
    if summary.is_listed {
        warn!(
            "[RBL] {} is listed on {} zone(s)",
            target.value, summary.listed_count
        );
    }

    Ok(BlacklistCheckResult {
        target: target.clone(),
        resolved_ips,
        results,
        summary,
        timestamp: timestamp_now(),
    })
}

/// Runner budget for one lookup; its A and TXT queries each carry the lookup timeout.
fn lookup_budget(settings: &ProbeSettings) -> Duration {
    settings.blacklist_timeout() + LOOKUP_MARGIN
}

/// A and AAAA addresses of `domain`.
async fn resolve_domain(
    settings: &ProbeSettings,
    resolver: IpAddr,
    domain: &str,
) -> ProbeResult<Vec<IpAddr>> {
    let client = DnsClient::new(settings.dns_timeout());
    let (v4, v6) = tokio::join!(
        client.query_record(resolver, domain, DnsQueryType::A),
        client.query_record(resolver, domain, DnsQueryType::Aaaa),
    );

    let ips: Vec<IpAddr> = v4
        .unwrap_or_default()
        .into_iter()
        .chain(v6.unwrap_or_default())
        .filter_map(|a| a.parse().ok())
        .collect();

    if ips.is_empty() {
        return Err(ProbeError::ResolutionError(format!(
            "No IP addresses found for {domain}"
        )));
    }
    Ok(ips)
}

/// Domain zones keyed on the domain itself, IP zones keyed on each reversed address.
fn build_lookups<'a>(
    zones: &'a [BlacklistZone],
    target: &ProbeTarget,
    ips: &[IpAddr],
    resolver: IpAddr,
) -> Vec<Lookup<'a>> {
    let lookup = |zone: &'a BlacklistZone, key: String, query: String| Lookup {
        zone,
        target: key,
        endpoint: Endpoint {
            address: resolver.to_string(),
            label: zone.zone.clone(),
            zone_or_query: query,
        },
    };

    let mut lookups = Vec::new();
    for zone in zones {
        match zone.zone_type {
            ZoneType::Domain if target.kind == TargetKind::Domain => lookups.push(lookup(
                zone,
                target.value.clone(),
                format!("{}.{}", target.value, zone.zone),
            )),
            ZoneType::Domain => {}
            ZoneType::Ip => {
                for ip in ips {
                    lookups.push(lookup(
                        zone,
                        ip.to_string(),
                        format!("{}.{}", reverse_ip(ip), zone.zone),
                    ));
                }
            }
        }
    }
    lookups
}

/// A and TXT lookups of one zone key, run together.
///
/// A declined answer becomes [`ProbeFailure::Ambiguous`]. A failed TXT query keeps
/// the verdict of the A answer.
async fn lookup_zone(
    client: DnsClient,
    server: SocketAddr,
    query: String,
    refusal_codes: Vec<String>,
) -> Result<ZoneAnswer, ProbeFailure> {
    let (addresses, txt) = tokio::join!(
        client.query_at(server, &query, DnsQueryType::A),
        client.query_at(server, &query, DnsQueryType::Txt),
    );

    match addresses {
        Ok(codes) => {
            let txt = txt.unwrap_or_default();
            match classify_listing(&codes, &txt, &refusal_codes) {
                (ListingStatus::Error, detail) => Err(ProbeFailure::Ambiguous(
                    detail.unwrap_or_else(|| "Zone declined the query".to_string()),
                )),
                _ => Ok(ZoneAnswer::Listed { codes, txt }),
            }
        }
        Err(e) if e.is_negative_answer() => Ok(ZoneAnswer::NotListed),
        Err(e) => Err(e.into()),
    }
}

fn to_result(lookup: Lookup<'_>, outcome: ProbeOutcome<ZoneAnswer>) -> BlacklistResult {
    let response_time = outcome.elapsed_ms();
    let (status, return_codes, reason, error) = match outcome {
        ProbeOutcome::Success {
            value: ZoneAnswer::NotListed,
            ..
        } => (ListingStatus::Clean, vec![], None, None),
        ProbeOutcome::Success {
            value: ZoneAnswer::Listed { codes, txt },
            ..
        } => {
            let reason = (!txt.is_empty()).then(|| txt.join("; "));
            (ListingStatus::Listed, codes, reason, None)
        }
        ProbeOutcome::Refused { .. } => (
            ListingStatus::Error,
            vec![],
            None,
            Some("Query refused".to_string()),
        ),
        ProbeOutcome::Timeout { .. } => (
            ListingStatus::Error,
            vec![],
            None,
            Some("Lookup timed out".to_string()),
        ),
        ProbeOutcome::NetworkError { detail, .. } | ProbeOutcome::AmbiguousError { detail, .. } => {
            (ListingStatus::Error, vec![], None, Some(detail))
        }
    };

    BlacklistResult {
        zone: lookup.endpoint.label,
        zone_type: lookup.zone.zone_type,
        target: lookup.target,
        query: lookup.endpoint.zone_or_query,
        status,
        listed: status == ListingStatus::Listed,
        return_codes,
        reason,
        error,
        response_time,
    }
}

/// Decide whether a positive zone answer is a listing or an error response.
///
/// Addresses in `127.255.0.0/16`, zone-specific refusal codes and TXT refusal phrases
/// all mean the zone declined to answer.
fn classify_listing(
    codes: &[String],
    txt: &[String],
    refusal_codes: &[String],
) -> (ListingStatus, Option<String>) {
    for code in codes {
        if refusal_codes.contains(code) {
            return (
                ListingStatus::Error,
                Some(format!("Zone refused the query (return code {code})")),
            );
        }
        if let Ok(ip) = code.parse::<Ipv4Addr>()
            && is_error_range(ip)
        {
            return (
                ListingStatus::Error,
                Some(format!("Zone returned error code {code}")),
            );
        }
    }

    for record in txt {
        let lower = record.to_lowercase();
        if REFUSAL_PHRASES.iter().any(|phrase| lower.contains(phrase)) {
            return (
                ListingStatus::Error,
                Some(format!("Zone refused the query: {record}")),
            );
        }
    }

    (ListingStatus::Listed, None)
}

/// `127.255.0.0/16`, used by blacklist operators for error answers.
fn is_error_range(ip: Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();
    a == 127 && b == 255
}

fn summarize(results: &[BlacklistResult]) -> BlacklistSummary {
    let count = |status| results.iter().filter(|r| r.status == status).count();
    let listed_count = count(ListingStatus::Listed);
    BlacklistSummary {
        total_checked: results.len(),
        listed_count,
        clean_count: count(ListingStatus::Clean),
        error_count: count(ListingStatus::Error),
        is_listed: listed_count > 0,
    }
}

fn reverse_ip(ip: &IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => reverse_ipv4(*v4),
        IpAddr::V6(v6) => reverse_ipv6(*v6),
    }
}

/// `1.2.3.4` → `4.3.2.1`.
pub(crate) fn reverse_ipv4(ip: Ipv4Addr) -> String {
    let [a, b, c, d] = ip.octets();
    format!("{d}.{c}.{b}.{a}")
}

/// Fully expanded address as 32 nibbles in reverse order, dot separated.
pub(crate) fn reverse_ipv6(ip: Ipv6Addr) -> String {
    let expanded: String = ip
        .segments()
        .iter()
        .map(|segment| format!("{segment:04x}"))
        .collect();
    let nibbles: Vec<String> = expanded.chars().rev().map(String::from).collect();
    nibbles.join(".")
}
