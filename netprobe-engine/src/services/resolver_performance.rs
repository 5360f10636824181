//! Resolver performance comparison across the public resolver roster.

use std::net::IpAddr;
use std::time::Instant;

use log::debug;

use crate::error::{DnsError, ProbeResult};
use crate::settings::ProbeSettings;
use crate::types::{
    DnsQueryType, ProbeOutcome, PublicResolver, QueryStatus, ResolverPerformanceResult,
    ResolverQueryResult, ResolverStatistics, TimingEntry, timestamp_now,
};

use super::dns::DnsClient;
use super::run_bounded;

/// Placeholder resolver name when no resolver succeeded.
const NO_RESOLVER: &str = "N/A";

/// Query every roster resolver concurrently and rank them.
pub(crate) async fn resolver_performance(
    settings: &ProbeSettings,
    domain: &str,
    record_type: DnsQueryType,
) -> ProbeResult<ResolverPerformanceResult> {
    let client = DnsClient::new(settings.dns_timeout());
    let start_time = Instant::now();

    let operations: Vec<_> = settings
        .resolvers
        .iter()
        .map(|resolver| {
            let ip = resolver.ip.clone();
            async move {
                let ip: IpAddr = ip
                    .parse()
                    .map_err(|_| DnsError::Protocol(format!("Invalid resolver address: {ip}")))?;
                match client.query_record(ip, domain, record_type).await {
                    // The resolver answered; an empty answer still counts as a response.
                    Err(e) if e.is_negative_answer() => Ok(vec![]),
                    other => other,
                }
            }
        })
        .collect();

    let outcomes = run_bounded(operations, settings.dns_timeout(), settings.concurrency).await?;

    let results: Vec<ResolverQueryResult> = settings
        .resolvers
        .iter()
        .zip(outcomes)
        .map(|(resolver, outcome)| to_result(settings, resolver.clone(), outcome))
        .collect();

    let statistics = compute_statistics(&results);

    // u128 -> u64: elapsed millis for the whole comparison will never exceed u64::MAX
    #[allow(clippy::cast_possible_truncation)]
    let total_time = start_time.elapsed().as_millis() as u64;

    debug!(
        "[PERF] {record_type} {domain}: {}/{} resolvers answered in {total_time}ms",
        statistics.successful, statistics.total
    );

    Ok(ResolverPerformanceResult {
        domain: domain.to_string(),
        record_type,
        results,
        statistics,
        total_time,
        timestamp: timestamp_now(),
    })
}

fn to_result(
    settings: &ProbeSettings,
    resolver: PublicResolver,
    outcome: ProbeOutcome<Vec<String>>,
) -> ResolverQueryResult {
    let response_time = outcome.elapsed_ms();
    let (status, records, error) = match outcome {
        ProbeOutcome::Success { value, .. } => (QueryStatus::Success, value, None),
        ProbeOutcome::Refused { .. } => (
            QueryStatus::Refused,
            vec![],
            Some("Query refused".to_string()),
        ),
        ProbeOutcome::Timeout { .. } => (
            QueryStatus::Timeout,
            vec![],
            Some(format!(
                "Query timeout ({}s)",
                settings.dns_timeout().as_secs()
            )),
        ),
        ProbeOutcome::NetworkError { detail, .. } | ProbeOutcome::AmbiguousError { detail, .. } => {
            (QueryStatus::Error, vec![], Some(detail))
        }
    };

    let total_records = records.len();
    let records = records
        .into_iter()
        .take(settings.max_display_records)
        .collect();

    ResolverQueryResult {
        resolver,
        status,
        records,
        total_records,
        error,
        response_time,
    }
}

/// Timing statistics over the successful results.
fn compute_statistics(results: &[ResolverQueryResult]) -> ResolverStatistics {
    let total = results.len();
    let successful: Vec<&ResolverQueryResult> = results
        .iter()
        .filter(|r| r.status == QueryStatus::Success)
        .collect();

    let (Some(fastest), Some(slowest)) = (
        successful.iter().min_by_key(|r| r.response_time),
        successful.iter().max_by_key(|r| r.response_time),
    ) else {
        return ResolverStatistics {
            fastest: placeholder(),
            slowest: placeholder(),
            average: 0.0,
            median: 0.0,
            success_rate: 0,
            successful: 0,
            total,
        };
    };

    let mut times: Vec<u64> = successful.iter().map(|r| r.response_time).collect();
    // usize/u64 -> f64: small counts and millisecond timings, well within f64's
    // precise integer range
    #[allow(clippy::cast_precision_loss)]
    let average = times.iter().sum::<u64>() as f64 / times.len() as f64;
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let success_rate = ((successful.len() as f64 / total as f64) * 100.0).round() as u32;

    ResolverStatistics {
        fastest: TimingEntry {
            resolver: fastest.resolver.name.clone(),
            time: fastest.response_time,
        },
        slowest: TimingEntry {
            resolver: slowest.resolver.name.clone(),
            time: slowest.response_time,
        },
        average,
        median: median(&mut times),
        success_rate,
        successful: successful.len(),
        total,
    }
}

fn placeholder() -> TimingEntry {
    TimingEntry {
        resolver: NO_RESOLVER.to_string(),
        time: 0,
    }
}

/// Median of `values`; the mean of the two middle values for an even count.
#[allow(clippy::cast_precision_loss)]
fn median(values: &mut [u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) as f64 / 2.0
    } else {
        values[mid] as f64
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::settings::default_resolvers;

    fn make_result(name: &str, status: QueryStatus, response_time: u64) -> ResolverQueryResult {
        ResolverQueryResult {
            resolver: PublicResolver {
                name: name.to_string(),
                ip: "192.0.2.1".to_string(),
                provider: "Test".to_string(),
            },
            status,
            records: vec![],
            total_records: 0,
            error: None,
            response_time,
        }
    }

    // ==================== median tests ====================

    #[test]
    fn test_median_odd_count() {
        assert!((median(&mut [30, 10, 20]) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_median_even_count() {
        assert!((median(&mut [40, 10, 30, 20]) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_median_empty() {
        assert!(median(&mut []).abs() < f64::EPSILON);
    }

    // ==================== compute_statistics tests ====================

    #[test]
    fn test_statistics_over_successes_only() {
        let results = vec![
            make_result("fast", QueryStatus::Success, 10),
            make_result("slow", QueryStatus::Success, 50),
            make_result("mid", QueryStatus::Success, 30),
            make_result("dead", QueryStatus::Timeout, 5000),
        ];
        let stats = compute_statistics(&results);
        assert_eq!(stats.fastest.resolver, "fast");
        assert_eq!(stats.fastest.time, 10);
        assert_eq!(stats.slowest.resolver, "slow");
        assert_eq!(stats.slowest.time, 50);
        assert!((stats.average - 30.0).abs() < f64::EPSILON);
        assert!((stats.median - 30.0).abs() < f64::EPSILON);
        assert_eq!(stats.success_rate, 75);
        assert_eq!(stats.successful, 3);
        assert_eq!(stats.total, 4);
    }

    #[test]
    fn test_statistics_success_rate_rounds() {
        let results = vec![
            make_result("a", QueryStatus::Success, 10),
            make_result("b", QueryStatus::Error, 10),
            make_result("c", QueryStatus::Refused, 10),
        ];
        assert_eq!(compute_statistics(&results).success_rate, 33);
    }

    #[test]
    fn test_statistics_no_success() {
        let results = vec![
            make_result("a", QueryStatus::Timeout, 5000),
            make_result("b", QueryStatus::Error, 12),
        ];
        let stats = compute_statistics(&results);
        assert_eq!(stats.fastest.resolver, "N/A");
        assert_eq!(stats.slowest.resolver, "N/A");
        assert_eq!(stats.fastest.time, 0);
        assert!(stats.average.abs() < f64::EPSILON);
        assert!(stats.median.abs() < f64::EPSILON);
        assert_eq!(stats.success_rate, 0);
        assert_eq!(stats.total, 2);
    }

    // ==================== to_result tests ====================

    #[test]
    fn test_to_result_truncates_records_keeps_count() {
        let settings = ProbeSettings::default();
        let records: Vec<String> = (0..25).map(|i| format!("192.0.2.{i}")).collect();
        let result = to_result(
            &settings,
            default_resolvers().remove(0),
            ProbeOutcome::Success {
                value: records,
                elapsed_ms: 12,
            },
        );
        assert_eq!(result.status, QueryStatus::Success);
        assert_eq!(result.records.len(), 10);
        assert_eq!(result.total_records, 25);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_to_result_timeout_carries_message() {
        let settings = ProbeSettings::default();
        let result = to_result(
            &settings,
            default_resolvers().remove(0),
            ProbeOutcome::Timeout { elapsed_ms: 5000 },
        );
        assert_eq!(result.status, QueryStatus::Timeout);
        assert_eq!(result.error.as_deref(), Some("Query timeout (5s)"));
        assert_eq!(result.response_time, 5000);
    }

    // ==================== integration tests ====================

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_resolver_performance_real() {
        let settings = ProbeSettings::default();
        let result = resolver_performance(&settings, "google.com", DnsQueryType::A)
            .await
            .unwrap();
        assert_eq!(result.results.len(), settings.resolvers.len());
        assert_eq!(result.statistics.total, settings.resolvers.len());
        assert!(result.statistics.successful > 0);
    }
}
