//! Network diagnostics probing engine.
//!
//! Fans raw DNS and TLS probes out across many unreliable endpoints (public
//! resolvers, a zone's authoritative nameservers, DNS blacklist zones, TLS servers)
//! with bounded concurrency and per-endpoint timeouts, then folds the typed
//! per-endpoint outcomes into one structured verdict.
//!
//! Every operation is stateless; all configuration lives in [`ProbeSettings`].

mod error;
mod services;
mod settings;
mod types;

pub use error::{DnsError, ProbeError, ProbeFailure, ProbeResult, TlsProbeError};
pub use services::{ProbeService, run_bounded};
pub use settings::{
    ProbeSettings, default_blacklist_zones, default_cipher_presets, default_resolvers,
};
pub use types::{
    AlpnResult, BlacklistCheckResult, BlacklistResult, BlacklistSummary, BlacklistZone,
    CertificateInfo, CipherAssessmentResult, CipherPreset, CipherPresetResult, DnsQueryResult,
    DnsQueryType, Endpoint, ListingStatus, NameserverResult, OcspStaplingResult, ProbeOutcome,
    ProbeTarget, PublicResolver, QueryStatus, ResolverPerformanceResult, ResolverQueryResult,
    ResolverStatistics, TargetKind, TimingEntry, TlsCertificateResult, TlsVersionSupport,
    TlsVersionsResult, TransferStatus, ZoneTransferResult, ZoneTransferSummary, ZoneType,
};
