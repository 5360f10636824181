//! Host system resolver discovery.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::LazyLock;

use hickory_resolver::config::ResolverConfig;

/// Resolver used when the system configuration has no usable nameserver.
pub(crate) const FALLBACK_RESOLVER: IpAddr = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));

/// First nameserver of the host system DNS configuration (e.g. `/etc/resolv.conf`),
/// or [`FALLBACK_RESOLVER`] when it cannot be loaded.
pub(crate) static SYSTEM_RESOLVER: LazyLock<IpAddr> = LazyLock::new(|| {
    #[cfg(any(unix, target_os = "windows"))]
    {
        match hickory_resolver::system_conf::read_system_conf() {
            Ok((config, _opts)) => {
                if let Some(ip) = first_usable_ip(&config) {
                    return ip;
                }
                log::warn!("[DNS] System configuration lists no nameserver, using {FALLBACK_RESOLVER}");
            }
            Err(e) => {
                log::warn!(
                    "[DNS] Failed to load system DNS configuration, using {FALLBACK_RESOLVER}: {e}"
                );
            }
        }
    }

    FALLBACK_RESOLVER
});

/// Deduplicate nameserver IP addresses from a resolver configuration.
pub(crate) fn dedup_ips(config: &ResolverConfig) -> Vec<IpAddr> {
    let mut ips: Vec<IpAddr> = Vec::new();
    for ns in config.name_servers() {
        let ip = ns.socket_addr.ip();
        if !ips.contains(&ip) {
            ips.push(ip);
        }
    }
    ips
}

/// First nameserver that is not an unspecified address (`0.0.0.0` / `::`).
fn first_usable_ip(config: &ResolverConfig) -> Option<IpAddr> {
    dedup_ips(config).into_iter().find(|ip| !ip.is_unspecified())
}
