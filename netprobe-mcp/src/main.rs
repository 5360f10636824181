//! MCP Server entry point for netprobe
//!
//! Starts the MCP server with stdio transport. Configuration comes from the engine
//! defaults plus a few environment overrides:
//!
//! - `NETPROBE_DEFAULT_RESOLVER`: resolver IP for NS discovery and address lookups
//! - `NETPROBE_CONCURRENCY`: maximum probes in flight per request
//! - `NETPROBE_TOOL_TIMEOUT_SECS`: outer timeout applied to every tool call

mod schemas;
mod server;

use std::net::IpAddr;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, bail};
use netprobe_engine::{ProbeService, ProbeSettings};
use rmcp::ServiceExt;
use server::{NetprobeMcp, ToolTimeouts};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const ENV_DEFAULT_RESOLVER: &str = "NETPROBE_DEFAULT_RESOLVER";
const ENV_CONCURRENCY: &str = "NETPROBE_CONCURRENCY";
const ENV_TOOL_TIMEOUT_SECS: &str = "NETPROBE_TOOL_TIMEOUT_SECS";

/// Settings and tool timeouts after applying environment overrides.
fn load_config(
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<(ProbeSettings, ToolTimeouts)> {
    let mut settings = ProbeSettings::default();
    let mut timeouts = ToolTimeouts::default();

    if let Some(resolver) = var(ENV_DEFAULT_RESOLVER) {
        resolver
            .trim()
            .parse::<IpAddr>()
            .with_context(|| format!("{ENV_DEFAULT_RESOLVER} is not an IP address: {resolver}"))?;
        settings.default_resolver = resolver.trim().to_string();
    }

    if let Some(concurrency) = var(ENV_CONCURRENCY) {
        let concurrency: usize = concurrency
            .trim()
            .parse()
            .with_context(|| format!("{ENV_CONCURRENCY} is not a number: {concurrency}"))?;
        if concurrency == 0 {
            bail!("{ENV_CONCURRENCY} must be greater than zero");
        }
        settings.concurrency = concurrency;
    }

    if let Some(secs) = var(ENV_TOOL_TIMEOUT_SECS) {
        let secs: u64 = secs
            .trim()
            .parse()
            .with_context(|| format!("{ENV_TOOL_TIMEOUT_SECS} is not a number: {secs}"))?;
        if secs == 0 {
            bail!("{ENV_TOOL_TIMEOUT_SECS} must be greater than zero");
        }
        timeouts = ToolTimeouts::uniform(Duration::from_secs(secs));
    }

    Ok((settings, timeouts))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing to stderr (MCP uses stdout for protocol)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!("Starting netprobe MCP Server");

    let (settings, timeouts) = match load_config(|key| std::env::var(key).ok()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        "Default resolver {}, concurrency {}",
        settings.default_resolver,
        settings.concurrency
    );

    let mcp_server = NetprobeMcp::new(ProbeService::new(settings), timeouts);

    tracing::info!("MCP server initialized with 9 tools");

    // Start serving via stdio
    tracing::info!("Starting MCP server on stdio transport");
    let service = match mcp_server.serve(rmcp::transport::stdio()).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start MCP server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Wait for the server to complete
    if let Err(e) = service.waiting().await {
        tracing::error!("MCP server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
