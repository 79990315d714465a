//! fault-harness service binary.
//!
//! Runs either the upstream simulator or the downstream proxy:
//!
//! ```text
//! fault-harness --type upstream --bind-address :9001 --upstream-errors 0.2
//! fault-harness --type downstream --bind-address :9000 --upstream-uri localhost:9001
//! ```

use std::path::PathBuf;

use clap::Parser;

use fault_harness::config::{load_config, LatencyMode, Role, ServiceConfig};
use fault_harness::lifecycle;
use fault_harness::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "fault-harness")]
#[command(about = "Fault-injecting upstream and pass-through downstream for resilience testing", long_about = None)]
struct Cli {
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// upstream or downstream service type
    #[arg(long = "type", value_enum)]
    role: Option<Role>,

    /// URI for upstream service
    #[arg(long)]
    upstream_uri: Option<String>,

    /// Bind address for the service
    #[arg(long)]
    bind_address: Option<String>,

    /// Decimal percentage of errors
    #[arg(long)]
    upstream_errors: Option<f64>,

    /// Rate in req/second after which upstream will return errors
    #[arg(long)]
    upstream_rate_limit: Option<f64>,

    /// Latency mode for successful upstream responses
    #[arg(long, value_enum)]
    latency: Option<LatencyMode>,

    /// Base delay in milliseconds for successful upstream responses
    #[arg(long)]
    base_delay_ms: Option<u64>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long)]
    log_filter: Option<String>,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    metrics_address: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(role) = self.role {
            config.role = role;
        }
        if let Some(uri) = self.upstream_uri {
            config.upstream_uri = uri;
        }
        if let Some(address) = self.bind_address {
            config.bind_address = address;
        }
        if let Some(p) = self.upstream_errors {
            config.upstream.error_probability = p;
        }
        if let Some(rate) = self.upstream_rate_limit {
            config.upstream.rate_limit = rate;
        }
        if let Some(latency) = self.latency {
            config.upstream.latency = latency;
        }
        if let Some(ms) = self.base_delay_ms {
            config.upstream.base_delay_ms = ms;
        }
        if let Some(filter) = self.log_filter {
            config.observability.log_filter = filter;
        }
        if let Some(address) = self.metrics_address {
            config.observability.metrics_address = Some(address);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    cli.apply(&mut config);

    logging::init(&config.observability.log_filter);
    tracing::info!("fault-harness v{} starting", env!("CARGO_PKG_VERSION"));

    lifecycle::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
