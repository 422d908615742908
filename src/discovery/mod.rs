//! Producer side: sample random ids, fetch their metadata, ship batches to the collector.

use std::time::Duration;

use crate::config::DiscoveryConfig;

pub mod clock;
pub mod fetcher;
pub mod sampler;
pub mod submitter;

fn http_agent(config: &DiscoveryConfig) -> ureq::Agent {
    let io_timeout = Duration::from_secs(config.io_timeout_secs);
    ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(config.connect_timeout_secs))
        .timeout_read(io_timeout)
        .timeout_write(io_timeout)
        .build()
}
