//! Rate limiting middleware using tower-governor
//!
//! Requests are keyed by peer IP, so the server must be started with
//! `into_make_service_with_connect_info::<SocketAddr>()`.

use std::sync::Arc;

use axum::Router;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::config::RateLimitConfig;

/// Token bucket parameters derived from a per-minute budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub replenish_every_ms: u64,
    pub burst_size: u32,
}

impl Quota {
    pub fn per_minute(requests_per_minute: u64) -> Self {
        let requests = requests_per_minute.max(1);
        Self {
            replenish_every_ms: (60_000 / requests).max(1),
            burst_size: u32::try_from(requests).unwrap_or(u32::MAX),
        }
    }
}

/// Wrap `router` in a governor layer when rate limiting is enabled
pub fn apply(router: Router, config: &RateLimitConfig) -> anyhow::Result<Router> {
    if !config.enabled {
        tracing::info!("Rate limiting disabled");
        return Ok(router);
    }

    let quota = Quota::per_minute(config.requests_per_minute);
    let governor_conf = GovernorConfigBuilder::default()
        .per_millisecond(quota.replenish_every_ms)
        .burst_size(quota.burst_size)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration: {:?}", quota))?;

    tracing::info!(
        requests_per_minute = config.requests_per_minute,
        "Rate limiting enabled"
    );

    Ok(router.layer(GovernorLayer {
        config: Arc::new(governor_conf),
    }))
}
