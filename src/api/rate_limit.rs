use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use warp::{Filter, Rejection};

/// How often idle client entries are dropped from the limiter
pub const RATE_LIMIT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Per-client-address request limiter
pub type ClientRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Rejection raised when a client exceeds its quota
#[derive(Debug)]
pub struct RateLimited;

impl warp::reject::Reject for RateLimited {}

/// Create a limiter allowing `per_second` requests per client address.
/// Returns `None` for a zero rate.
pub fn create_client_rate_limiter(per_second: u32) -> Option<Arc<ClientRateLimiter>> {
    let rate = NonZeroU32::new(per_second)?;
    Some(Arc::new(RateLimiter::keyed(Quota::per_second(rate))))
}

/// Drops clients whose quota has fully refilled and releases the freed capacity.
/// Returns the number of clients still tracked.
pub fn prune(limiter: &ClientRateLimiter) -> usize {
    limiter.retain_recent();
    limiter.shrink_to_fit();
    limiter.len()
}

/// Spawns a task pruning `limiter` every `interval` until `shutdown` reads
/// `true` or its sender is dropped.
pub fn spawn_pruner(
    limiter: Arc<ClientRateLimiter>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let tracked = prune(&limiter);
                    tracing::debug!(clients = tracked, "Pruned rate limiter");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Rate limiter pruner stopped");
    })
}

/// Filter that rejects requests over quota. A `None` limiter lets everything through.
pub fn rate_limit(
    limiter: Option<Arc<ClientRateLimiter>>,
) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::addr::remote()
        .and_then(move |remote: Option<SocketAddr>| {
            let limiter = limiter.clone();
            async move {
                let Some(limiter) = limiter else {
                    return Ok(());
                };

                let client = remote
                    .map(|addr| addr.ip())
                    .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

                match limiter.check_key(&client) {
                    Ok(()) => Ok(()),
                    Err(_) => {
                        tracing::warn!(client = %client, "Rate limit exceeded");
                        Err(warp::reject::custom(RateLimited))
                    }
                }
            }
        })
        .untuple_one()
}
