//! Cost-based rate limiter with linear decay
//!
//! Mirrors the exchange's call-rate counter: every call adds its cost to a
//! counter, the counter decays by one unit every `decay_interval`, and a call
//! may only proceed while the counter stays at or below `limit`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Budget parameters for a limited tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum accumulated cost before calls block
    pub limit: u32,
    /// Time after which one unit of accumulated cost is forgiven
    pub decay_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            limit: 15,
            decay_interval: Duration::from_secs(3),
        }
    }
}

impl RateLimiterConfig {
    pub const fn new(limit: u32, decay_interval: Duration) -> Self {
        Self {
            limit,
            decay_interval,
        }
    }

    /// Set the maximum accumulated cost
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the decay interval
    pub fn with_decay_interval(mut self, interval: Duration) -> Self {
        self.decay_interval = interval;
        self
    }
}

/// Admission control for outgoing calls
///
/// Cloning shares the underlying counter, so one limiter can be handed to
/// every task issuing calls for the same budget.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use kraken_rest::common::{RateLimiter, RateLimiterConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let limiter = RateLimiter::new(RateLimiterConfig::new(15, Duration::from_secs(3)));
///
///     // Suspends until the call fits in the budget
///     limiter.admit(2).await;
///     // Make API request...
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub enum RateLimiter {
    /// No budget tracking; `admit` returns immediately
    #[default]
    Unlimited,
    /// Decaying cost counter
    Limited(CostLimiter),
}

impl RateLimiter {
    /// Create a limited limiter. A zero decay interval can never forgive cost,
    /// so it is treated as "no limit".
    pub fn new(config: RateLimiterConfig) -> Self {
        if config.decay_interval.is_zero() {
            return Self::Unlimited;
        }
        Self::Limited(CostLimiter::new(config))
    }

    pub fn unlimited() -> Self {
        Self::Unlimited
    }

    /// Build from an optional tier configuration; `None` disables limiting
    pub fn from_config(config: Option<RateLimiterConfig>) -> Self {
        config.map_or(Self::Unlimited, Self::new)
    }

    pub fn is_limited(&self) -> bool {
        matches!(self, Self::Limited(_))
    }

    /// Wait until `cost` fits in the budget, then consume it
    ///
    /// Cost is only recorded at the moment of admission: dropping the future
    /// while it waits leaves the counter untouched.
    pub async fn admit(&self, cost: u32) {
        match self {
            Self::Unlimited => {}
            Self::Limited(limiter) => limiter.admit(cost).await,
        }
    }

    /// Consume `cost` only if it fits right now and nobody is queued ahead
    pub async fn try_admit(&self, cost: u32) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Limited(limiter) => limiter.try_admit(cost).await,
        }
    }

    /// Outstanding cost after applying decay; always 0 when unlimited
    pub async fn current_cost(&self) -> u32 {
        match self {
            Self::Unlimited => 0,
            Self::Limited(limiter) => limiter.current_cost().await,
        }
    }

    /// Configured limit, if any
    pub fn limit(&self) -> Option<u32> {
        match self {
            Self::Unlimited => None,
            Self::Limited(limiter) => Some(limiter.config.limit),
        }
    }
}

#[derive(Debug)]
struct CostState {
    current_cost: u32,
    last_decay: Instant,
}

impl CostState {
    /// Forgive one unit per whole elapsed interval. `last_decay` advances by
    /// whole intervals so partial progress carries over to the next call.
    fn decay(&mut self, now: Instant, interval: Duration) {
        let elapsed = now.saturating_duration_since(self.last_decay);
        let ticks = elapsed.as_nanos() / interval.as_nanos();
        if ticks == 0 {
            return;
        }

        let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
        self.current_cost = self.current_cost.saturating_sub(ticks);
        match interval.checked_mul(ticks) {
            Some(step) => self.last_decay += step,
            None => self.last_decay = now,
        }
    }

    /// Units that still have to decay before `cost` can be admitted.
    /// A cost above the limit waits for the counter to drain completely.
    fn units_over(&self, cost: u32, limit: u32) -> u32 {
        if cost > limit {
            self.current_cost
        } else {
            self.current_cost.saturating_add(cost).saturating_sub(limit)
        }
    }
}

/// Shared state of a limited [`RateLimiter`]
#[derive(Debug, Clone)]
pub struct CostLimiter {
    config: RateLimiterConfig,
    state: Arc<Mutex<CostState>>,
    // Held by the caller at the head of the line while it sleeps; tokio's
    // mutex is FIFO, which keeps waiters from starving.
    queue: Arc<Mutex<()>>,
}

impl CostLimiter {
    fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(CostState {
                current_cost: 0,
                last_decay: Instant::now(),
            })),
            queue: Arc::new(Mutex::new(())),
        }
    }

    async fn admit(&self, cost: u32) {
        let _turn = self.queue.lock().await;

        loop {
            let (deadline, current) = {
                let mut state = self.state.lock().await;
                state.decay(Instant::now(), self.config.decay_interval);

                let pending = state.units_over(cost, self.config.limit);
                if pending == 0 {
                    state.current_cost = state.current_cost.saturating_add(cost);
                    return;
                }

                let wait = self.config.decay_interval.saturating_mul(pending);
                (state.last_decay + wait, state.current_cost)
            };

            debug!(
                cost,
                current,
                limit = self.config.limit,
                wait_ms = deadline
                    .saturating_duration_since(Instant::now())
                    .as_millis() as u64,
                "Rate limit budget exhausted, waiting"
            );
            sleep_until(deadline).await;
        }
    }

    async fn try_admit(&self, cost: u32) -> bool {
        let Ok(_turn) = self.queue.try_lock() else {
            return false;
        };

        let mut state = self.state.lock().await;
        state.decay(Instant::now(), self.config.decay_interval);
        if state.units_over(cost, self.config.limit) > 0 {
            return false;
        }
        state.current_cost = state.current_cost.saturating_add(cost);
        true
    }

    async fn current_cost(&self) -> u32 {
        let mut state = self.state.lock().await;
        state.decay(Instant::now(), self.config.decay_interval);
        state.current_cost
    }
}
