//! In-process pool backend with configurable latencies.
//!
//! Models the parts of a real connection pool that matter to the harness:
//! a hard cap on open connections, blocking waits for a free slot, a
//! connect cost for every new connection, idle and lifetime expiry, and a
//! periodic maintenance pass.

use super::config::PoolSettings;
use super::pool::{PoolFactory, Query, QueryOutput, ResourcePool};
use crate::utils::error::PoolError;
use log::{debug, trace};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// Latency and failure profile of the simulated backend
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedBackend {
    /// Cost of opening a new connection
    pub connect_latency: Duration,
    /// Server-side time per query
    pub query_latency: Duration,
    /// Probability in [0, 1] that a query fails
    pub failure_rate: f64,
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self {
            connect_latency: Duration::from_millis(5),
            query_latency: Duration::from_millis(2),
            failure_rate: 0.0,
        }
    }
}

/// Factory producing `SimulatedPool`s that share one backend profile
#[derive(Debug, Clone, Default)]
pub struct SimulatedPoolFactory {
    backend: SimulatedBackend,
}

impl SimulatedPoolFactory {
    pub fn new(backend: SimulatedBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &SimulatedBackend {
        &self.backend
    }
}

impl PoolFactory for SimulatedPoolFactory {
    type Pool = SimulatedPool;

    fn create(&self, dsn: &str, settings: &PoolSettings) -> Result<SimulatedPool, PoolError> {
        settings.validate()?;
        if !(0.0..=1.0).contains(&self.backend.failure_rate) {
            return Err(PoolError::InvalidConfig(format!(
                "failure_rate {} is outside [0, 1]",
                self.backend.failure_rate
            )));
        }
        debug!("Opening simulated pool for {}", dsn);
        SimulatedPool::open(self.backend.clone(), settings.clone())
    }
}

/// A connection handed out by `SimulatedPool`
#[derive(Debug)]
pub struct SimConnection {
    pub id: u64,
    pub queries: u64,
    created_at: Instant,
    expires_at: Instant,
    last_used: Instant,
}

impl SimConnection {
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Counters describing pool churn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub open: usize,
    pub idle: usize,
    pub created: u64,
    pub expired: u64,
}

#[derive(Debug)]
struct PoolState {
    idle: VecDeque<SimConnection>,
    open: usize,
    closed: bool,
    last_maintenance: Instant,
}

/// Bounded blocking pool over the simulated backend
#[derive(Debug)]
pub struct SimulatedPool {
    backend: SimulatedBackend,
    settings: PoolSettings,
    state: Mutex<PoolState>,
    available: Condvar,
    next_id: AtomicU64,
    expired: AtomicU64,
}

impl SimulatedPool {
    /// Create a pool and open `min_connections` up front
    pub fn open(backend: SimulatedBackend, settings: PoolSettings) -> Result<Self, PoolError> {
        settings.validate()?;
        let pool = Self {
            backend,
            settings,
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
                open: 0,
                closed: false,
                last_maintenance: Instant::now(),
            }),
            available: Condvar::new(),
            next_id: AtomicU64::new(0),
            expired: AtomicU64::new(0),
        };

        for _ in 0..pool.settings.min_connections {
            pool.lock().open += 1;
            let conn = pool.connect(None)?;
            pool.lock().idle.push_back(conn);
        }
        Ok(pool)
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            open: state.open,
            idle: state.idle.len(),
            created: self.next_id.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }

    /// Open a new connection. The caller has already reserved a slot in `open`.
    fn connect(&self, deadline: Option<Instant>) -> Result<SimConnection, PoolError> {
        if let Err(e) = sleep_within(self.backend.connect_latency, deadline, "connecting") {
            let mut state = self.lock();
            state.open -= 1;
            self.available.notify_one();
            return Err(e);
        }

        let now = Instant::now();
        let jitter = random_jitter(self.settings.lifetime_jitter);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!("Opened simulated connection {}", id);
        Ok(SimConnection {
            id,
            queries: 0,
            created_at: now,
            expires_at: now + self.settings.max_lifetime + jitter,
            last_used: now,
        })
    }

    fn is_stale(&self, conn: &SimConnection, now: Instant, open: usize) -> bool {
        if now >= conn.expires_at {
            return true;
        }
        open > self.settings.min_connections
            && now.duration_since(conn.last_used) >= self.settings.max_idle_time
    }

    /// Drop idle connections that outlived their lifetime or idle budget,
    /// then reserve slots to get back to `min_connections`.
    ///
    /// Returns the number of reserved slots; the caller opens them with
    /// `top_up` once the lock is released.
    fn maintain(&self, state: &mut PoolState, now: Instant) -> usize {
        if now.duration_since(state.last_maintenance) < self.settings.health_check_period {
            return 0;
        }
        state.last_maintenance = now;

        let mut kept = VecDeque::with_capacity(state.idle.len());
        while let Some(conn) = state.idle.pop_front() {
            if self.is_stale(&conn, now, state.open) {
                self.retire(state, conn);
            } else {
                kept.push_back(conn);
            }
        }
        state.idle = kept;

        let missing = self.settings.min_connections.saturating_sub(state.open);
        state.open += missing;
        missing
    }

    /// Open `count` connections whose slots are already reserved and park them idle
    fn top_up(&self, count: usize) {
        if count > 0 {
            debug!("Topping simulated pool up by {} connections", count);
        }
        for _ in 0..count {
            // connect gives the slot back itself on failure
            let Ok(conn) = self.connect(None) else {
                continue;
            };
            let mut state = self.lock();
            if state.closed {
                self.retire(&mut state, conn);
            } else {
                state.idle.push_back(conn);
            }
            self.available.notify_one();
        }
    }

    fn retire(&self, state: &mut PoolState, conn: SimConnection) {
        trace!(
            "Retiring simulated connection {} after {} queries ({:?} old)",
            conn.id,
            conn.queries,
            conn.age()
        );
        state.open -= 1;
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResourcePool for SimulatedPool {
    type Handle = SimConnection;

    fn acquire(&self, deadline: Option<Instant>) -> Result<SimConnection, PoolError> {
        let mut state = self.lock();
        let mut topped_up = false;
        loop {
            if state.closed {
                return Err(PoolError::Closed);
            }

            let now = Instant::now();
            let reserved = self.maintain(&mut state, now);
            if reserved > 0 {
                drop(state);
                self.top_up(reserved);
                state = self.lock();
                if !topped_up {
                    topped_up = true;
                    continue;
                }
            }

            while let Some(conn) = state.idle.pop_front() {
                if self.is_stale(&conn, now, state.open) {
                    self.retire(&mut state, conn);
                } else {
                    return Ok(conn);
                }
            }

            if state.open < self.settings.max_connections {
                state.open += 1;
                drop(state);
                return self.connect(deadline);
            }

            state = match deadline {
                None => self
                    .available
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
                Some(deadline) => {
                    if now >= deadline {
                        return Err(PoolError::Timeout("waiting for a free connection"));
                    }
                    self.available
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .0
                }
            };
        }
    }

    fn execute(
        &self,
        handle: &mut SimConnection,
        query: &Query,
        deadline: Option<Instant>,
    ) -> Result<QueryOutput, PoolError> {
        sleep_within(self.backend.query_latency, deadline, "running query")?;
        handle.queries += 1;

        if self.backend.failure_rate > 0.0 && rand::thread_rng().gen_bool(self.backend.failure_rate) {
            return Err(PoolError::Operation(format!(
                "simulated failure on connection {} for {:?}",
                handle.id, query.statement
            )));
        }
        Ok(QueryOutput { rows: 1 })
    }

    fn release(&self, mut handle: SimConnection) {
        let mut state = self.lock();
        let now = Instant::now();
        handle.last_used = now;
        if state.closed || now >= handle.expires_at {
            self.retire(&mut state, handle);
        } else {
            state.idle.push_back(handle);
        }
        self.available.notify_one();
    }

    fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let idle = state.idle.len();
        state.idle.clear();
        state.open -= idle;
        self.available.notify_all();
        debug!("Closed simulated pool ({} idle connections dropped)", idle);
    }
}

/// Sleep for `latency`, or until `deadline` if that comes first
fn sleep_within(
    latency: Duration,
    deadline: Option<Instant>,
    activity: &'static str,
) -> Result<(), PoolError> {
    match deadline {
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining < latency {
                thread::sleep(remaining);
                return Err(PoolError::Timeout(activity));
            }
            thread::sleep(latency);
        }
        None => thread::sleep(latency),
    }
    Ok(())
}

fn random_jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let nanos = u64::try_from(max.as_nanos()).unwrap_or(u64::MAX);
    Duration::from_nanos(rand::thread_rng().gen_range(0..nanos))
}
