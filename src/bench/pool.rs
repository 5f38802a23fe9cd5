//! Contract between the harness and a pooled-resource backend.
//!
//! The harness never depends on a concrete backend; it only creates pools
//! through a `PoolFactory` and drives them through `ResourcePool`.

use super::config::PoolSettings;
use crate::utils::config::{BENCH_QUERY, BENCH_QUERY_KEYSPACE};
use crate::utils::error::PoolError;
use std::time::Instant;

/// One statement issued by a client
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub statement: String,
    pub param: Option<i64>,
}

impl Query {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            param: None,
        }
    }

    pub fn with_param(mut self, param: i64) -> Self {
        self.param = Some(param);
        self
    }

    /// Point lookup issued by client `worker_id`
    pub fn lookup_for_worker(worker_id: usize) -> Self {
        let key = (worker_id as i64 % BENCH_QUERY_KEYSPACE) + 1;
        Self::new(BENCH_QUERY).with_param(key)
    }
}

/// Result of a successful query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOutput {
    pub rows: u64,
}

/// A bounded set of reusable resource handles
pub trait ResourcePool: Send + Sync {
    type Handle: Send;

    /// Wait for a free handle, failing once `deadline` passes
    fn acquire(&self, deadline: Option<Instant>) -> Result<Self::Handle, PoolError>;

    fn execute(
        &self,
        handle: &mut Self::Handle,
        query: &Query,
        deadline: Option<Instant>,
    ) -> Result<QueryOutput, PoolError>;

    /// Return a handle to the pool
    fn release(&self, handle: Self::Handle);

    /// Acquire, run one query, and release regardless of the query outcome
    fn acquire_and_run(
        &self,
        query: &Query,
        deadline: Option<Instant>,
    ) -> Result<QueryOutput, PoolError> {
        let mut handle = self.acquire(deadline)?;
        let result = self.execute(&mut handle, query, deadline);
        self.release(handle);
        result
    }

    /// Stop handing out handles and drop idle ones
    fn close(&self);
}

/// Builds pool instances for a connection descriptor
pub trait PoolFactory {
    type Pool: ResourcePool;

    fn create(&self, dsn: &str, settings: &PoolSettings) -> Result<Self::Pool, PoolError>;
}
