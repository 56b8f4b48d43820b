//! Per-call deadlines for store operations
//!
//! Store calls are synchronous, so a deadline is checked once the call
//! returns. An overrun read or aggregation is reported as
//! [`LedgerError::Timeout`] so callers can tell it apart from "not found".
//! An overrun write keeps its result: the record is already stored and
//! reporting failure would invite a duplicating retry.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::config::StoreTimeouts;
use crate::error::{LedgerError, LedgerResult};

/// What kind of store access a call performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Run `f` and hold its result to `budget`
pub fn within<T>(
    operation: &'static str,
    budget: Duration,
    access: Access,
    f: impl FnOnce() -> LedgerResult<T>,
) -> LedgerResult<T> {
    let started = Instant::now();
    let result = f();
    let elapsed = started.elapsed();

    if elapsed <= budget {
        return result;
    }

    let budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
    warn!(
        operation,
        budget_ms,
        elapsed_ms = elapsed.as_millis() as u64,
        "store call exceeded its deadline"
    );

    match access {
        Access::Read => Err(LedgerError::Timeout {
            operation,
            budget_ms,
        }),
        Access::Write => result,
    }
}

/// Deadline budgets bound to the configured timeouts
#[derive(Debug, Clone, Copy)]
pub struct Deadlines {
    timeouts: StoreTimeouts,
}

impl Deadlines {
    pub fn new(timeouts: StoreTimeouts) -> Self {
        Self { timeouts }
    }

    /// Point lookups, listings and counts
    pub fn read<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        within(operation, self.timeouts.read(), Access::Read, f)
    }

    /// Single-record mutations
    pub fn write<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        within(operation, self.timeouts.write(), Access::Write, f)
    }

    /// Grouping and summing queries
    pub fn aggregate<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        within(operation, self.timeouts.aggregate(), Access::Read, f)
    }

    /// Reads backing a bulk export
    pub fn bulk_read<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        within(operation, self.timeouts.bulk(), Access::Read, f)
    }

    /// Per-row work during a bulk import
    pub fn bulk_write<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        within(operation, self.timeouts.bulk(), Access::Write, f)
    }
}
