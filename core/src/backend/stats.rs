//! Timing and serialized-bindings instrumentation, wrapped around every
//! statement/query/transaction boundary and forwarded to an optional
//! [`SessionMonitor`]. A panic unwinding out of a monitor callback is caught
//! here: it's discarded when the operation it was reporting on already
//! failed (the caller should see that original error, not the monitor's),
//! and it's left to roll back the just-begun transaction when it comes out
//! of `transaction_started`. See §4.7 of the design notes for the full
//! discipline.

use std::fmt::Write as _;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::error::Result;
use crate::monitor::SessionMonitor;
use crate::types::BindValue;

/// Per-connection accumulator: forwards transaction events to the user
/// monitor (if any) and keeps a running total of time spent in queries,
/// whether or not a monitor is attached.
pub struct SessionStat {
    monitor: Option<Box<dyn SessionMonitor>>,
    // Stored as integer nanoseconds so the running total can be updated with
    // a plain atomic add from statement execution, which may run without
    // exclusive access to the connection.
    total_nanos: AtomicU64,
}

impl SessionStat {
    pub fn new(monitor: Option<Box<dyn SessionMonitor>>) -> Self {
        SessionStat {
            monitor,
            total_nanos: AtomicU64::new(0),
        }
    }

    pub fn has_monitor(&self) -> bool {
        self.monitor.is_some()
    }

    pub fn total_execution_time(&self) -> f64 {
        self.total_nanos.load(Ordering::Relaxed) as f64 / 1e9
    }

    fn add_time(&self, elapsed: std::time::Duration) {
        self.total_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Runs `begin_impl`, reporting `transaction_started` to the monitor
    /// once the backend confirms the transaction is open. If the callback
    /// panics, the just-opened transaction is rolled back via
    /// `rollback_impl` before the panic is allowed to propagate — there is
    /// no `Transaction` guard alive yet to do this via `Drop`.
    pub fn begin(&self, begin_impl: impl FnOnce() -> Result<()>, rollback_impl: impl FnOnce()) -> Result<()> {
        begin_impl()?;
        if let Some(m) = &self.monitor {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| m.transaction_started())) {
                rollback_impl();
                resume_unwind(panic);
            }
        }
        Ok(())
    }

    pub fn commit(&self, commit_impl: impl FnOnce() -> Result<()>) -> Result<()> {
        commit_impl()?;
        if let Some(m) = &self.monitor {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| m.transaction_committed())) {
                resume_unwind(panic);
            }
        }
        Ok(())
    }

    /// `rollback_impl` must never fail; a monitor panic on the revert
    /// notification is always discarded, since this path already runs on an
    /// unwinding rollback.
    pub fn rollback(&self, rollback_impl: impl FnOnce()) {
        rollback_impl();
        if let Some(m) = &self.monitor {
            let _ = catch_unwind(AssertUnwindSafe(|| m.transaction_reverted()));
        }
    }
}

/// Per-statement accumulator: records a text form of the bound values (only
/// when a monitor is attached, since serializing is pure overhead
/// otherwise) and wraps `query`/`exec` with timing.
///
/// Owns an `Arc` rather than borrowing its parent [`SessionStat`] so it can
/// live inside a `Box<dyn Statement>` stored in a connection-wide cache
/// without threading a lifetime parameter through the whole backend
/// contract.
pub struct StatementStat {
    session_stat: std::sync::Arc<SessionStat>,
    bindings: Mutex<String>,
}

impl StatementStat {
    pub fn new(session_stat: std::sync::Arc<SessionStat>) -> Self {
        StatementStat {
            session_stat,
            bindings: Mutex::new(String::new()),
        }
    }

    pub fn record_bind(&self, col: usize, val: &BindValue<'_>) {
        if !self.session_stat.has_monitor() {
            return;
        }
        let mut b = self.bindings.lock().unwrap();
        let _ = write!(b, "[{col}, {val}]");
    }

    pub fn reset_bindings(&self) {
        if self.session_stat.has_monitor() {
            self.bindings.lock().unwrap().clear();
        }
    }

    /// Wraps a `query()` call: measures elapsed time, always adds it to the
    /// connection's running total, and — only if a monitor is attached —
    /// reports `query_executed`. If the monitor callback itself fails, that
    /// failure is discarded when the query succeeded (so the caller still
    /// sees the result) and surfaces only when the query itself failed and
    /// no other error is already propagating.
    pub fn measure_query<T>(
        &self,
        sql: &str,
        rows: impl FnOnce(&T) -> Option<u64>,
        body: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let start = Instant::now();
        let result = body();
        let elapsed = start.elapsed();
        self.session_stat.add_time(elapsed);

        if let Some(m) = &self.session_stat.monitor {
            let bindings = self.bindings.lock().unwrap().clone();
            let panicked = catch_unwind(AssertUnwindSafe(|| match &result {
                Ok(v) => m.query_executed(sql, &bindings, true, elapsed.as_secs_f64(), rows(v)),
                Err(_) => m.query_executed(sql, &bindings, false, elapsed.as_secs_f64(), None),
            }));
            if let Err(panic) = panicked {
                if result.is_ok() {
                    resume_unwind(panic);
                }
            }
        }
        result
    }

    /// Like [`Self::measure_query`], but for `exec()`-style statements:
    /// `body` runs the statement and returns the affected-row count on
    /// success, in a single closure (rather than a separate `affected()`
    /// closure) so it never needs to borrow the statement twice at once.
    pub fn measure_exec(&self, sql: &str, body: impl FnOnce() -> Result<u64>) -> Result<u64> {
        let start = Instant::now();
        let result = body();
        let elapsed = start.elapsed();
        self.session_stat.add_time(elapsed);

        if let Some(m) = &self.session_stat.monitor {
            let bindings = self.bindings.lock().unwrap().clone();
            let affected = *result.as_ref().unwrap_or(&0);
            let succeeded = result.is_ok();
            let panicked = catch_unwind(AssertUnwindSafe(|| {
                m.statement_executed(sql, &bindings, succeeded, elapsed.as_secs_f64(), affected)
            }));
            if let Err(panic) = panicked {
                if succeeded {
                    resume_unwind(panic);
                }
            }
        }
        result
    }
}
