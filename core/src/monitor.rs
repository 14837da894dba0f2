//! The observability sink a [`crate::session::Session`] or
//! [`crate::pool::Pool`] may be given at construction time.

/// Notified of statement/query execution and transaction boundaries.
///
/// A monitor never participates in control flow: a panic unwinding out of
/// one of these methods during a *successful* statement/query is allowed to
/// propagate, but if the underlying database operation itself already
/// failed, the monitor's own failure is swallowed so the caller only ever
/// observes the original error. See the crate-level docs on
/// [`crate::backend::stats`] for where that swallowing happens.
pub trait SessionMonitor: Send {
    /// An `exec()`-style statement ran. `affected` is the row count.
    fn statement_executed(
        &self,
        sql: &str,
        bindings: &str,
        success: bool,
        elapsed_secs: f64,
        affected: u64,
    ) {
        let _ = (sql, bindings, success, elapsed_secs, affected);
    }

    /// A `query()`-style statement ran. `rows` is the row count if known.
    fn query_executed(
        &self,
        sql: &str,
        bindings: &str,
        success: bool,
        elapsed_secs: f64,
        rows: Option<u64>,
    ) {
        let _ = (sql, bindings, success, elapsed_secs, rows);
    }

    fn transaction_started(&self) {}
    fn transaction_committed(&self) {}
    fn transaction_reverted(&self) {}
}
