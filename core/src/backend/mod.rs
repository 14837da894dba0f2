//! The backend contract: the three capability roles ([`Connection`],
//! [`Statement`], [`ResultSet`]) every engine adapter must satisfy, plus a
//! reusable helper ([`base`]) that implements caching, dialect selection and
//! instrumentation on top of a much smaller set of primitive hooks, so an
//! adapter author writes only the engine-specific parts.

pub mod base;
pub mod stats;

use std::any::Any;

use crate::error::Result;
use crate::types::{BindValue, FetchValue};

/// How much is known, without materializing it, about whether another row
/// is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextRow {
    LastRowReached,
    NextRowExists,
    /// The backend cannot tell without attempting to advance.
    NextRowUnknown,
}

/// A forward-only cursor over the rows returned by a query, as implemented
/// by a backend. The frontend's [`crate::row::Row`]/[`crate::row::Rowset`]
/// wrap this.
pub trait ResultSet: Send {
    /// Cheap, possibly approximate, check for more rows.
    fn has_next(&self) -> NextRow;

    /// Advances to the next row. Returns `false` when exhausted.
    fn next(&mut self) -> Result<bool>;

    /// Fetches column `col` (0-based) into `dest`. Returns `false`, leaving
    /// `dest` unchanged, if the column is SQL NULL.
    fn fetch(&mut self, col: usize, dest: &mut FetchValue<'_>) -> Result<bool>;

    fn is_null(&mut self, col: usize) -> Result<bool>;

    fn cols(&self) -> usize;

    /// Row count, if the backend can report it without scanning ahead.
    fn rows(&self) -> Option<u64>;

    fn name_to_column(&self, name: &str) -> Option<usize>;

    fn column_to_name(&self, col: usize) -> Result<String>;
}

/// A compiled statement, as implemented by a backend.
pub trait Statement: Send {
    /// Binds a value to 1-based position `col`.
    fn bind(&mut self, col: usize, val: &BindValue<'_>) -> Result<()>;

    fn bindings_reset(&mut self);

    /// Runs the statement as a query. `MAY` fail if the statement does not
    /// produce a result set.
    fn run_query(&mut self) -> Result<Box<dyn ResultSet>>;

    /// Runs the statement for effect. `MAY` fail if the statement produces a
    /// result set.
    fn run_exec(&mut self) -> Result<()>;

    /// The auto-increment/sequence value from the last insert, if the
    /// backend can report one.
    fn sequence_last(&mut self, sequence: Option<&str>) -> Result<i64> {
        let _ = sequence;
        Err(crate::error::Error::not_supported_by_backend(
            "sequence_last",
        ))
    }

    fn affected(&self) -> Result<u64>;

    /// The SQL actually sent to the backend, after dialect selection and
    /// placeholder rewriting. Used for monitor reporting.
    fn patched_query(&self) -> &str;
}

/// A live connection to a database, as implemented by a backend.
///
/// `Send` because the pool hands connections across threads; callers are
/// responsible for not using one concurrently from two threads at once (see
/// the concurrency model in the crate docs).
pub trait Connection: Send {
    /// Applies `~engine~` dialect selection to `sql` (a no-op passthrough if
    /// `@expand_conditionals=off` or `sql` carries no annotation), without
    /// touching `:name` placeholders. Callers (the frontend's
    /// [`crate::session::Session`]) run this *before* the name→position
    /// rewrite, so each dialect branch can carry its own placeholder set.
    fn select_dialect(&self, sql: &str) -> Result<String>;

    /// Returns a compiled statement for already-dialect-selected `sql`,
    /// reusing a cached compilation for the same text when available.
    fn prepare_statement(&self, sql: &str) -> Result<Box<dyn Statement>>;

    /// Returns a compiled statement for `sql` without consulting or
    /// populating the cache.
    fn create_statement(&self, sql: &str) -> Result<Box<dyn Statement>>;

    fn exec_batch(&self, sql: &str) -> Result<()>;

    fn begin(&self) -> Result<()>;
    fn commit(&self) -> Result<()>;
    /// Must never fail: a backend whose native rollback can fail must log
    /// and recover internally.
    fn rollback(&self);

    fn escape(&self, text: &str) -> Result<String>;

    fn engine(&self) -> &str;
    fn backend_name(&self) -> &str;
    fn version(&self) -> (u32, u32);
    fn description(&self) -> &str;

    /// Running total of time spent executing statements/queries on this
    /// connection, whether or not a monitor is attached.
    fn total_execution_time(&self) -> f64;

    fn set_specific(&self, data: Box<dyn Any + Send>);

    /// The current specific-data slot, locked for the duration of the
    /// borrow. `None` if nothing was ever set.
    fn get_specific(&self) -> std::sync::MutexGuard<'_, Option<Box<dyn Any + Send>>>;
}
