//! edba: a uniform, backend-agnostic SQL database abstraction layer.
//!
//! `edba` provides a single frontend API — sessions, statements, rowsets,
//! transactions — over a small set of capability traits ([`backend`]) that
//! engine-specific adapters implement. Application code written against
//! `edba` does not need to change when the underlying database engine does;
//! only the connection string and, where a query relies on engine-specific
//! SQL, the [`dialect`] annotation embedded in that query need to change.
//!
//! # Example
//!
//! ```ignore
//! use edba::{open, types::BindValue};
//!
//! let session = open("edba_memory:db=demo")?;
//! session.exec_batch("create table t(id integer, name text)")?;
//!
//! let mut insert = session.prepare("insert into t(id, name) values(:id, :name)")?;
//! insert.bind_named("id", 1i64)?.bind_named("name", "alice")?.exec()?;
//!
//! let mut query = session.prepare("select id, name from t where id = :id")?;
//! query.bind_named("id", 1i64)?;
//! let row = query.first_row()?;
//! let (id, name): (i64, String) = (row.get(0)?, row.get(1)?);
//! # Ok::<(), edba::error::Error>(())
//! ```
//!
//! # Concurrency model
//!
//! `edba` is thread-safe at the pool boundary and connection-affine above
//! it: a [`Session`](session::Session) (and anything derived from it — a
//! [`Statement`](statement::Statement), a
//! [`Rowset`](row::Rowset)/[`Row`](row::Row)) is safe to use from one
//! thread at a time, though it may be handed off to a different thread
//! between uses. [`pool::Pool`] itself is `Send + Sync` and is the
//! supported way to share connections across a thread pool.

pub mod backend;
pub mod bind_by_name;
pub mod conn_info;
pub mod dialect;
pub mod error;
pub mod monitor;
pub mod pool;
pub mod registry;
pub mod row;
pub mod session;
pub mod statement;
pub mod string_ref;
pub mod transaction;
pub mod types;

pub use conn_info::ConnInfo;
pub use error::{Error, Kind, Result};
pub use monitor::SessionMonitor;
pub use pool::{Pool, PooledSession};
pub use row::{Row, Rowset, RowsetItem};
pub use session::Session;
pub use statement::Statement;
pub use transaction::Transaction;

/// Opens a single session directly against `uri`, bypassing the connection
/// pool. `uri` has the form `driver:key=value;key=value;...` (see
/// [`ConnInfo`]).
pub fn open(uri: &str) -> Result<Session> {
    open_with_monitor(uri, None)
}

/// Like [`open`], additionally attaching `monitor` to the new connection.
pub fn open_with_monitor(uri: &str, monitor: Option<Box<dyn SessionMonitor>>) -> Result<Session> {
    let info = ConnInfo::parse(uri)?;
    let conn = registry::connect(&info, monitor)?;
    Ok(Session::from_connection(conn))
}

/// Builds a [`Pool`] of at most `max_size` connections, each opened against
/// `uri` on demand.
pub fn pool(uri: &str, max_size: usize) -> Result<Pool> {
    pool_with_monitor(uri, max_size, || None)
}

/// Like [`pool`], calling `make_monitor` once per freshly created connection
/// to obtain the monitor attached to it (a [`SessionMonitor`] is a trait
/// object, not `Clone`, so each connection gets its own instance rather than
/// sharing one across the pool).
pub fn pool_with_monitor(
    uri: &str,
    max_size: usize,
    make_monitor: impl Fn() -> Option<Box<dyn SessionMonitor>> + Send + Sync + 'static,
) -> Result<Pool> {
    let info = ConnInfo::parse(uri)?;
    Ok(Pool::builder(max_size, move || registry::connect(&info, make_monitor())).build())
}
