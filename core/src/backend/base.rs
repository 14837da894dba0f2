//! Reusable implementation of caching, dialect selection and instrumentation
//! on top of a backend's primitive hooks, so a backend author implements the
//! small [`BackendConnection`]/[`BackendStatement`] traits instead of
//! [`Connection`]/[`Statement`] directly.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::conn_info::ConnInfo;
use crate::dialect;
use crate::error::Result;
use crate::monitor::SessionMonitor;
use crate::types::BindValue;

use super::stats::{SessionStat, StatementStat};
use super::{Connection, ResultSet, Statement};

/// The primitive operations a backend connection author implements. Wrap in
/// [`ConnectionBase`] to get a full [`Connection`] (caching + dialect
/// selection + instrumentation) for free.
pub trait BackendConnection: Send {
    fn prepare_statement_impl(&self, patched_sql: &str) -> Result<Box<dyn BackendStatement>>;
    fn create_statement_impl(&self, patched_sql: &str) -> Result<Box<dyn BackendStatement>>;
    fn exec_batch_impl(&self, patched_sql: &str) -> Result<()>;

    fn begin_impl(&self) -> Result<()>;
    fn commit_impl(&self) -> Result<()>;
    /// Must never fail; see [`Connection::rollback`].
    fn rollback_impl(&self);

    fn escape_impl(&self, text: &str) -> Result<String>;

    fn engine(&self) -> &str;
    fn backend_name(&self) -> &str;
    fn version(&self) -> (u32, u32);
    fn description(&self) -> &str;
}

/// The primitive operations a backend statement author implements. Wrap in
/// [`ConnectionBase`]'s returned statements (via [`StatementWrapper`]) to get
/// instrumented `bind`/`run_query`/`run_exec` for free.
pub trait BackendStatement: Send {
    fn bind_impl(&mut self, col: usize, val: &BindValue<'_>) -> Result<()>;
    fn bindings_reset_impl(&mut self);
    fn query_impl(&mut self) -> Result<Box<dyn ResultSet>>;
    fn exec_impl(&mut self) -> Result<()>;
    fn sequence_last_impl(&mut self, sequence: Option<&str>) -> Result<i64> {
        let _ = sequence;
        Err(crate::error::Error::not_supported_by_backend("sequence_last"))
    }
    fn affected_impl(&self) -> Result<u64>;
}

/// A connection's prepared-statement cache, keyed by post-dialect-selected
/// SQL text. Each entry is a single physical backend statement, checked out
/// while in use and returned by [`StatementWrapper::drop`] — mirroring the
/// original design where a cache hit hands back the very same compiled
/// statement object, `reset()` and all, rather than a second instance
/// compiled from the same text.
struct StatementCache {
    idle: BTreeMap<String, Box<dyn BackendStatement>>,
}

/// Wraps a [`BackendStatement`] with bind-value recording and query/exec
/// timing. If `return_to` is set, dropping the wrapper pushes the backend
/// statement back into the connection's cache instead of discarding it —
/// this is what makes `prepare_statement` a real cache rather than a
/// recompile-every-time convenience wrapper.
struct StatementWrapper {
    inner: Option<Box<dyn BackendStatement>>,
    patched_sql: String,
    stat: StatementStat,
    return_to: Option<(Arc<Mutex<StatementCache>>, String)>,
}

impl StatementWrapper {
    fn inner_mut(&mut self) -> &mut dyn BackendStatement {
        self.inner.as_deref_mut().expect("statement used after being returned")
    }

    fn inner_ref(&self) -> &dyn BackendStatement {
        self.inner.as_deref().expect("statement used after being returned")
    }
}

impl Drop for StatementWrapper {
    fn drop(&mut self) {
        if let (Some(inner), Some((cache, key))) = (self.inner.take(), self.return_to.take()) {
            cache.lock().unwrap().idle.insert(key, inner);
        }
    }
}

impl Statement for StatementWrapper {
    fn bind(&mut self, col: usize, val: &BindValue<'_>) -> Result<()> {
        self.inner_mut().bind_impl(col, val)?;
        self.stat.record_bind(col, val);
        Ok(())
    }

    fn bindings_reset(&mut self) {
        self.inner_mut().bindings_reset_impl();
        self.stat.reset_bindings();
    }

    fn run_query(&mut self) -> Result<Box<dyn ResultSet>> {
        let sql = self.patched_sql.clone();
        let inner = self.inner.as_deref_mut().expect("statement used after being returned");
        self.stat
            .measure_query(&sql, |r: &Box<dyn ResultSet>| r.rows(), || inner.query_impl())
    }

    fn run_exec(&mut self) -> Result<()> {
        let sql = self.patched_sql.clone();
        let inner = self.inner.as_deref_mut().expect("statement used after being returned");
        self.stat.measure_exec(&sql, || {
            inner.exec_impl()?;
            inner.affected_impl()
        })?;
        Ok(())
    }

    fn sequence_last(&mut self, sequence: Option<&str>) -> Result<i64> {
        self.inner_mut().sequence_last_impl(sequence)
    }

    fn affected(&self) -> Result<u64> {
        self.inner_ref().affected_impl()
    }

    fn patched_query(&self) -> &str {
        &self.patched_sql
    }
}

/// Wraps a [`BackendConnection`] to provide a full [`Connection`]: dialect
/// selection on every statement/batch, a prepared-statement cache, and
/// stats/monitor wiring.
pub struct ConnectionBase<B: BackendConnection> {
    inner: B,
    cache: Arc<Mutex<StatementCache>>,
    session_stat: Arc<SessionStat>,
    expand_conditionals: bool,
    specific: Mutex<Option<Box<dyn Any + Send>>>,
}

impl<B: BackendConnection> ConnectionBase<B> {
    pub fn new(
        inner: B,
        conn_info: &ConnInfo,
        monitor: Option<Box<dyn SessionMonitor>>,
    ) -> Result<Self> {
        let expand_conditionals = match conn_info.get_or("@expand_conditionals", "on") {
            s if s.eq_ignore_ascii_case("on") => true,
            s if s.eq_ignore_ascii_case("off") => false,
            other => {
                return Err(crate::error::Error::invalid_connection_string(format!(
                    "@expand_conditionals should be either 'on' or 'off', got '{other}'"
                )))
            }
        };
        Ok(ConnectionBase {
            inner,
            cache: Arc::new(Mutex::new(StatementCache {
                idle: BTreeMap::new(),
            })),
            session_stat: Arc::new(SessionStat::new(monitor)),
            expand_conditionals,
            specific: Mutex::new(None),
        })
    }

    fn select(&self, sql: &str) -> Result<String> {
        if self.expand_conditionals {
            let (major, minor) = self.inner.version();
            dialect::select_statement(sql, self.inner.engine(), major, minor)
        } else {
            Ok(sql.to_string())
        }
    }
}

impl<B: BackendConnection> Connection for ConnectionBase<B> {
    fn select_dialect(&self, sql: &str) -> Result<String> {
        self.select(sql)
    }

    fn prepare_statement(&self, sql: &str) -> Result<Box<dyn Statement>> {
        let patched = sql.to_string();

        let existing = self.cache.lock().unwrap().idle.remove(&patched);
        let backend_stmt = match existing {
            Some(mut stmt) => {
                log::debug!("prepared-statement cache hit for {patched:?}");
                stmt.bindings_reset_impl();
                stmt
            }
            None => {
                log::debug!("prepared-statement cache miss for {patched:?}, compiling");
                self.inner.prepare_statement_impl(&patched)?
            }
        };

        Ok(Box::new(StatementWrapper {
            inner: Some(backend_stmt),
            patched_sql: patched.clone(),
            stat: StatementStat::new(self.session_stat.clone()),
            return_to: Some((self.cache.clone(), patched)),
        }))
    }

    fn create_statement(&self, sql: &str) -> Result<Box<dyn Statement>> {
        let patched = sql.to_string();
        let backend_stmt = self.inner.create_statement_impl(&patched)?;
        Ok(Box::new(StatementWrapper {
            inner: Some(backend_stmt),
            patched_sql: patched,
            stat: StatementStat::new(self.session_stat.clone()),
            return_to: None,
        }))
    }

    fn exec_batch(&self, sql: &str) -> Result<()> {
        let patched = if self.expand_conditionals {
            let (major, minor) = self.inner.version();
            dialect::select_statements_in_batch(sql, self.inner.engine(), major, minor)?
        } else {
            sql.to_string()
        };
        self.inner.exec_batch_impl(&patched)
    }

    fn begin(&self) -> Result<()> {
        self.session_stat
            .begin(|| self.inner.begin_impl(), || self.inner.rollback_impl())
    }

    fn commit(&self) -> Result<()> {
        self.session_stat.commit(|| self.inner.commit_impl())
    }

    fn rollback(&self) {
        self.session_stat.rollback(|| self.inner.rollback_impl())
    }

    fn escape(&self, text: &str) -> Result<String> {
        self.inner.escape_impl(text)
    }

    fn engine(&self) -> &str {
        self.inner.engine()
    }

    fn backend_name(&self) -> &str {
        self.inner.backend_name()
    }

    fn version(&self) -> (u32, u32) {
        self.inner.version()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn total_execution_time(&self) -> f64 {
        self.session_stat.total_execution_time()
    }

    fn set_specific(&self, data: Box<dyn Any + Send>) {
        *self.specific.lock().unwrap() = Some(data);
    }

    fn get_specific(&self) -> std::sync::MutexGuard<'_, Option<Box<dyn Any + Send>>> {
        self.specific.lock().unwrap()
    }
}
