//! The gateway to a single database connection: [`Session`] wraps a backend
//! connection and is the entry point for preparing statements, running
//! batches, and managing transactions.

use std::any::Any;
use std::sync::Arc;

use crate::backend;
use crate::bind_by_name::{BoundNames, PostgresqlStyleMarker, QuestionMarker};
use crate::error::Result;
use crate::statement::Statement;

/// A handle to a live database connection.
///
/// Cheaply cloneable: every clone shares the same underlying backend
/// connection (`Arc`-backed), and the connection stays alive for as long as
/// the longest-lived clone. "Closing" a session just drops that clone's
/// reference — see [`Session::close`].
#[derive(Clone)]
pub struct Session {
    conn: Arc<dyn backend::Connection>,
}

impl Session {
    pub(crate) fn from_connection(conn: Arc<dyn backend::Connection>) -> Self {
        Session { conn }
    }

    /// Drops this clone's reference to the underlying connection. The
    /// connection itself is only torn down once every `Session`/`Statement`
    /// holding a reference to it has done the same.
    pub fn close(self) {
        drop(self);
    }

    /// Prepares `sql`, reusing a cached compilation when the connection has
    /// already prepared the same (post-dialect-selection) text.
    pub fn prepare(&self, sql: &str) -> Result<Statement> {
        self.build_statement(sql, |conn, patched| conn.prepare_statement(patched))
    }

    /// Like [`Session::prepare`], but never consults or populates the
    /// prepared-statement cache. Use for one-off or highly dynamic SQL.
    pub fn create_statement(&self, sql: &str) -> Result<Statement> {
        self.build_statement(sql, |conn, patched| conn.create_statement(patched))
    }

    fn build_statement(
        &self,
        sql: &str,
        make: impl FnOnce(&dyn backend::Connection, &str) -> Result<Box<dyn backend::Statement>>,
    ) -> Result<Statement> {
        if sql.trim().is_empty() {
            return Err(crate::error::Error::empty_string_query(
                "attempted to prepare an empty SQL string",
            ));
        }
        // Dialect selection runs first, on the raw (possibly `~engine~`
        // annotated) text: each branch may carry its own `:name` placeholder
        // set, so the name -> position rewrite must see only the one branch
        // that survives selection, not every branch's placeholders at once.
        let selected = self.conn.select_dialect(sql)?;
        let marker_style = self.conn.engine().to_ascii_lowercase();
        let bound = if marker_style.contains("postgres") || marker_style.contains("pgsql") {
            BoundNames::rewrite(&selected, &PostgresqlStyleMarker)
        } else {
            BoundNames::rewrite(&selected, &QuestionMarker)
        };
        let inner = make(self.conn.as_ref(), bound.patched_query())?;
        Ok(Statement::new(self.clone(), inner, bound))
    }

    /// Executes `sql` (possibly several `;`-separated statements) as a
    /// single batch request.
    pub fn exec_batch(&self, sql: &str) -> Result<()> {
        self.conn.exec_batch(sql)
    }

    /// Begins a transaction. Prefer [`crate::transaction::Transaction`] for
    /// RAII-scoped transactions instead of calling this directly.
    pub fn begin(&self) -> Result<()> {
        self.conn.begin()
    }

    /// Commits the open transaction.
    pub fn commit(&self) -> Result<()> {
        self.conn.commit()
    }

    /// Rolls back the open transaction. Never fails (see the backend
    /// contract's `rollback` contract).
    pub fn rollback(&self) {
        self.conn.rollback()
    }

    pub fn escape(&self, text: &str) -> Result<String> {
        self.conn.escape(text)
    }

    /// The backend/driver name, e.g. `"sqlite3"`, `"odbc"`, `"PgSQL"`.
    pub fn backend_name(&self) -> &str {
        self.conn.backend_name()
    }

    /// The SQL dialect name used for `~engine~` selection, e.g.
    /// `"sqlite3"`, `"PgSQL"`, `"Microsoft SQL Server"`.
    pub fn engine(&self) -> &str {
        self.conn.engine()
    }

    pub fn version(&self) -> (u32, u32) {
        self.conn.version()
    }

    pub fn description(&self) -> &str {
        self.conn.description()
    }

    /// Running total of time spent executing statements/queries on this
    /// connection, whether or not a monitor is attached.
    pub fn total_execution_time(&self) -> f64 {
        self.conn.total_execution_time()
    }

    /// Attaches application-defined per-connection state, replacing
    /// whatever was set before.
    pub fn set_specific<T: Any + Send>(&self, data: T) {
        self.conn.set_specific(Box::new(data));
    }

    /// Runs `f` with the current specific-data slot downcast to `T`, or
    /// `None` if nothing was set or the stored type doesn't match.
    pub fn with_specific<T: Any + Send, R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        let guard = self.conn.get_specific();
        f(guard.as_ref().and_then(|b| b.downcast_ref::<T>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Connection, ResultSet, Statement as BackendStatement};
    use crate::types::BindValue;
    use std::sync::Mutex;

    struct NullResult;
    impl ResultSet for NullResult {
        fn has_next(&self) -> crate::backend::NextRow {
            crate::backend::NextRow::LastRowReached
        }
        fn next(&mut self) -> Result<bool> {
            Ok(false)
        }
        fn fetch(&mut self, _col: usize, _dest: &mut crate::types::FetchValue<'_>) -> Result<bool> {
            Ok(false)
        }
        fn is_null(&mut self, _col: usize) -> Result<bool> {
            Ok(true)
        }
        fn cols(&self) -> usize {
            0
        }
        fn rows(&self) -> Option<u64> {
            Some(0)
        }
        fn name_to_column(&self, _name: &str) -> Option<usize> {
            None
        }
        fn column_to_name(&self, _col: usize) -> Result<String> {
            Err(crate::error::Error::invalid_column("no columns"))
        }
    }

    struct StubStatement {
        sql: String,
    }
    impl BackendStatement for StubStatement {
        fn bind(&mut self, _col: usize, _val: &BindValue<'_>) -> Result<()> {
            Ok(())
        }
        fn bindings_reset(&mut self) {}
        fn run_query(&mut self) -> Result<Box<dyn ResultSet>> {
            Ok(Box::new(NullResult))
        }
        fn run_exec(&mut self) -> Result<()> {
            Ok(())
        }
        fn affected(&self) -> Result<u64> {
            Ok(0)
        }
        fn patched_query(&self) -> &str {
            &self.sql
        }
    }

    struct StubConnection {
        specific: Mutex<Option<Box<dyn Any + Send>>>,
    }

    impl Connection for StubConnection {
        fn select_dialect(&self, sql: &str) -> Result<String> {
            Ok(sql.to_string())
        }
        fn prepare_statement(&self, sql: &str) -> Result<Box<dyn BackendStatement>> {
            Ok(Box::new(StubStatement { sql: sql.to_string() }))
        }
        fn create_statement(&self, sql: &str) -> Result<Box<dyn BackendStatement>> {
            Ok(Box::new(StubStatement { sql: sql.to_string() }))
        }
        fn exec_batch(&self, _sql: &str) -> Result<()> {
            Ok(())
        }
        fn begin(&self) -> Result<()> {
            Ok(())
        }
        fn commit(&self) -> Result<()> {
            Ok(())
        }
        fn rollback(&self) {}
        fn escape(&self, text: &str) -> Result<String> {
            Ok(text.replace('\'', "''"))
        }
        fn engine(&self) -> &str {
            "sqlite3"
        }
        fn backend_name(&self) -> &str {
            "sqlite3"
        }
        fn version(&self) -> (u32, u32) {
            (3, 40)
        }
        fn description(&self) -> &str {
            "stub"
        }
        fn total_execution_time(&self) -> f64 {
            0.0
        }
        fn set_specific(&self, data: Box<dyn Any + Send>) {
            *self.specific.lock().unwrap() = Some(data);
        }
        fn get_specific(&self) -> std::sync::MutexGuard<'_, Option<Box<dyn Any + Send>>> {
            self.specific.lock().unwrap()
        }
    }

    fn session() -> Session {
        Session::from_connection(Arc::new(StubConnection {
            specific: Mutex::new(None),
        }))
    }

    #[test]
    fn prepare_rewrites_named_placeholders_with_question_marks() {
        let sess = session();
        let st = sess.prepare("select * from t where a = :a and b = :b").unwrap();
        assert_eq!(
            st.patched_query(),
            "select * from t where a = ? and b = ?"
        );
    }

    #[test]
    fn empty_sql_is_rejected() {
        let sess = session();
        let err = sess.prepare("   ").unwrap_err();
        assert_eq!(err.kind(), crate::error::Kind::EmptyStringQuery);
    }

    #[test]
    fn specific_data_round_trips_through_downcast() {
        let sess = session();
        sess.set_specific(42u32);
        sess.with_specific::<u32, _>(|v| assert_eq!(v, Some(&42)));
        sess.with_specific::<String, _>(|v| assert_eq!(v, None));
    }
}
