//! An RAII transaction guard: begins on construction, commits on
//! [`Transaction::commit`], and rolls back on drop unless already committed.

use crate::error::Result;
use crate::session::Session;

/// A transaction scoped to its own lifetime.
///
/// ```ignore
/// let tx = Transaction::begin(session)?;
/// tx.session().prepare("insert into t values (:v)")?.bind_named("v", 1)?.exec()?;
/// tx.commit()?;
/// ```
///
/// Dropping a `Transaction` that was never committed rolls back — including
/// when a `?` unwinds out of the scope that holds it.
pub struct Transaction {
    session: Session,
    committed: bool,
}

impl Transaction {
    /// Begins a transaction on `session`.
    pub fn begin(session: Session) -> Result<Self> {
        session.begin()?;
        Ok(Transaction {
            session,
            committed: false,
        })
    }

    /// The session this transaction runs on.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Commits the transaction. Calling this consumes the guard, so a
    /// subsequent drop does nothing further.
    pub fn commit(mut self) -> Result<()> {
        self.session.commit()?;
        self.committed = true;
        Ok(())
    }

    /// Rolls back explicitly. Equivalent to just dropping the guard, spelled
    /// out for callers who want the intent visible at the call site.
    pub fn rollback(self) {
        drop(self);
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.committed {
            self.session.rollback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Connection, ResultSet, Statement as BackendStatement};
    use crate::types::BindValue;
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

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

    struct StubStatement;
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
            ""
        }
    }

    #[derive(Default)]
    struct Counters {
        begins: AtomicUsize,
        commits: AtomicUsize,
        rollbacks: AtomicUsize,
    }

    struct TrackingConnection {
        counters: Arc<Counters>,
        specific: Mutex<Option<Box<dyn Any + Send>>>,
    }

    impl Connection for TrackingConnection {
        fn select_dialect(&self, sql: &str) -> Result<String> {
            Ok(sql.to_string())
        }
        fn prepare_statement(&self, _sql: &str) -> Result<Box<dyn BackendStatement>> {
            Ok(Box::new(StubStatement))
        }
        fn create_statement(&self, _sql: &str) -> Result<Box<dyn BackendStatement>> {
            Ok(Box::new(StubStatement))
        }
        fn exec_batch(&self, _sql: &str) -> Result<()> {
            Ok(())
        }
        fn begin(&self) -> Result<()> {
            self.counters.begins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn commit(&self) -> Result<()> {
            self.counters.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn rollback(&self) {
            self.counters.rollbacks.fetch_add(1, Ordering::SeqCst);
        }
        fn escape(&self, text: &str) -> Result<String> {
            Ok(text.to_string())
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

    fn session_with(counters: Arc<Counters>) -> Session {
        Session::from_connection(Arc::new(TrackingConnection {
            counters,
            specific: Mutex::new(None),
        }))
    }

    #[test]
    fn committed_transaction_does_not_roll_back_on_drop() {
        let counters = Arc::new(Counters::default());
        let tx = Transaction::begin(session_with(counters.clone())).unwrap();
        tx.commit().unwrap();
        assert_eq!(counters.begins.load(Ordering::SeqCst), 1);
        assert_eq!(counters.commits.load(Ordering::SeqCst), 1);
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropped_transaction_rolls_back() {
        let counters = Arc::new(Counters::default());
        {
            let _tx = Transaction::begin(session_with(counters.clone())).unwrap();
        }
        assert_eq!(counters.begins.load(Ordering::SeqCst), 1);
        assert_eq!(counters.commits.load(Ordering::SeqCst), 0);
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_rollback_still_rolls_back_once() {
        let counters = Arc::new(Counters::default());
        let tx = Transaction::begin(session_with(counters.clone())).unwrap();
        tx.rollback();
        assert_eq!(counters.rollbacks.load(Ordering::SeqCst), 1);
    }
}
