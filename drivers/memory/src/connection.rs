//! The [`edba::backend::base::BackendConnection`] primitive, plus the
//! process-wide registry of named in-memory stores so two connections opened
//! with the same `db=name` option share tables (needed for pool tests, where
//! several pooled connections must see each other's writes).

use std::collections::HashMap;
use std::sync::atomic::AtomicI64;
use std::sync::{Arc, Mutex, OnceLock};

use edba::backend::base::{BackendConnection, BackendStatement, ConnectionBase};
use edba::backend::Connection;
use edba::conn_info::ConnInfo;
use edba::error::Result;
use edba::monitor::SessionMonitor;

use crate::statement::{MemoryStatement, Store, TxLog, UndoOp};

type NamedStores = Mutex<HashMap<String, Arc<Store>>>;

fn named_stores() -> &'static NamedStores {
    static STORES: OnceLock<NamedStores> = OnceLock::new();
    STORES.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Resolves the backing store for a `db=` option: named stores are shared
/// process-wide (case-sensitively, matching table/column lookups elsewhere in
/// this backend), an absent or empty name gets a private store of its own.
fn resolve_store(info: &ConnInfo) -> Arc<Store> {
    match info.get("db").filter(|n| !n.is_empty()) {
        Some(name) => named_stores()
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(HashMap::new())))
            .clone(),
        None => Arc::new(Mutex::new(HashMap::new())),
    }
}

pub struct MemoryConnection {
    store: Arc<Store>,
    tx_log: Arc<TxLog>,
    last_insert_id: Arc<AtomicI64>,
    description: String,
}

impl MemoryConnection {
    fn new_statement(&self, patched_sql: &str) -> Result<Box<dyn BackendStatement>> {
        Ok(Box::new(MemoryStatement::new(
            patched_sql,
            self.store.clone(),
            self.tx_log.clone(),
            self.last_insert_id.clone(),
        )?))
    }
}

impl BackendConnection for MemoryConnection {
    fn prepare_statement_impl(&self, patched_sql: &str) -> Result<Box<dyn BackendStatement>> {
        self.new_statement(patched_sql)
    }

    fn create_statement_impl(&self, patched_sql: &str) -> Result<Box<dyn BackendStatement>> {
        self.new_statement(patched_sql)
    }

    fn exec_batch_impl(&self, patched_sql: &str) -> Result<()> {
        for part in patched_sql.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let mut stmt = self.new_statement(part)?;
            stmt.exec_impl()?;
        }
        Ok(())
    }

    fn begin_impl(&self) -> Result<()> {
        log::trace!("memory: begin transaction");
        *self.tx_log.lock().unwrap() = Some(Vec::new());
        Ok(())
    }

    fn commit_impl(&self) -> Result<()> {
        log::trace!("memory: commit transaction");
        *self.tx_log.lock().unwrap() = None;
        Ok(())
    }

    fn rollback_impl(&self) {
        let undo_log = self.tx_log.lock().unwrap().take();
        let Some(undo_log) = undo_log else { return };
        log::debug!("memory: rolling back {} undo operation(s)", undo_log.len());
        let mut store = self.store.lock().unwrap();
        for op in undo_log.into_iter().rev() {
            match op {
                UndoOp::DropTable(table) => {
                    store.remove(&table);
                }
                UndoOp::DeleteRow { table, rowid } => {
                    if let Some(t) = store.get_mut(&table) {
                        t.rows.remove(&rowid);
                    }
                }
                UndoOp::RestoreRow { table, rowid, row } => {
                    if let Some(t) = store.get_mut(&table) {
                        t.rows.insert(rowid, row);
                    }
                }
            }
        }
    }

    fn escape_impl(&self, text: &str) -> Result<String> {
        Ok(text.replace('\'', "''"))
    }

    fn engine(&self) -> &str {
        "memory"
    }

    fn backend_name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> (u32, u32) {
        (1, 0)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builds a connection from a `memory:...` connection string. Registered
/// under the name `"memory"` by [`register`].
pub fn connect(info: &ConnInfo, monitor: Option<Box<dyn SessionMonitor>>) -> Result<Arc<dyn Connection>> {
    let store = resolve_store(info);
    let description = match info.get("db") {
        Some(name) => format!("in-memory reference backend, shared store '{name}'"),
        None => "in-memory reference backend, private store".to_string(),
    };
    let inner = MemoryConnection {
        store,
        tx_log: Arc::new(Mutex::new(None)),
        last_insert_id: Arc::new(AtomicI64::new(0)),
        description,
    };
    Ok(Arc::new(ConnectionBase::new(inner, info, monitor)?))
}

/// Registers the `memory` driver in-process. Called automatically once by
/// [`crate::ensure_registered`]; downstream crates never need to call it
/// directly.
pub fn register() {
    edba::registry::register("memory", connect);
}
