//! The [`edba::backend::base::BackendStatement`] primitive: parses its SQL
//! once at construction, then applies positionally bound [`Value`]s against
//! the shared in-memory store on `exec`/`query`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use edba::backend::base::BackendStatement;
use edba::backend::ResultSet;
use edba::error::{Error, Result};
use edba::types::BindValue;

use crate::result::MemoryResultSet;
use crate::sql::{self, Statement as Ast};
use crate::table::Table;
use crate::value::Value;

/// Recorded so a rolled-back transaction can undo exactly the mutations it
/// made, in reverse order.
pub enum UndoOp {
    DropTable(String),
    DeleteRow { table: String, rowid: u64 },
    RestoreRow { table: String, rowid: u64, row: Vec<Value> },
}

pub type Store = Mutex<HashMap<String, Table>>;
pub type TxLog = Mutex<Option<Vec<UndoOp>>>;

pub struct MemoryStatement {
    parsed: Ast,
    bindings: RefCell<Vec<Value>>,
    affected: Cell<u64>,
    store: Arc<Store>,
    tx_log: Arc<TxLog>,
    last_insert_id: Arc<AtomicI64>,
}

impl MemoryStatement {
    pub fn new(
        sql: &str,
        store: Arc<Store>,
        tx_log: Arc<TxLog>,
        last_insert_id: Arc<AtomicI64>,
    ) -> Result<Self> {
        let parsed = sql::parse(sql)?;
        Ok(MemoryStatement {
            parsed,
            bindings: RefCell::new(Vec::new()),
            affected: Cell::new(0),
            store,
            tx_log,
            last_insert_id,
        })
    }

    fn record_undo(&self, op: UndoOp) {
        if let Some(log) = self.tx_log.lock().unwrap().as_mut() {
            log.push(op);
        }
    }

    fn table_not_found(name: &str) -> Error {
        Error::edba_error(format!("no such table: {name}"))
    }

    fn column_not_found(table: &str, col: &str) -> Error {
        Error::edba_error(format!("no such column: {table}.{col}"))
    }
}

impl BackendStatement for MemoryStatement {
    fn bind_impl(&mut self, col: usize, val: &BindValue<'_>) -> Result<()> {
        let mut bindings = self.bindings.borrow_mut();
        let idx = col - 1;
        if bindings.len() <= idx {
            bindings.resize(idx + 1, Value::Null);
        }
        bindings[idx] = Value::from_bind(val);
        Ok(())
    }

    fn bindings_reset_impl(&mut self) {
        self.bindings.borrow_mut().clear();
        self.affected.set(0);
    }

    fn query_impl(&mut self) -> Result<Box<dyn ResultSet>> {
        let Ast::Select { table, columns, filter } = &self.parsed else {
            return Err(Error::edba_error("query on statement"));
        };
        let store = self.store.lock().unwrap();
        let t = store.get(table).ok_or_else(|| Self::table_not_found(table))?;

        let col_names: Vec<String> = if columns.is_empty() {
            t.columns.clone()
        } else {
            columns.clone()
        };
        let col_idxs = col_names
            .iter()
            .map(|c| t.column_index(c).ok_or_else(|| Self::column_not_found(table, c)))
            .collect::<Result<Vec<_>>>()?;

        let bindings = self.bindings.borrow();
        let mut cursor = bindings.iter();
        let filter_match = match filter {
            Some(w) => {
                let idx = t.column_index(&w.column).ok_or_else(|| Self::column_not_found(table, &w.column))?;
                Some((idx, w.value.resolve(&mut cursor)?))
            }
            None => None,
        };

        let mut rows = Vec::new();
        for row in t.rows.values() {
            if let Some((idx, val)) = &filter_match {
                if &row[*idx] != val {
                    continue;
                }
            }
            rows.push(col_idxs.iter().map(|&i| row[i].clone()).collect());
        }

        Ok(Box::new(MemoryResultSet { columns: col_names, rows, pos: -1 }))
    }

    fn exec_impl(&mut self) -> Result<()> {
        match &self.parsed {
            Ast::Select { .. } => Err(Error::edba_error("exec on query")),
            Ast::CreateTable { table, columns } => {
                let mut store = self.store.lock().unwrap();
                if store.contains_key(table) {
                    return Err(Error::edba_error(format!("table '{table}' already exists")));
                }
                log::debug!("memory: creating table '{table}' with {} column(s)", columns.len());
                store.insert(table.clone(), Table::new(columns.clone()));
                drop(store);
                self.record_undo(UndoOp::DropTable(table.clone()));
                self.affected.set(0);
                Ok(())
            }
            Ast::Insert { table, columns, values } => {
                let bindings = self.bindings.borrow();
                let mut cursor = bindings.iter();
                let mut store = self.store.lock().unwrap();
                let t = store.get_mut(table).ok_or_else(|| Self::table_not_found(table))?;

                let mut row = vec![Value::Null; t.columns.len()];
                for (col_name, lit) in columns.iter().zip(values.iter()) {
                    let idx = t.column_index(col_name).ok_or_else(|| Self::column_not_found(table, col_name))?;
                    row[idx] = lit.resolve(&mut cursor)?;
                }
                let rowid = t.insert(row);
                drop(store);
                drop(bindings);

                self.last_insert_id.store(rowid as i64, Ordering::SeqCst);
                self.record_undo(UndoOp::DeleteRow { table: table.clone(), rowid });
                self.affected.set(1);
                Ok(())
            }
            Ast::Update { table, assignments, filter } => {
                let bindings = self.bindings.borrow();
                let mut cursor = bindings.iter();
                let resolved_assignments = assignments
                    .iter()
                    .map(|(name, lit)| Ok((name.clone(), lit.resolve(&mut cursor)?)))
                    .collect::<Result<Vec<_>>>()?;
                let resolved_filter = match filter {
                    Some(w) => Some((w.column.clone(), w.value.resolve(&mut cursor)?)),
                    None => None,
                };
                drop(bindings);

                let mut store = self.store.lock().unwrap();
                let t = store.get_mut(table).ok_or_else(|| Self::table_not_found(table))?;
                let assignment_idxs = resolved_assignments
                    .iter()
                    .map(|(name, val)| {
                        t.column_index(name)
                            .map(|idx| (idx, val.clone()))
                            .ok_or_else(|| Self::column_not_found(table, name))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let filter_idx = match &resolved_filter {
                    Some((name, val)) => Some((
                        t.column_index(name).ok_or_else(|| Self::column_not_found(table, name))?,
                        val.clone(),
                    )),
                    None => None,
                };

                let mut undo = Vec::new();
                let mut affected = 0u64;
                for (rowid, row) in t.rows.iter_mut() {
                    if let Some((idx, val)) = &filter_idx {
                        if &row[*idx] != val {
                            continue;
                        }
                    }
                    undo.push(UndoOp::RestoreRow {
                        table: table.clone(),
                        rowid: *rowid,
                        row: row.clone(),
                    });
                    for (idx, val) in &assignment_idxs {
                        row[*idx] = val.clone();
                    }
                    affected += 1;
                }
                drop(store);
                for op in undo {
                    self.record_undo(op);
                }
                self.affected.set(affected);
                Ok(())
            }
            Ast::Delete { table, filter } => {
                let bindings = self.bindings.borrow();
                let mut cursor = bindings.iter();
                let resolved_filter = match filter {
                    Some(w) => Some((w.column.clone(), w.value.resolve(&mut cursor)?)),
                    None => None,
                };
                drop(bindings);

                let mut store = self.store.lock().unwrap();
                let t = store.get_mut(table).ok_or_else(|| Self::table_not_found(table))?;
                let filter_idx = match &resolved_filter {
                    Some((name, val)) => Some((
                        t.column_index(name).ok_or_else(|| Self::column_not_found(table, name))?,
                        val.clone(),
                    )),
                    None => None,
                };

                let to_remove: Vec<u64> = t
                    .rows
                    .iter()
                    .filter(|(_, row)| match &filter_idx {
                        Some((idx, val)) => &row[*idx] == val,
                        None => true,
                    })
                    .map(|(rowid, _)| *rowid)
                    .collect();

                let mut undo = Vec::new();
                for rowid in &to_remove {
                    if let Some(row) = t.rows.remove(rowid) {
                        undo.push(UndoOp::RestoreRow { table: table.clone(), rowid: *rowid, row });
                    }
                }
                drop(store);
                for op in undo {
                    self.record_undo(op);
                }
                self.affected.set(to_remove.len() as u64);
                Ok(())
            }
        }
    }

    fn sequence_last_impl(&mut self, _sequence: Option<&str>) -> Result<i64> {
        Ok(self.last_insert_id.load(Ordering::SeqCst))
    }

    fn affected_impl(&self) -> Result<u64> {
        Ok(self.affected.get())
    }
}
