//! A single in-memory table: an ordered column list plus a rowid-keyed row
//! store, so deletes don't disturb the identity of surviving rows the way a
//! plain `Vec<Row>` would.

use std::collections::BTreeMap;

use crate::value::Value;

pub struct Table {
    pub columns: Vec<String>,
    pub rows: BTreeMap<u64, Vec<Value>>,
    pub next_rowid: u64,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: BTreeMap::new(),
            next_rowid: 1,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn insert(&mut self, row: Vec<Value>) -> u64 {
        let rowid = self.next_rowid;
        self.next_rowid += 1;
        self.rows.insert(rowid, row);
        rowid
    }
}
