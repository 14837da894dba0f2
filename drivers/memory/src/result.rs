//! The [`edba::backend::ResultSet`] a `select` query returns: a snapshot of
//! matching rows taken at `query()` time, since this backend buffers rather
//! than streaming from a live cursor (see §4.5/§5's "unless the backend
//! explicitly buffers" carve-out).

use edba::backend::{NextRow, ResultSet};
use edba::error::{Error, Result};
use edba::types::FetchValue;

use crate::value::Value;

pub struct MemoryResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub pos: isize,
}

impl MemoryResultSet {
    fn current(&self) -> Result<&Vec<Value>> {
        if self.pos < 0 || self.pos as usize >= self.rows.len() {
            return Err(Error::empty_row_access("no current row"));
        }
        Ok(&self.rows[self.pos as usize])
    }
}

impl ResultSet for MemoryResultSet {
    fn has_next(&self) -> NextRow {
        if (self.pos + 1) as usize >= self.rows.len() {
            NextRow::LastRowReached
        } else {
            NextRow::NextRowExists
        }
    }

    fn next(&mut self) -> Result<bool> {
        self.pos += 1;
        Ok((self.pos as usize) < self.rows.len())
    }

    fn fetch(&mut self, col: usize, dest: &mut FetchValue<'_>) -> Result<bool> {
        if col >= self.columns.len() {
            return Err(Error::invalid_column(format!(
                "column {col} out of range (result has {} columns)",
                self.columns.len()
            )));
        }
        self.current()?[col].write_into(dest)
    }

    fn is_null(&mut self, col: usize) -> Result<bool> {
        if col >= self.columns.len() {
            return Err(Error::invalid_column(format!("column {col} out of range")));
        }
        Ok(matches!(self.current()?[col], Value::Null))
    }

    fn cols(&self) -> usize {
        self.columns.len()
    }

    fn rows(&self) -> Option<u64> {
        Some(self.rows.len() as u64)
    }

    fn name_to_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    fn column_to_name(&self, col: usize) -> Result<String> {
        self.columns
            .get(col)
            .cloned()
            .ok_or_else(|| Error::invalid_column(format!("column {col} out of range")))
    }
}
