//! The materialized view over a result set's current row ([`Row`]), and the
//! one-shot forward range over rows a query produces ([`Rowset`]).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::backend::{NextRow, ResultSet};
use crate::error::{Error, Result};
use crate::types::{FetchConversion, FetchValue};

/// Shared so a [`Row`] handed out by a [`Rowset`] iteration and the
/// [`Rowset`] itself can both reach the same backend cursor — connection-
/// affine, so `Rc` rather than `Arc` is enough (see the crate's concurrency
/// notes: nothing here crosses a thread boundary).
pub(crate) type SharedResult = Rc<RefCell<Box<dyn ResultSet>>>;

/// A view over the result set's current row.
///
/// `Row` is cheap to clone: every clone shares the same backend cursor, so
/// advancing one clone (via the owning [`Rowset`]) is visible through all of
/// them — copying a row mid-iteration does not snapshot its data.
#[derive(Clone)]
pub struct Row {
    result: SharedResult,
    next_col: Cell<usize>,
}

impl Row {
    pub(crate) fn new(result: SharedResult) -> Self {
        Row {
            result,
            next_col: Cell::new(0),
        }
    }

    /// Number of columns in the result set.
    pub fn cols(&self) -> usize {
        self.result.borrow().cols()
    }

    pub fn column_name(&self, col: usize) -> Result<String> {
        self.check_col(col)?;
        self.result.borrow().column_to_name(col)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.result
            .borrow()
            .name_to_column(name)
            .ok_or_else(|| Error::invalid_column(format!("no column named '{name}'")))
    }

    /// Resets the auto-advancing column cursor `fetch` (without an explicit
    /// index) uses, back to 0.
    pub fn rewind_column(&self) {
        self.next_col.set(0);
    }

    pub fn is_null(&self, col: usize) -> Result<bool> {
        self.check_col(col)?;
        self.result.borrow_mut().is_null(col)
    }

    fn check_col(&self, col: usize) -> Result<()> {
        if col >= self.cols() {
            return Err(Error::invalid_column(format!(
                "column {col} out of range (result has {} columns)",
                self.cols()
            )));
        }
        Ok(())
    }

    /// Fetches column `col` (0-based) into `dest`. Returns `false`, leaving
    /// `dest` unchanged, if the column is SQL NULL.
    pub fn fetch(&self, col: usize, dest: &mut FetchValue<'_>) -> Result<bool> {
        self.check_col(col)?;
        self.result.borrow_mut().fetch(col, dest)
    }

    pub fn fetch_named(&self, name: &str, dest: &mut FetchValue<'_>) -> Result<bool> {
        let col = self.column_index(name)?;
        self.fetch(col, dest)
    }

    /// Like [`Row::fetch`], but raises `null_value_fetch` instead of
    /// returning `false` on NULL.
    pub fn get<T: FetchConversion>(&mut self, col: usize) -> Result<T> {
        self.next_col.set(col);
        let v = T::fetch_auto(self)?;
        Ok(v)
    }

    pub fn get_named<T: FetchConversion>(&mut self, name: &str) -> Result<T> {
        let col = self.column_index(name)?;
        self.get(col)
    }

    /// Used by [`FetchConversion`] implementations to read the next
    /// auto-advancing column.
    pub(crate) fn fetch_next(&self, dest: &mut FetchValue<'_>) -> Result<bool> {
        let col = self.next_col.get();
        self.check_col(col)?;
        self.next_col.set(col + 1);
        self.result.borrow_mut().fetch(col, dest)
    }

    pub(crate) fn is_next_null(&self) -> Result<bool> {
        let col = self.next_col.get();
        self.check_col(col)?;
        self.result.borrow_mut().is_null(col)
    }

    pub(crate) fn skip_next(&self) {
        self.next_col.set(self.next_col.get() + 1);
    }
}

/// Marker trait implemented by everything a [`Rowset`] can yield: the raw
/// [`Row`] handle itself, or any [`FetchConversion`] type materialized from
/// it. Kept separate from `FetchConversion` because `Row` itself must not
/// go through `fetch_auto` — it IS the row, not a conversion target.
pub trait RowsetItem: Sized {
    fn from_row(row: &mut Row) -> Result<Self>;
}

impl RowsetItem for Row {
    fn from_row(row: &mut Row) -> Result<Self> {
        Ok(row.clone())
    }
}

impl<T: FetchConversion> RowsetItem for T {
    fn from_row(row: &mut Row) -> Result<Self> {
        T::fetch_auto(row)
    }
}

/// A one-shot forward range over the rows of a query.
///
/// Iterating is driven through [`Rowset::iter`], which may be called at most
/// once: a second call raises `multiple_rowset_traverse`, mirroring the
/// "single pass range" contract of the library this crate's API is modeled
/// on, where `begin()` may only ever be called once per rowset.
pub struct Rowset<T = Row> {
    result: SharedResult,
    started: Cell<bool>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> Rowset<T> {
    pub(crate) fn new(result: Box<dyn ResultSet>) -> Self {
        Rowset {
            result: Rc::new(RefCell::new(result)),
            started: Cell::new(false),
            _marker: std::marker::PhantomData,
        }
    }

    /// Row count, if the backend can report it without scanning ahead.
    pub fn rows(&self) -> Option<u64> {
        self.result.borrow().rows()
    }

    pub fn columns(&self) -> usize {
        self.result.borrow().cols()
    }

    pub fn column_name(&self, col: usize) -> Result<String> {
        self.result.borrow().column_to_name(col)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.result
            .borrow()
            .name_to_column(name)
            .ok_or_else(|| Error::invalid_column(format!("no column named '{name}'")))
    }
}

impl<T: RowsetItem> Rowset<T> {
    /// Begins iteration. May only be called once per rowset.
    pub fn iter(&self) -> Result<RowsetIter<'_, T>> {
        if self.started.replace(true) {
            return Err(Error::multiple_rowset_traverse(
                "a rowset can only be iterated once",
            ));
        }
        Ok(RowsetIter {
            row: Row::new(self.result.clone()),
            done: false,
            _rowset: self,
        })
    }

    /// Convenience: collects every row into a `Vec<T>`.
    pub fn collect_all(self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        for item in self.iter()? {
            out.push(item?);
        }
        Ok(out)
    }
}

pub struct RowsetIter<'r, T> {
    row: Row,
    done: bool,
    _rowset: &'r Rowset<T>,
}

impl<T: RowsetItem> Iterator for RowsetIter<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let advanced = {
            let mut result = self.row_result_mut();
            match result.has_next() {
                NextRow::LastRowReached => Ok(false),
                _ => result.next(),
            }
        };
        match advanced {
            Ok(true) => {
                self.row.rewind_column();
                Some(T::from_row(&mut self.row))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<T> RowsetIter<'_, T> {
    fn row_result_mut(&self) -> std::cell::RefMut<'_, Box<dyn ResultSet>> {
        self.row.result.borrow_mut()
    }
}
