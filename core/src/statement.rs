//! A compiled (prepared or ordinary) statement, created via
//! [`crate::session::Session::prepare`]/[`crate::session::Session::create_statement`].

use std::cell::Cell;

use crate::backend;
use crate::bind_by_name::BoundNames;
use crate::error::{Error, Result};
use crate::row::{Row, Rowset, RowsetItem};
use crate::session::Session;
use crate::types::{BindValue, ToBindValue};

/// A statement returned by [`Session::prepare`] or
/// [`Session::create_statement`].
///
/// Holds the connection alive for as long as the statement (and anything
/// derived from it, like a [`Rowset`]) is in scope.
pub struct Statement {
    session: Session,
    inner: Box<dyn backend::Statement>,
    names: BoundNames,
    auto_index: Cell<usize>,
}

impl Statement {
    pub(crate) fn new(session: Session, inner: Box<dyn backend::Statement>, names: BoundNames) -> Self {
        Statement {
            session,
            inner,
            names,
            auto_index: Cell::new(1),
        }
    }

    /// The SQL actually sent to the backend, after dialect selection and
    /// placeholder rewriting.
    pub fn patched_query(&self) -> &str {
        self.inner.patched_query()
    }

    /// Binds `val` to the 1-based position `pos`.
    pub fn bind(&mut self, pos: usize, val: impl ToBindValue) -> Result<&mut Self> {
        if pos == 0 {
            return Err(Error::invalid_placeholder("positions are 1-based"));
        }
        self.inner.bind(pos, &val.to_bind_value())?;
        Ok(self)
    }

    /// Binds `val` to every position `:name` occurred at.
    pub fn bind_named(&mut self, name: &str, val: impl ToBindValue) -> Result<&mut Self> {
        let positions = self
            .names
            .indices_for(name)
            .ok_or_else(|| Error::invalid_placeholder(format!("no placeholder named '{name}'")))?
            .to_vec();
        let bv = val.to_bind_value();
        for pos in positions {
            self.inner.bind(pos, &bv)?;
        }
        Ok(self)
    }

    /// Binds `val` to the next auto-incrementing position, starting at 1.
    pub fn bind_next(&mut self, val: impl ToBindValue) -> Result<&mut Self> {
        self.bind_next_value(val.to_bind_value())?;
        Ok(self)
    }

    /// Used by [`crate::types::BindConversion`] implementations, which only
    /// have a [`BindValue`] in hand (already converted from the user type).
    pub(crate) fn bind_next_value(&mut self, val: BindValue<'_>) -> Result<()> {
        let pos = self.auto_index.get();
        self.inner.bind(pos, &val)?;
        self.auto_index.set(pos + 1);
        Ok(())
    }

    /// Clears all bindings and resets the auto-increment cursor to 1.
    /// Idempotent: calling it twice in a row is the same as calling it once.
    pub fn reset(&mut self) -> &mut Self {
        self.inner.bindings_reset();
        self.auto_index.set(1);
        self
    }

    /// Runs the statement for effect (INSERT/UPDATE/DELETE/DDL).
    pub fn exec(&mut self) -> Result<()> {
        self.inner.run_exec()
    }

    /// Runs the statement as a query, returning a one-shot [`Rowset`] over
    /// its result rows.
    pub fn query<T: RowsetItem>(&mut self) -> Result<Rowset<T>> {
        let result = self.inner.run_query()?;
        Ok(Rowset::new(result))
    }

    /// Runs the statement as a query and returns its single row.
    ///
    /// `empty_row_access` if the result has no rows; `multiple_rows_query`
    /// if it has more than one.
    pub fn first_row(&mut self) -> Result<Row> {
        let rowset: Rowset<Row> = self.query()?;
        let mut iter = rowset.iter()?;
        let Some(first) = iter.next() else {
            return Err(Error::empty_row_access("query returned no rows"));
        };
        let first = first?;
        if iter.next().is_some() {
            return Err(Error::multiple_rows_query(
                "first_row() on a query that returned more than one row",
            ));
        }
        Ok(first)
    }

    /// The auto-increment/sequence value from the last insert, if the
    /// backend can report one. `seq` names the sequence for backends (e.g.
    /// PostgreSQL, Oracle) that require it; ignored by auto-increment-style
    /// backends (MySQL, SQLite).
    pub fn sequence_last(&mut self, seq: Option<&str>) -> Result<i64> {
        self.inner.sequence_last(seq)
    }

    /// Same as `sequence_last(None)`.
    pub fn last_insert_id(&mut self) -> Result<i64> {
        self.sequence_last(None)
    }

    /// Rows affected by the last `exec()`.
    pub fn affected(&self) -> Result<u64> {
        self.inner.affected()
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }
}
