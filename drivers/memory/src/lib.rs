//! An in-tree, in-memory reference backend for `edba`'s own test suite and
//! for experimentation: a small hand-rolled SQL engine (`create table`,
//! `insert`, `select`, `update`, `delete`, each with an optional
//! single-column `where`) backing the full `edba` frontend pipeline without
//! requiring a real database.
//!
//! Connection strings take the form `memory:db=<name>`. Two connections
//! opened with the same `db` name share the same tables; an omitted or empty
//! `db` gets a private, unshared store. There is no persistence: all data is
//! dropped once the last connection to a private store (or the process, for
//! a named store) goes away.

mod connection;
mod result;
mod sql;
mod statement;
mod table;
mod value;

use std::sync::Once;

/// Registers the `memory` driver with `edba`'s global registry, once per
/// process. [`edba::open`]/[`edba::pool`] call [`edba::registry::connect`]
/// internally, which only finds this driver if something has registered it
/// first — call this once at process startup (or rely on it having already
/// run, since it is idempotent).
pub fn ensure_registered() {
    static INIT: Once = Once::new();
    INIT.call_once(connection::register);
}
