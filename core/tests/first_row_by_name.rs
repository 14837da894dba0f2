//! A [`edba::Row`] can be destructured by column name, not just by position,
//! which matters once a query's column order isn't something calling code
//! wants to hard-code.

mod common;

#[test]
fn get_named_reads_the_right_column_regardless_of_select_list_order() {
    let session = common::open_private();
    session
        .exec_batch("create table t(id integer, name text, score integer)")
        .unwrap();
    session
        .prepare("insert into t(id, name, score) values(?, ?, ?)")
        .unwrap()
        .bind(1, 1i64)
        .unwrap()
        .bind(2, "alice")
        .unwrap()
        .bind(3, 42i64)
        .unwrap()
        .exec()
        .unwrap();

    let mut row = session
        .prepare("select score, id, name from t where id = ?")
        .unwrap()
        .bind(1, 1i64)
        .unwrap()
        .first_row()
        .unwrap();

    let name: String = row.get_named("name").unwrap();
    let id: i64 = row.get_named("id").unwrap();
    let score: i64 = row.get_named("score").unwrap();
    assert_eq!(name, "alice");
    assert_eq!(id, 1);
    assert_eq!(score, 42);
}

#[test]
fn column_index_and_column_name_are_inverses() {
    let session = common::open_private();
    session.exec_batch("create table t(id integer, name text)").unwrap();
    session
        .prepare("insert into t(id, name) values(?, ?)")
        .unwrap()
        .bind(1, 1i64)
        .unwrap()
        .bind(2, "bob")
        .unwrap()
        .exec()
        .unwrap();

    let row = session
        .prepare("select id, name from t where id = ?")
        .unwrap()
        .bind(1, 1i64)
        .unwrap()
        .first_row()
        .unwrap();

    assert_eq!(row.column_index("name").unwrap(), 1);
    assert_eq!(row.column_name(1).unwrap(), "name");
}

#[test]
fn get_named_on_an_unknown_column_raises_invalid_column() {
    let session = common::open_private();
    session.exec_batch("create table t(id integer)").unwrap();
    session
        .prepare("insert into t(id) values(?)")
        .unwrap()
        .bind(1, 1i64)
        .unwrap()
        .exec()
        .unwrap();

    let mut row = session
        .prepare("select id from t where id = ?")
        .unwrap()
        .bind(1, 1i64)
        .unwrap()
        .first_row()
        .unwrap();

    let err = row.get_named::<i64>("nonexistent").unwrap_err();
    assert_eq!(err.kind(), edba::Kind::InvalidColumn);
}
