//! `~engine~` annotations are resolved against the connecting backend's
//! reported engine name and version before the SQL ever reaches the backend.

mod common;

#[test]
fn named_placeholder_is_rewritten_before_the_backend_ever_sees_it() {
    let session = common::open_private();
    let stmt = session.create_statement("select a from t where a = :a").unwrap();
    assert_eq!(stmt.patched_query(), "select a from t where a = ?");
}

#[test]
fn engine_branch_matching_this_backend_is_selected() {
    let session = common::open_private();
    assert_eq!(session.engine(), "memory");

    let sql = "~memory~select * from a~~select * from b~";
    let stmt = session.create_statement(sql).unwrap();
    assert_eq!(stmt.patched_query(), "select * from a");
}

#[test]
fn engine_branch_not_matching_this_backend_falls_through_to_wildcard() {
    let session = common::open_private();
    let sql = "~postgres~select * from a~~select * from b~";
    let stmt = session.create_statement(sql).unwrap();
    assert_eq!(stmt.patched_query(), "select * from b");
}

#[test]
fn no_matching_branch_and_no_wildcard_is_sql_variant_not_found() {
    let session = common::open_private();
    let sql = "~postgres~select * from a~";
    let err = session.create_statement(sql).unwrap_err();
    assert_eq!(err.kind(), edba::Kind::SqlVariantNotFound);
}

/// Dialect selection must run before the `:name` -> positional rewrite: each
/// branch may carry its own placeholder set, so only the branch that
/// survives selection should ever contribute a placeholder to the patched
/// query. Rewriting first would see both branches' names at once and bind
/// against the wrong positions.
#[test]
fn only_the_selected_branch_contributes_named_placeholders() {
    let session = common::open_private();
    assert_eq!(session.engine(), "memory");

    let sql = "~memory~select * from a where x = :x~~select * from b where y = :y and z = :z~";
    let stmt = session.create_statement(sql).unwrap();
    assert_eq!(stmt.patched_query(), "select * from a where x = ?");

    let sql = "~postgres~select * from a where x = :x~~select * from b where y = :y and z = :z~";
    let stmt = session.create_statement(sql).unwrap();
    assert_eq!(stmt.patched_query(), "select * from b where y = ? and z = ?");
}

/// A batch fragment (one `;`-separated statement passed to `exec_batch`) may
/// carry free SQL text ahead of its first `~`; only the annotated remainder
/// is dialect-selected, the prefix is passed through untouched.
#[test]
fn batch_fragment_with_leading_free_text_still_gets_dialect_selected() {
    let session = common::open_private();
    assert_eq!(session.engine(), "memory");

    session.exec_batch("create table t(x integer, y integer)").unwrap();
    session
        .prepare("insert into t(x, y) values(?, ?)")
        .unwrap()
        .bind(1, 1i64)
        .unwrap()
        .bind(2, 1i64)
        .unwrap()
        .exec()
        .unwrap();

    session
        .exec_batch("update t set x=2 ~memory~, y=2 where x = 1~postgres~, y=3 where x = 1~~, y=4 where x = 1~")
        .unwrap();

    let y: i64 = session
        .prepare("select y from t where x = 2")
        .unwrap()
        .first_row()
        .unwrap()
        .get(0)
        .unwrap();
    assert_eq!(y, 2);
}
