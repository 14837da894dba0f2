//! [`edba::Pool`] bounds the number of live backend connections to its
//! `max_size`, blocking further checkouts until one is returned.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn checkouts_never_exceed_max_size_and_all_complete() {
    edba_memory::ensure_registered();
    let uri = "memory:db=it_pool_concurrency";
    let pool = edba::pool(uri, 2).unwrap();

    {
        // Seed the shared store once, before any pooled connection races to
        // create it.
        let setup = edba::open(uri).unwrap();
        setup.exec_batch("create table t(id integer)").unwrap();
    }

    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_observed = Arc::new(AtomicUsize::new(0));

    thread::scope(|scope| {
        for i in 0..6 {
            let pool = pool.clone();
            let in_flight = in_flight.clone();
            let max_observed = max_observed.clone();
            scope.spawn(move || {
                let conn = pool.open().unwrap();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_observed.fetch_max(now, Ordering::SeqCst);

                conn.prepare("insert into t(id) values(?)")
                    .unwrap()
                    .bind(1, i as i64)
                    .unwrap()
                    .exec()
                    .unwrap();

                thread::sleep(Duration::from_millis(15));
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
    });

    assert!(max_observed.load(Ordering::SeqCst) <= 2);

    let check = edba::open(uri).unwrap();
    let rows = check
        .prepare("select id from t")
        .unwrap()
        .query::<i64>()
        .unwrap()
        .collect_all()
        .unwrap();
    assert_eq!(rows.len(), 6);
}
