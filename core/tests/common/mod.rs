//! Shared setup for integration tests: every test gets its own named store
//! under a process-unique `db=` value, so tests never see each other's
//! tables even when run concurrently by the test harness.

use std::sync::atomic::{AtomicU64, Ordering};

pub fn open_private() -> edba::Session {
    edba_memory::ensure_registered();
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    edba::open(&format!("memory:db=it_private_{id}")).expect("open in-memory session")
}

pub fn open_shared(name: &str) -> edba::Session {
    edba_memory::ensure_registered();
    edba::open(&format!("memory:db={name}")).expect("open in-memory session")
}
