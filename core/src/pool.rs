//! A bounded, thread-safe pool of sessions with lazy connection creation and
//! a one-shot per-connection initializer callback.

use std::sync::{Arc, Condvar, Mutex};

use crate::backend;
use crate::error::Result;
use crate::session::Session;

type Factory = Box<dyn Fn() -> Result<Arc<dyn backend::Connection>> + Send + Sync>;
type InitCallback = Box<dyn Fn(&Session) -> Result<()> + Send + Sync>;

struct Shared {
    factory: Factory,
    init_callback: Option<InitCallback>,
    max_size: usize,
    state: Mutex<State>,
    available: Condvar,
}

struct State {
    idle: Vec<Arc<dyn backend::Connection>>,
    remaining_unopened: usize,
}

/// A bounded pool of connections, built once via [`Pool::builder`].
///
/// Cloning a `Pool` shares the same underlying slots: every clone draws from
/// and returns to the same `idle` list and `remaining_unopened` counter.
#[derive(Clone)]
pub struct Pool {
    shared: Arc<Shared>,
}

/// Builds a [`Pool`].
pub struct PoolBuilder {
    factory: Factory,
    max_size: usize,
    init_callback: Option<InitCallback>,
}

impl Pool {
    /// Starts building a pool of at most `max_size` connections, each
    /// produced (on demand) by `factory`.
    pub fn builder(
        max_size: usize,
        factory: impl Fn() -> Result<Arc<dyn backend::Connection>> + Send + Sync + 'static,
    ) -> PoolBuilder {
        PoolBuilder {
            factory: Box::new(factory),
            max_size,
            init_callback: None,
        }
    }

    /// Checks out a connection, blocking until one is available.
    pub fn open(&self) -> Result<PooledSession> {
        loop {
            let mut state = self.shared.state.lock().unwrap();
            if let Some(conn) = state.idle.pop() {
                drop(state);
                return Ok(self.wrap(conn));
            }
            if state.remaining_unopened > 0 {
                state.remaining_unopened -= 1;
                drop(state);
                return self.create_and_wrap();
            }
            // Neither idle nor room to grow: wait for a return-path notify.
            let _guard = self.shared.available.wait(state).unwrap();
        }
    }

    /// Checks out a connection without blocking. Returns `Ok(None)` if none
    /// is immediately available.
    pub fn try_open(&self) -> Result<Option<PooledSession>> {
        let mut state = self.shared.state.lock().unwrap();
        if let Some(conn) = state.idle.pop() {
            drop(state);
            return Ok(Some(self.wrap(conn)));
        }
        if state.remaining_unopened > 0 {
            state.remaining_unopened -= 1;
            drop(state);
            return self.create_and_wrap().map(Some);
        }
        Ok(None)
    }

    fn create_and_wrap(&self) -> Result<PooledSession> {
        let result = (self.shared.factory)();
        let conn = match result {
            Ok(conn) => conn,
            Err(e) => {
                // Creation failed: give the unopened slot back so a future
                // caller can retry instead of permanently shrinking the pool.
                log::error!("pool failed to create a new backend connection: {e}");
                self.shared.state.lock().unwrap().remaining_unopened += 1;
                self.shared.available.notify_one();
                return Err(e);
            }
        };
        log::info!("pool created a new backend connection");
        if let Some(cb) = &self.shared.init_callback {
            // Run on a plain, non-pooled session: if the callback fails, no
            // proxy exists yet to try (and fail) to return the connection.
            let temp = Session::from_connection(conn.clone());
            cb(&temp)?;
        }
        Ok(self.wrap(conn))
    }

    fn wrap(&self, conn: Arc<dyn backend::Connection>) -> PooledSession {
        PooledSession {
            session: Session::from_connection(conn.clone()),
            conn: Some(conn),
            shared: self.shared.clone(),
        }
    }
}

impl PoolBuilder {
    /// Registers a callback run exactly once on every freshly created
    /// connection, before it is first handed out.
    pub fn init_callback(
        mut self,
        cb: impl Fn(&Session) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.init_callback = Some(Box::new(cb));
        self
    }

    pub fn build(self) -> Pool {
        Pool {
            shared: Arc::new(Shared {
                factory: self.factory,
                init_callback: self.init_callback,
                max_size: self.max_size,
                state: Mutex::new(State {
                    idle: Vec::new(),
                    remaining_unopened: self.max_size,
                }),
                available: Condvar::new(),
            }),
        }
    }
}

/// A connection checked out from a [`Pool`].
///
/// Derefs to [`Session`]. Dropping it returns the connection to the pool and
/// wakes one waiter, rather than tearing the connection down.
pub struct PooledSession {
    session: Session,
    conn: Option<Arc<dyn backend::Connection>>,
    shared: Arc<Shared>,
}

impl std::ops::Deref for PooledSession {
    type Target = Session;
    fn deref(&self) -> &Session {
        &self.session
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.shared.state.lock().unwrap().idle.push(conn);
            self.shared.available.notify_one();
        }
    }
}

impl Pool {
    pub fn max_size(&self) -> usize {
        self.shared.max_size
    }
}
