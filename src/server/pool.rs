use std::sync::{Mutex, PoisonError};

use crate::http::context::ConnectionContext;

/// Thread-safe LIFO pool of reusable connection contexts.
///
/// The pool is the only mutable state shared across worker threads.
/// Contexts are acquired at connection start and returned on every exit
/// path through the [`PooledContext`] guard; the pool grows on demand
/// when exhausted and never shrinks. LIFO reuse keeps recently used
/// contexts (and their warm buffers) in circulation.
pub struct ContextPool {
    message_limit: usize,
    contexts: Mutex<Vec<ConnectionContext>>,
}

impl ContextPool {
    /// Creates a pool pre-warmed with `warm` contexts carrying the
    /// configured message size limit.
    pub fn new(message_limit: usize, warm: usize) -> Self {
        let contexts = (0..warm)
            .map(|_| ConnectionContext::new(message_limit))
            .collect();
        Self {
            message_limit,
            contexts: Mutex::new(contexts),
        }
    }

    /// Pops an available context or constructs a new one. The returned
    /// guard releases the context back to the pool when dropped, which
    /// makes the release unconditional on every exit path, panics
    /// included.
    pub fn acquire(&self) -> PooledContext<'_> {
        let ctx = self
            .lock()
            .pop()
            .unwrap_or_else(|| ConnectionContext::new(self.message_limit));
        PooledContext {
            pool: self,
            ctx: Some(ctx),
        }
    }

    /// Number of idle contexts currently in the pool.
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    fn release(&self, mut ctx: ConnectionContext) {
        ctx.reset();
        self.lock().push(ctx);
    }

    // A worker that panicked while holding the lock must not stop every
    // other worker from releasing contexts.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ConnectionContext>> {
        self.contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped-acquisition guard over a pooled [`ConnectionContext`].
pub struct PooledContext<'a> {
    pool: &'a ContextPool,
    ctx: Option<ConnectionContext>,
}

impl std::ops::Deref for PooledContext<'_> {
    type Target = ConnectionContext;

    fn deref(&self) -> &ConnectionContext {
        self.ctx.as_ref().expect("context present until drop")
    }
}

impl std::ops::DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut ConnectionContext {
        self.ctx.as_mut().expect("context present until drop")
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}
