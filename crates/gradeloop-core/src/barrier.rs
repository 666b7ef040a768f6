//! A reusable counting completion barrier.
//!
//! Tasks register with [`CompletionBarrier::try_enter`] and hold the returned
//! guard until they finish; dropping the guard releases the slot on every
//! exit path, including panics. Any number of callers can
//! [`wait`](CompletionBarrier::wait) for the count to reach zero, and the
//! barrier can be entered again after a wait has completed.
//!
//! Once [`close`](CompletionBarrier::close)d, the barrier admits no new
//! tasks. Guards already handed out keep it pending until they drop, so a
//! wait that starts after `close` covers every admitted task.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default)]
struct State {
    pending: usize,
    closed: bool,
}

#[derive(Debug)]
pub struct CompletionBarrier {
    state: watch::Sender<State>,
}

impl Default for CompletionBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionBarrier {
    pub fn new() -> Self {
        let (state, _) = watch::channel(State::default());
        Self { state }
    }

    /// Register one outstanding task. Returns `None` once the barrier is closed.
    pub fn try_enter(self: &Arc<Self>) -> Option<BarrierGuard> {
        let admitted = self.state.send_if_modified(|s| {
            if s.closed {
                return false;
            }
            s.pending += 1;
            true
        });
        admitted.then(|| BarrierGuard {
            barrier: Arc::clone(self),
        })
    }

    /// Refuse every later `try_enter`. Idempotent.
    pub fn close(&self) {
        self.state.send_if_modified(|s| !std::mem::replace(&mut s.closed, true));
    }

    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    /// Number of tasks still holding a guard.
    pub fn pending(&self) -> usize {
        self.state.borrow().pending
    }

    /// Resolve once no task holds a guard. Returns immediately if none do.
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = rx.wait_for(|s| s.pending == 0).await;
    }

    fn release(&self) {
        self.state
            .send_modify(|s| s.pending = s.pending.saturating_sub(1));
    }
}

/// Releases its barrier slot when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard releases the barrier immediately"]
pub struct BarrierGuard {
    barrier: Arc<CompletionBarrier>,
}

impl Drop for BarrierGuard {
    fn drop(&mut self) {
        self.barrier.release();
    }
}
