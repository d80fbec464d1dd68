//! Per-wait selection record a blocked thread parks on.
//!
//! Every blocking `send`, `recv` or `Select::wait` creates one `Context` and
//! registers it on each channel it waits for. A counterpart completes the wait
//! by selecting the context, which happens at most once.

use crossbeam::utils::Backoff;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// Outcome of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Selected {
    /// Still waiting for a counterpart.
    Waiting,
    /// The owner itself gave up on this wait because one of its cases turned
    /// out to be ready during registration.
    Aborted,
    /// The operation registered under this index was completed, either by a
    /// counterpart handing off (or taking) a value or by the channel closing.
    Operation(usize),
}

#[derive(Debug)]
struct Inner {
    selected: Mutex<Selected>,
    ready: Condvar,
}

#[derive(Debug, Clone)]
pub(crate) struct Context {
    inner: Arc<Inner>,
}

impl Context {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                selected: Mutex::new(Selected::Waiting),
                ready: Condvar::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Selected> {
        // The selection state is a plain enum, valid even after a panic.
        self.inner
            .selected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Selects operation `oper` if nothing has been selected yet.
    ///
    /// `commit` runs while the selection lock is held, before the owner is
    /// woken, so the owner never observes the selection without its effect.
    pub(crate) fn try_select<F>(&self, oper: usize, commit: F) -> bool
    where
        F: FnOnce(),
    {
        let mut selected = self.lock();
        if *selected != Selected::Waiting {
            return false;
        }
        commit();
        *selected = Selected::Operation(oper);
        drop(selected);
        self.inner.ready.notify_one();
        true
    }

    /// Gives up on the wait. Fails, returning what was selected instead, if a
    /// counterpart got there first.
    pub(crate) fn try_abort(&self) -> Result<(), Selected> {
        let mut selected = self.lock();
        match *selected {
            Selected::Waiting => {
                *selected = Selected::Aborted;
                Ok(())
            }
            other => Err(other),
        }
    }

    pub(crate) fn is_waiting(&self) -> bool {
        *self.lock() == Selected::Waiting
    }

    /// Blocks until the context is selected or aborted.
    pub(crate) fn wait(&self) -> Selected {
        // Spin for a short time first: a rendezvous partner is often just
        // about to arrive.
        let backoff = Backoff::new();
        while !backoff.is_completed() {
            let selected = *self.lock();
            if selected != Selected::Waiting {
                return selected;
            }
            backoff.snooze();
        }

        let mut selected = self.lock();
        while *selected == Selected::Waiting {
            selected = self
                .inner
                .ready
                .wait(selected)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        *selected
    }

    pub(crate) fn same(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
