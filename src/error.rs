use std::fmt;
use thiserror::Error;

/// Returned by `send` when the channel is closed.
///
/// The unsent value is handed back so the caller can decide what to do with it.
#[derive(Error, PartialEq, Eq, Clone, Copy)]
#[error("sending on a closed channel")]
pub struct ClosedChannelError<T>(pub T);

impl<T> ClosedChannelError<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for ClosedChannelError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("ClosedChannelError { .. }")
    }
}

/// Returned by `close` when the channel has already been closed.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("closing an already closed channel")]
pub struct DoubleCloseError;

/// Returned by `recv` once the channel is closed and no sender is left to hand off a value.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("receiving on a closed and drained channel")]
pub struct RecvError;

#[derive(Error, PartialEq, Eq, Clone, Copy)]
pub enum TrySendError<T> {
    /// No receiver was waiting to take the value.
    #[error("no receiver is waiting on the channel")]
    Full(T),
    #[error("sending on a closed channel")]
    Closed(T),
}

impl<T> TrySendError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(value) | TrySendError::Closed(value) => value,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, TrySendError::Full(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TrySendError::Closed(_))
    }
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(_) => f.pad("Full(..)"),
            TrySendError::Closed(_) => f.pad("Closed(..)"),
        }
    }
}

impl<T> From<ClosedChannelError<T>> for TrySendError<T> {
    fn from(err: ClosedChannelError<T>) -> Self {
        TrySendError::Closed(err.0)
    }
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
    /// No sender was waiting to hand off a value.
    #[error("no sender is waiting on the channel")]
    Empty,
    #[error("receiving on a closed and drained channel")]
    Closed,
}

impl TryRecvError {
    pub fn is_empty(&self) -> bool {
        matches!(self, TryRecvError::Empty)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, TryRecvError::Closed)
    }
}

impl From<RecvError> for TryRecvError {
    fn from(_: RecvError) -> Self {
        TryRecvError::Closed
    }
}
