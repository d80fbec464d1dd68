//! Unbuffered (rendezvous) channels with close and select.
//!
//! A [`Channel`] has no capacity: `send` returns only once a receiver has
//! taken the value. [`Select`] waits on several sends and receives at once and
//! completes exactly one of them.
//!
//! The `scenarios` module holds the four demo programs built on top of them.

pub mod channel;
pub mod config;
mod context;
pub mod error;
pub mod narrate;
pub mod scenarios;
pub mod select;

pub use channel::{Channel, IntoIter, Iter, TryIter};
pub use error::{ClosedChannelError, DoubleCloseError, RecvError, TryRecvError, TrySendError};
pub use select::{Fired, Select};
