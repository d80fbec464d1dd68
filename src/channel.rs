//! The rendezvous channel.
//!
//! A `Channel<T>` has no buffer at all: a value only moves when a sender and a
//! receiver meet. Whichever side arrives first parks in the channel's waiter
//! queue and the other side completes the handoff for both of them.

use std::collections::VecDeque;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::context::Context;
use crate::error::{ClosedChannelError, DoubleCloseError, RecvError, TryRecvError, TrySendError};

/// Slot a parked operation exchanges its value through.
///
/// A parked sender's packet starts out holding the value and is emptied by the
/// receiver that takes it. A parked receiver's packet starts out empty and is
/// filled by the sender that hands off to it.
pub(crate) struct Packet<T> {
    msg: Mutex<Option<T>>,
}

impl<T> Packet<T> {
    pub(crate) fn new(msg: Option<T>) -> Arc<Self> {
        Arc::new(Self {
            msg: Mutex::new(msg),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.msg.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn put(&self, msg: T) {
        *self.lock() = Some(msg);
    }

    pub(crate) fn take(&self) -> Option<T> {
        self.lock().take()
    }
}

/// A parked send or receive.
struct Entry<T> {
    oper: usize,
    packet: Arc<Packet<T>>,
    cx: Context,
}

struct Waiters<T> {
    closed: bool,
    senders: VecDeque<Entry<T>>,
    receivers: VecDeque<Entry<T>>,
}

impl<T> Waiters<T> {
    /// Hands `value` to the first parked receiver that can still be selected.
    ///
    /// Entries whose context was already selected elsewhere are stale and get
    /// dropped on the way. A select unregisters all of its entries before it
    /// polls again, so the only entries seen here belong to other waits.
    fn hand_off(&mut self, value: T) -> Result<(), T> {
        let mut value = Some(value);
        while let Some(entry) = self.receivers.pop_front() {
            let delivered = entry.cx.try_select(entry.oper, || {
                if let Some(value) = value.take() {
                    entry.packet.put(value);
                }
            });
            if delivered {
                return Ok(());
            }
        }
        match value {
            Some(value) => Err(value),
            None => Ok(()),
        }
    }

    /// Takes the value of the first parked sender that can still be selected.
    fn take_from_sender(&mut self) -> Option<T> {
        while let Some(entry) = self.senders.pop_front() {
            let mut taken = None;
            if entry.cx.try_select(entry.oper, || taken = entry.packet.take()) {
                return taken;
            }
        }
        None
    }

    /// Drops stale entries from `queue` and reports whether one of them
    /// belongs to a wait other than `own`. Registration checks this, so a
    /// select whose send and receive cases sit on the same channel never
    /// meets itself.
    fn counterpart_ready(queue: &mut VecDeque<Entry<T>>, own: &Context) -> bool {
        queue.retain(|entry| entry.cx.same(own) || entry.cx.is_waiting());
        queue.iter().any(|entry| !entry.cx.same(own))
    }
}

struct Shared<T> {
    waiters: Mutex<Waiters<T>>,
}

/// An unbuffered channel shared by every task holding a clone of it.
///
/// Any holder may send, receive or close. Dropping handles never closes the
/// channel; the state is freed together with the last handle.
///
/// `close` is meant to be called by the sending side, at most once. Calling it
/// from a task that only receives is not checked and leaves any producer to
/// fail on its next `send`.
pub struct Channel<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Channel<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                waiters: Mutex::new(Waiters {
                    closed: false,
                    senders: VecDeque::new(),
                    receivers: VecDeque::new(),
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Waiters<T>> {
        self.shared
            .waiters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Blocks until a receiver takes `value`.
    ///
    /// Fails right away if the channel is closed, and a sender that is parked
    /// when the channel gets closed fails as soon as `close` runs. Either way
    /// the value comes back inside the error.
    pub fn send(&self, value: T) -> Result<(), ClosedChannelError<T>> {
        let cx = Context::new();
        let packet;
        {
            let mut waiters = self.lock();
            if waiters.closed {
                return Err(ClosedChannelError(value));
            }
            let value = match waiters.hand_off(value) {
                Ok(()) => return Ok(()),
                Err(value) => value,
            };
            packet = Packet::new(Some(value));
            waiters.senders.push_back(Entry {
                oper: 0,
                packet: Arc::clone(&packet),
                cx: cx.clone(),
            });
        }

        cx.wait();
        match packet.take() {
            None => Ok(()),
            Some(value) => Err(ClosedChannelError(value)),
        }
    }

    /// Blocks until a sender hands off a value, or the channel is closed.
    ///
    /// Once the channel is closed every call returns `RecvError` without
    /// blocking.
    pub fn recv(&self) -> Result<T, RecvError> {
        let cx = Context::new();
        let packet;
        {
            let mut waiters = self.lock();
            if let Some(value) = waiters.take_from_sender() {
                return Ok(value);
            }
            if waiters.closed {
                return Err(RecvError);
            }
            packet = Packet::new(None);
            waiters.receivers.push_back(Entry {
                oper: 0,
                packet: Arc::clone(&packet),
                cx: cx.clone(),
            });
        }

        cx.wait();
        packet.take().ok_or(RecvError)
    }

    /// Comma-ok receive: `(value, true)` on a handoff, `(T::default(), false)`
    /// once the channel is closed and drained.
    pub fn recv_ok(&self) -> (T, bool)
    where
        T: Default,
    {
        match self.recv() {
            Ok(value) => (value, true),
            Err(RecvError) => (T::default(), false),
        }
    }

    /// Hands off `value` only if a receiver is already parked.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        self.start_send(value)
    }

    /// Takes a value only if a sender is already parked.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.start_recv()
    }

    /// Closes the channel and wakes every parked sender and receiver.
    pub fn close(&self) -> Result<(), DoubleCloseError> {
        let mut guard = self.lock();
        let waiters = &mut *guard;
        if waiters.closed {
            return Err(DoubleCloseError);
        }
        waiters.closed = true;

        // Parked receivers wake up with an empty packet and report closure;
        // parked senders wake up still holding their value and fail.
        let parked: Vec<Entry<T>> = waiters
            .receivers
            .drain(..)
            .chain(waiters.senders.drain(..))
            .collect();
        for entry in parked {
            entry.cx.try_select(entry.oper, || {});
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn same_channel(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Blocking iterator that ends once the channel is closed and drained.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { channel: self }
    }

    /// Iterator over the values senders are already parked with.
    pub fn try_iter(&self) -> TryIter<'_, T> {
        TryIter { channel: self }
    }

    pub(crate) fn start_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut waiters = self.lock();
        if waiters.closed {
            return Err(TrySendError::Closed(value));
        }
        waiters.hand_off(value).map_err(TrySendError::Full)
    }

    pub(crate) fn start_recv(&self) -> Result<T, TryRecvError> {
        let mut waiters = self.lock();
        if let Some(value) = waiters.take_from_sender() {
            return Ok(value);
        }
        if waiters.closed {
            Err(TryRecvError::Closed)
        } else {
            Err(TryRecvError::Empty)
        }
    }

    /// Parks a select's send case. Returns `false` without parking if the
    /// case can already complete, i.e. a receiver is waiting or the channel is
    /// closed.
    pub(crate) fn register_send(&self, oper: usize, packet: &Arc<Packet<T>>, cx: &Context) -> bool {
        let mut waiters = self.lock();
        if waiters.closed || Waiters::counterpart_ready(&mut waiters.receivers, cx) {
            return false;
        }
        waiters.senders.push_back(Entry {
            oper,
            packet: Arc::clone(packet),
            cx: cx.clone(),
        });
        true
    }

    /// Parks a select's receive case, see `register_send`.
    pub(crate) fn register_recv(&self, oper: usize, packet: &Arc<Packet<T>>, cx: &Context) -> bool {
        let mut waiters = self.lock();
        if waiters.closed || Waiters::counterpart_ready(&mut waiters.senders, cx) {
            return false;
        }
        waiters.receivers.push_back(Entry {
            oper,
            packet: Arc::clone(packet),
            cx: cx.clone(),
        });
        true
    }

    #[cfg(test)]
    pub(crate) fn parked_senders(&self) -> usize {
        self.lock().senders.len()
    }

    #[cfg(test)]
    pub(crate) fn parked_receivers(&self) -> usize {
        self.lock().receivers.len()
    }

    /// Removes every entry parked by `cx`.
    pub(crate) fn unregister(&self, cx: &Context) {
        let mut waiters = self.lock();
        waiters.senders.retain(|entry| !entry.cx.same(cx));
        waiters.receivers.retain(|entry| !entry.cx.same(cx));
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Channel { .. }")
    }
}

impl<'a, T> IntoIterator for &'a Channel<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> IntoIterator for Channel<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { channel: self }
    }
}

pub struct Iter<'a, T> {
    channel: &'a Channel<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.channel.recv().ok()
    }
}

// Closure is permanent, so once `recv` fails it keeps failing.
impl<T> FusedIterator for Iter<'_, T> {}

impl<T> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Iter { .. }")
    }
}

pub struct TryIter<'a, T> {
    channel: &'a Channel<T>,
}

impl<T> Iterator for TryIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.channel.try_recv().ok()
    }
}

impl<T> fmt::Debug for TryIter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("TryIter { .. }")
    }
}

pub struct IntoIter<T> {
    channel: Channel<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.channel.recv().ok()
    }
}

impl<T> FusedIterator for IntoIter<T> {}

impl<T> fmt::Debug for IntoIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("IntoIter { .. }")
    }
}
