//! Waiting on several channel operations at once.
//!
//! ```no_run
//! use unbuffered_channels::{Channel, Select};
//!
//! let numbers = Channel::new();
//! let quit: Channel<()> = Channel::new();
//!
//! let fired = Select::new()
//!     .send(&numbers, 1, |res| res.is_ok())
//!     .recv(&quit, |_| false)
//!     .wait();
//! println!("case {} fired", fired.index);
//! ```

use rand::seq::SliceRandom;
use std::fmt;
use std::sync::Arc;
use std::thread;

use crate::channel::{Channel, Packet};
use crate::context::{Context, Selected};
use crate::error::{ClosedChannelError, RecvError, TryRecvError, TrySendError};

/// The case that fired and what its handler returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<R> {
    /// Position of the case in the order it was added to the `Select`.
    pub index: usize,
    pub output: R,
}

trait Case<R> {
    /// Tries to complete the operation without parking.
    fn poll(&mut self) -> bool;

    /// Parks the operation on its channel under `oper`. Returns `false` if the
    /// operation turned out to be ready instead.
    fn register(&self, oper: usize, cx: &Context) -> bool;

    fn unregister(&self, cx: &Context);

    /// Runs the handler with the outcome of the completed operation.
    fn fire(self: Box<Self>) -> R;
}

struct SendCase<'a, T, F> {
    channel: &'a Channel<T>,
    packet: Arc<Packet<T>>,
    outcome: Option<Result<(), ClosedChannelError<T>>>,
    handler: F,
}

impl<'a, T, F, R> Case<R> for SendCase<'a, T, F>
where
    F: FnOnce(Result<(), ClosedChannelError<T>>) -> R,
{
    fn poll(&mut self) -> bool {
        let Some(value) = self.packet.take() else {
            return false;
        };
        match self.channel.start_send(value) {
            Ok(()) => {
                self.outcome = Some(Ok(()));
                true
            }
            Err(TrySendError::Closed(value)) => {
                self.outcome = Some(Err(ClosedChannelError(value)));
                true
            }
            Err(TrySendError::Full(value)) => {
                self.packet.put(value);
                false
            }
        }
    }

    fn register(&self, oper: usize, cx: &Context) -> bool {
        self.channel.register_send(oper, &self.packet, cx)
    }

    fn unregister(&self, cx: &Context) {
        self.channel.unregister(cx);
    }

    fn fire(self: Box<Self>) -> R {
        let this = *self;
        // Without a recorded outcome the case was completed while parked: an
        // emptied packet means a receiver took the value, a full one means the
        // channel was closed under it.
        let outcome = match this.outcome {
            Some(outcome) => outcome,
            None => match this.packet.take() {
                None => Ok(()),
                Some(value) => Err(ClosedChannelError(value)),
            },
        };
        (this.handler)(outcome)
    }
}

struct RecvCase<'a, T, F> {
    channel: &'a Channel<T>,
    packet: Arc<Packet<T>>,
    outcome: Option<Result<T, RecvError>>,
    handler: F,
}

impl<'a, T, F, R> Case<R> for RecvCase<'a, T, F>
where
    F: FnOnce(Result<T, RecvError>) -> R,
{
    fn poll(&mut self) -> bool {
        match self.channel.start_recv() {
            Ok(value) => {
                self.outcome = Some(Ok(value));
                true
            }
            Err(TryRecvError::Closed) => {
                self.outcome = Some(Err(RecvError));
                true
            }
            Err(TryRecvError::Empty) => false,
        }
    }

    fn register(&self, oper: usize, cx: &Context) -> bool {
        self.channel.register_recv(oper, &self.packet, cx)
    }

    fn unregister(&self, cx: &Context) {
        self.channel.unregister(cx);
    }

    fn fire(self: Box<Self>) -> R {
        let this = *self;
        let outcome = match this.outcome {
            Some(outcome) => outcome,
            None => this.packet.take().ok_or(RecvError),
        };
        (this.handler)(outcome)
    }
}

/// A set of send and receive cases waited on together.
///
/// `wait` completes exactly one ready case and leaves every other case
/// untouched: values of send cases that did not fire are dropped with the
/// `Select`, never delivered. Simultaneously ready cases are picked at random.
pub struct Select<'a, R> {
    cases: Vec<(usize, Box<dyn Case<R> + 'a>)>,
    default: Option<(usize, Box<dyn FnOnce() -> R + 'a>)>,
    next_index: usize,
}

impl<'a, R> Select<'a, R> {
    pub fn new() -> Self {
        Self {
            cases: Vec::new(),
            default: None,
            next_index: 0,
        }
    }

    fn claim_index(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// Adds a case sending `value` on `channel`.
    pub fn send<T, F>(mut self, channel: &'a Channel<T>, value: T, handler: F) -> Self
    where
        T: 'a,
        F: FnOnce(Result<(), ClosedChannelError<T>>) -> R + 'a,
    {
        let index = self.claim_index();
        self.cases.push((
            index,
            Box::new(SendCase {
                channel,
                packet: Packet::new(Some(value)),
                outcome: None,
                handler,
            }),
        ));
        self
    }

    /// Adds a case receiving from `channel`.
    pub fn recv<T, F>(mut self, channel: &'a Channel<T>, handler: F) -> Self
    where
        T: 'a,
        F: FnOnce(Result<T, RecvError>) -> R + 'a,
    {
        let index = self.claim_index();
        self.cases.push((
            index,
            Box::new(RecvCase {
                channel,
                packet: Packet::new(None),
                outcome: None,
                handler,
            }),
        ));
        self
    }

    /// Sets the case that fires when nothing else is ready.
    ///
    /// Setting it again replaces the previous default.
    pub fn default<F>(mut self, handler: F) -> Self
    where
        F: FnOnce() -> R + 'a,
    {
        let index = self.claim_index();
        self.default = Some((index, Box::new(handler)));
        self
    }

    pub fn len(&self) -> usize {
        self.cases.len() + usize::from(self.default.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocks until one case completes and returns what its handler produced.
    ///
    /// With a default case this never blocks. With no cases at all and no
    /// default it blocks forever.
    pub fn wait(mut self) -> Fired<R> {
        let mut order: Vec<usize> = (0..self.cases.len()).collect();
        let mut rng = rand::thread_rng();

        loop {
            order.shuffle(&mut rng);

            for &i in &order {
                if self.cases[i].1.poll() {
                    return self.fire(i);
                }
            }

            if let Some((index, handler)) = self.default.take() {
                return Fired {
                    index,
                    output: handler(),
                };
            }

            if self.cases.is_empty() {
                loop {
                    thread::park();
                }
            }

            let cx = Context::new();
            let mut registered = 0;
            let mut ready = false;
            for &i in &order {
                if !self.cases[i].1.register(i, &cx) {
                    ready = true;
                    break;
                }
                registered += 1;
            }

            let selected = if ready {
                cx.try_abort().err().unwrap_or(Selected::Aborted)
            } else {
                cx.wait()
            };

            for &i in &order[..registered] {
                self.cases[i].1.unregister(&cx);
            }

            match selected {
                Selected::Operation(i) => return self.fire(i),
                Selected::Aborted | Selected::Waiting => thread::yield_now(),
            }
        }
    }

    fn fire(mut self, i: usize) -> Fired<R> {
        let (index, case) = self.cases.swap_remove(i);
        Fired {
            index,
            output: case.fire(),
        }
    }
}

impl<R> fmt::Debug for Select<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select")
            .field("cases", &self.cases.len())
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum Event {
        Sent,
        Got(i32),
        Closed,
        Idle,
    }

    fn park_sender(channel: &Channel<i32>, value: i32) -> thread::JoinHandle<Result<(), ClosedChannelError<i32>>> {
        let tx = channel.clone();
        let parked = channel.parked_senders();
        let handle = thread::spawn(move || tx.send(value));
        while channel.parked_senders() == parked {
            thread::yield_now();
        }
        handle
    }

    fn park_receiver(channel: &Channel<i32>) -> thread::JoinHandle<Result<i32, RecvError>> {
        let rx = channel.clone();
        let parked = channel.parked_receivers();
        let handle = thread::spawn(move || rx.recv());
        while channel.parked_receivers() == parked {
            thread::yield_now();
        }
        handle
    }

    #[test]
    fn test_recv_case_fires_when_sender_ready() {
        let channel = Channel::new();
        let other: Channel<i32> = Channel::new();
        let handle = park_sender(&channel, 11);

        let fired = Select::new()
            .recv(&other, |_| Event::Idle)
            .recv(&channel, |res| res.map(Event::Got).unwrap_or(Event::Closed))
            .wait();

        assert_eq!(fired, Fired { index: 1, output: Event::Got(11) });
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_send_case_blocks_until_receiver() {
        let channel = Channel::new();
        let rx = channel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            rx.recv()
        });

        let fired = Select::new()
            .send(&channel, 5, |res| if res.is_ok() { Event::Sent } else { Event::Closed })
            .wait();

        assert_eq!(fired.index, 0);
        assert_eq!(fired.output, Event::Sent);
        assert_eq!(handle.join().unwrap(), Ok(5));
    }

    #[test]
    fn test_default_fires_only_when_nothing_ready() {
        let channel: Channel<i32> = Channel::new();
        let fired = Select::new()
            .recv(&channel, |_| Event::Got(0))
            .default(|| Event::Idle)
            .wait();
        assert_eq!(fired, Fired { index: 1, output: Event::Idle });

        channel.close().unwrap();
        let fired = Select::new()
            .recv(&channel, |res| if res.is_err() { Event::Closed } else { Event::Got(0) })
            .default(|| Event::Idle)
            .wait();
        assert_eq!(fired.output, Event::Closed);
    }

    #[test]
    fn test_default_alone_fires() {
        let fired: Fired<u8> = Select::new().default(|| 3).wait();
        assert_eq!(fired, Fired { index: 0, output: 3 });
    }

    #[test]
    fn test_closed_send_case_reports_error() {
        let channel = Channel::new();
        channel.close().unwrap();
        let fired = Select::new()
            .send(&channel, 9, |res: Result<(), ClosedChannelError<i32>>| res.unwrap_err().into_inner())
            .wait();
        assert_eq!(fired.output, 9);
    }

    #[test]
    fn test_close_wakes_parked_select() {
        let channel: Channel<i32> = Channel::new();
        let closer = channel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            closer.close().unwrap();
        });

        let fired = Select::new()
            .recv(&channel, |res| res.is_err())
            .wait();
        assert!(fired.output);
        handle.join().unwrap();
    }

    #[test]
    fn test_exactly_one_ready_case_consumed() {
        let a = Channel::new();
        let b = Channel::new();
        let handle_a = park_sender(&a, 1);
        let handle_b = park_sender(&b, 2);

        let fired = Select::new()
            .recv(&a, |res| res.unwrap())
            .recv(&b, |res| res.unwrap())
            .wait();

        // The other sender is still parked with its value intact.
        let (winner, loser, loser_value, loser_handle, winner_handle) = if fired.index == 0 {
            (1, &b, 2, handle_b, handle_a)
        } else {
            (2, &a, 1, handle_a, handle_b)
        };
        assert_eq!(fired.output, winner);
        winner_handle.join().unwrap().unwrap();
        assert_eq!(loser.recv(), Ok(loser_value));
        loser_handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_exactly_one_ready_send_case_delivers() {
        for _ in 0..50 {
            let a = Channel::new();
            let b = Channel::new();
            let handle_a = park_receiver(&a);
            let handle_b = park_receiver(&b);

            let fired = Select::new()
                .send(&a, 1, |res| res.is_ok())
                .send(&b, 2, |res| res.is_ok())
                .wait();
            assert!(fired.output);

            // The other receiver stays parked until its channel closes.
            a.close().unwrap();
            b.close().unwrap();
            let results = [handle_a.join().unwrap(), handle_b.join().unwrap()];
            let expected = if fired.index == 0 {
                [Ok(1), Err(RecvError)]
            } else {
                [Err(RecvError), Ok(2)]
            };
            assert_eq!(results, expected);
        }
    }

    #[test]
    fn test_tie_break_is_not_fixed() {
        let a = Channel::new();
        let b = Channel::new();
        let mut winners = HashSet::new();

        for _ in 0..64 {
            let handle_a = park_sender(&a, 1);
            let handle_b = park_sender(&b, 2);
            let fired = Select::new()
                .recv(&a, |res| res.unwrap())
                .recv(&b, |res| res.unwrap())
                .wait();
            winners.insert(fired.index);

            // Drain the loser so both senders finish.
            if fired.index == 0 {
                b.recv().unwrap();
            } else {
                a.recv().unwrap();
            }
            handle_a.join().unwrap().unwrap();
            handle_b.join().unwrap().unwrap();

            if winners.len() == 2 {
                break;
            }
        }

        assert_eq!(winners.len(), 2, "select always picked the same case");
    }

    #[test]
    fn test_two_selects_meet_each_other() {
        let channel = Channel::new();
        let peer = channel.clone();
        let handle = thread::spawn(move || {
            Select::new()
                .recv(&peer, |res: Result<i32, RecvError>| res.unwrap())
                .wait()
                .output
        });

        let fired = Select::new().send(&channel, 77, |res| res.is_ok()).wait();
        assert!(fired.output);
        assert_eq!(handle.join().unwrap(), 77);
    }

    #[test]
    fn test_select_does_not_meet_itself() {
        let channel = Channel::new();
        let peer = channel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            peer.recv()
        });

        // Both cases sit on the same channel; only the outside receiver can
        // complete the send case.
        let fired = Select::new()
            .send(&channel, 4, |_| Event::Sent)
            .recv(&channel, |res| res.map(Event::Got).unwrap_or(Event::Closed))
            .wait();

        assert_eq!(fired.output, Event::Sent);
        assert_eq!(handle.join().unwrap(), Ok(4));
    }

    #[test]
    fn test_len_counts_default() {
        let channel: Channel<i32> = Channel::new();
        let select = Select::new().recv(&channel, |_| ()).default(|| ());
        assert_eq!(select.len(), 2);
        assert!(!select.is_empty());
        assert!(Select::<()>::new().is_empty());
    }
}
