//! The four demo scenarios.
//!
//! Each scenario narrates what it does and returns what was observed on the
//! channel, so the binaries can print it and the tests can check it.

use std::thread;
use thiserror::Error;

use crate::channel::Channel;
use crate::config::{ConfigError, DemoConfig};
use crate::error::{ClosedChannelError, DoubleCloseError, RecvError};
use crate::narrate::{Narrator, Role};
use crate::select::Select;

#[derive(Error, Debug)]
pub enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Send(#[from] ClosedChannelError<i64>),

    #[error(transparent)]
    Recv(#[from] RecvError),

    #[error(transparent)]
    DoubleClose(#[from] DoubleCloseError),

    #[error("the {0} thread panicked")]
    WorkerPanicked(&'static str),
}

/// What a select in the quit-signal loop completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Sent,
    Quit,
}

/// State of the select-driven sender loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Stopped,
}

impl DriverState {
    pub fn next(self, step: Step) -> Self {
        match (self, step) {
            (DriverState::Running, Step::Sent) => DriverState::Running,
            (DriverState::Running, Step::Quit) | (DriverState::Stopped, _) => DriverState::Stopped,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectReport {
    /// Values the select loop handed off, in order.
    pub sent: Vec<i64>,
    /// Values the consumer took, in order.
    pub received: Vec<i64>,
    pub final_state: DriverState,
}

/// Sends `1..=count` with a pause after each handoff, then closes.
fn produce(channel: &Channel<i64>, config: &DemoConfig, narrator: &Narrator) -> Result<(), DemoError> {
    narrator.say(Role::Worker, "started");
    narrator.say(Role::Worker, format!("writing {} values (blocking begins)", config.count));
    for count in 1..=i64::from(config.count) {
        channel.send(count)?;
        narrator.say(Role::Channel, format!("value {} written", count));
        thread::sleep(config.producer_delay());
    }
    narrator.say(Role::Worker, format!("writing {} values done (blocking ends)", config.count));

    channel.close()?;
    narrator.say(Role::Channel, "closed");
    narrator.say(Role::Worker, "finished");
    Ok(())
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, Result<T, DemoError>>, who: &'static str) -> Result<T, DemoError> {
    handle.join().map_err(|_| DemoError::WorkerPanicked(who))?
}

/// Drains the channel with explicit comma-ok receives until it reports closed.
pub fn for_with_channel(config: &DemoConfig, narrator: &Narrator) -> Result<Vec<i64>, DemoError> {
    narrator.say(Role::Main, "started");
    let channel: Channel<i64> = Channel::new();
    narrator.say(Role::Channel, "created as an unbuffered channel");

    let received = thread::scope(|s| {
        let producer = s.spawn(|| produce(&channel, config, narrator));

        narrator.say(Role::Main, "draining the channel with a for loop");
        let mut received = Vec::new();
        loop {
            let (value, ok) = channel.recv_ok();
            if ok {
                narrator.say(Role::Main, format!("took <- {}", value));
                received.push(value);
            } else {
                narrator.say(Role::Main, "channel closed, leaving the loop");
                break;
            }
        }
        narrator.say(Role::Main, "for loop drain done");

        join(producer, "producer")?;
        Ok::<_, DemoError>(received)
    })?;

    narrator.say(Role::Main, "finished");
    Ok(received)
}

/// Drains the channel by iterating over it.
pub fn range_with_channel(config: &DemoConfig, narrator: &Narrator) -> Result<Vec<i64>, DemoError> {
    narrator.say(Role::Main, "started");
    let channel: Channel<i64> = Channel::new();
    narrator.say(Role::Channel, "created as an unbuffered channel");

    let received = thread::scope(|s| {
        let producer = s.spawn(|| produce(&channel, config, narrator));

        narrator.say(Role::Main, "draining the channel by iteration");
        let mut received = Vec::new();
        for item in &channel {
            narrator.say(Role::Main, format!("took <- {}", item));
            received.push(item);
        }
        narrator.say(Role::Main, "iteration drain done");

        join(producer, "producer")?;
        Ok::<_, DemoError>(received)
    })?;

    narrator.say(Role::Main, "finished");
    Ok(received)
}

/// A select loop feeds the consumer until the consumer asks it to quit.
///
/// The consumer takes `count` values, then sends on the quit channel. The
/// loop starts at 0 and adds `step` after each successful handoff.
pub fn select_with_channel(config: &DemoConfig, narrator: &Narrator) -> Result<SelectReport, DemoError> {
    narrator.say(Role::Main, "started");
    let numbers: Channel<i64> = Channel::new();
    narrator.say(Role::Channel, "numbers created as an unbuffered channel");
    let quit: Channel<i64> = Channel::new();
    narrator.say(Role::Channel, "quit created as an unbuffered channel");

    let report = thread::scope(|s| {
        let consumer = s.spawn(|| {
            narrator.say(Role::Worker, "started");
            narrator.say(Role::Worker, "taking values from numbers (blocking begins)");
            let mut received = Vec::new();
            for _ in 0..config.count {
                let value = numbers.recv()?;
                narrator.say(Role::Worker, format!("took <- {}", value));
                received.push(value);
            }
            narrator.say(Role::Worker, "taking values done (blocking ends)");

            quit.send(0)?;
            narrator.say(Role::Channel, "0 written to quit");
            narrator.say(Role::Worker, "finished");
            Ok::<_, DemoError>(received)
        });

        let (sent, state) = drive_select_loop(&numbers, &quit, config, narrator)?;

        let received = join(consumer, "consumer")?;
        Ok::<_, DemoError>(SelectReport {
            sent,
            received,
            final_state: state,
        })
    })?;

    narrator.say(Role::Main, "finished");
    Ok(report)
}

/// Offers `0, step, 2 * step, ...` on `numbers` until something arrives on
/// `quit`.
///
/// If a case fails, `numbers` is closed before the error is returned so a
/// consumer blocked on it wakes up instead of holding the scope open.
fn drive_select_loop(
    numbers: &Channel<i64>,
    quit: &Channel<i64>,
    config: &DemoConfig,
    narrator: &Narrator,
) -> Result<(Vec<i64>, DriverState), DemoError> {
    let mut x: i64 = 0;
    narrator.say(Role::Main, "x = 0");
    let mut sent = Vec::new();
    let mut state = DriverState::Running;

    narrator.say(Role::Main, "looping over select");
    while state == DriverState::Running {
        narrator.say(Role::Select, "entered");
        let fired = Select::new()
            .send(numbers, x, |res| res.map(|()| Step::Sent).map_err(DemoError::from))
            .recv(quit, |res| res.map(|_| Step::Quit).map_err(DemoError::from))
            .wait();

        let step = match fired.output {
            Ok(step) => step,
            Err(err) => {
                // Already closed is fine, the consumer is awake either way.
                let _ = numbers.close();
                return Err(err);
            }
        };
        match step {
            Step::Sent => {
                narrator.say(Role::Channel, format!("value {} written to numbers", x));
                sent.push(x);
                x += config.step;
                narrator.say(Role::Main, format!("x += {}", config.step));
            }
            Step::Quit => narrator.say(Role::Main, "quit received, leaving the loop"),
        }
        state = state.next(step);
        narrator.say(Role::Select, "left");
    }
    Ok((sent, state))
}

/// Two values handed off one at a time: the worker stays blocked on each send
/// until the main thread gets around to receiving it.
pub fn unbuffered_channel(config: &DemoConfig, narrator: &Narrator) -> Result<Vec<i64>, DemoError> {
    narrator.say(Role::Main, "started");
    let channel: Channel<i64> = Channel::new();
    narrator.say(Role::Channel, "created as an unbuffered channel");

    let received = thread::scope(|s| {
        let sender = s.spawn(|| {
            narrator.say(Role::Worker, "started");
            for value in [1, 2] {
                narrator.say(Role::Channel, format!("pushing {}, blocked until it is taken", value));
                channel.send(value)?;
            }
            narrator.say(Role::Worker, "finished");
            Ok::<_, DemoError>(())
        });

        let mut received = Vec::new();
        for _ in 0..2 {
            thread::sleep(config.handoff_delay());
            let value = channel.recv()?;
            narrator.say(Role::Main, format!("took <- {}, blocking over", value));
            received.push(value);
        }
        thread::sleep(config.handoff_delay());

        join(sender, "sender")?;
        Ok::<_, DemoError>(received)
    })?;

    narrator.say(Role::Main, "finished");
    Ok(received)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> DemoConfig {
        DemoConfig::default().without_delays()
    }

    #[test]
    fn test_for_loop_drain_sees_one_to_ten() {
        let received = for_with_channel(&fast_config(), &Narrator::silent()).unwrap();
        assert_eq!(received, (1..=10).collect::<Vec<i64>>());
    }

    #[test]
    fn test_range_drain_sees_one_to_ten() {
        let received = range_with_channel(&fast_config(), &Narrator::silent()).unwrap();
        assert_eq!(received, (1..=10).collect::<Vec<i64>>());
    }

    #[test]
    fn test_drain_respects_count() {
        let config = DemoConfig {
            count: 3,
            ..fast_config()
        };
        let received = range_with_channel(&config, &Narrator::silent()).unwrap();
        assert_eq!(received, vec![1, 2, 3]);
    }

    #[test]
    fn test_select_loop_stops_on_quit() {
        let report = select_with_channel(&fast_config(), &Narrator::silent()).unwrap();
        let expected: Vec<i64> = (0..10).map(|i| i * 2).collect();
        assert_eq!(report.sent, expected);
        assert_eq!(report.received, expected);
        assert_eq!(report.final_state, DriverState::Stopped);
    }

    #[test]
    fn test_select_loop_uses_step() {
        let config = DemoConfig {
            count: 4,
            step: 5,
            ..fast_config()
        };
        let report = select_with_channel(&config, &Narrator::silent()).unwrap();
        assert_eq!(report.sent, vec![0, 5, 10, 15]);
        assert_eq!(report.received, report.sent);
    }

    #[test]
    fn test_unbuffered_handoff_delivers_both_values() {
        let received = unbuffered_channel(&fast_config(), &Narrator::silent()).unwrap();
        assert_eq!(received, vec![1, 2]);
    }

    #[test]
    fn test_failed_select_loop_releases_consumer() {
        let numbers: Channel<i64> = Channel::new();
        let quit: Channel<i64> = Channel::new();
        quit.close().unwrap();

        let result = thread::scope(|s| {
            let consumer = s.spawn(|| numbers.iter().count());
            let result = drive_select_loop(&numbers, &quit, &fast_config(), &Narrator::silent());
            consumer.join().unwrap();
            result
        });

        assert!(matches!(result, Err(DemoError::Recv(RecvError))));
        assert!(numbers.is_closed());
    }

    #[test]
    fn test_driver_state_transitions() {
        assert_eq!(DriverState::Running.next(Step::Sent), DriverState::Running);
        assert_eq!(DriverState::Running.next(Step::Quit), DriverState::Stopped);
        assert_eq!(DriverState::Stopped.next(Step::Sent), DriverState::Stopped);
        assert_eq!(DriverState::Stopped.next(Step::Quit), DriverState::Stopped);
    }

    #[test]
    fn test_demo_error_messages() {
        let err: DemoError = ClosedChannelError(3).into();
        assert_eq!(err.to_string(), "sending on a closed channel");
        let err: DemoError = DoubleCloseError.into();
        assert_eq!(err.to_string(), "closing an already closed channel");
        assert_eq!(DemoError::WorkerPanicked("producer").to_string(), "the producer thread panicked");
    }
}
