//! Drain an unbuffered channel with a for loop and comma-ok receives.
//!
//! Run with: cargo run --bin for_with_channel [config.toml]

use std::process;
use unbuffered_channels::config::DemoConfig;
use unbuffered_channels::narrate::{Narrator, Role};
use unbuffered_channels::scenarios::{self, DemoError};

fn run() -> Result<(), DemoError> {
    let config = DemoConfig::from_env()?;
    let narrator = Narrator::from_config(&config);
    if !narrator.is_quiet() {
        println!("=== For Loop Over an Unbuffered Channel ===\n");
    }

    let received = scenarios::for_with_channel(&config, &narrator)?;
    narrator.say(Role::Main, format!("received {:?}", received));

    narrator.key_points(&[
        "Each send waits until the receiver takes the value",
        "recv_ok() reports false once the channel is closed and drained",
        "The producer closes the channel, the consumer only observes it",
    ]);
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}
