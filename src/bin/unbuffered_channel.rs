//! Two blocking handoffs over an unbuffered channel.
//!
//! Run with: cargo run --bin unbuffered_channel [config.toml]

use std::process;
use unbuffered_channels::config::DemoConfig;
use unbuffered_channels::narrate::{Narrator, Role};
use unbuffered_channels::scenarios::{self, DemoError};

fn run() -> Result<(), DemoError> {
    let config = DemoConfig::from_env()?;
    let narrator = Narrator::from_config(&config);
    if !narrator.is_quiet() {
        println!("=== Blocking Handoff ===\n");
    }

    let received = scenarios::unbuffered_channel(&config, &narrator)?;
    narrator.say(Role::Main, format!("received {:?}", received));

    narrator.key_points(&[
        "An unbuffered channel holds nothing",
        "The sender stays blocked until the receiver shows up",
    ]);
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}
