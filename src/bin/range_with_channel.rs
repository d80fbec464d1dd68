//! Drain an unbuffered channel by iterating over it.
//!
//! Run with: cargo run --bin range_with_channel [config.toml]

use std::process;
use unbuffered_channels::config::DemoConfig;
use unbuffered_channels::narrate::{Narrator, Role};
use unbuffered_channels::scenarios::{self, DemoError};

fn run() -> Result<(), DemoError> {
    let config = DemoConfig::from_env()?;
    let narrator = Narrator::from_config(&config);
    if !narrator.is_quiet() {
        println!("=== Iterating Over an Unbuffered Channel ===\n");
    }

    let received = scenarios::range_with_channel(&config, &narrator)?;
    narrator.say(Role::Main, format!("received {:?}", received));

    narrator.key_points(&[
        "`for item in &channel` receives until the channel is closed",
        "The loop ends on its own, no closed check needed",
        "A fast producer is held to the consumer's pace",
    ]);
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}
