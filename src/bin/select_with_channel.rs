//! Feed a consumer from a select loop until it signals quit.
//!
//! Run with: cargo run --bin select_with_channel [config.toml]

use std::process;
use unbuffered_channels::config::DemoConfig;
use unbuffered_channels::narrate::{Narrator, Role};
use unbuffered_channels::scenarios::{self, DemoError};

fn run() -> Result<(), DemoError> {
    let config = DemoConfig::from_env()?;
    let narrator = Narrator::from_config(&config);
    if !narrator.is_quiet() {
        println!("=== Select With a Quit Channel ===\n");
    }

    let report = scenarios::select_with_channel(&config, &narrator)?;
    narrator.say(Role::Main, format!("sent {:?}", report.sent));
    narrator.say(Role::Main, format!("loop ended {:?}", report.final_state));

    narrator.key_points(&[
        "Select blocks until one of its cases can complete",
        "Exactly one case fires per wait, the others are left untouched",
        "A dedicated quit channel stops the loop",
    ]);
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        process::exit(1);
    }
}
