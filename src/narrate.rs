//! Console narration for the demo programs.
//!
//! Every demo prints its own execution order as it runs. Lines are tagged with
//! the role that produced them; the interleaving depends on the scheduler.

use colored::{ColoredString, Colorize};
use std::fmt::Display;

use crate::config::DemoConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Main,
    Worker,
    Channel,
    Select,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Main => "main",
            Role::Worker => "worker",
            Role::Channel => "channel",
            Role::Select => "select",
        }
    }

    fn paint(self, text: String) -> ColoredString {
        match self {
            Role::Main => text.bold().blue(),
            Role::Worker => text.bold().green(),
            Role::Channel => text.bold().yellow(),
            Role::Select => text.bold().magenta(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Narrator {
    quiet: bool,
    colors: bool,
}

impl Narrator {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            colors: Self::should_use_colors(),
        }
    }

    pub fn from_config(config: &DemoConfig) -> Self {
        Self::new(config.quiet)
    }

    pub fn silent() -> Self {
        Self::new(true)
    }

    pub fn should_use_colors() -> bool {
        std::env::var("NO_COLOR").is_err()
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn format(&self, role: Role, message: impl Display) -> String {
        let tag = format!("[{}]", role.label());
        if self.colors {
            format!("{} {}", role.paint(tag), message)
        } else {
            format!("{} {}", tag, message)
        }
    }

    pub fn say(&self, role: Role, message: impl Display) {
        if !self.quiet {
            println!("{}", self.format(role, message));
        }
    }

    /// Closing summary printed after a demo, in the style of a lesson recap.
    pub fn key_points(&self, points: &[&str]) {
        if self.quiet {
            return;
        }
        println!("\n=== Key Points ===");
        for (i, point) in points.iter().enumerate() {
            println!("{}. {}", i + 1, point);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_format_has_role_tag() {
        let narrator = Narrator {
            quiet: false,
            colors: false,
        };
        assert_eq!(narrator.format(Role::Worker, "started"), "[worker] started");
        assert_eq!(narrator.format(Role::Channel, 3), "[channel] 3");
    }

    #[test]
    fn test_colored_format_keeps_message() {
        let narrator = Narrator {
            quiet: false,
            colors: true,
        };
        let line = narrator.format(Role::Select, "entered");
        assert!(line.contains("[select]"));
        assert!(line.ends_with("entered"));
    }

    #[test]
    fn test_quiet_from_config() {
        let config = DemoConfig {
            quiet: true,
            ..DemoConfig::default()
        };
        assert!(Narrator::from_config(&config).is_quiet());
        assert!(Narrator::silent().is_quiet());
        assert!(!Narrator::new(false).is_quiet());
    }
}
