//! REPL command parsing

use anyhow::{bail, Result};

use crate::error::ShieldError;
use crate::session::MAX_MINUTES;
use crate::store::MAX_HISTORY_DAYS;

/// Days covered by `history` without an argument
pub const DEFAULT_HISTORY_DAYS: u32 = 7;

/// A parsed REPL command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a timed session; `None` uses the configured default
    Start(Option<u32>),
    Stop,
    Add(String),
    Remove(String),
    List,
    Status,
    /// Apply the block without a timer
    Test,
    History(u32),
    Help,
    Quit,
    /// Blank line
    Empty,
}

impl Command {
    /// Parse one line of input. Command names are case-insensitive.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Command::Empty);
        }

        let (name, arg) = match input.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (input, ""),
        };

        let command = match name.to_lowercase().as_str() {
            "start" | "s" => Command::Start(parse_minutes(arg)?),
            "stop" | "end" => Command::Stop,
            "add" | "a" => Command::Add(require_domain(arg)?),
            "remove" | "rm" => Command::Remove(require_domain(arg)?),
            "list" | "ls" => Command::List,
            "status" | "st" => Command::Status,
            "test" => Command::Test,
            "history" | "stats" => Command::History(parse_days(arg)?),
            "help" | "h" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => bail!(ShieldError::UnknownCommand(other.to_string())),
        };

        Ok(command)
    }

    /// Whether the command may run while a countdown is on screen
    pub fn allowed_during_countdown(&self) -> bool {
        matches!(
            self,
            Command::Stop
                | Command::Quit
                | Command::Status
                | Command::List
                | Command::Add(_)
                | Command::Remove(_)
                | Command::Help
                | Command::Empty
        )
    }
}

fn parse_minutes(arg: &str) -> Result<Option<u32>> {
    if arg.is_empty() {
        return Ok(None);
    }

    match arg.parse::<u32>() {
        Ok(minutes) if (1..=MAX_MINUTES).contains(&minutes) => Ok(Some(minutes)),
        _ => bail!(ShieldError::InvalidDuration(arg.to_string())),
    }
}

fn parse_days(arg: &str) -> Result<u32> {
    if arg.is_empty() {
        return Ok(DEFAULT_HISTORY_DAYS);
    }

    match arg.parse::<u32>() {
        Ok(days) if (1..=MAX_HISTORY_DAYS).contains(&days) => Ok(days),
        _ => bail!(ShieldError::InvalidDays(arg.to_string())),
    }
}

fn require_domain(arg: &str) -> Result<String> {
    if arg.is_empty() {
        bail!(ShieldError::EmptyDomain);
    }
    Ok(arg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(input: &str) -> ShieldError {
        Command::parse(input)
            .unwrap_err()
            .downcast::<ShieldError>()
            .unwrap()
    }

    #[test]
    fn test_parse_commands_and_aliases() {
        let cases = [
            ("start 25", Command::Start(Some(25))),
            ("s", Command::Start(None)),
            ("STOP", Command::Stop),
            ("end", Command::Stop),
            ("add reddit.com", Command::Add("reddit.com".to_string())),
            ("a  https://x.com ", Command::Add("https://x.com".to_string())),
            ("rm x.com", Command::Remove("x.com".to_string())),
            ("ls", Command::List),
            ("status", Command::Status),
            ("test", Command::Test),
            ("stats", Command::History(DEFAULT_HISTORY_DAYS)),
            ("history 30", Command::History(30)),
            ("?", Command::Help),
            ("exit", Command::Quit),
            ("   ", Command::Empty),
        ];

        for (input, expected) in cases {
            assert_eq!(Command::parse(input).unwrap(), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_invalid_durations() {
        for input in ["start 0", "start -5", "start soon", "start 1441"] {
            assert!(
                matches!(parse_err(input), ShieldError::InvalidDuration(_)),
                "input {:?}",
                input
            );
        }
        assert_eq!(Command::parse("start 1440").unwrap(), Command::Start(Some(1440)));
    }

    #[test]
    fn test_missing_domain() {
        assert_eq!(parse_err("add"), ShieldError::EmptyDomain);
        assert_eq!(parse_err("remove   "), ShieldError::EmptyDomain);
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(parse_err("block"), ShieldError::UnknownCommand("block".to_string()));
        assert!(matches!(parse_err("history 0"), ShieldError::InvalidDays(_)));
    }

    #[test]
    fn test_countdown_command_filter() {
        for input in ["stop", "q", "status", "ls", "add x.com", "rm x.com", "help", ""] {
            assert!(
                Command::parse(input).unwrap().allowed_during_countdown(),
                "input {:?}",
                input
            );
        }
        for input in ["start", "start 5", "test", "history", "stats 3"] {
            assert!(
                !Command::parse(input).unwrap().allowed_during_countdown(),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_history_days_upper_bound() {
        assert_eq!(Command::parse("history 3650").unwrap(), Command::History(3650));
        for input in ["history 3651", "history 4000000000", "stats 99999999999"] {
            assert!(
                matches!(parse_err(input), ShieldError::InvalidDays(_)),
                "input {:?}",
                input
            );
        }
    }
}
