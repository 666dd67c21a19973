use std::fmt;

/// One line command read from the operator console.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Pause,
    Resume,
    Refresh,
    Recenter,
    /// `type all` or `type <Name>`
    SelectType(String),
    /// `window <start_ms> <end_ms>`
    Window { start: i64, end: i64 },
    /// `window off`
    ClearWindow,
    Status,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str =
    "commands: pause | resume | refresh | recenter | type <Name|all> | window <start_ms> <end_ms> | window off | status | quit";

impl ConsoleCommand {
    /// Parse a line; blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("pause", []) => ConsoleCommand::Pause,
            ("resume", []) => ConsoleCommand::Resume,
            ("refresh", []) => ConsoleCommand::Refresh,
            ("recenter", []) => ConsoleCommand::Recenter,
            ("status", []) => ConsoleCommand::Status,
            ("quit" | "exit", []) => ConsoleCommand::Quit,
            ("type", [name]) => ConsoleCommand::SelectType(name.to_string()),
            ("window", ["off"]) => ConsoleCommand::ClearWindow,
            ("window", [start, end]) => ConsoleCommand::Window {
                start: parse_millis(start)?,
                end: parse_millis(end)?,
            },
            _ => return Err(ParseError(format!("unrecognized command '{}'", line.trim()))),
        };
        Ok(Some(command))
    }
}

fn parse_millis(text: &str) -> Result<i64, ParseError> {
    text.parse::<i64>()
        .map_err(|_| ParseError(format!("'{}' is not a millisecond timestamp", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleCommand::parse("pause"), Ok(Some(ConsoleCommand::Pause)));
        assert_eq!(ConsoleCommand::parse("  Resume "), Ok(Some(ConsoleCommand::Resume)));
        assert_eq!(
            ConsoleCommand::parse("type WeatherObserved"),
            Ok(Some(ConsoleCommand::SelectType("WeatherObserved".to_string())))
        );
        assert_eq!(
            ConsoleCommand::parse("window 20 10"),
            Ok(Some(ConsoleCommand::Window { start: 20, end: 10 }))
        );
        assert_eq!(ConsoleCommand::parse("window off"), Ok(Some(ConsoleCommand::ClearWindow)));
        assert_eq!(ConsoleCommand::parse(""), Ok(None));
    }

    #[test]
    fn test_parse_errors() {
        assert!(ConsoleCommand::parse("window soon later").is_err());
        assert!(ConsoleCommand::parse("type").is_err());
        assert!(ConsoleCommand::parse("jump").is_err());
        assert!(ConsoleCommand::parse("pause now").is_err());
    }
}
