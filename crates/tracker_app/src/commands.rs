use thiserror::Error;
use tracker_core::OperationId;

/// A line typed on stdin while the tracker runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stop(OperationId),
    Inspect(OperationId),
    Hide,
    Show,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("'{0}' needs an operation id")]
    MissingId(&'static str),
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
}

pub const HELP: &str = "commands: stop <id> | inspect <id> | hide | show | help | quit";

impl Command {
    /// Blank input yields `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let id = words.next().map(str::to_string);
        let command = match verb.to_ascii_lowercase().as_str() {
            "stop" | "cancel" => Command::Stop(id.ok_or(CommandError::MissingId("stop"))?),
            "inspect" | "show-op" => {
                Command::Inspect(id.ok_or(CommandError::MissingId("inspect"))?)
            }
            "hide" => Command::Hide,
            "show" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            _ => return Err(CommandError::Unknown(verb.to_string())),
        };
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_ids() {
        assert_eq!(
            Command::parse("stop op-1"),
            Ok(Some(Command::Stop("op-1".to_string())))
        );
        assert_eq!(
            Command::parse("  INSPECT   op-2  "),
            Ok(Some(Command::Inspect("op-2".to_string())))
        );
        assert_eq!(Command::parse("hide"), Ok(Some(Command::Hide)));
        assert_eq!(Command::parse("show"), Ok(Some(Command::Show)));
        assert_eq!(Command::parse("q"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn blank_and_bad_input() {
        assert_eq!(Command::parse("   "), Ok(None));
        assert_eq!(Command::parse("stop"), Err(CommandError::MissingId("stop")));
        assert_eq!(
            Command::parse("pause op-1"),
            Err(CommandError::Unknown("pause".to_string()))
        );
    }
}
