use std::path::PathBuf;

use thiserror::Error;

use crate::logging::LogDestination;

pub const USAGE: &str = "usage: opwatch [--config PATH] [--base-url URL] [--log terminal|file|both] [--verbose] [--write-config PATH]";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub base_url: Option<String>,
    pub log: LogDestination,
    pub verbose: bool,
    /// Write the effective config to this path and exit.
    pub write_config: Option<PathBuf>,
    pub help: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliError {
    #[error("{0} needs a value")]
    MissingValue(String),
    #[error("unknown log destination '{0}'")]
    BadLogDestination(String),
    #[error("unexpected argument '{0}'")]
    Unexpected(String),
}

/// Parses arguments after the program name.
pub fn parse_args<I>(args: I) -> Result<CliOptions, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut options = CliOptions::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| CliError::MissingValue(flag.to_string()))
        };
        match arg.as_str() {
            "--config" | "-c" => options.config = Some(PathBuf::from(value(&arg)?)),
            "--base-url" => options.base_url = Some(value(&arg)?),
            "--log" => {
                let raw = value(&arg)?;
                options.log =
                    LogDestination::parse(&raw).ok_or(CliError::BadLogDestination(raw))?;
            }
            "--write-config" => options.write_config = Some(PathBuf::from(value(&arg)?)),
            "--verbose" | "-v" => options.verbose = true,
            "--help" | "-h" => options.help = true,
            other => return Err(CliError::Unexpected(other.to_string())),
        }
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_arguments() {
        let options = parse_args(Vec::new()).unwrap();
        assert_eq!(options, CliOptions::default());
        assert_eq!(options.log, LogDestination::File);
    }

    #[test]
    fn reads_all_flags() {
        let options = parse_args(args(&[
            "--config",
            "opwatch.ron",
            "--base-url",
            "http://backend:9000/api",
            "--log",
            "both",
            "-v",
        ]))
        .unwrap();
        assert_eq!(options.config, Some(PathBuf::from("opwatch.ron")));
        assert_eq!(options.base_url.as_deref(), Some("http://backend:9000/api"));
        assert_eq!(options.log, LogDestination::Both);
        assert!(options.verbose);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            parse_args(args(&["--config"])),
            Err(CliError::MissingValue("--config".to_string()))
        );
        assert_eq!(
            parse_args(args(&["--log", "syslog"])),
            Err(CliError::BadLogDestination("syslog".to_string()))
        );
        assert_eq!(
            parse_args(args(&["extra"])),
            Err(CliError::Unexpected("extra".to_string()))
        );
    }
}
