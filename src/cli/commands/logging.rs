use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 4 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new("verbosity")
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("OPAL_SESSION_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_named_levels() {
        let parser = validator_log_level();
        let command = Command::new("test").arg(Arg::new("level").value_parser(parser));

        for (input, expected) in [("error", 0u8), ("WARN", 1), ("info", 2), ("3", 3), ("trace", 4)] {
            let matches = command.clone().try_get_matches_from(["test", input]);
            assert_eq!(
                matches.ok().and_then(|m| m.get_one::<u8>("level").copied()),
                Some(expected),
                "level {input}"
            );
        }
    }

    #[test]
    fn rejects_unknown_level() {
        let command =
            Command::new("test").arg(Arg::new("level").value_parser(validator_log_level()));
        assert!(command.try_get_matches_from(["test", "loud"]).is_err());
        let command =
            Command::new("test").arg(Arg::new("level").value_parser(validator_log_level()));
        assert!(command.try_get_matches_from(["test", "9"]).is_err());
    }
}
