use clap::{Arg, ArgAction, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accept either a numeric level (0-5) or a level name.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        let level = level.to_lowercase();
        LEVEL_NAMES
            .iter()
            .position(|name| *name == level)
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| "invalid log level".to_string())
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("AUTHGATE_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
