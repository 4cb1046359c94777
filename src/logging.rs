use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    Config,
};

use crate::error::{OutbreakError, OutbreakResult};

// ISO 8601 timestamp and color coded level tag
const LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%S)} {h({l})} {t} - {m}{n}";

/// Installs the global logger. Everything goes to stderr,
/// stdout is reserved for the json configs printed by the CLI.
pub fn init_logging(level: LevelFilter) -> OutbreakResult<()>
{
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .map_err(|e| OutbreakError::Logging(e.to_string()))?;

    log4rs::init_config(config)
        .map_err(|e| OutbreakError::Logging(e.to_string()))?;
    Ok(())
}
