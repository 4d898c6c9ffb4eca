//! Logging initialization

use crate::settings::LoggingSettings;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Parse a level name, falling back to INFO
pub fn parse_level(level: &str) -> Level {
    level.parse().unwrap_or(Level::INFO)
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(settings: &LoggingSettings) -> Result<(), SetGlobalDefaultError> {
    let level = parse_level(&settings.level);

    if settings.json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("chatty"), Level::INFO);
    }
}
