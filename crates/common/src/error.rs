//! Startup error type shared across crates

use thiserror::Error;

/// Errors raised while assembling process configuration.
///
/// Everything here is fatal: the service refuses to start rather than run
/// with a partial OAuth client registration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias using the shared Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_display_includes_message() {
        let err = Error::Config("EPIC_CLIENT_ID is required".into());
        assert_eq!(
            err.to_string(),
            "configuration error: EPIC_CLIENT_ID is required"
        );
    }

    #[test]
    fn config_debug_includes_variant() {
        let err = Error::Config("bad port".into());
        let debug = format!("{:?}", err);
        assert!(
            debug.contains("Config"),
            "Debug should include variant name, got: {debug}"
        );
    }
}
