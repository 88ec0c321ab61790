use serde::Serialize;
use tracing::{Level, debug};

/// Logs `value` as pretty JSON at debug level; serialisation is skipped when debug is off.
pub(crate) fn debug_pretty_json<T: Serialize>(what: &'static str, value: &T) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }

    match serde_json::to_string_pretty(value) {
        Ok(json) => debug!(what, "\n{json}"),
        Err(error) => debug!(what, %error, "pretty serialize failed"),
    }
}
