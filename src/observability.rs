//! Logging hooks for the streaming pipeline.
//!
//! Library code only talks to the `log` facade. Applications that want to see
//! what the adapters and engines are doing call [`enable_verbose_logging`] once,
//! which installs an `env_logger` backend.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Once;

use log::LevelFilter;

use crate::error::TransformError;

/// Logs a structured key-value metric line at debug level.
///
/// # Example
/// ```ignore
/// log_metric!("event" = "upstream_eof", "bytes_in" = total);
/// ```
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        if log::log_enabled!(log::Level::Debug) {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            log::debug!("TAMBAK_STREAM_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}

static INIT_LOGGER: Once = Once::new();

/// Installs a process-wide `env_logger` at `level`, optionally appending to
/// `log_file` instead of stderr. Only the first call has any effect.
///
/// # Errors
/// Returns `TransformError::Io` if `log_file` cannot be opened for appending.
pub fn enable_verbose_logging(
    level: LevelFilter,
    log_file: Option<&Path>,
) -> Result<(), TransformError> {
    let file = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(level);

        // Custom formatter: just print the level and message
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}
