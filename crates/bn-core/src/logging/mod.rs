//! Structured logging for structure building, inference and learning.
//!
//! The library only emits `tracing` events. Embedding applications that
//! want them on stderr call [`init_logging`]; the engine's own output is
//! otherwise invisible.
//!
//! ```ignore
//! use bn_core::logging::{init_logging, LogConfig, LogFormat};
//!
//! init_logging(&LogConfig::from_env().with_format(LogFormat::Json).with_rounds());
//! ```

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat};
pub use events::{event_names, LogContext, Stage};

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global subscriber writing to stderr.
///
/// Invalid directives are skipped. Returns false if a global subscriber was
/// already set.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = EnvFilter::builder().parse_lossy(&config.directive);

    match config.format {
        LogFormat::Human => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(std::io::stderr().is_terminal());

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .try_init()
                    .is_ok()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .try_init()
                    .is_ok()
            }
        }
        LogFormat::Json => {
            let json_layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init()
                .is_ok()
        }
    }
}

/// Emit a `tracing` event stamped with the run context.
///
/// `$level` is a `tracing::Level` constant name (`INFO`, `DEBUG`, `WARN`).
/// Extra fields must be plain expressions; wrap with
/// `tracing::field::display` for `Display` formatting.
///
/// ```ignore
/// log_event!(ctx, DEBUG, event_names::VMP_ROUND_COMPLETED, Stage::Round, "round done",
///     round = 3, elbo = -12.5);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, $level:ident, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::event!(
            tracing::Level::$level,
            event = $event,
            run_id = %$ctx.run_id,
            schedule = $ctx.schedule,
            stage = %$stage,
            $($key = $val,)*
            "{}", $msg
        )
    };
}
