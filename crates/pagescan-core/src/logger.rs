//! Logger setup for binaries and tests.
//!
//! [`init_with_level`] installs a `log` backend writing
//! `[seconds LEVEL module] message` lines to stderr, where `module` is the
//! record target with the `pagescan_` crate prefix removed. With the
//! `tracing` feature, [`init_tracing`] installs a `tracing-subscriber`
//! formatter instead. `RUST_LOG` overrides its default level when set.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, fmt::format::FmtSpan, util::SubscriberInitExt, EnvFilter};

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

/// `EnvFilter` directive for a `log` level filter.
#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
fn filter_directive(level: LevelFilter) -> String {
    level.as_str().to_ascii_lowercase()
}

fn short_target(target: &str) -> &str {
    target.strip_prefix("pagescan_").unwrap_or(target)
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let secs = self.started.elapsed().as_secs_f64();
        let mut out = std::io::stderr().lock();
        let _ = writeln!(
            out,
            "[{secs:8.3} {:<5} {}] {}",
            record.level(),
            short_target(record.target()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger. Only the first call has an effect; later calls
/// return `Ok(())` and keep the original level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    let mut fresh = false;
    let logger = LOGGER.get_or_init(|| {
        fresh = true;
        StderrLogger {
            level,
            started: Instant::now(),
        }
    });
    if fresh {
        log::set_logger(logger)?;
        log::set_max_level(logger.level);
    }
    Ok(())
}

/// Install a `tracing` subscriber with span-close timings, filtered at
/// `default_level` unless `RUST_LOG` is set. `json` switches to flattened
/// JSON events. A subscriber that is already set wins.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, default_level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(default_level)));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_prefix_is_trimmed() {
        assert_eq!(short_target("pagescan_scanner::coordinator"), "scanner::coordinator");
        assert_eq!(short_target("other::module"), "other::module");
    }

    #[test]
    fn level_maps_to_filter_directive() {
        assert_eq!(filter_directive(LevelFilter::Warn), "warn");
        assert_eq!(filter_directive(LevelFilter::Off), "off");
        assert_eq!(filter_directive(LevelFilter::Trace), "trace");
    }

    #[test]
    fn repeated_init_is_ok() {
        init_with_level(LevelFilter::Warn).unwrap();
        init_with_level(LevelFilter::Trace).unwrap();
        assert_eq!(LOGGER.get().map(|l| l.level), Some(LevelFilter::Warn));
    }
}
