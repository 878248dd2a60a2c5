//! Log output for the command-line tool.
//!
//! The library crates log through the `log` facade; the subscriber
//! installed here bridges those records into `tracing` and writes them to
//! stderr so stdout stays clean for command output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "graphdrive=info,graphdrive_lib=info,graphdrive_fs=info,graphdrive_sharepoint=info";

const VERBOSE_FILTER: &str = "graphdrive=debug,graphdrive_lib=debug,graphdrive_fs=debug,graphdrive_sharepoint=debug";

#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    /// Raise the default filter to debug.
    pub verbose: bool,
    /// Emit one JSON object per line.
    pub json: bool,
}

/// Filter directives for `options`, unless `RUST_LOG` overrides them.
pub fn filter_directives(options: &LogOptions) -> &'static str {
    if options.verbose {
        VERBOSE_FILTER
    } else {
        DEFAULT_FILTER
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(options: &LogOptions) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(options)));

    let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if options.json {
        Box::new(fmt::layer().json().with_writer(std::io::stderr))
    } else {
        Box::new(fmt::layer().with_target(false).with_writer(std::io::stderr))
    };

    // `try_init` so a second call (tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives() {
        assert!(filter_directives(&LogOptions::default()).contains("graphdrive_sharepoint=info"));
        let verbose = LogOptions {
            verbose: true,
            json: false,
        };
        assert!(filter_directives(&verbose).contains("graphdrive_sharepoint=debug"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(&LogOptions::default());
        init_logging(&LogOptions {
            verbose: true,
            json: true,
        });
    }
}
