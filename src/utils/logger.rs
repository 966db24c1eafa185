use std::io;
use tracing::Dispatch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Logger built once at startup and handed to the upgrader.
///
/// Holds its own dispatcher instead of installing a global subscriber, so
/// every log event is routed through [`Logger::scope`].
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    quiet: bool,
}

impl Logger {
    /// Log to stderr; `quiet` keeps warnings and errors only.
    pub fn new(quiet: bool) -> Self {
        Self::with_writer(quiet, io::stderr, true)
    }

    pub fn with_writer<W>(quiet: bool, writer: W, ansi: bool) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let level = if quiet {
            LevelFilter::WARN
        } else {
            LevelFilter::INFO
        };

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .with_ansi(ansi)
            .with_writer(writer)
            .finish();

        Self {
            dispatch: Dispatch::new(subscriber),
            quiet,
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Run `f` with this logger receiving every `tracing` event.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}
