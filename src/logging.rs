//! Logger handle passed to each component at construction.
//!
//! Nothing here installs a global `log` backend. The binary builds an
//! `env_logger::Logger` and hands out clones of a [`Logger`] wrapping it;
//! tests hand in their own `log::Log` implementation instead.

use std::fmt;
use std::sync::Arc;

use log::{Level, Log, Record};

#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn Log>,
    target: &'static str,
}

impl Logger {
    pub fn new(sink: Arc<dyn Log>) -> Self {
        Self {
            sink,
            target: env!("CARGO_PKG_NAME"),
        }
    }

    /// Build the `env_logger` backend used by the binary.
    ///
    /// `RUST_LOG` is honoured and defaults to `info`; `verbose` raises the
    /// filter to `debug`.
    pub fn from_env(verbose: bool) -> Self {
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
        if verbose {
            builder.parse_filters("debug");
        }
        Self::new(Arc::new(builder.build()))
    }

    /// Same sink, records tagged with `target` instead.
    pub fn scoped(&self, target: &'static str) -> Self {
        Self {
            sink: self.sink.clone(),
            target,
        }
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let record = Record::builder()
            .level(level)
            .target(self.target)
            .args(args)
            .build();
        if self.sink.enabled(record.metadata()) {
            self.sink.log(&record);
        }
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args)
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args)
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args)
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args)
    }

    pub fn flush(&self) {
        self.sink.flush()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
