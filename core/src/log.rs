//!
//! Logger and logging macros
//!
//! Verification code only emits records through the `log` facade. Binaries and tests
//! opt into output by calling [`init_logger`] or [`try_init_logger`].
//!

pub use log::{Level, LevelFilter};

use log4rs::{Config, config::Root};
use std::sync::atomic::{AtomicBool, Ordering};

mod appender;
mod consts;
mod logger;

use appender::AppenderSpec;
use consts::*;
use logger::Builder;

static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Builds a log4rs configuration from a filter expression such as `info,tessera_txscript=trace`.
///
/// When `log_dir` is provided, a rolling file appender and an error-only rolling file appender
/// are added next to the console appender.
fn build_config(log_dir: Option<&str>, filters: &str) -> Config {
    let mut stdout_appender = AppenderSpec::console(CONSOLE_APPENDER, None);
    let mut file_appenders = log_dir
        .map(|dir| {
            [
                AppenderSpec::roller(LOG_FILE_APPENDER, None, dir, LOG_FILE_NAME),
                AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), dir, ERR_LOG_FILE_NAME),
            ]
        })
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    let appender_names =
        std::iter::once(CONSOLE_APPENDER).chain(file_appenders.iter().map(|x| x.name)).collect::<Vec<_>>();
    let level = {
        let mut builder = Builder::new();
        builder.appenders(appender_names.iter().copied()).root_level(LevelFilter::Info).parse_env(DEFAULT_LOGGER_ENV);
        builder.parse_expression(filters);
        builder.build()
    };

    Config::builder()
        .appender(stdout_appender.appender())
        .appenders(file_appenders.iter_mut().map(|x| x.appender()))
        .loggers(level.items())
        .build(Root::builder().appenders(appender_names).build(level.root_level()))
        .expect("the log4rs configuration is built from valid appender names")
}

/// Initializes the global logger. Panics if a logger was already installed.
pub fn init_logger(log_dir: Option<&str>, filters: &str) {
    let config = build_config(log_dir, filters);
    log4rs::init_config(config).expect("a global logger was already installed");
    LOGGER_INITIALIZED.store(true, Ordering::SeqCst);
}

/// Tries to init the global logger, but does not panic if it was already setup.
/// Should be used for tests.
pub fn try_init_logger(filters: &str) {
    if LOGGER_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    let _ = log4rs::init_config(build_config(None, filters));
}

#[macro_export]
macro_rules! trace {
    ($($t:tt)*) => (
        $crate::log::__private_log::trace!($($t)*)
    )
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => (
        $crate::log::__private_log::debug!($($t)*)
    )
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => (
        $crate::log::__private_log::info!($($t)*)
    )
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => (
        $crate::log::__private_log::warn!($($t)*)
    )
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => (
        $crate::log::__private_log::error!($($t)*)
    )
}

#[doc(hidden)]
pub use log as __private_log;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_logger_is_idempotent() {
        try_init_logger("info,tessera_core=trace");
        try_init_logger("trace");
        crate::trace!("logger initialized twice without panicking");
        assert!(LOGGER_INITIALIZED.load(Ordering::SeqCst));
    }

    #[test]
    fn test_build_config_with_log_dir() {
        let dir = std::env::temp_dir().join("tessera-log-test");
        let config = build_config(dir.to_str(), "debug");
        assert_eq!(config.appenders().len(), 3);
        assert_eq!(config.root().level(), LevelFilter::Debug);
    }
}
