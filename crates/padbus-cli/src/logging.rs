// Colorized wrappers for logging

use colored::Colorize;
use fern::{Dispatch, FormatCallback};
use log::{Level, LevelFilter, Record};

/// Target of the program's own output. Library records keep their
/// `padbus::<module>` targets.
pub(crate) const TARGET: &str = "padbus_cli";

const LIBRARY_PREFIX: &str = "padbus::";

#[inline(always)]
pub(crate) fn format_log(message: &str) -> String {
    let now = chrono::Local::now().format("%Y.%m.%d %H:%M:%S").to_string();
    format!("[{now}] {message}")
}

#[macro_export]
macro_rules! print_error {
    ($($arg:tt)*) => {
        let message = $crate::logging::format_log(&format!($($arg)*));
        log::error!(target: $crate::logging::TARGET, "{}", message.bright_red());
    }
}

#[macro_export]
macro_rules! print_info {
    ($($arg:tt)*) => {
        let message = $crate::logging::format_log(&format!($($arg)*));
        log::info!(target: $crate::logging::TARGET, "{message}");
    }
}

#[macro_export]
macro_rules! print_debug {
    ($($arg:tt)*) => {
        let message = $crate::logging::format_log(&format!($($arg)*));
        log::debug!(target: $crate::logging::TARGET, "{}", message.dimmed());
    }
}

#[macro_export]
macro_rules! print_warning {
    ($($arg:tt)*) => {
        let message = $crate::logging::format_log(&format!($($arg)*));
        log::warn!(target: $crate::logging::TARGET, "{}", message.bright_yellow());
    }
}

/// Bus module a library record comes from, e.g. `notifier`.
fn library_source(target: &str) -> &str {
    target.strip_prefix(LIBRARY_PREFIX).unwrap_or(target)
}

/// Program records are already formatted by the `print_*` macros. Library
/// records get a timestamp and their bus module.
fn format_record(out: FormatCallback, message: &std::fmt::Arguments, record: &Record) {
    if record.target() == TARGET {
        out.finish(format_args!("{message}"));
        return;
    }
    let line = format_log(&format!("{}: {message}", library_source(record.target())));
    match record.level() {
        Level::Error => out.finish(format_args!("{}", line.bright_red())),
        Level::Warn => out.finish(format_args!("{}", line.bright_yellow())),
        _ => out.finish(format_args!("{}", line.dimmed())),
    }
}

/// Levels for the program and for the bus library.
///
/// Bus warnings repeat what the error stream delivers and the program
/// prints those already, so the library stays at `Error` unless verbose.
fn levels(verbose: bool) -> (LevelFilter, LevelFilter) {
    if verbose {
        (LevelFilter::Debug, LevelFilter::Debug)
    } else {
        (LevelFilter::Info, LevelFilter::Error)
    }
}

/// Setup the logger.
pub(crate) fn setup(verbose: bool, no_color: bool) {
    let (program, library) = levels(verbose);
    Dispatch::new()
        .format(format_record)
        .level(LevelFilter::Warn)
        .level_for(TARGET, program)
        .level_for("padbus", library)
        .chain(std::io::stdout())
        .apply()
        .expect("Unable to set up logger");

    if no_color {
        colored::control::set_override(false);
    }
}
