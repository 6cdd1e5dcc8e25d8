//! Stderr logging. Stdout is reserved for command output and serve-mode responses.

use colored::Colorize;
use env_logger::{Builder, Target};
use log::{Level, LevelFilter};
use std::io::Write;

use super::config::PackagePaths;

/// Level for this crate's own records; dependencies stay at Warn.
pub fn crate_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Last path segment of a record target: `sqlity::engine::query` -> `query`.
pub fn module_tag(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

/// Install the logger once per process. Later calls are no-ops.
pub fn setup_logging(verbose: bool) {
    let name = PackagePaths::get().pkg_name();
    let _ = Builder::from_default_env()
        .target(Target::Stderr)
        .filter_level(LevelFilter::Warn)
        .filter_module(name, crate_level(verbose))
        .format(move |buf, record| {
            let tag = module_tag(record.target());
            let head = match record.level() {
                Level::Error => format!("{} {} {}", name.cyan(), "ERROR".red(), tag.white()),
                Level::Warn => format!("{} {} {}", name.cyan(), "WARN".yellow(), tag.white()),
                Level::Info => name.cyan().to_string(),
                Level::Debug | Level::Trace => format!("{} {}", name.cyan(), tag.dimmed()),
            };
            let line = format!("[{}] {}", head, record.args());
            writeln!(buf, "{}", line)
        })
        .try_init();
}
