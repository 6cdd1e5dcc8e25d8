//! Application configuration constants.
//! Limits and package-derived names in one place.

use std::ffi::c_int;
use std::sync::OnceLock;

// ---- Package / names (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    config_filename: String,
    assist_env_key: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                config_filename: format!(".{pkg}.toml"),
                assist_env_key: format!("{}_ASSIST_CMD", pkg.to_uppercase()),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Per-directory config file name (e.g. `.sqlity.toml`).
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Environment variable holding the assist command line (e.g. `SQLITY_ASSIST_CMD`).
    pub fn assist_env_key(&self) -> &str {
        &self.assist_env_key
    }
}

// ---- Session ----

/// Maximum history entries kept per session; oldest are dropped first.
pub const HISTORY_LIMIT: usize = 100;

// ---- Browse ----

/// Rows per page when neither config nor caller sets one.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

// ---- Database image ----

/// Pages copied per backup step when loading or flushing the image. Must be positive.
pub const BACKUP_PAGES_PER_STEP: c_int = 100;

/// Statement prefixes treated as read-only by the statement classifier.
pub const READ_ONLY_KEYWORDS: [&str; 4] = ["SELECT", "PRAGMA", "EXPLAIN", "WITH"];
