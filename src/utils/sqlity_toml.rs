//! Load `.sqlity.toml` from the database's directory (CLI only). The library takes everything
//! through explicit arguments; the binary resolves them here.

use serde::Deserialize;
use std::path::Path;

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct SqlityToml {
    #[serde(default)]
    settings: SettingsSection,
    #[serde(default)]
    assist: AssistSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    page_size: Option<u64>,
    history_limit: Option<usize>,
    verbose: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistSection {
    command: Option<Vec<String>>,
    consent: Option<bool>,
}

/// Load the config file from `dir`. `Ok(None)` when there is no readable file.
pub fn load_sqlity_toml(dir: &Path) -> Result<Option<SqlityToml>, toml::de::Error> {
    let path = dir.join(PackagePaths::get().config_filename());
    match std::fs::read_to_string(&path) {
        Ok(s) => parse_sqlity_toml(&s).map(Some),
        Err(_) => Ok(None),
    }
}

pub fn parse_sqlity_toml(s: &str) -> Result<SqlityToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$opts_field = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub fn apply_file_to_opts(file: &SqlityToml, opts: &mut Opts) {
    let settings = &file.settings;
    apply_file_opt!(settings, opts, page_size => page_size);
    apply_file_opt!(settings, opts, history_limit => history_limit);
    apply_file_opt!(settings, opts, verbose => verbose);
    if let Some(ref cmd) = file.assist.command {
        opts.assist_command = cmd.clone();
    }
    apply_file_opt!(file.assist, opts, consent => assist_consent);
}

/// Assist command from the environment, then from `.env` in `dir`. Whitespace-split.
pub fn assist_command_from_env(dir: &Path) -> Option<Vec<String>> {
    let key = PackagePaths::get().assist_env_key();
    let read = || {
        std::env::var(key)
            .ok()
            .map(|s| s.split_whitespace().map(String::from).collect::<Vec<_>>())
            .filter(|parts| !parts.is_empty())
    };
    if let Some(cmd) = read() {
        return Some(cmd);
    }
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
        return read();
    }
    None
}
