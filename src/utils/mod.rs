pub mod config;
pub mod logger;
pub mod sqlity_toml;

pub use config::*;
pub use logger::{crate_level, module_tag, setup_logging};
pub use sqlity_toml::{
    SqlityToml, apply_file_to_opts, assist_command_from_env, load_sqlity_toml, parse_sqlity_toml,
};
