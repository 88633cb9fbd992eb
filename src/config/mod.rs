//! Configuration loading and management.

mod file;
mod paths;
mod types;
mod validate;

pub use file::{ineffective_settings, load_config, load_config_file, render_config, save_config};
pub use paths::{ConfigSource, config_dir, config_file_path, resolve_config_source};
pub use types::{Config, DecimateConfig, MergeConfig, PatternConfig};
pub use validate::validate_config;
