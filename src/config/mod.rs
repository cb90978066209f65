//! Config module.
//! Provides configuration types, default paths, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{default_config_path, default_log_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel, MoveSettings};
pub use xml::{load_config, load_config_from_xml_path};

/// Defaults shared across submodules.
pub const DESTINATION_ROOT_DEFAULT: &str = "/srv/media/sorted";
pub const DEFAULT_DUPLICATES_DIR: &str = "duplicates";
pub const DEFAULT_ITEM_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "BATCH_MOVER_CONFIG";
