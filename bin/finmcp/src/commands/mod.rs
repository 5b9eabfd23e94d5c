pub mod config_cmd;
pub mod run_cmd;
pub mod serve;
pub mod tools_cmd;

use std::path::{Path, PathBuf};

use finmcp_core::{Config, Paths};

/// Config file to use: the `--config` override or `~/.finmcp/config.json`.
pub fn config_file(override_path: Option<&Path>) -> PathBuf {
    override_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| Paths::new().config_file())
}

/// Load the config file, or defaults when it does not exist.
pub fn load_config(override_path: Option<&Path>) -> anyhow::Result<Config> {
    match override_path {
        Some(path) if path.exists() => Ok(Config::load(path)?),
        Some(_) => Ok(Config::default()),
        None => Ok(Config::load_or_default(&Paths::new())?),
    }
}
