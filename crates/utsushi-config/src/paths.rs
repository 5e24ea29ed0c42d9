use std::env;
use std::path::PathBuf;

const APP_NAME: &str = "utsushi";
const CONFIG_FILE: &str = "config.json";

/// `$UTSUSHI_CONFIG`, else `<config dir>/utsushi/config.json`, else `./config.json`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var("UTSUSHI_CONFIG")
        && !path.trim().is_empty()
    {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}
