use crate::config::AppConfig;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "pirisk.toml";

/// Layered configuration: built-in defaults, then the TOML file, then
/// `PIRISK_*` environment variables (`__` separates nested keys, e.g.
/// `PIRISK_SERVER__PORT`).
pub fn figment(path: Option<&str>) -> Figment {
    Figment::from(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(path.unwrap_or(DEFAULT_CONFIG_FILE)))
        .merge(Env::prefixed("PIRISK_").split("__"))
}

/// An explicitly requested file must exist; the default file is optional.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, figment::Error> {
    if let Some(p) = path {
        if !std::path::Path::new(p).is_file() {
            return Err(figment::Error::from(format!("config file {p} not found")));
        }
    }

    let config: AppConfig = figment(path).extract()?;
    config.validate().map_err(figment::Error::from)?;
    Ok(config)
}
