use log::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Config {
  pub data_dir_path: String,
}

impl Config {
  /// Loads the config file, creating one with defaults on first run. The
  /// file lives at `$HOME/.taskdock.json` unless `TASKDOCK_CONFIG` points
  /// elsewhere.
  pub fn load() -> Result<Self> {
    const DEFAULT_DATA_DIR: &str = ".taskdock";
    const DEFAULT_CONFIG_NAME: &str = ".taskdock.json";

    let home_env = std::env::var("HOME")
      .map_err(|_| Error::Storage("HOME is not set, cannot locate config".to_string()))?;
    let home = std::path::Path::new(home_env.as_str());

    let config_file_path = match std::env::var("TASKDOCK_CONFIG") {
      Ok(file_path) => std::path::PathBuf::from(file_path),
      Err(_) => home.join(DEFAULT_CONFIG_NAME),
    };

    if !config_file_path.exists() {
      let config = Self {
        data_dir_path: home.join(DEFAULT_DATA_DIR).to_string_lossy().into_owned(),
      };
      let serialized = serde_json::to_string_pretty(&config)
        .map_err(|err| Error::Storage(format!("could not serialize default config: {}", err)))?;
      std::fs::write(&config_file_path, serialized).map_err(|err| {
        Error::Storage(format!(
          "could not write {}: {}",
          config_file_path.display(),
          err
        ))
      })?;
      debug!("created default config at {}", config_file_path.display());
      return Ok(config);
    }

    let raw = std::fs::read_to_string(&config_file_path).map_err(|err| {
      Error::Storage(format!(
        "could not read {}: {}",
        config_file_path.display(),
        err
      ))
    })?;
    serde_json::from_str(&raw).map_err(|err| {
      Error::Storage(format!(
        "could not parse {}: {}",
        config_file_path.display(),
        err
      ))
    })
  }
}
