use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub tracker: TrackerConfig,
  pub default_project: Option<String>,
  #[serde(default)]
  pub list: ListConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
  /// Base URL of the tracker, e.g. https://bugs.example.com/
  pub url: String,
}

/// Defaults for batched list fetches.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListConfig {
  pub items_per_page: Option<u32>,
  pub max_parallel_calls: Option<u32>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./bugview.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/bugview/config.yaml
  /// 4. ~/.config/bugview/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/bugview/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("bugview.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("bugview").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the API token from environment variables, if set.
  ///
  /// Checks BUGVIEW_TOKEN first, then TRACKER_API_TOKEN as fallback.
  /// Anonymous read access works without one.
  pub fn get_api_token() -> Option<String> {
    std::env::var("BUGVIEW_TOKEN")
      .or_else(|_| std::env::var("TRACKER_API_TOKEN"))
      .ok()
  }
}
