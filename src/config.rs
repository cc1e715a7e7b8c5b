//! Runtime configuration
//!
//! Settings come from an optional `config.toml` and are overridden by
//! command line flags. Every key is optional.

use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::catalog::FormatRegistry;
use crate::mirror::DEFAULT_REMOTE;

/// Name of the application directory under the OS cache/config roots
pub const APP_DIR_NAME: &str = "catpaper";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No platform cache directory and no `cache_dir` configured
    #[error("No cache directory available; set cache_dir or pass --cache-dir")]
    NoCacheDir,
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unknown image format {0:?}; expected one of jpeg, png, gif, webp, bmp")]
    UnknownFormat(String),
    #[error("Invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Command line flags
#[derive(Debug, Default, Parser)]
#[command(name = "catpaper", version, about = "Browse a local mirror of a wallpaper repository")]
pub struct Cli {
    /// The port to serve on
    #[arg(long)]
    pub port: Option<u16>,
    /// Directory holding the local mirror
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,
    /// Git URL of the wallpaper collection
    #[arg(long)]
    pub remote: Option<String>,
    /// Do not open the browser after startup
    #[arg(long)]
    pub no_browser: bool,
    /// Path to a config.toml (defaults to the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub remote_url: String,
    pub cache_dir: Option<PathBuf>,
    pub port: u16,
    pub open_browser: bool,
    /// Image formats the scanner decodes, in sniffing order
    pub formats: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_url: DEFAULT_REMOTE.to_string(),
            cache_dir: None,
            port: DEFAULT_PORT,
            open_browser: true,
            formats: vec!["jpeg".to_string(), "png".to_string()],
        }
    }
}

impl Config {
    /// Load the config file named by `--config`, or the default one if it exists,
    /// then apply the command line overrides.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        Ok(config.with_overrides(cli))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(dir) = &cli.cache_dir {
            self.cache_dir = Some(dir.clone());
        }
        if let Some(remote) = &cli.remote {
            self.remote_url = remote.clone();
        }
        if cli.no_browser {
            self.open_browser = false;
        }
        self
    }

    /// Where the mirror lives: `cache_dir` if set, else `<user cache>/catpaper`
    pub fn mirror_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::cache_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or(ConfigError::NoCacheDir),
        }
    }

    /// Format registry for the configured format names
    pub fn registry(&self) -> Result<FormatRegistry, ConfigError> {
        FormatRegistry::from_names(self.formats.as_slice()).map_err(ConfigError::UnknownFormat)
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}
