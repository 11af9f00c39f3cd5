//! Config loading with JSON-path context in error messages.
use std::path::Path as FsPath;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::{Error, Result};

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> std::result::Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| {
        let path = err.path().to_string();
        format!("at JSON path {path} → {}", err.into_inner())
    })
}

impl Config {
    /// Parse and validate a JSON config document.
    pub fn from_json_str(src: &str) -> Result<Config> {
        let config: Config = from_str_with_path(src).map_err(Error::InvalidConfig)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &FsPath) -> Result<Config> {
        let src = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", path.display())))?;
        Config::from_json_str(&src)
    }
}
