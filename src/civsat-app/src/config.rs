// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "civsat.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),
}

/// `civsat.toml` in the working directory, the user config dir, then /etc.
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("civsat").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from("/etc/civsat").join(CONFIG_FILE_NAME));
    paths
}

/// Deserialize `[key]` out of TOML text.
///
/// `Ok(None)` when the section is absent.
fn parse_section<T: DeserializeOwned>(
    path: &Path,
    content: &str,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let table: toml::Table = toml::from_str(content)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

    let Some(section) = table.get(key) else {
        return Ok(None);
    };

    // Round-trip through text so serde defaults apply to the section.
    let section_toml = toml::to_string(section)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
    let cfg = toml::from_str::<T>(&section_toml)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
    Ok(Some(cfg))
}

fn load_section_from_file<T: DeserializeOwned>(
    path: &Path,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;
    parse_section(path, &content, key)
}

/// Trait for loading configuration from a `civsat.toml` section.
pub trait ConfigFile: Sized + Default + DeserializeOwned {
    /// Section key in `civsat.toml` (e.g. `"civsat-server"`).
    fn section_key() -> &'static str;

    /// Load the section from a specific file path.
    ///
    /// Errors when the file cannot be read, is not valid TOML, or lacks the
    /// `[<section_key>]` table.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        load_section_from_file::<Self>(path, Self::section_key())?.ok_or_else(|| {
            ConfigError::ParseError(
                path.to_path_buf(),
                format!("missing [{}] section", Self::section_key()),
            )
        })
    }

    /// Load the first default-path file that carries the section.
    ///
    /// Returns `(Default::default(), None)` when there is none.
    fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in config_search_paths() {
            if path.exists() {
                if let Some(cfg) = load_section_from_file::<Self>(&path, Self::section_key())? {
                    return Ok((cfg, Some(path)));
                }
            }
        }
        Ok((Self::default(), None))
    }

    /// Explicit path when given, default search otherwise.
    fn load(path: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        match path {
            Some(path) => Ok((Self::load_from_file(path)?, Some(path.to_path_buf()))),
            None => Self::load_from_default_paths(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Sample {
        name: String,
        port: u16,
    }

    #[test]
    fn test_parse_section_applies_defaults() {
        let text = "[sample]\nname = \"gw\"\n\n[other]\nport = 1\n";
        let cfg: Sample = parse_section(Path::new("t.toml"), text, "sample")
            .unwrap()
            .unwrap();
        assert_eq!(cfg.name, "gw");
        assert_eq!(cfg.port, 0);
    }

    #[test]
    fn test_parse_section_missing() {
        let cfg: Option<Sample> =
            parse_section(Path::new("t.toml"), "[other]\nport = 1\n", "sample").unwrap();
        assert!(cfg.is_none());
    }

    #[test]
    fn test_parse_section_reports_path() {
        let err = parse_section::<Sample>(Path::new("bad.toml"), "[sample\n", "sample")
            .unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_default_paths_end_in_etc() {
        let paths = config_search_paths();
        assert_eq!(paths[0], PathBuf::from("civsat.toml"));
        assert_eq!(
            paths.last().unwrap(),
            &PathBuf::from("/etc/civsat/civsat.toml")
        );
    }
}
