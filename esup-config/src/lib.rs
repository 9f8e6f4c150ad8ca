// Copyright (C) 2024 esup contributors.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

use config::{Config as ConfigSource, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum Error {
    #[error("couldn't load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    #[serde(rename = "apiKey", default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrototypeConfig {
    #[serde(default)]
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangelogConfig {
    pub index: String,
    #[serde(rename = "lockIndex")]
    pub lock_index: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexSetsConfig {
    pub directory: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelinesConfig {
    pub directory: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentsConfig {
    pub directory: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreprocessConfig {
    #[serde(rename = "includesDirectory")]
    pub includes_directory: String,
}

/// The tool's full configuration, assembled from `esup.config.yml` in the
/// working directory (optional) layered under defaults, then overridden by
/// environment variables (`SERVER_ADDRESS`, `CHANGELOG_LOCKINDEX`, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub prototype: PrototypeConfig,
    pub changelog: ChangelogConfig,
    #[serde(rename = "indexSets")]
    pub index_sets: IndexSetsConfig,
    pub pipelines: PipelinesConfig,
    pub documents: DocumentsConfig,
    pub preprocess: PreprocessConfig,
}

impl Config {
    /// Reads `esup.config.yml` from the current directory if present, and
    /// applies `ESUP_`-unprefixed environment overrides on top -- a missing
    /// config file isn't an error, it just means every key falls back to
    /// its default.
    pub fn load() -> Result<Self, Error> {
        Self::load_from(".")
    }

    /// Like [`Config::load`], but reads `esup.config.yml` from `dir` instead
    /// of the current directory. Exposed so tests don't have to chdir.
    pub fn load_from(dir: &str) -> Result<Self, Error> {
        let config_path = format!("{dir}/esup.config");

        let source = ConfigSource::builder()
            .set_default("server.address", "http://localhost:9200")?
            .set_default("server.apiKey", "")?
            .set_default("prototype.environment", "")?
            .set_default("changelog.index", "esup-changelog0")?
            .set_default("changelog.lockIndex", "esup-lock0")?
            .set_default("indexSets.directory", "./indexSets")?
            .set_default("pipelines.directory", "./pipelines")?
            .set_default("documents.directory", "./documents")?
            .set_default("preprocess.includesDirectory", "./includes")?
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::default().separator("_"))
            .build()?;

        let config: Config = source.try_deserialize()?;
        info!(address = %config.server.address, "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn falls_back_to_documented_defaults_with_no_config_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.address, "http://localhost:9200");
        assert_eq!(config.changelog.index, "esup-changelog0");
        assert_eq!(config.changelog.lock_index, "esup-lock0");
        assert_eq!(config.index_sets.directory, "./indexSets");
        assert_eq!(config.pipelines.directory, "./pipelines");
        assert_eq!(config.documents.directory, "./documents");
        assert_eq!(config.preprocess.includes_directory, "./includes");
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join("esup.config.yml")).unwrap();
        writeln!(file, "server:\n  address: http://cluster:9200\nchangelog:\n  index: custom-changelog").unwrap();
        let config = Config::load_from(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.address, "http://cluster:9200");
        assert_eq!(config.changelog.index, "custom-changelog");
        assert_eq!(config.changelog.lock_index, "esup-lock0");
    }
}
