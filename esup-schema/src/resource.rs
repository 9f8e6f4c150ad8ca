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

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// A single declaration file found on disk: `{identifier}-{env}.{ext}`.
#[derive(Debug, Clone)]
pub(crate) struct ResourceFile {
    pub identifier: String,
    pub env_name: String,
    pub file_path: PathBuf,
}

/// Walks `directory` for files with `.{ext}` (e.g. `json`, `meta.yml`),
/// parses each name as `{identifier}-{env}.{ext}`, then keeps only the file
/// that applies to `env_name`: the environment-specific file if present,
/// otherwise the `default` file, otherwise the resource is dropped.
///
/// A missing directory is treated as "no resources", matching the
/// original's tolerance of an absent directory rather than failing the
/// whole schema load.
pub(crate) fn environment_resources(
    directory: &str,
    env_name: &str,
    ext: &str,
) -> Result<Vec<ResourceFile>, Error> {
    let all = all_resources(directory, ext)?;
    Ok(resolve_for_environment(all, env_name))
}

fn all_resources(directory: &str, ext: &str) -> Result<Vec<ResourceFile>, Error> {
    let root = Path::new(directory);
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut resources = Vec::new();
    walk(root, ext, &mut resources)?;
    Ok(resources)
}

fn walk(dir: &Path, ext: &str, out: &mut Vec<ResourceFile>) -> Result<(), Error> {
    let entries = std::fs::read_dir(dir).map_err(|source| Error::Io {
        path: dir.display().to_string(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| Error::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, ext, out)?;
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !has_extension(name, ext) {
            continue;
        }

        match parse_resource_file_name(name, ext) {
            Some((identifier, env_name)) => out.push(ResourceFile {
                identifier,
                env_name,
                file_path: path.clone(),
            }),
            None => tracing::warn!(file = name, "unexpected file, skipping"),
        }
    }

    Ok(())
}

fn has_extension(name: &str, ext: &str) -> bool {
    name.to_lowercase().ends_with(&format!(".{}", ext.to_lowercase()))
}

fn parse_resource_file_name(name: &str, ext: &str) -> Option<(String, String)> {
    let stem = &name[..name.len() - ext.len() - 1];
    let last_dash = stem.rfind('-')?;
    Some((stem[..last_dash].to_string(), stem[last_dash + 1..].to_string()))
}

fn resolve_for_environment(resources: Vec<ResourceFile>, env_name: &str) -> Vec<ResourceFile> {
    let mut by_identifier: HashMap<String, Vec<ResourceFile>> = HashMap::new();
    for resource in resources {
        by_identifier
            .entry(resource.identifier.clone())
            .or_default()
            .push(resource);
    }

    let mut result = Vec::new();
    for (_, candidates) in by_identifier {
        let specific = candidates.iter().find(|r| r.env_name == env_name);
        let default = candidates.iter().find(|r| r.env_name == "default");
        if let Some(resource) = specific.or(default) {
            result.push(resource.clone());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn environment_specific_file_wins_over_default() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foo-default.json"), "{}").unwrap();
        fs::write(dir.path().join("foo-prod.json"), "{}").unwrap();
        let resources = environment_resources(dir.path().to_str().unwrap(), "prod", "json").unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].env_name, "prod");
    }

    #[test]
    fn falls_back_to_default_when_no_specific_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foo-default.json"), "{}").unwrap();
        let resources = environment_resources(dir.path().to_str().unwrap(), "prod", "json").unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].env_name, "default");
    }

    #[test]
    fn absent_when_neither_specific_nor_default_exists() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foo-staging.json"), "{}").unwrap();
        let resources = environment_resources(dir.path().to_str().unwrap(), "prod", "json").unwrap();
        assert!(resources.is_empty());
    }

    #[test]
    fn missing_directory_yields_no_resources() {
        let resources = environment_resources("/does/not/exist", "prod", "json").unwrap();
        assert!(resources.is_empty());
    }

    #[test]
    fn meta_extension_is_matched_on_dotted_suffix() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foo-default.meta.yml"), "index: bar").unwrap();
        let resources = environment_resources(dir.path().to_str().unwrap(), "prod", "meta.yml").unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].identifier, "foo");
    }
}
