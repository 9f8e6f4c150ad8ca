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

use esup_config::Config;

use crate::error::Error;
use crate::meta::{read_document_meta, read_index_set_meta};
use crate::model::{Document, IndexSet, IndexSetMeta, Pipeline, Schema};
use crate::resource::environment_resources;

/// Loads the full declared schema for one environment: every index set,
/// pipeline, and document that resolves for `env_name`, sorted by
/// identifier for deterministic planning.
pub fn get_schema(config: &Config, env_name: &str) -> Result<Schema, Error> {
    let index_sets = get_index_sets(config, env_name)?;
    let pipelines = get_pipelines(config, env_name)?;
    let documents = get_documents(config, env_name)?;

    Ok(Schema {
        env_name: env_name.to_string(),
        index_sets,
        pipelines,
        documents,
    })
}

fn get_index_sets(config: &Config, env_name: &str) -> Result<Vec<IndexSet>, Error> {
    let directory = &config.index_sets.directory;
    let content_files = environment_resources(directory, env_name, "json")?;
    let meta_files = environment_resources(directory, env_name, "meta.yml")?;

    let mut meta_by_identifier: HashMap<String, IndexSetMeta> = HashMap::new();
    for meta_file in &meta_files {
        let meta = read_index_set_meta(meta_file.file_path.to_str().unwrap_or_default())?;
        meta_by_identifier.insert(meta_file.identifier.clone(), meta);
    }

    let mut seen = std::collections::HashSet::new();
    let mut index_sets = Vec::new();

    for content_file in &content_files {
        let meta = meta_by_identifier
            .get(&content_file.identifier)
            .cloned()
            .unwrap_or_default();
        seen.insert(content_file.identifier.clone());
        index_sets.push(IndexSet {
            index_set: content_file.identifier.clone(),
            file_path: content_file.file_path.to_string_lossy().into_owned(),
            meta,
        });
    }

    for (identifier, meta) in &meta_by_identifier {
        if seen.contains(identifier) {
            continue;
        }
        index_sets.push(IndexSet {
            index_set: identifier.clone(),
            file_path: String::new(),
            meta: meta.clone(),
        });
    }

    index_sets.sort_by(|a, b| a.index_set.cmp(&b.index_set));
    Ok(index_sets)
}

fn get_pipelines(config: &Config, env_name: &str) -> Result<Vec<Pipeline>, Error> {
    let content_files = environment_resources(&config.pipelines.directory, env_name, "json")?;
    let mut pipelines: Vec<Pipeline> = content_files
        .into_iter()
        .map(|file| Pipeline {
            name: file.identifier,
            file_path: file.file_path.to_string_lossy().into_owned(),
        })
        .collect();
    pipelines.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(pipelines)
}

fn get_documents(config: &Config, env_name: &str) -> Result<Vec<Document>, Error> {
    let directory = &config.documents.directory;
    let content_files = environment_resources(directory, env_name, "json")?;
    let meta_files = environment_resources(directory, env_name, "meta.yml")?;

    let mut meta_by_identifier = HashMap::new();
    for meta_file in &meta_files {
        let meta = read_document_meta(meta_file.file_path.to_str().unwrap_or_default())?;
        meta_by_identifier.insert(meta_file.identifier.clone(), meta);
    }

    let mut documents = Vec::new();
    for content_file in &content_files {
        let last_dash = content_file
            .identifier
            .rfind('-')
            .filter(|&idx| idx > 0 && idx < content_file.identifier.len() - 1)
            .ok_or_else(|| Error::MalformedDocumentFilename(content_file.identifier.clone()))?;

        let meta = meta_by_identifier
            .get(&content_file.identifier)
            .cloned()
            .unwrap_or_default();

        documents.push(Document {
            index_set: content_file.identifier[..last_dash].to_string(),
            name: content_file.identifier[last_dash + 1..].to_string(),
            file_path: content_file.file_path.to_string_lossy().into_owned(),
            meta,
        });
    }

    documents.sort_by(|a, b| (&a.index_set, &a.name).cmp(&(&b.index_set, &b.name)));
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use esup_config::{
        ChangelogConfig, DocumentsConfig, IndexSetsConfig, PipelinesConfig, PreprocessConfig,
        PrototypeConfig, ServerConfig,
    };
    use tempfile::TempDir;

    use super::*;

    fn config_for(dir: &TempDir) -> Config {
        Config {
            server: ServerConfig {
                address: "http://localhost:9200".to_string(),
                api_key: String::new(),
            },
            prototype: PrototypeConfig::default(),
            changelog: ChangelogConfig {
                index: "esup-changelog0".to_string(),
                lock_index: "esup-lock0".to_string(),
            },
            index_sets: IndexSetsConfig {
                directory: dir.path().join("indexSets").to_string_lossy().into_owned(),
            },
            pipelines: PipelinesConfig {
                directory: dir.path().join("pipelines").to_string_lossy().into_owned(),
            },
            documents: DocumentsConfig {
                directory: dir.path().join("documents").to_string_lossy().into_owned(),
            },
            preprocess: PreprocessConfig {
                includes_directory: dir.path().join("includes").to_string_lossy().into_owned(),
            },
        }
    }

    #[test]
    fn schema_collects_and_sorts_all_resource_kinds() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("indexSets")).unwrap();
        fs::create_dir_all(dir.path().join("pipelines")).unwrap();
        fs::create_dir_all(dir.path().join("documents")).unwrap();

        fs::write(dir.path().join("indexSets/zeta-default.json"), "{}").unwrap();
        fs::write(dir.path().join("indexSets/alpha-default.json"), "{}").unwrap();
        fs::write(dir.path().join("pipelines/my-pipeline-default.json"), "{}").unwrap();
        fs::write(dir.path().join("documents/alpha-seed1-default.json"), "{}").unwrap();

        let config = config_for(&dir);
        let schema = get_schema(&config, "prod").unwrap();

        assert_eq!(
            schema.index_sets.iter().map(|s| &s.index_set).collect::<Vec<_>>(),
            vec!["alpha", "zeta"]
        );
        assert_eq!(schema.pipelines.len(), 1);
        assert_eq!(schema.documents.len(), 1);
        assert_eq!(schema.documents[0].index_set, "alpha");
        assert_eq!(schema.documents[0].name, "seed1");
    }

    #[test]
    fn index_set_declared_only_by_meta_file_still_appears() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("indexSets")).unwrap();
        fs::write(
            dir.path().join("indexSets/bare-default.meta.yml"),
            "prototype:\n  disabled: true\n",
        )
        .unwrap();

        let config = config_for(&dir);
        let schema = get_schema(&config, "prod").unwrap();

        assert_eq!(schema.index_sets.len(), 1);
        assert_eq!(schema.index_sets[0].index_set, "bare");
        assert_eq!(schema.index_sets[0].file_path, "");
        assert!(schema.index_sets[0].meta.prototype.disabled);
    }

    #[test]
    fn malformed_document_filename_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("documents")).unwrap();
        fs::write(dir.path().join("documents/nodash-default.json"), "{}").unwrap();

        let config = config_for(&dir);
        let result = get_documents(&config, "prod");
        assert!(matches!(result, Err(Error::MalformedDocumentFilename(_))));
    }
}
