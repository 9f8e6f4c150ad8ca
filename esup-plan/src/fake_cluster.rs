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

#![cfg(test)]
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use esup_cluster::{Cluster, Document, Error, TaskStatus, Version};
use serde_json::Value;

/// An in-memory stand-in for a real cluster, used to exercise the planner
/// and action execution without an HTTP round-trip. Aliases, pipelines,
/// and documents are tracked well enough to reproduce the branches the
/// planner takes; reindex always completes instantly on the first status
/// poll.
#[derive(Default)]
pub(crate) struct FakeCluster {
    indices: Mutex<HashMap<String, Value>>,
    aliases: Mutex<HashMap<String, Vec<String>>>,
    pipelines: Mutex<HashMap<String, Value>>,
    documents: Mutex<HashMap<(String, String), (Value, Version)>>,
    next_auto_id: Mutex<u64>,
}

#[async_trait]
impl Cluster for FakeCluster {
    async fn get_index_def(&self, index: &str) -> Result<Option<Value>, Error> {
        Ok(self.indices.lock().unwrap().get(index).cloned())
    }

    async fn create_index(&self, index: &str, mapping: &Value) -> Result<(), Error> {
        self.indices.lock().unwrap().insert(index.to_string(), mapping.clone());
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), Error> {
        self.indices.lock().unwrap().remove(index);
        Ok(())
    }

    async fn get_indices_for_alias(&self, alias: &str) -> Result<Option<Vec<String>>, Error> {
        Ok(self.aliases.lock().unwrap().get(alias).cloned())
    }

    async fn create_alias(&self, alias: &str, index: &str) -> Result<(), Error> {
        self.aliases
            .lock()
            .unwrap()
            .insert(alias.to_string(), vec![index.to_string()]);
        Ok(())
    }

    async fn update_alias(&self, alias: &str, new_index: &str, _old_indices: &[String]) -> Result<(), Error> {
        self.aliases
            .lock()
            .unwrap()
            .insert(alias.to_string(), vec![new_index.to_string()]);
        Ok(())
    }

    async fn get_pipeline_def(&self, id: &str) -> Result<Option<Value>, Error> {
        Ok(self.pipelines.lock().unwrap().get(id).cloned())
    }

    async fn put_pipeline_def(&self, id: &str, definition: &Value) -> Result<(), Error> {
        self.pipelines.lock().unwrap().insert(id.to_string(), definition.clone());
        Ok(())
    }

    async fn delete_pipeline(&self, id: &str) -> Result<(), Error> {
        self.pipelines.lock().unwrap().remove(id);
        Ok(())
    }

    async fn reindex(
        &self,
        _from_index: &str,
        _to_index: &str,
        _max_docs: Option<u64>,
        _pipeline: Option<&str>,
    ) -> Result<String, Error> {
        Ok("task:fake".to_string())
    }

    async fn get_task_status(&self, _id: &str) -> Result<TaskStatus, Error> {
        Ok(TaskStatus {
            is_completed: true,
            done: 0,
            total: 0,
            failure: None,
        })
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
        version: Option<Version>,
    ) -> Result<(), Error> {
        let mut documents = self.documents.lock().unwrap();
        let id = if id.is_empty() {
            let mut next = self.next_auto_id.lock().unwrap();
            *next += 1;
            format!("auto-{next}")
        } else {
            id.to_string()
        };
        let key = (index.to_string(), id.clone());
        if let Some(expected) = version {
            if let Some((_, current)) = documents.get(&key) {
                if current.seq_no != expected.seq_no || current.primary_term != expected.primary_term {
                    return Err(Error::Api(esup_cluster::ApiError {
                        status: reqwest::StatusCode::CONFLICT,
                        body: "version conflict".to_string(),
                    }));
                }
            }
        }
        let next_version = documents
            .get(&key)
            .map(|(_, v)| Version {
                seq_no: v.seq_no + 1,
                primary_term: v.primary_term,
            })
            .unwrap_or(Version {
                seq_no: 0,
                primary_term: 1,
            });
        documents.insert(key, (body.clone(), next_version));
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Document>, Error> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .get(&(index.to_string(), id.to_string()))
            .map(|(source, version)| Document {
                id: id.to_string(),
                version: *version,
                source: source.clone(),
            }))
    }

    async fn search(&self, index: &str, query: &Value, size: Option<u64>) -> Result<Vec<Document>, Error> {
        let terms: Vec<(String, String)> = query
            .pointer("/query/bool/must")
            .and_then(Value::as_array)
            .map(|clauses| {
                clauses
                    .iter()
                    .filter_map(|clause| clause.get("term"))
                    .filter_map(|term| term.as_object())
                    .filter_map(|fields| {
                        let (field, value) = fields.iter().next()?;
                        Some((field.clone(), value.as_str()?.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let documents = self.documents.lock().unwrap();
        let mut matches: Vec<Document> = documents
            .iter()
            .filter(|((idx, _), _)| idx == index)
            .filter(|(_, (source, _))| {
                terms
                    .iter()
                    .all(|(field, expected)| source.get(field).and_then(Value::as_str) == Some(expected.as_str()))
            })
            .map(|((_, id), (source, version))| Document {
                id: id.clone(),
                version: *version,
                source: source.clone(),
            })
            .collect();
        matches.sort_by(|a, b| {
            let a_ts = a.source.get("timestamp").and_then(Value::as_str).unwrap_or_default();
            let b_ts = b.source.get("timestamp").and_then(Value::as_str).unwrap_or_default();
            b_ts.cmp(a_ts).then(b.version.seq_no.cmp(&a.version.seq_no))
        });
        if let Some(size) = size {
            matches.truncate(size as usize);
        }
        Ok(matches)
    }

    async fn refresh(&self, _index: &str) -> Result<(), Error> {
        Ok(())
    }
}

impl FakeCluster {
    /// Seeds an existing alias pointing at `index`, as if a prior run had
    /// already created it.
    pub(crate) fn seed_alias(&self, alias: &str, index: &str) {
        self.aliases
            .lock()
            .unwrap()
            .insert(alias.to_string(), vec![index.to_string()]);
    }

    pub(crate) fn seed_pipeline(&self, id: &str, definition: Value) {
        self.pipelines.lock().unwrap().insert(id.to_string(), definition);
    }
}
