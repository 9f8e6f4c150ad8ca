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

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, Url};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::Error;
use crate::model::{Document, TaskStatus, Version};
use crate::transport::Transport;

/// The set of operations the rest of the tool needs from an
/// Elasticsearch-compatible cluster: index, alias, pipeline and document
/// management, plus the changelog/lock queries that sit on top of plain
/// document reads and writes.
///
/// Defined as a trait so the planner and orchestrator can be exercised
/// against an in-memory fake instead of a live cluster.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// The raw JSON mapping for `index`, or `None` if it doesn't exist.
    async fn get_index_def(&self, index: &str) -> Result<Option<Value>, Error>;

    async fn create_index(&self, index: &str, mapping: &Value) -> Result<(), Error>;

    async fn delete_index(&self, index: &str) -> Result<(), Error>;

    /// The concrete index names currently behind `alias`, or `None` if the
    /// alias doesn't exist.
    async fn get_indices_for_alias(&self, alias: &str) -> Result<Option<Vec<String>>, Error>;

    async fn create_alias(&self, alias: &str, index: &str) -> Result<(), Error>;

    /// Atomically repoints `alias` at `new_index`, removing it from every
    /// index in `old_indices` in the same request.
    async fn update_alias(
        &self,
        alias: &str,
        new_index: &str,
        old_indices: &[String],
    ) -> Result<(), Error>;

    async fn get_pipeline_def(&self, id: &str) -> Result<Option<Value>, Error>;

    async fn put_pipeline_def(&self, id: &str, definition: &Value) -> Result<(), Error>;

    async fn delete_pipeline(&self, id: &str) -> Result<(), Error>;

    /// Starts an asynchronous reindex from `from_index` to `to_index`,
    /// returning the task id to poll. `max_docs` of `None` reindexes
    /// everything.
    async fn reindex(
        &self,
        from_index: &str,
        to_index: &str,
        max_docs: Option<u64>,
        pipeline: Option<&str>,
    ) -> Result<String, Error>;

    async fn get_task_status(&self, id: &str) -> Result<TaskStatus, Error>;

    /// Indexes `body` at `id` in `index`. `version` enforces optimistic
    /// concurrency via `_seq_no`/`_primary_term` when present.
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
        version: Option<Version>,
    ) -> Result<(), Error>;

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Document>, Error>;

    async fn search(
        &self,
        index: &str,
        query: &Value,
        size: Option<u64>,
    ) -> Result<Vec<Document>, Error>;

    async fn refresh(&self, index: &str) -> Result<(), Error>;
}

/// [`Cluster`] implementation backed by a real Elasticsearch-compatible
/// HTTP endpoint.
pub struct EsClient {
    transport: Transport,
}

impl EsClient {
    pub fn new(address: &str, api_key: Option<&str>) -> Result<Self, Error> {
        let base_url = Url::parse(address)
            .map_err(|error| Error::Config(format!("invalid server address: {error}")))?;
        let encoded_api_key = api_key.map(Self::encode_api_key).transpose()?;
        let transport = Transport::new(base_url, encoded_api_key.as_deref())?;
        Ok(Self { transport })
    }

    /// The configured API key is a JSON object `{"id": ..., "api_key": ...}`;
    /// the wire credential is `base64("<id>:<api_key>")`.
    fn encode_api_key(api_key: &str) -> Result<String, Error> {
        let parsed: Value = serde_json::from_str(api_key)
            .map_err(|_| Error::Config(format!("illegal API key: expected JSON API key, not {api_key}")))?;
        let id = parsed.get("id").and_then(Value::as_str).unwrap_or_default();
        let key = parsed
            .get("api_key")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(base64::encode(format!("{id}:{key}")))
    }

    fn body_bytes(value: &Value) -> Result<Bytes, Error> {
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }
}

#[async_trait]
impl Cluster for EsClient {
    async fn get_index_def(&self, index: &str) -> Result<Option<Value>, Error> {
        let response = self
            .transport
            .send::<()>(Method::GET, index, None, None)
            .await?;
        if response.is_not_found() {
            return Ok(None);
        }
        Ok(Some(response.deserialize()?))
    }

    async fn create_index(&self, index: &str, mapping: &Value) -> Result<(), Error> {
        let body = Self::body_bytes(mapping)?;
        let response = self
            .transport
            .send::<()>(Method::PUT, index, None, Some(body))
            .await?;
        response.check()?;
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), Error> {
        let response = self
            .transport
            .send::<()>(Method::DELETE, index, None, None)
            .await?;
        response.check()?;
        Ok(())
    }

    async fn get_indices_for_alias(&self, alias: &str) -> Result<Option<Vec<String>>, Error> {
        let path = format!("_alias/{alias}");
        let response = self
            .transport
            .send::<()>(Method::GET, &path, None, None)
            .await?;
        if response.is_not_found() {
            return Ok(None);
        }
        let body: Value = response.deserialize()?;
        let indices = body
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        Ok(Some(indices))
    }

    async fn create_alias(&self, alias: &str, index: &str) -> Result<(), Error> {
        let path = format!("{index}/_alias/{alias}");
        let response = self
            .transport
            .send::<()>(Method::PUT, &path, None, None)
            .await?;
        response.check()?;
        Ok(())
    }

    async fn update_alias(
        &self,
        alias: &str,
        new_index: &str,
        old_indices: &[String],
    ) -> Result<(), Error> {
        let mut actions: Vec<Value> = old_indices
            .iter()
            .map(|old| json!({"remove": {"index": old, "alias": alias}}))
            .collect();
        actions.push(json!({"add": {"index": new_index, "alias": alias}}));
        let body = Self::body_bytes(&json!({"actions": actions}))?;
        let response = self
            .transport
            .send::<()>(Method::POST, "_aliases", None, Some(body))
            .await?;
        response.check()?;
        Ok(())
    }

    async fn get_pipeline_def(&self, id: &str) -> Result<Option<Value>, Error> {
        let path = format!("_ingest/pipeline/{id}");
        let response = self
            .transport
            .send::<()>(Method::GET, &path, None, None)
            .await?;
        if response.is_not_found() {
            return Ok(None);
        }
        let body: Value = response.deserialize()?;
        let map = body.as_object().ok_or_else(|| {
            Error::Protocol(format!("expected a single-key pipeline response, got {body}"))
        })?;
        if map.len() != 1 {
            return Err(Error::Protocol(format!(
                "expected only 1 key, got {} in pipeline response",
                map.len()
            )));
        }
        Ok(map.values().next().cloned())
    }

    async fn put_pipeline_def(&self, id: &str, definition: &Value) -> Result<(), Error> {
        let path = format!("_ingest/pipeline/{id}");
        let body = Self::body_bytes(definition)?;
        let response = self
            .transport
            .send::<()>(Method::PUT, &path, None, Some(body))
            .await?;
        response.check()?;
        Ok(())
    }

    async fn delete_pipeline(&self, id: &str) -> Result<(), Error> {
        let path = format!("_ingest/pipeline/{id}");
        let response = self
            .transport
            .send::<()>(Method::DELETE, &path, None, None)
            .await?;
        response.check()?;
        Ok(())
    }

    async fn reindex(
        &self,
        from_index: &str,
        to_index: &str,
        max_docs: Option<u64>,
        pipeline: Option<&str>,
    ) -> Result<String, Error> {
        let mut dest = json!({"index": to_index});
        if let Some(pipeline) = pipeline {
            dest["pipeline"] = json!(pipeline);
        }
        let mut body = json!({
            "source": {"index": from_index},
            "dest": dest,
        });
        if let Some(max_docs) = max_docs {
            body["max_docs"] = json!(max_docs);
        }
        let body = Self::body_bytes(&body)?;
        let response = self
            .transport
            .send(
                Method::POST,
                "_reindex",
                Some(&[("wait_for_completion", "false")]),
                Some(body),
            )
            .await?;
        let body: Value = response.deserialize()?;
        body.get("task")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Protocol(format!("couldn't get task id from reindex response {body}")))
    }

    async fn get_task_status(&self, id: &str) -> Result<TaskStatus, Error> {
        let path = format!("_tasks/{id}");
        let response = self
            .transport
            .send::<()>(Method::GET, &path, None, None)
            .await?;
        let body: Value = response.deserialize()?;
        debug!(task_id = id, "polled reindex task status");
        Ok(TaskStatus::from_body(&body))
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: &Value,
        version: Option<Version>,
    ) -> Result<(), Error> {
        // An empty id means "let the engine assign one" (the changelog's
        // append-only writes), which is a POST to the type endpoint rather
        // than a PUT to an id that doesn't exist yet.
        let (method, path) = if id.is_empty() {
            (Method::POST, format!("{index}/_doc"))
        } else {
            (Method::PUT, format!("{index}/_doc/{id}"))
        };
        let query = version.map(|v| {
            [
                ("if_seq_no", v.seq_no.to_string()),
                ("if_primary_term", v.primary_term.to_string()),
            ]
        });
        let bytes = Self::body_bytes(body)?;
        let response = self.transport.send(method, &path, query.as_ref(), Some(bytes)).await?;
        response.check()?;
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Document>, Error> {
        let path = format!("{index}/_doc/{id}");
        let response = self
            .transport
            .send::<()>(Method::GET, &path, None, None)
            .await?;
        if response.is_not_found() {
            return Ok(None);
        }
        let body: Value = response.deserialize()?;
        Ok(Document::from_hit(&body))
    }

    async fn search(
        &self,
        index: &str,
        query: &Value,
        size: Option<u64>,
    ) -> Result<Vec<Document>, Error> {
        let path = format!("{index}/_search");
        let query_params = size.map(|size| [("size", size.to_string())]);
        let body = Self::body_bytes(query)?;
        let response = self
            .transport
            .send(Method::POST, &path, query_params.as_ref(), Some(body))
            .await?;
        let body: Value = response.deserialize()?;
        let hits = body
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(hits.iter().filter_map(Document::from_hit).collect())
    }

    async fn refresh(&self, index: &str) -> Result<(), Error> {
        let path = format!("{index}/_refresh");
        let response = self
            .transport
            .send::<()>(Method::POST, &path, None, None)
            .await?;
        response.check()?;
        Ok(())
    }
}
