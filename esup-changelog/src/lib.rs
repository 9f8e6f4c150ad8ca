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

use std::sync::atomic::{AtomicBool, Ordering};

use esup_cluster::Cluster;
use esup_common::Clock;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Cluster(#[from] esup_cluster::Error),
}

const CHANGELOG_MAPPING: &str = r#"{
    "mappings": {
        "properties": {
            "resource_type": {"type": "keyword"},
            "resource_identifier": {"type": "keyword"},
            "final_name": {"type": "keyword"},
            "env_name": {"type": "keyword"},
            "content": {"type": "text"},
            "meta": {"type": "text"},
            "timestamp": {"type": "date"}
        }
    }
}"#;

/// The most recent changelog entry for a resource, or its absence -- the
/// drift-detection baseline the planner diffs declared content against.
#[derive(Debug, Clone, Default)]
pub struct ChangelogEntry {
    pub is_present: bool,
    pub content: String,
    pub meta: String,
}

/// The append-only record of every change applied to a cluster, used as
/// the source of truth for drift detection. The backing index is created
/// lazily on first use; once it's known to exist, that fact is cached
/// in-process rather than re-checked on every call.
pub struct Changelog<'a> {
    cluster: &'a dyn Cluster,
    clock: &'a dyn Clock,
    index_name: String,
    index_exists: AtomicBool,
}

impl<'a> Changelog<'a> {
    pub fn new(cluster: &'a dyn Cluster, clock: &'a dyn Clock, index_name: impl Into<String>) -> Self {
        Self {
            cluster,
            clock,
            index_name: index_name.into(),
            index_exists: AtomicBool::new(false),
        }
    }

    async fn ensure_index(&self) -> Result<(), Error> {
        if self.index_exists.load(Ordering::Relaxed) {
            return Ok(());
        }
        if self.cluster.get_index_def(&self.index_name).await?.is_none() {
            let mapping: Value = serde_json::from_str(CHANGELOG_MAPPING).expect("valid literal");
            self.cluster.create_index(&self.index_name, &mapping).await?;
            info!(index = %self.index_name, "bootstrapped changelog index");
        }
        self.index_exists.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// The latest entry for `(resource_type, resource_identifier, env_name)`,
    /// bootstrapping the changelog index first if it doesn't exist yet.
    pub async fn get_current_changelog_entry(
        &self,
        resource_type: &str,
        resource_identifier: &str,
        env_name: &str,
    ) -> Result<ChangelogEntry, Error> {
        self.ensure_index().await?;

        let query = json!({
            "query": {
                "bool": {
                    "must": [
                        {"term": {"resource_type": resource_type}},
                        {"term": {"resource_identifier": resource_identifier}},
                        {"term": {"env_name": env_name}},
                    ]
                }
            },
            "sort": {"timestamp": {"order": "desc"}},
        });

        let hits = self.cluster.search(&self.index_name, &query, Some(1)).await?;

        let Some(hit) = hits.into_iter().next() else {
            return Ok(ChangelogEntry::default());
        };

        Ok(ChangelogEntry {
            is_present: true,
            content: hit
                .source
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            meta: hit
                .source
                .get("meta")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    /// Appends a new changelog entry. Entries are never updated in place --
    /// the index is append-only, so the document id is left to the cluster.
    pub async fn put_changelog_entry(
        &self,
        resource_type: &str,
        resource_identifier: &str,
        final_name: &str,
        entry: &ChangelogEntry,
        env_name: &str,
    ) -> Result<(), Error> {
        self.ensure_index().await?;

        let body = json!({
            "resource_type": resource_type,
            "resource_identifier": resource_identifier,
            "final_name": final_name,
            "content": entry.content,
            "meta": entry.meta,
            "env_name": env_name,
            "timestamp": self.clock.changelog_timestamp(),
        });

        self.cluster
            .index_document(&self.index_name, "", &body, None)
            .await?;
        Ok(())
    }

    /// Forces the changelog index to refresh so just-written entries are
    /// immediately visible to a subsequent search -- needed by tests, not
    /// by the planner itself.
    pub async fn refresh(&self) -> Result<(), Error> {
        self.cluster.refresh(&self.index_name).await?;
        Ok(())
    }
}
