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

use esup_cluster::{Cluster, Version};
use esup_common::Clock;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Cluster(#[from] esup_cluster::Error),
    #[error("couldn't get lock entry: doesn't exist")]
    MissingLockDocument,
    #[error("changelog is locked")]
    AlreadyLocked,
}

const LOCK_DOC_ID: &str = "LOCK";
const LOCK_CLIENT_ID: &str = "esup";

const LOCK_MAPPING: &str = r#"{
    "mappings": {
        "properties": {
            "client_id": {"type": "keyword"},
            "env_name": {"type": "keyword"},
            "status": {"type": "keyword"},
            "timestamp": {"type": "date"}
        }
    }
}"#;

/// Single-document optimistic-concurrency lock, used to serialize
/// `migrate` runs against the same changelog. Acquiring bootstraps the
/// lock index on first use, then flips the `LOCK` document from
/// `UNLOCKED` to `LOCKED` with a CAS write so two concurrent runs can't
/// both succeed.
pub struct Lock<'a> {
    cluster: &'a dyn Cluster,
    clock: &'a dyn Clock,
    index_name: String,
}

impl<'a> Lock<'a> {
    pub fn new(cluster: &'a dyn Cluster, clock: &'a dyn Clock, index_name: impl Into<String>) -> Self {
        Self {
            cluster,
            clock,
            index_name: index_name.into(),
        }
    }

    async fn ensure_index(&self) -> Result<(), Error> {
        if self.cluster.get_index_def(&self.index_name).await?.is_some() {
            return Ok(());
        }

        let mapping: Value = serde_json::from_str(LOCK_MAPPING).expect("valid literal");
        self.cluster.create_index(&self.index_name, &mapping).await?;
        self.cluster
            .index_document(
                &self.index_name,
                LOCK_DOC_ID,
                &json!({
                    "client_id": "",
                    "env_name": "",
                    "status": "UNLOCKED",
                    "timestamp": self.clock.changelog_timestamp(),
                }),
                None,
            )
            .await?;
        info!(index = %self.index_name, "bootstrapped lock index");
        Ok(())
    }

    /// Acquires the lock for `env_name`, failing with [`Error::AlreadyLocked`]
    /// if another run holds it.
    pub async fn acquire(&self, env_name: &str) -> Result<(), Error> {
        self.ensure_index().await?;

        let document = self
            .cluster
            .get_document(&self.index_name, LOCK_DOC_ID)
            .await?
            .ok_or(Error::MissingLockDocument)?;

        let status = document
            .source
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if status != "UNLOCKED" {
            return Err(Error::AlreadyLocked);
        }

        self.put(
            document.version,
            "LOCKED",
            LOCK_CLIENT_ID,
            env_name,
        )
        .await
    }

    /// Releases the lock unconditionally -- the caller is expected to call
    /// this on every exit path of a migration, success or failure.
    pub async fn release(&self, env_name: &str) -> Result<(), Error> {
        self.put_unversioned("UNLOCKED", LOCK_CLIENT_ID, env_name).await
    }

    async fn put(
        &self,
        version: Version,
        status: &str,
        client_id: &str,
        env_name: &str,
    ) -> Result<(), Error> {
        let body = json!({
            "client_id": client_id,
            "env_name": env_name,
            "status": status,
            "timestamp": self.clock.changelog_timestamp(),
        });
        self.cluster
            .index_document(&self.index_name, LOCK_DOC_ID, &body, Some(version))
            .await
            .map_err(|error| {
                if error.status_code() == Some(reqwest::StatusCode::CONFLICT) {
                    Error::AlreadyLocked
                } else {
                    Error::Cluster(error)
                }
            })?;
        Ok(())
    }

    async fn put_unversioned(&self, status: &str, client_id: &str, env_name: &str) -> Result<(), Error> {
        let body = json!({
            "client_id": client_id,
            "env_name": env_name,
            "status": status,
            "timestamp": self.clock.changelog_timestamp(),
        });
        self.cluster
            .index_document(&self.index_name, LOCK_DOC_ID, &body, None)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use esup_cluster::{Document, TaskStatus};

    use super::*;

    struct FixedClock;
    impl Clock for FixedClock {
        fn now(&self) -> chrono::DateTime<Utc> {
            Utc.with_ymd_and_hms(2001, 2, 3, 4, 5, 6).unwrap()
        }
    }

    #[derive(Default)]
    struct FakeCluster {
        indices: Mutex<HashMap<String, Value>>,
        documents: Mutex<HashMap<String, (Value, Version)>>,
    }

    #[async_trait]
    impl Cluster for FakeCluster {
        async fn get_index_def(&self, index: &str) -> Result<Option<Value>, esup_cluster::Error> {
            Ok(self.indices.lock().unwrap().get(index).cloned())
        }
        async fn create_index(&self, index: &str, mapping: &Value) -> Result<(), esup_cluster::Error> {
            self.indices.lock().unwrap().insert(index.to_string(), mapping.clone());
            Ok(())
        }
        async fn delete_index(&self, _index: &str) -> Result<(), esup_cluster::Error> {
            Ok(())
        }
        async fn get_indices_for_alias(&self, _alias: &str) -> Result<Option<Vec<String>>, esup_cluster::Error> {
            Ok(None)
        }
        async fn create_alias(&self, _alias: &str, _index: &str) -> Result<(), esup_cluster::Error> {
            Ok(())
        }
        async fn update_alias(&self, _alias: &str, _new_index: &str, _old_indices: &[String]) -> Result<(), esup_cluster::Error> {
            Ok(())
        }
        async fn get_pipeline_def(&self, _id: &str) -> Result<Option<Value>, esup_cluster::Error> {
            Ok(None)
        }
        async fn put_pipeline_def(&self, _id: &str, _definition: &Value) -> Result<(), esup_cluster::Error> {
            Ok(())
        }
        async fn delete_pipeline(&self, _id: &str) -> Result<(), esup_cluster::Error> {
            Ok(())
        }
        async fn reindex(&self, _from_index: &str, _to_index: &str, _max_docs: Option<u64>, _pipeline: Option<&str>) -> Result<String, esup_cluster::Error> {
            Ok("task:1".to_string())
        }
        async fn get_task_status(&self, _id: &str) -> Result<TaskStatus, esup_cluster::Error> {
            Ok(TaskStatus::default())
        }
        async fn index_document(&self, _index: &str, id: &str, body: &Value, version: Option<Version>) -> Result<(), esup_cluster::Error> {
            let mut documents = self.documents.lock().unwrap();
            if let Some(expected) = version {
                if let Some((_, current)) = documents.get(id) {
                    if current.seq_no != expected.seq_no || current.primary_term != expected.primary_term {
                        return Err(esup_cluster::Error::Api(make_conflict()));
                    }
                }
            }
            let next_version = documents
                .get(id)
                .map(|(_, v)| Version { seq_no: v.seq_no + 1, primary_term: v.primary_term })
                .unwrap_or(Version { seq_no: 0, primary_term: 1 });
            documents.insert(id.to_string(), (body.clone(), next_version));
            Ok(())
        }
        async fn get_document(&self, _index: &str, id: &str) -> Result<Option<Document>, esup_cluster::Error> {
            Ok(self.documents.lock().unwrap().get(id).map(|(source, version)| Document {
                id: id.to_string(),
                version: *version,
                source: source.clone(),
            }))
        }
        async fn search(&self, _index: &str, _query: &Value, _size: Option<u64>) -> Result<Vec<Document>, esup_cluster::Error> {
            Ok(Vec::new())
        }
        async fn refresh(&self, _index: &str) -> Result<(), esup_cluster::Error> {
            Ok(())
        }
    }

    fn make_conflict() -> esup_cluster::ApiError {
        esup_cluster::ApiError {
            status: reqwest::StatusCode::CONFLICT,
            body: "version conflict".to_string(),
        }
    }

    #[tokio::test]
    async fn acquire_bootstraps_index_and_locks() {
        let cluster = FakeCluster::default();
        let clock = FixedClock;
        let lock = Lock::new(&cluster, &clock, "esup-lock0");

        lock.acquire("prod").await.unwrap();

        let document = cluster.get_document("esup-lock0", "LOCK").await.unwrap().unwrap();
        assert_eq!(document.source.get("status").unwrap(), "LOCKED");
        assert_eq!(document.source.get("env_name").unwrap(), "prod");
    }

    #[tokio::test]
    async fn acquire_twice_fails_with_already_locked() {
        let cluster = FakeCluster::default();
        let clock = FixedClock;
        let lock = Lock::new(&cluster, &clock, "esup-lock0");

        lock.acquire("prod").await.unwrap();
        let result = lock.acquire("prod").await;
        assert!(matches!(result, Err(Error::AlreadyLocked)));
    }

    /// A CAS write that loses the race (someone else flipped the document
    /// between our read and our write) surfaces as `AlreadyLocked`, not a
    /// raw cluster error -- the spec requires version-conflict to read the
    /// same as an already-held lock.
    #[tokio::test]
    async fn version_conflict_on_cas_write_surfaces_as_already_locked() {
        let cluster = FakeCluster::default();
        let clock = FixedClock;
        let lock = Lock::new(&cluster, &clock, "esup-lock0");
        lock.ensure_index().await.unwrap();

        let document = cluster.get_document("esup-lock0", "LOCK").await.unwrap().unwrap();
        // Simulate another process having already locked (and thus bumped
        // the version) in between our read and our write.
        lock.put(document.version, "LOCKED", LOCK_CLIENT_ID, "other").await.unwrap();

        let result = lock.put(document.version, "LOCKED", LOCK_CLIENT_ID, "prod").await;
        assert!(matches!(result, Err(Error::AlreadyLocked)));
    }

    #[tokio::test]
    async fn release_after_acquire_unlocks() {
        let cluster = FakeCluster::default();
        let clock = FixedClock;
        let lock = Lock::new(&cluster, &clock, "esup-lock0");

        lock.acquire("prod").await.unwrap();
        lock.release("prod").await.unwrap();

        let document = cluster.get_document("esup-lock0", "LOCK").await.unwrap().unwrap();
        assert_eq!(document.source.get("status").unwrap(), "UNLOCKED");

        lock.acquire("prod").await.unwrap();
    }
}
