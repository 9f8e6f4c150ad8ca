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

use std::time::Duration;

use esup_changelog::{Changelog, ChangelogEntry};
use esup_cluster::Cluster;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tokio::time::interval;
use tracing::debug;

use crate::collector::Collector;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Cluster(#[from] esup_cluster::Error),
    #[error(transparent)]
    Changelog(#[from] esup_changelog::Error),
    #[error("couldn't index document {index}/{id}: document to index wasn't valid json: {source}")]
    InvalidDocument {
        index: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    ReindexFailed(String),
}

/// One step of a migration: either a direct cluster mutation or a
/// changelog write. The plan is a flat, ordered list of these -- the
/// ordering itself (pipelines, then index sets, then documents, with
/// per-index-set sub-ordering) is the planner's responsibility, not this
/// type's.
#[derive(Debug, Clone)]
pub enum PlanAction {
    PutPipeline {
        id: String,
        definition: String,
    },
    CreateIndex {
        name: String,
        index_set: String,
        definition: String,
    },
    Reindex {
        from: String,
        to: String,
        max_docs: i64,
        pipeline: String,
    },
    CreateAlias {
        name: String,
        index: String,
    },
    UpdateAlias {
        name: String,
        new_index: String,
        old_indices: Vec<String>,
    },
    IndexDocument {
        index: String,
        id: String,
        document: String,
    },
    WriteChangelogEntry {
        resource_type: String,
        resource_identifier: String,
        final_name: String,
        definition: String,
        meta: String,
        env_name: String,
    },
}

impl PlanAction {
    /// A one-line human-readable rendering, printed in the plan preview and
    /// echoed on execution failure.
    pub fn describe(&self) -> String {
        match self {
            PlanAction::PutPipeline { id, .. } => format!("put pipeline {id}"),
            PlanAction::CreateIndex { name, .. } => format!("create index {name}"),
            PlanAction::Reindex {
                from,
                to,
                pipeline,
                max_docs,
            } => {
                let mut s = format!("reindex {from} -> {to}");
                if !pipeline.is_empty() {
                    s = format!("{s} via {pipeline}");
                }
                if *max_docs != -1 {
                    s = format!("{s} ({max_docs} max docs)");
                }
                s
            }
            PlanAction::CreateAlias { name, index } => format!("create alias {name} -> {index}"),
            PlanAction::UpdateAlias { name, new_index, .. } => {
                format!("update alias {name} -> {new_index}")
            }
            PlanAction::IndexDocument { index, id, .. } => format!("index document {index}/{id}"),
            PlanAction::WriteChangelogEntry {
                resource_type,
                env_name,
                resource_identifier,
                ..
            } => format!("write {resource_type} changelog entry for {env_name}:{resource_identifier}"),
        }
    }

    pub async fn execute(
        &self,
        cluster: &dyn Cluster,
        changelog: &Changelog<'_>,
        collector: &mut Collector,
    ) -> Result<(), Error> {
        match self {
            PlanAction::PutPipeline { id, definition } => {
                let definition = serde_json::from_str(definition).map_err(|source| Error::InvalidDocument {
                    index: String::new(),
                    id: id.clone(),
                    source,
                })?;
                cluster.put_pipeline_def(id, &definition).await?;
                collector.pipelines.push(id.clone());
                Ok(())
            }
            PlanAction::CreateIndex {
                name, definition, ..
            } => {
                let definition: serde_json::Value = if definition.is_empty() {
                    serde_json::json!({})
                } else {
                    serde_json::from_str(definition).map_err(|source| Error::InvalidDocument {
                        index: name.clone(),
                        id: String::new(),
                        source,
                    })?
                };
                cluster.create_index(name, &definition).await?;
                collector.indices.push(name.clone());
                Ok(())
            }
            PlanAction::CreateAlias { name, index } => {
                cluster.create_alias(name, index).await?;
                Ok(())
            }
            PlanAction::UpdateAlias {
                name,
                new_index,
                old_indices,
            } => {
                cluster.update_alias(name, new_index, old_indices).await?;
                Ok(())
            }
            PlanAction::IndexDocument { index, id, document } => {
                let body: serde_json::Map<String, serde_json::Value> =
                    serde_json::from_str(document).map_err(|source| Error::InvalidDocument {
                        index: index.clone(),
                        id: id.clone(),
                        source,
                    })?;
                cluster
                    .index_document(index, id, &serde_json::Value::Object(body), None)
                    .await?;
                Ok(())
            }
            PlanAction::WriteChangelogEntry {
                resource_type,
                resource_identifier,
                final_name,
                definition,
                meta,
                env_name,
            } => {
                changelog
                    .put_changelog_entry(
                        resource_type,
                        resource_identifier,
                        final_name,
                        &ChangelogEntry {
                            is_present: true,
                            content: definition.clone(),
                            meta: meta.clone(),
                        },
                        env_name,
                    )
                    .await?;
                Ok(())
            }
            PlanAction::Reindex {
                from,
                to,
                max_docs,
                pipeline,
            } => run_reindex(cluster, from, to, *max_docs, pipeline).await,
        }
    }
}

/// Starts an asynchronous reindex and polls its status once a second,
/// rendering progress on a bar sized to the task's reported total. The
/// poll loop and the wait for completion are the same task -- there's
/// nothing else for the caller to do meanwhile, so unlike the original
/// poller-plus-waiter split there's no separate background task or
/// channel handoff to coordinate, just a sequence of awaited ticks.
async fn run_reindex(
    cluster: &dyn Cluster,
    from: &str,
    to: &str,
    max_docs: i64,
    pipeline: &str,
) -> Result<(), Error> {
    let max_docs = if max_docs == -1 { None } else { Some(max_docs as u64) };
    let pipeline = if pipeline.is_empty() { None } else { Some(pipeline) };
    let task_id = cluster.reindex(from, to, max_docs, pipeline).await?;

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut ticker = interval(Duration::from_secs(1));
    let mut bar_started = false;
    let result = loop {
        ticker.tick().await;
        let status = match cluster.get_task_status(&task_id).await {
            Ok(status) => status,
            Err(error) => break Err(Error::Cluster(error)),
        };

        if !bar_started && status.total > 0 {
            progress.set_length(status.total as u64);
            bar_started = true;
        }
        progress.set_position(status.done.max(0) as u64);
        debug!(task_id, done = status.done, total = status.total, "reindex progress");

        if status.is_completed {
            break match status.failure {
                Some(failure) if !failure.cause_type.is_empty() => Err(Error::ReindexFailed(format!(
                    "{}: [{}] {}",
                    failure.id, failure.cause_type, failure.cause_reason
                ))),
                _ => Ok(()),
            };
        }
    };

    progress.finish_and_clear();
    result
}
