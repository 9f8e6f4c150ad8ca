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

use esup_changelog::{Changelog, ChangelogEntry};
use esup_cluster::Cluster;
use esup_common::Clock;
use esup_config::Config;
use esup_schema::{DocumentMeta, IndexSetMeta, Preprocessor, Schema};
use thiserror::Error;

use crate::action::PlanAction;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Cluster(#[from] esup_cluster::Error),
    #[error(transparent)]
    Changelog(#[from] esup_changelog::Error),
    #[error(transparent)]
    Schema(#[from] esup_schema::Error),
    #[error("couldn't diff {0} with existing: {1}")]
    Diff(String, esup_diff::Error),
    #[error("couldn't marshal meta for {0} back to json for changelog: {1}")]
    Meta(String, serde_json::Error),
}

/// Computes the ordered list of actions needed to bring the cluster in
/// line with a declared `Schema`, for a fixed environment and a fixed
/// clock reading (so two calls against the same state produce the same
/// plan, including the same versioned index name).
pub struct Planner<'a> {
    cluster: &'a dyn Cluster,
    config: &'a Config,
    changelog: &'a Changelog<'a>,
    schema: &'a Schema,
    preprocessor: &'a Preprocessor,
    env_name: String,
    version: String,
}

impl<'a> Planner<'a> {
    pub fn new(
        cluster: &'a dyn Cluster,
        config: &'a Config,
        changelog: &'a Changelog<'a>,
        schema: &'a Schema,
        preprocessor: &'a Preprocessor,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            cluster,
            config,
            changelog,
            schema,
            preprocessor,
            env_name: schema.env_name.clone(),
            version: clock.version(),
        }
    }

    pub async fn plan(&self) -> Result<Vec<PlanAction>, Error> {
        let mut plan = Vec::new();
        self.append_pipeline_mutations(&mut plan).await?;
        self.append_index_set_mutations(&mut plan).await?;
        self.append_document_mutations(&mut plan).await?;
        Ok(plan)
    }

    async fn preprocess(&self, file_path: &str) -> Result<String, Error> {
        self.preprocessor.preprocess(file_path).map_err(|source| {
            tracing::error!(path = file_path, error = %source, "preprocess failed");
            Error::Schema(source)
        })
    }

    async fn append_pipeline_mutations(&self, plan: &mut Vec<PlanAction>) -> Result<(), Error> {
        for pipeline in &self.schema.pipelines {
            let new_def = self.preprocess(&pipeline.file_path).await?;
            let id = pipeline_id(&pipeline.name, &self.env_name);
            let existing_def = self
                .cluster
                .get_pipeline_def(&id)
                .await?
                .map(|value| value.to_string())
                .unwrap_or_default();

            let changed = if existing_def.is_empty() {
                true
            } else {
                esup_diff::diff(&new_def, &existing_def)
                    .map_err(|error| Error::Diff(pipeline.file_path.clone(), error))?
            };

            if !changed {
                continue;
            }

            plan.push(PlanAction::PutPipeline {
                id,
                definition: new_def,
            });
        }
        Ok(())
    }

    async fn append_index_set_mutations(&self, plan: &mut Vec<PlanAction>) -> Result<(), Error> {
        for index_set in &self.schema.index_sets {
            let alias_name = alias_name(&index_set.index_set, &self.env_name);
            let existing_indices = self.cluster.get_indices_for_alias(&alias_name).await?;

            let new_def = self.preprocess(&index_set.file_path).await?;
            let new_meta = canonical_index_set_meta_json(&index_set.meta)
                .map_err(|error| Error::Meta(index_set.index_set.clone(), error))?;

            let changelog_entry = self
                .changelog
                .get_current_changelog_entry("index_set", index_set.resource_identifier(), &self.env_name)
                .await?;

            let changed = changelog_diff(&new_def, &new_meta, &changelog_entry)
                .map_err(|error| Error::Diff(index_set.resource_identifier().to_string(), error))?;

            if !changed && !plan_changes_pipeline(plan, &index_set.meta.reindex.pipeline, &self.env_name) {
                continue;
            }

            let static_index = !index_set.meta.index.is_empty();
            let index_name = if static_index {
                index_set.meta.index.clone()
            } else {
                versioned_index_name(&index_set.index_set, &self.env_name, &self.version)
            };

            let pipe = pipeline_id(&index_set.meta.reindex.pipeline, &self.env_name);

            if !static_index {
                plan.push(PlanAction::CreateIndex {
                    name: index_name.clone(),
                    index_set: index_set.index_set.clone(),
                    definition: new_def.clone(),
                });
            }

            match &existing_indices {
                None => {
                    if !static_index {
                        let prototype_env = &self.config.prototype.environment;
                        if !prototype_env.is_empty()
                            && prototype_env != &self.env_name
                            && !index_set.meta.prototype.disabled
                        {
                            plan.push(PlanAction::Reindex {
                                from: alias_name(&index_set.index_set, prototype_env),
                                to: index_name.clone(),
                                max_docs: index_set.meta.prototype.max_docs,
                                pipeline: pipe.clone(),
                            });
                        }
                    }
                    plan.push(PlanAction::CreateAlias {
                        name: alias_name.clone(),
                        index: index_name.clone(),
                    });
                }
                Some(existing) => {
                    if !static_index {
                        plan.push(PlanAction::Reindex {
                            from: alias_name.clone(),
                            to: index_name.clone(),
                            max_docs: -1,
                            pipeline: pipe.clone(),
                        });
                    }
                    if !static_index || existing != &vec![index_name.clone()] {
                        plan.push(PlanAction::UpdateAlias {
                            name: alias_name.clone(),
                            new_index: index_name.clone(),
                            old_indices: existing.clone(),
                        });
                    }
                }
            }

            plan.push(PlanAction::WriteChangelogEntry {
                resource_type: "index_set".to_string(),
                resource_identifier: index_set.resource_identifier().to_string(),
                final_name: index_name,
                definition: new_def,
                meta: new_meta,
                env_name: self.env_name.clone(),
            });
        }
        Ok(())
    }

    async fn append_document_mutations(&self, plan: &mut Vec<PlanAction>) -> Result<(), Error> {
        for document in &self.schema.documents {
            let final_content = self.preprocess(&document.file_path).await?;
            let identifier = document.resource_identifier();

            let changelog_entry = self
                .changelog
                .get_current_changelog_entry("document", &identifier, &self.env_name)
                .await?;

            let changed = changelog_diff(&final_content, "", &changelog_entry)
                .map_err(|error| Error::Diff(identifier.clone(), error))?;

            if !changed {
                continue;
            }

            let index = alias_name(&document.index_set, &self.env_name);

            if !document.meta.ignored {
                plan.push(PlanAction::IndexDocument {
                    index,
                    id: document.name.clone(),
                    document: final_content.clone(),
                });
            }

            plan.push(PlanAction::WriteChangelogEntry {
                resource_type: "document".to_string(),
                resource_identifier: identifier,
                final_name: document.name.clone(),
                definition: final_content,
                meta: String::new(),
                env_name: self.env_name.clone(),
            });
        }
        Ok(())
    }
}

fn alias_name(index_set: &str, env_name: &str) -> String {
    format!("{env_name}-{index_set}")
}

fn versioned_index_name(index_set: &str, env_name: &str, version: &str) -> String {
    format!("{env_name}-{index_set}_{version}")
}

fn pipeline_id(name: &str, env_name: &str) -> String {
    if name.is_empty() {
        String::new()
    } else {
        format!("{env_name}-{name}")
    }
}

fn changelog_diff(new_def: &str, new_meta: &str, entry: &ChangelogEntry) -> Result<bool, esup_diff::Error> {
    if !entry.is_present {
        return Ok(true);
    }
    if esup_diff::diff(new_def, &entry.content)? {
        return Ok(true);
    }
    esup_diff::diff(new_meta, &entry.meta)
}

fn plan_changes_pipeline(plan: &[PlanAction], pipeline: &str, env_name: &str) -> bool {
    let id = pipeline_id(pipeline, env_name);
    if id.is_empty() {
        return false;
    }
    plan.iter()
        .any(|action| matches!(action, PlanAction::PutPipeline { id: put_id, .. } if put_id == &id))
}

fn canonical_index_set_meta_json(meta: &IndexSetMeta) -> Result<String, serde_json::Error> {
    serde_json::to_string(meta)
}
