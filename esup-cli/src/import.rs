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

use anyhow::{bail, Context};
use clap::{arg, ArgMatches, Command};
use esup_changelog::{Changelog, ChangelogEntry};
use esup_cluster::EsClient;
use esup_common::SystemClock;
use esup_config::Config;
use esup_schema::{get_schema, Preprocessor};

use crate::env_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    IndexSet,
    Document,
}

impl ResourceType {
    fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "index_set" => Ok(Self::IndexSet),
            "document" => Ok(Self::Document),
            other => bail!("unknown resource type {other:?}, expected `index_set` or `document`"),
        }
    }
}

pub fn build_import_command() -> Command {
    Command::new("import")
        .about("Adopt an existing cluster resource into changelog control without reconciling it")
        .arg(arg!(<RESOURCE_TYPE> "`index_set` or `document`"))
        .arg(arg!(<RESOURCE_IDENTIFIER> "Resource identifier (index set name, or `{indexSet}/{name}` for a document)"))
        .arg(arg!(<ENV> "Deployment environment the resource belongs to"))
}

#[derive(Debug, PartialEq)]
pub struct ImportCliCommand {
    pub resource_type: ResourceType,
    pub resource_identifier: String,
    pub env_name: String,
}

impl ImportCliCommand {
    pub fn parse_cli_args(matches: &ArgMatches) -> anyhow::Result<Self> {
        let resource_type = ResourceType::parse(
            matches.get_one::<String>("RESOURCE_TYPE").context("missing RESOURCE_TYPE argument")?,
        )?;
        let resource_identifier = matches
            .get_one::<String>("RESOURCE_IDENTIFIER")
            .context("missing RESOURCE_IDENTIFIER argument")?
            .to_string();
        let env_name = matches
            .get_one::<String>("ENV")
            .context("missing ENV argument")?
            .to_string();
        env_name::validate(&env_name)?;

        Ok(Self {
            resource_type,
            resource_identifier,
            env_name,
        })
    }

    pub async fn execute(self) -> anyhow::Result<()> {
        let config = Config::load().context("couldn't load configuration")?;
        let schema = get_schema(&config, &self.env_name).context("couldn't read schema")?;
        let preprocessor = Preprocessor::new(config.preprocess.includes_directory.clone());

        let api_key = (!config.server.api_key.is_empty()).then_some(config.server.api_key.as_str());
        let cluster = EsClient::new(&config.server.address, api_key).context("couldn't build cluster client")?;
        let clock = SystemClock;
        let changelog = Changelog::new(&cluster, &clock, config.changelog.index.clone());

        match self.resource_type {
            ResourceType::IndexSet => {
                let index_set = schema
                    .get_index_set(&self.resource_identifier)
                    .context("couldn't import index set")?;
                let content = preprocessor
                    .preprocess(&index_set.file_path)
                    .context("couldn't preprocess index set content")?;
                let meta = serde_json::to_string(&index_set.meta).context("couldn't marshal index set meta")?;

                changelog
                    .put_changelog_entry(
                        "index_set",
                        index_set.resource_identifier(),
                        "",
                        &ChangelogEntry {
                            is_present: true,
                            content,
                            meta,
                        },
                        &self.env_name,
                    )
                    .await
                    .context("couldn't write changelog entry")?;
            }
            ResourceType::Document => {
                let document = schema
                    .get_document(&self.resource_identifier)
                    .context("couldn't import document")?;
                let content = preprocessor
                    .preprocess(&document.file_path)
                    .context("couldn't preprocess document content")?;

                changelog
                    .put_changelog_entry(
                        "document",
                        &document.resource_identifier(),
                        &document.name,
                        &ChangelogEntry {
                            is_present: true,
                            content,
                            meta: String::new(),
                        },
                        &self.env_name,
                    )
                    .await
                    .context("couldn't write changelog entry")?;
            }
        }

        println!(
            "Imported {:?} \"{}\" for environment \"{}\"",
            self.resource_type, self.resource_identifier, self.env_name
        );
        Ok(())
    }
}
