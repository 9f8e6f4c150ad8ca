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

use std::io::{self, Write};

use anyhow::{anyhow, Context};
use clap::{arg, ArgMatches, Command};
use esup_changelog::Changelog;
use esup_cluster::EsClient;
use esup_common::{Clock, SystemClock};
use esup_config::Config;
use esup_lock::Lock;
use esup_plan::{Collector, Planner};
use esup_schema::{get_schema, Preprocessor};

use crate::env_name;

pub fn build_migrate_command() -> Command {
    Command::new("migrate")
        .about("Reconcile a deployment environment's cluster state with its declared schema")
        .arg(arg!(<ENV> "Deployment environment to migrate"))
        .arg(arg!(-a --approve "Apply the plan without an interactive confirmation prompt"))
}

#[derive(Debug, PartialEq)]
pub struct MigrateCliCommand {
    pub env_name: String,
    pub approve: bool,
}

impl MigrateCliCommand {
    pub fn parse_cli_args(matches: &ArgMatches) -> anyhow::Result<Self> {
        let env_name = matches
            .get_one::<String>("ENV")
            .context("missing ENV argument")?
            .to_string();
        env_name::validate(&env_name)?;
        let approve = matches.get_flag("approve");
        Ok(Self { env_name, approve })
    }

    pub async fn execute(self) -> anyhow::Result<()> {
        let config = Config::load().context("couldn't load configuration")?;
        let schema = get_schema(&config, &self.env_name).context("couldn't read schema")?;
        let preprocessor = Preprocessor::new(config.preprocess.includes_directory.clone());

        let api_key = (!config.server.api_key.is_empty()).then_some(config.server.api_key.as_str());
        let cluster = EsClient::new(&config.server.address, api_key).context("couldn't build cluster client")?;
        let clock = SystemClock;

        let lock = Lock::new(&cluster, &clock, config.changelog.lock_index.clone());
        lock.acquire(&self.env_name)
            .await
            .map_err(|error| anyhow!("couldn't acquire migration lock for {}: {error}", self.env_name))?;

        let result = self.run_locked(&config, &cluster, &clock, &schema, &preprocessor).await;

        if let Err(release_error) = lock.release(&self.env_name).await {
            tracing::error!(error = %release_error, env = %self.env_name, "failed to release migration lock");
        }

        result
    }

    async fn run_locked(
        &self,
        config: &Config,
        cluster: &EsClient,
        clock: &dyn Clock,
        schema: &esup_schema::Schema,
        preprocessor: &Preprocessor,
    ) -> anyhow::Result<()> {
        let changelog = Changelog::new(cluster, clock, config.changelog.index.clone());
        let planner = Planner::new(cluster, config, &changelog, schema, preprocessor, clock);
        let plan = planner.plan().await.context("couldn't compute migration plan")?;

        println!("Plan for environment \"{}\" against {}:", self.env_name, config.server.address);
        if plan.is_empty() {
            println!("No changes");
            return Ok(());
        }
        for action in &plan {
            println!("  {}", action.describe());
        }

        if !self.approve && !confirm()? {
            println!("Cancelled");
            return Ok(());
        }

        let mut collector = Collector::new();
        for action in &plan {
            action
                .execute(cluster, &changelog, &mut collector)
                .await
                .map_err(|error| anyhow!("migration failed on `{}`: {error}", action.describe()))?;
        }

        Ok(())
    }
}

/// Reads one line from stdin and proceeds only if it is exactly `y`,
/// case-insensitively -- anything else, including an empty line or `yes`,
/// is treated as a decline.
fn confirm() -> anyhow::Result<bool> {
    print!("Confirm [Y/n]: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(accepts(&line))
}

fn accepts(line: &str) -> bool {
    line.trim_end_matches(['\r', '\n']).eq_ignore_ascii_case("y")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_y_with_newline() {
        assert!(accepts("y\n"));
    }

    #[test]
    fn accepts_uppercase_y() {
        assert!(accepts("Y\r\n"));
    }

    #[test]
    fn rejects_yes_and_empty_and_anything_else() {
        assert!(!accepts("yes\n"));
        assert!(!accepts("\n"));
        assert!(!accepts("n\n"));
    }
}
