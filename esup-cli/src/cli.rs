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
use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::import::{build_import_command, ImportCliCommand};
use crate::migrate::{build_migrate_command, MigrateCliCommand};

pub fn build_cli() -> Command {
    Command::new("esup")
        .about("Declarative schema migration tool for an Elasticsearch-compatible cluster")
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable ANSI terminal codes in the logging output")
                .env("NO_COLOR")
                .value_parser(clap::builder::FalseyValueParser::new())
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .subcommand(build_migrate_command().display_order(1))
        .subcommand(build_import_command().display_order(2))
        .arg_required_else_help(true)
        .disable_help_subcommand(true)
        .subcommand_required(true)
}

#[derive(Debug, PartialEq)]
pub enum CliCommand {
    Migrate(MigrateCliCommand),
    Import(ImportCliCommand),
}

impl CliCommand {
    pub fn parse_cli_args(mut matches: ArgMatches) -> anyhow::Result<Self> {
        let (subcommand, submatches) = matches.remove_subcommand().context("failed to parse command")?;
        match subcommand.as_str() {
            "migrate" => MigrateCliCommand::parse_cli_args(&submatches).map(CliCommand::Migrate),
            "import" => ImportCliCommand::parse_cli_args(&submatches).map(CliCommand::Import),
            _ => bail!("unknown command `{subcommand}`"),
        }
    }

    pub async fn execute(self) -> anyhow::Result<()> {
        match self {
            CliCommand::Migrate(subcommand) => subcommand.execute().await,
            CliCommand::Import(subcommand) => subcommand.execute().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_migrate_with_approve_flag() {
        let matches = build_cli()
            .try_get_matches_from(["esup", "migrate", "prod", "--approve"])
            .unwrap();
        let command = CliCommand::parse_cli_args(matches).unwrap();
        assert!(matches!(
            command,
            CliCommand::Migrate(crate::migrate::MigrateCliCommand { ref env_name, approve: true })
                if env_name == "prod"
        ));
    }

    #[test]
    fn parses_migrate_without_approve_flag() {
        let matches = build_cli().try_get_matches_from(["esup", "migrate", "prod"]).unwrap();
        let command = CliCommand::parse_cli_args(matches).unwrap();
        assert!(matches!(
            command,
            CliCommand::Migrate(crate::migrate::MigrateCliCommand { approve: false, .. })
        ));
    }

    #[test]
    fn rejects_invalid_environment_name() {
        let matches = build_cli().try_get_matches_from(["esup", "migrate", "Not-Valid"]).unwrap();
        assert!(CliCommand::parse_cli_args(matches).is_err());
    }

    #[test]
    fn parses_import_of_a_document() {
        let matches = build_cli()
            .try_get_matches_from(["esup", "import", "document", "widgets/seed1", "prod"])
            .unwrap();
        let command = CliCommand::parse_cli_args(matches).unwrap();
        assert!(matches!(
            command,
            CliCommand::Import(crate::import::ImportCliCommand {
                resource_type: crate::import::ResourceType::Document,
                ref resource_identifier,
                ref env_name,
            }) if resource_identifier == "widgets/seed1" && env_name == "prod"
        ));
    }

    #[test]
    fn rejects_unknown_resource_type() {
        let matches = build_cli()
            .try_get_matches_from(["esup", "import", "bogus", "x", "prod"])
            .unwrap();
        assert!(CliCommand::parse_cli_args(matches).is_err());
    }

    #[test]
    fn requires_a_subcommand() {
        assert!(build_cli().try_get_matches_from(["esup"]).is_err());
    }
}
