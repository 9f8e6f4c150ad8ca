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

mod cli;
mod env_name;
mod import;
mod logging;
mod migrate;

use cli::CliCommand;

#[tokio::main]
async fn main() {
    let matches = cli::build_cli().get_matches();
    let no_color = matches.get_flag("no-color");
    logging::setup_logging(no_color);

    let command = match CliCommand::parse_cli_args(matches) {
        Ok(command) => command,
        Err(error) => {
            eprintln!("Error: {error:#}");
            std::process::exit(1);
        }
    };

    if let Err(error) = command.execute().await {
        eprintln!("Error: {error:#}");
        std::process::exit(1);
    }
}
