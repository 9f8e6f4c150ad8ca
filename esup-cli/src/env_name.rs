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

use once_cell::sync::Lazy;
use regex::Regex;

static ENV_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9\-_.]*$").unwrap());

/// Validates an environment name against `^[a-z0-9][a-z0-9\-_.]*$` -- the
/// same string gets used as a prefix/suffix in every cluster resource name,
/// so anything the engine would choke on is rejected up front.
pub fn validate(env_name: &str) -> anyhow::Result<()> {
    if ENV_NAME.is_match(env_name) {
        Ok(())
    } else {
        anyhow::bail!("invalid environment name {env_name:?}: must match {}", ENV_NAME.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_alnum_with_separators() {
        assert!(validate("prod").is_ok());
        assert!(validate("dev-2").is_ok());
        assert!(validate("a.b_c").is_ok());
    }

    #[test]
    fn rejects_leading_separator_or_uppercase() {
        assert!(validate("-prod").is_err());
        assert!(validate("Prod").is_err());
        assert!(validate("").is_err());
    }
}
