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

use std::fmt::Debug;
use std::str::FromStr;

use tracing::{error, info};

/// Reads `key` from the environment, falling back to `default_value` if it
/// isn't set or doesn't parse. Logs which source won, the way the rest of
/// the stack likes to surface where a setting actually came from.
pub fn get_from_env<T: FromStr + Debug>(key: &str, default_value: T) -> T {
    if let Ok(value_str) = std::env::var(key) {
        if let Ok(value) = T::from_str(&value_str) {
            info!(value = ?value, "setting `{}` from environment", key);
            return value;
        }
        error!(value_str = %value_str, "failed to parse `{}` from environment", key);
    }
    info!(value = ?default_value, "setting `{}` from default", key);
    default_value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_when_unset() {
        let value: u16 = get_from_env("ESUP_TEST_DOES_NOT_EXIST_ENV_VAR", 7280);
        assert_eq!(value, 7280);
    }

    #[test]
    fn parses_from_env_when_set() {
        std::env::set_var("ESUP_TEST_GET_FROM_ENV", "42");
        let value: u16 = get_from_env("ESUP_TEST_GET_FROM_ENV", 0);
        assert_eq!(value, 42);
        std::env::remove_var("ESUP_TEST_GET_FROM_ENV");
    }
}
