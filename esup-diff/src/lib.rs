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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("couldn't parse JSON for diff: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reports whether `current` differs from `required`.
///
/// An empty string stands for "absent" on either side, so two empty
/// strings are never different, and an empty string against a non-empty
/// one always is. Otherwise both sides are parsed as JSON and compared
/// structurally, ignoring key order -- `serde_json::Value`'s `PartialEq`
/// for objects is already order-independent.
pub fn diff(required: &str, current: &str) -> Result<bool, Error> {
    if required.is_empty() || current.is_empty() {
        return Ok(required != current);
    }

    let required: serde_json::Value = serde_json::from_str(required)?;
    let current: serde_json::Value = serde_json::from_str(current)?;

    Ok(required != current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_absent_is_not_a_difference() {
        assert!(!diff("", "").unwrap());
    }

    #[test]
    fn absent_against_present_is_a_difference() {
        assert!(diff("", r#"{"a":1}"#).unwrap());
        assert!(diff(r#"{"a":1}"#, "").unwrap());
    }

    #[test]
    fn identical_json_is_not_a_difference() {
        assert!(!diff(r#"{"a":1,"b":2}"#, r#"{"a":1,"b":2}"#).unwrap());
    }

    #[test]
    fn key_order_is_ignored() {
        assert!(!diff(r#"{"a":1,"b":2}"#, r#"{"b":2,"a":1}"#).unwrap());
    }

    #[test]
    fn different_values_are_a_difference() {
        assert!(diff(r#"{"a":1}"#, r#"{"a":2}"#).unwrap());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(diff("not json", r#"{"a":1}"#).is_err());
    }
}
