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

use crate::error::Error;

static BLOCK_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static INCLUDE_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{\{\{\s*include\s+"([^"]+)"\s*\}\}\}"#).unwrap());

/// Expands `{{{ include "name" }}}` calls and strips `/* ... */` block
/// comments from a resource file. The non-standard `{{{`/`}}}` delimiters
/// and the single `include` builtin are the only templating the format
/// supports -- there's no general expression language to evaluate, so this
/// is a small textual pass rather than a full template engine.
pub struct Preprocessor {
    includes_directory: String,
}

impl Preprocessor {
    pub fn new(includes_directory: impl Into<String>) -> Self {
        Self {
            includes_directory: includes_directory.into(),
        }
    }

    /// An empty `filename` preprocesses to an empty string -- the caller
    /// uses this to mean "no file for this resource at this environment".
    pub fn preprocess(&self, filename: &str) -> Result<String, Error> {
        if filename.is_empty() {
            return Ok(String::new());
        }

        let contents = std::fs::read_to_string(filename).map_err(|source| Error::Io {
            path: filename.to_string(),
            source,
        })?;

        let mut expand_error = None;
        let expanded = INCLUDE_CALL.replace_all(&contents, |captures: &regex::Captures| {
            let name = &captures[1];
            match self.read_include(name) {
                Ok(text) => text,
                Err(error) => {
                    expand_error.get_or_insert(error);
                    String::new()
                }
            }
        });
        if let Some(error) = expand_error {
            return Err(error);
        }

        Ok(BLOCK_COMMENT.replace_all(&expanded, "").into_owned())
    }

    fn read_include(&self, name: &str) -> Result<String, Error> {
        let path = format!("{}/{}.json", self.includes_directory, name);
        std::fs::read_to_string(&path).map_err(|source| Error::Io { path, source })
    }
}
