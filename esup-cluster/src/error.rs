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

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors surfaced by the cluster capability. `Absent` from the spec's
/// error kind table isn't a variant here: a 404 on an optional GET is
/// mapped to an empty/`None` result by the operation itself, not an error.
#[derive(Error, Debug)]
pub enum Error {
    /// Non-2xx response from the cluster, carrying status and body.
    #[error("cluster returned {0}")]
    Api(#[from] ApiError),
    /// Transport-level failure from the underlying HTTP client.
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
    /// JSON serialization/deserialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// The configured base address or api key couldn't be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A response that should have shaped data didn't (e.g. a reindex
    /// response with no `task` field).
    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl Error {
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Error::Client(err) => err.status(),
            Error::Api(err) => Some(err.status),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP status {}: {}", self.status, self.body)
    }
}

#[derive(Deserialize)]
pub(crate) struct ErrorResponsePayload {
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}
