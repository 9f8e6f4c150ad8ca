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

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The optimistic-concurrency coordinates of a document, taken from
/// `_seq_no`/`_primary_term` on a get or search hit and replayed on a
/// subsequent index request to guard against a lost update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub seq_no: i64,
    pub primary_term: i64,
}

/// A document fetched by id or returned from a search hit. `None` stands in
/// for "no such document", the same sentinel the cluster uses for a 404 on
/// an optional get.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub version: Version,
    pub source: Value,
}

impl Document {
    pub(crate) fn from_hit(hit: &Value) -> Option<Self> {
        let id = hit.get("_id")?.as_str()?.to_string();
        let seq_no = hit.get("_seq_no").and_then(Value::as_i64).unwrap_or(0);
        let primary_term = hit.get("_primary_term").and_then(Value::as_i64).unwrap_or(0);
        let source = hit.get("_source").cloned().unwrap_or(Value::Null);
        Some(Self {
            id,
            version: Version {
                seq_no,
                primary_term,
            },
            source,
        })
    }
}

/// Progress of an asynchronous reindex task, polled until `is_completed`.
#[derive(Debug, Clone, Default)]
pub struct TaskStatus {
    pub is_completed: bool,
    pub done: i64,
    pub total: i64,
    pub failure: Option<TaskStatusFailure>,
}

#[derive(Debug, Clone)]
pub struct TaskStatusFailure {
    pub id: String,
    pub cause_type: String,
    pub cause_reason: String,
}

impl TaskStatus {
    pub(crate) fn from_body(body: &Value) -> Self {
        let is_completed = body
            .get("completed")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let (done, total) = match body.pointer("/task/status") {
            Some(status) => {
                let created = status.get("created").and_then(Value::as_i64).unwrap_or(0);
                let updated = status.get("updated").and_then(Value::as_i64).unwrap_or(0);
                let deleted = status.get("deleted").and_then(Value::as_i64).unwrap_or(0);
                let total = status.get("total").and_then(Value::as_i64).unwrap_or(0);
                (created + updated + deleted, total)
            }
            None => (0, 0),
        };

        let failure = body
            .pointer("/response/failures/0")
            .map(|failure| TaskStatusFailure {
                id: failure
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                cause_type: failure
                    .pointer("/cause/type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                cause_reason: failure
                    .pointer("/cause/reason")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });

        Self {
            is_completed,
            done,
            total,
            failure,
        }
    }
}
