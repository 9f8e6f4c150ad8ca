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

use serde::Serialize;

use crate::error::Error;

/// Everything declared for one environment: its index sets, ingest
/// pipelines, and seed documents, each resolved against that environment's
/// specific or `default` declaration file.
#[derive(Debug, Clone)]
pub struct Schema {
    pub env_name: String,
    pub index_sets: Vec<IndexSet>,
    pub pipelines: Vec<Pipeline>,
    pub documents: Vec<Document>,
}

impl Schema {
    pub fn get_index_set(&self, name: &str) -> Result<&IndexSet, Error> {
        self.index_sets
            .iter()
            .find(|index_set| index_set.index_set == name)
            .ok_or_else(|| Error::NoSuchIndexSet(name.to_string()))
    }

    pub fn get_document(&self, identifier: &str) -> Result<&Document, Error> {
        self.documents
            .iter()
            .find(|doc| doc.resource_identifier() == identifier)
            .ok_or_else(|| Error::NoSuchDocument(identifier.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub file_path: String,
}

impl Pipeline {
    pub fn resource_identifier(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
pub struct IndexSet {
    pub index_set: String,
    /// Empty when the index set is declared only by a meta file, with no
    /// content file for this environment.
    pub file_path: String,
    pub meta: IndexSetMeta,
}

impl IndexSet {
    pub fn resource_identifier(&self) -> &str {
        &self.index_set
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub index_set: String,
    pub name: String,
    pub file_path: String,
    pub meta: DocumentMeta,
}

impl Document {
    /// `{indexSet}/{name}` -- a slash, not a dash, so it can't collide with
    /// an index set identifier that happens to contain a dash.
    pub fn resource_identifier(&self) -> String {
        format!("{}/{}", self.index_set, self.name)
    }
}

/// These fields are marshalled to JSON verbatim for changelog diffing, so
/// field order and casing here are part of the wire contract, not just
/// internal bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSetMeta {
    #[serde(rename = "Index")]
    pub index: String,
    #[serde(rename = "Prototype")]
    pub prototype: IndexSetMetaPrototype,
    #[serde(rename = "Reindex")]
    pub reindex: IndexSetMetaReindex,
}

impl Default for IndexSetMeta {
    fn default() -> Self {
        Self {
            index: String::new(),
            prototype: IndexSetMetaPrototype {
                disabled: false,
                max_docs: -1,
            },
            reindex: IndexSetMetaReindex::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSetMetaPrototype {
    #[serde(rename = "Disabled")]
    pub disabled: bool,
    #[serde(rename = "MaxDocs")]
    pub max_docs: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexSetMetaReindex {
    #[serde(rename = "Pipeline")]
    pub pipeline: String,
}

/// A document's metadata. `ignored` suppresses indexing while the
/// reconciler still records the changelog entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentMeta {
    #[serde(rename = "Ignored")]
    pub ignored: bool,
}
