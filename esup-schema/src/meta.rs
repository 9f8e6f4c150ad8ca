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

use serde::Deserialize;

use crate::error::Error;
use crate::model::{DocumentMeta, IndexSetMeta, IndexSetMetaPrototype, IndexSetMetaReindex};

#[derive(Debug, Default, Deserialize)]
struct RawIndexSetMeta {
    #[serde(default)]
    index: String,
    #[serde(default)]
    prototype: Option<RawPrototype>,
    #[serde(default)]
    reindex: Option<RawReindex>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPrototype {
    #[serde(rename = "maxDocs")]
    max_docs: Option<i64>,
    disabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawReindex {
    #[serde(default)]
    pipeline: String,
}

/// Parses an index set's `.meta.yml`, rejecting a static `index` combined
/// with a `prototype` or `reindex` block -- those are mutually exclusive
/// provisioning strategies.
pub(crate) fn read_index_set_meta(file_path: &str) -> Result<IndexSetMeta, Error> {
    let contents = std::fs::read_to_string(file_path).map_err(|source| Error::Io {
        path: file_path.to_string(),
        source,
    })?;
    let raw: RawIndexSetMeta = serde_yaml::from_str(&contents).map_err(|source| Error::Yaml {
        path: file_path.to_string(),
        source,
    })?;

    if !raw.index.is_empty() && raw.prototype.is_some() {
        return Err(Error::IndexAndPrototype(file_path.to_string()));
    }
    if !raw.index.is_empty() && raw.reindex.is_some() {
        return Err(Error::IndexAndReindex(file_path.to_string()));
    }

    let mut meta = IndexSetMeta {
        index: raw.index,
        ..IndexSetMeta::default()
    };

    if let Some(prototype) = raw.prototype {
        if let Some(max_docs) = prototype.max_docs {
            meta.prototype.max_docs = max_docs;
        }
        if let Some(disabled) = prototype.disabled {
            meta.prototype.disabled = disabled;
        }
    }

    if let Some(reindex) = raw.reindex {
        meta.reindex = IndexSetMetaReindex {
            pipeline: reindex.pipeline,
        };
    }

    Ok(meta)
}

#[derive(Debug, Default, Deserialize)]
struct RawDocumentMeta {
    #[serde(default)]
    ignored: bool,
}

pub(crate) fn read_document_meta(file_path: &str) -> Result<DocumentMeta, Error> {
    let contents = std::fs::read_to_string(file_path).map_err(|source| Error::Io {
        path: file_path.to_string(),
        source,
    })?;
    let raw: RawDocumentMeta = serde_yaml::from_str(&contents).map_err(|source| Error::Yaml {
        path: file_path.to_string(),
        source,
    })?;
    Ok(DocumentMeta {
        ignored: raw.ignored,
    })
}
