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
    #[error("couldn't read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("couldn't parse {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("couldn't parse template {path}: {source}")]
    Template { path: String, source: String },
    #[error("can't specify both static index and prototype index configuration in {0}")]
    IndexAndPrototype(String),
    #[error("can't specify both static index and reindexing configuration in {0}")]
    IndexAndReindex(String),
    #[error("document filenames should look like {{indexSet}}-{{name}}-{{environment}}.json, got {0}")]
    MalformedDocumentFilename(String),
    #[error("no such index set {0:?}")]
    NoSuchIndexSet(String),
    #[error("no such document {0}")]
    NoSuchDocument(String),
}
