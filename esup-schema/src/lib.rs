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

mod error;
mod loader;
mod meta;
mod model;
mod preprocess;
mod resource;

pub use error::Error;
pub use loader::get_schema;
pub use model::{
    Document, DocumentMeta, IndexSet, IndexSetMeta, IndexSetMetaPrototype, IndexSetMetaReindex,
    Pipeline, Schema,
};
pub use preprocess::Preprocessor;
