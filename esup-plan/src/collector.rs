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

/// Records the resource names side-effected during plan execution, so
/// integration tests can clean up the indices and pipelines a run created
/// without having to re-derive them from the plan itself.
#[derive(Debug, Default, Clone)]
pub struct Collector {
    pub indices: Vec<String>,
    pub pipelines: Vec<String>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }
}
