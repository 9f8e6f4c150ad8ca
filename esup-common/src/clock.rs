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

use chrono::{DateTime, Utc};

/// Time as a capability, so the planner's version timestamp (and the
/// changelog's entry timestamp) are controllable under test instead of
/// reading the wall clock directly.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The `YYYYMMDDhhmmss` version suffix used to build a versioned index
    /// name, fixed once per plan.
    fn version(&self) -> String {
        self.now().format("%Y%m%d%H%M%S").to_string()
    }

    /// The timestamp recorded on changelog and lock documents.
    fn changelog_timestamp(&self) -> String {
        self.now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
