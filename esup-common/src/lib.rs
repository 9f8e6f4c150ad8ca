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

//! Small pieces shared by every `esup` crate: a `Clock` capability so the
//! planner's version timestamp is controllable under test, environment
//! variable plumbing, and test-only logging setup.

mod clock;
mod env;

pub use clock::{Clock, SystemClock};
pub use env::get_from_env;

/// Install a `tracing-subscriber` suitable for unit/integration tests:
/// `RUST_LOG` honoured, no timestamps (keeps test output diffable).
pub fn setup_logging_for_tests() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .without_time()
        .with_test_writer()
        .try_init();
}
