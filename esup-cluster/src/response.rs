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

use bytes::Bytes;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, Error, ErrorResponsePayload};

/// A response whose body has already been buffered, so callers can inspect
/// the status code before deciding how (or whether) to parse the body --
/// notably, to treat a 404 on an optional resource as "absent" rather than
/// an error.
pub struct ApiResponse {
    status: StatusCode,
    body: Bytes,
}

impl ApiResponse {
    pub(crate) async fn new(response: reqwest::Response) -> Result<Self, Error> {
        let status = response.status();
        let body = response.bytes().await?;
        Ok(Self { status, body })
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }

    fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Fails with `Error::Api` on a non-2xx status, otherwise returns the
    /// raw body bytes.
    pub fn check(self) -> Result<Bytes, Error> {
        if !self.status.is_success() {
            let body = self.body_string();
            let message = serde_json::from_slice::<ErrorResponsePayload>(&self.body)
                .ok()
                .and_then(|payload| payload.error)
                .map(|error| error.to_string())
                .unwrap_or(body);
            return Err(Error::Api(ApiError {
                status: self.status,
                body: message,
            }));
        }
        Ok(self.body)
    }

    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, Error> {
        let body = self.check()?;
        Ok(serde_json::from_slice(&body)?)
    }
}
