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

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use serde::Serialize;

use crate::error::Error;
use crate::response::ApiResponse;

pub static DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Thin HTTP layer over the cluster's REST surface: joins every request
/// path against a fixed base URL and attaches the `ApiKey` auth header
/// derived from an `id:api_key` pair, the way the original client encoded
/// its credentials once at construction time.
pub struct Transport {
    base_url: Url,
    client: Client,
    auth_header: Option<HeaderValue>,
}

impl Transport {
    /// `encoded_api_key` is already base64("id:api_key") -- see
    /// `EsClient::encode_api_key` for how the configured JSON key is turned
    /// into this form.
    pub fn new(base_url: Url, encoded_api_key: Option<&str>) -> Result<Self, Error> {
        let auth_header = match encoded_api_key {
            Some(key) => Some(Self::build_auth_header(key)?),
            None => None,
        };
        Ok(Self {
            base_url,
            client: Client::new(),
            auth_header,
        })
    }

    fn build_auth_header(encoded_api_key: &str) -> Result<HeaderValue, Error> {
        let mut value = HeaderValue::from_str(&format!("ApiKey {encoded_api_key}"))
            .map_err(|error| Error::Config(error.to_string()))?;
        value.set_sensitive(true);
        Ok(value)
    }

    pub async fn send<Q: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query_string: Option<&Q>,
        body: Option<Bytes>,
    ) -> Result<ApiResponse, Error> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|error| Error::Config(error.to_string()))?;
        let mut request_builder = self.client.request(method, url);
        request_builder = request_builder.timeout(Duration::from_secs(30));
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        if let Some(auth) = &self.auth_header {
            headers.insert(AUTHORIZATION, auth.clone());
        }
        request_builder = request_builder.headers(headers);
        if let Some(bytes) = body {
            request_builder = request_builder.body(bytes);
        }
        if let Some(qs) = query_string {
            request_builder = request_builder.query(qs);
        }
        let response = request_builder.send().await?;
        ApiResponse::new(response).await
    }
}
