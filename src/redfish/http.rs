// Copyright 2024 Bare Metal Enrollment Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Redfish client on top of reqwest.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;

use super::super::config::Config;
use super::super::{Result, ResultExt};
use super::{Connector, RedfishClient, Response};

const SERVICE_ROOT: &str = "/redfish/v1/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Base URL with a scheme and without a trailing slash.
pub(crate) fn base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Redfish client using HTTP basic authentication.
///
/// Certificates are not verified since BMCs ship with self-signed ones.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish()
    }
}

impl HttpClient {
    /// Create a client for the BMC.
    pub fn new(config: &Config, timeout: Duration) -> Result<HttpClient> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()?;
        Ok(HttpClient {
            client,
            base_url: base_url(&config.url),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        trace!("Sending {} {}", method, url);
        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password));
        if let Some(json) = body {
            request = request.json(json);
        }

        let resp = request.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            // Error pages are not always JSON.
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        trace!("Received {} from {}", status, url);
        Ok(Response::new(status, body))
    }
}

#[async_trait]
impl RedfishClient for HttpClient {
    async fn get(&self, path: &str) -> Result<Response> {
        self.send(Method::GET, path, None).await
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<Response> {
        self.send(Method::PATCH, path, Some(body)).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Response> {
        self.send(Method::POST, path, Some(body)).await
    }
}

/// Connector producing [HttpClient](struct.HttpClient.html) instances.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    /// Create a connector with the given request timeout.
    pub fn new(timeout: Duration) -> HttpConnector {
        HttpConnector { timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> HttpConnector {
        HttpConnector::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, config: &Config) -> Result<Arc<dyn RedfishClient>> {
        debug!("Connecting to Redfish at {}", config.url);
        let client = HttpClient::new(config, self.timeout)
            .context("failed to connect to BMC service")?;
        let _ = client
            .get(SERVICE_ROOT)
            .await
            .and_then(|resp| resp.check("service root is not available"))
            .context("failed to connect to BMC service")?;
        Ok(Arc::new(client))
    }
}
