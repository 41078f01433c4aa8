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

//! Web API client on top of reqwest.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::SET_COOKIE;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;

use super::super::config::Config;
use super::super::redfish::http::base_url;
use super::super::{Error, ErrorKind, Result};
use super::protocol::{LoginResponse, SESSION_PATH};
use super::{WebApi, WebConnector, WebSession};

const CSRF_HEADER: &str = "X-CSRFTOKEN";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client of an AMI-style web API.
#[derive(Clone)]
pub struct WebClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl fmt::Debug for WebClient {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WebClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish()
    }
}

/// Extract `name=value` from a `Set-Cookie` header.
pub(crate) fn session_cookie(header: &str) -> Option<&str> {
    let cookie = header.split(';').next()?.trim();
    if cookie.contains('=') {
        Some(cookie)
    } else {
        None
    }
}

impl WebClient {
    /// Create a client.
    pub fn new(config: &Config, timeout: Duration) -> Result<WebClient> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()?;
        Ok(WebClient {
            client,
            base_url: base_url(&config.url),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn request(&self, method: Method, session: &WebSession, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(CSRF_HEADER, &session.csrf_token)
            .header(reqwest::header::COOKIE, &session.cookie)
    }

    async fn send(&self, request: RequestBuilder, what: String) -> Result<Value> {
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::from_status(status, what));
        }
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            Ok(Value::Null)
        } else {
            Ok(serde_json::from_slice(&bytes)?)
        }
    }
}

#[async_trait]
impl WebApi for WebClient {
    async fn login(&self) -> Result<WebSession> {
        debug!("Logging into the web API at {}", self.base_url);
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, SESSION_PATH))
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::from_status(status, "web API login failed"));
        }

        let cookie = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(session_cookie)
            .map(String::from)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidResponse,
                    "web API login returned no session cookie",
                )
            })?;
        let body: LoginResponse = resp.json().await?;
        Ok(WebSession {
            csrf_token: body.csrf_token,
            cookie,
        })
    }

    async fn logout(&self, session: &WebSession) -> Result<()> {
        let request = self.request(Method::DELETE, session, SESSION_PATH);
        let _ = self.send(request, "web API logout failed".into()).await?;
        debug!("Logged out of the web API at {}", self.base_url);
        Ok(())
    }

    async fn get(&self, session: &WebSession, path: &str) -> Result<Value> {
        let request = self.request(Method::GET, session, path);
        self.send(request, format!("GET {} failed", path)).await
    }

    async fn put(&self, session: &WebSession, path: &str, body: &Value) -> Result<Value> {
        let request = self.request(Method::PUT, session, path).json(body);
        self.send(request, format!("PUT {} failed", path)).await
    }

    async fn post(&self, session: &WebSession, path: &str, body: &Value) -> Result<Value> {
        let request = self.request(Method::POST, session, path).json(body);
        self.send(request, format!("POST {} failed", path)).await
    }
}

/// Connector producing [WebClient](struct.WebClient.html) instances.
#[derive(Debug, Clone)]
pub struct WebClientConnector {
    timeout: Duration,
}

impl WebClientConnector {
    /// Create a connector with the given request timeout.
    pub fn new(timeout: Duration) -> WebClientConnector {
        WebClientConnector { timeout }
    }
}

impl Default for WebClientConnector {
    fn default() -> WebClientConnector {
        WebClientConnector::new(DEFAULT_TIMEOUT)
    }
}

impl WebConnector for WebClientConnector {
    fn open(&self, config: &Config) -> Result<Arc<dyn WebApi>> {
        Ok(Arc::new(WebClient::new(config, self.timeout)?))
    }
}
