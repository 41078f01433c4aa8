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

//! Vendor web API with cookie and CSRF token sessions.
//!
//! BMCs only allow a handful of concurrent web sessions, so every call goes through
//! [with_session](fn.with_session.html) which logs out regardless of the outcome.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use super::config::Config;
use super::{Result, ResultExt};

mod client;
pub mod protocol;

pub use self::client::{WebClient, WebClientConnector};

/// Authenticated web session.
#[derive(Clone, PartialEq, Eq)]
pub struct WebSession {
    /// Token sent in the `X-CSRFTOKEN` header.
    pub csrf_token: String,
    /// Session cookie, e.g. `QSESSIONID=...`.
    pub cookie: String,
}

impl fmt::Debug for WebSession {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("WebSession")
    }
}

/// Vendor web API.
#[async_trait]
pub trait WebApi: Send + Sync {
    /// Open a session.
    async fn login(&self) -> Result<WebSession>;

    /// Close a session.
    async fn logout(&self, session: &WebSession) -> Result<()>;

    /// Issue a GET request.
    async fn get(&self, session: &WebSession, path: &str) -> Result<Value>;

    /// Issue a PUT request.
    async fn put(&self, session: &WebSession, path: &str, body: &Value) -> Result<Value>;

    /// Issue a POST request.
    async fn post(&self, session: &WebSession, path: &str, body: &Value) -> Result<Value>;
}

/// Creates web API clients.
pub trait WebConnector: Send + Sync {
    /// Create a client for the BMC. No requests are made.
    fn open(&self, config: &Config) -> Result<Arc<dyn WebApi>>;
}

/// Run `f` inside a web session.
///
/// The session is closed on every path. A failed logout is logged and does not
/// override the result of `f`.
pub async fn with_session<T, F>(api: &dyn WebApi, f: F) -> Result<T>
where
    F: for<'a> FnOnce(&'a dyn WebApi, &'a WebSession) -> BoxFuture<'a, Result<T>>,
{
    let session = api
        .login()
        .await
        .context("unable to log into the web API")?;
    let result = f(api, &session).await;
    if let Err(err) = api.logout(&session).await {
        warn!("Failed to log out of the web API: {}", err);
    }
    result
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::{with_session, WebApi, WebSession};
    use crate::{Error, ErrorKind, Result};

    #[derive(Default)]
    struct Counting {
        logins: AtomicUsize,
        logouts: AtomicUsize,
    }

    #[async_trait]
    impl WebApi for Counting {
        async fn login(&self) -> Result<WebSession> {
            let _ = self.logins.fetch_add(1, Ordering::SeqCst);
            Ok(WebSession {
                csrf_token: "token".into(),
                cookie: "QSESSIONID=1".into(),
            })
        }

        async fn logout(&self, _session: &WebSession) -> Result<()> {
            let _ = self.logouts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn get(&self, _session: &WebSession, path: &str) -> Result<Value> {
            if path == "/missing" {
                Err(Error::new(ErrorKind::ResourceNotFound, "missing"))
            } else {
                Ok(json!({"path": path}))
            }
        }

        async fn put(&self, _session: &WebSession, _path: &str, body: &Value) -> Result<Value> {
            Ok(body.clone())
        }

        async fn post(&self, _session: &WebSession, _path: &str, body: &Value) -> Result<Value> {
            Ok(body.clone())
        }
    }

    #[tokio::test]
    async fn test_logout_on_success() {
        let api = Counting::default();
        let value = with_session(&api, |api, session| {
            Box::pin(async move { api.get(session, "/api/settings/users").await })
        })
        .await
        .unwrap();
        assert_eq!(value["path"], "/api/settings/users");
        assert_eq!(api.logins.load(Ordering::SeqCst), 1);
        assert_eq!(api.logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_logout_on_failure() {
        let api = Counting::default();
        let err = with_session(&api, |api, session| {
            Box::pin(async move { api.get(session, "/missing").await })
        })
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
        assert_eq!(api.logouts.load(Ordering::SeqCst), 1);
    }
}
