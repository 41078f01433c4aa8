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

//! Redfish transport.
//!
//! Drivers talk to the BMC through the [RedfishClient](trait.RedfishClient.html) trait,
//! which only knows how to issue GET, PATCH and POST requests by path. Resource walks
//! are built on top of it with [fetch](fn.fetch.html) and [first_system](fn.first_system.html).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::config::Config;
use super::{Error, ErrorKind, Result, ResultExt};

pub(crate) mod http;
pub mod protocol;

pub use self::http::{HttpClient, HttpConnector};

/// Path of the systems collection.
pub const SYSTEMS: &str = "/redfish/v1/Systems";
/// Path of the account service.
pub const ACCOUNT_SERVICE: &str = "/redfish/v1/AccountService";
/// Path of the accounts collection.
pub const ACCOUNTS: &str = "/redfish/v1/AccountService/Accounts";

/// Status and body of a Redfish response.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status.
    pub status: StatusCode,
    /// JSON body, `Null` when the response had none.
    pub body: Value,
}

impl Response {
    /// Create a response.
    pub fn new(status: StatusCode, body: Value) -> Response {
        Response { status, body }
    }

    /// Fail unless the status is in the 2xx range.
    pub fn check<S: Into<String>>(self, message: S) -> Result<Response> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(Error::from_status(self.status, message))
        }
    }

    /// Parse the body.
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.body)?)
    }
}

/// Minimal Redfish client.
#[async_trait]
pub trait RedfishClient: Send + Sync {
    /// Issue a GET request.
    async fn get(&self, path: &str) -> Result<Response>;

    /// Issue a PATCH request with a JSON body.
    async fn patch(&self, path: &str, body: &Value) -> Result<Response>;

    /// Issue a POST request with a JSON body.
    async fn post(&self, path: &str, body: &Value) -> Result<Response>;
}

/// Opens Redfish clients.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a client for the BMC.
    async fn connect(&self, config: &Config) -> Result<Arc<dyn RedfishClient>>;
}

/// Fetch a resource and parse it.
pub async fn fetch<T: DeserializeOwned>(client: &dyn RedfishClient, path: &str) -> Result<T> {
    trace!("Fetching Redfish resource {}", path);
    let resp = client
        .get(path)
        .await?
        .check(format!("GET {} failed", path))?;
    resp.json().context(path)
}

/// Fetch a collection and return the paths of its members.
pub async fn members(client: &dyn RedfishClient, path: &str) -> Result<Vec<String>> {
    let coll: protocol::Collection = fetch(client, path).await?;
    Ok(coll.members.into_iter().map(|m| m.odata_id).collect())
}

/// Fetch every member of a collection.
pub async fn fetch_members<T: DeserializeOwned>(
    client: &dyn RedfishClient,
    path: &str,
) -> Result<Vec<T>> {
    let mut result = Vec::new();
    for member in members(client, path).await? {
        result.push(fetch(client, &member).await?);
    }
    Ok(result)
}

/// Fetch the first computer system.
pub async fn first_system(client: &dyn RedfishClient) -> Result<protocol::ComputerSystem> {
    let systems = members(client, SYSTEMS)
        .await
        .context("unable to get the computing system")?;
    let first = systems.first().ok_or_else(|| {
        Error::new(
            ErrorKind::ResourceNotFound,
            "no system found for BMC under Services",
        )
    })?;
    fetch(client, first).await
}

/// PATCH a resource and require success.
pub async fn patch_checked(client: &dyn RedfishClient, path: &str, body: &Value) -> Result<()> {
    debug!("Patching {}", path);
    let _ = client
        .patch(path, body)
        .await?
        .check(format!("PATCH {} failed", path))?;
    Ok(())
}

/// POST to a resource and require success.
pub async fn post_checked(client: &dyn RedfishClient, path: &str, body: &Value) -> Result<()> {
    let _ = client
        .post(path, body)
        .await?
        .check(format!("POST {} failed", path))?;
    Ok(())
}
