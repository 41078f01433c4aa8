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

//! In-memory BMC transports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};

use baremetal_bmc::ipmi::{ChassisControl, LanChannel, LanConnector};
use baremetal_bmc::redfish::{Connector, RedfishClient, Response};
use baremetal_bmc::websession::protocol::{KCS_PATH, USERS_PATH};
use baremetal_bmc::websession::{WebApi, WebConnector, WebSession};
use baremetal_bmc::{Config, Error, ErrorKind, PowerState, Result, Transports};

static INIT: Once = Once::new();

pub const SYSTEM: &str = "/redfish/v1/Systems/1";
pub const URL: &str = "https://10.0.0.10";

pub fn set_up() {
    INIT.call_once(|| {
        env_logger::init();
    });
}

pub fn config() -> Config {
    Config::new(URL, "root", "calvin")
}

/// Request observed by a fake transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub body: Value,
}

fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                merge(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// Redfish service backed by a map of resources.
///
/// PATCH requests are merged into the resource. A reset request changes the
/// power state of the system unless `stuck` is set.
#[derive(Default)]
pub struct FakeRedfish {
    resources: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<Call>>,
    pub stuck: AtomicBool,
    pub reject_writes: AtomicBool,
}

impl FakeRedfish {
    pub fn new() -> Arc<FakeRedfish> {
        Arc::new(FakeRedfish::default())
    }

    /// Service with a single system.
    pub fn with_system(system: Value) -> Arc<FakeRedfish> {
        let fake = FakeRedfish::new();
        fake.insert(
            "/redfish/v1/Systems",
            json!({"Members": [{"@odata.id": SYSTEM}]}),
        );
        let mut body = json!({"@odata.id": SYSTEM});
        merge(&mut body, &system);
        fake.insert(SYSTEM, body);
        fake
    }

    pub fn insert(&self, path: &str, body: Value) {
        let _ = self
            .resources
            .lock()
            .unwrap()
            .insert(path.to_string(), body);
    }

    /// Insert a collection and its members.
    pub fn insert_collection(&self, path: &str, members: Vec<(String, Value)>) {
        let links = members
            .iter()
            .map(|(member, _)| json!({"@odata.id": member}))
            .collect::<Vec<_>>();
        self.insert(path, json!({ "Members": links }));
        for (member, body) in members {
            self.insert(&member, body);
        }
    }

    pub fn resource(&self, path: &str) -> Value {
        self.resources
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.method != "GET")
            .collect()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    pub fn set_power_state(&self, state: &str) {
        let mut resources = self.resources.lock().unwrap();
        if let Some(system) = resources.get_mut(SYSTEM) {
            system["PowerState"] = json!(state);
        }
    }

    fn record(&self, method: &'static str, path: &str, body: &Value) {
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            body: body.clone(),
        });
    }
}

#[async_trait]
impl RedfishClient for FakeRedfish {
    async fn get(&self, path: &str) -> Result<Response> {
        self.record("GET", path, &Value::Null);
        match self.resources.lock().unwrap().get(path) {
            Some(body) => Ok(Response::new(StatusCode::OK, body.clone())),
            None => Ok(Response::new(StatusCode::NOT_FOUND, Value::Null)),
        }
    }

    async fn patch(&self, path: &str, body: &Value) -> Result<Response> {
        self.record("PATCH", path, body);
        if self.reject_writes.load(Ordering::SeqCst) {
            return Ok(Response::new(StatusCode::BAD_REQUEST, Value::Null));
        }
        let mut resources = self.resources.lock().unwrap();
        match resources.get_mut(path) {
            Some(resource) => {
                merge(resource, body);
                Ok(Response::new(StatusCode::OK, Value::Null))
            }
            None => Ok(Response::new(StatusCode::NOT_FOUND, Value::Null)),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Response> {
        self.record("POST", path, body);
        if self.reject_writes.load(Ordering::SeqCst) {
            return Ok(Response::new(StatusCode::BAD_REQUEST, Value::Null));
        }
        if path.ends_with("ComputerSystem.Reset") && !self.stuck.load(Ordering::SeqCst) {
            let state = match body["ResetType"].as_str() {
                Some("On") => "On",
                _ => "Off",
            };
            self.set_power_state(state);
        }
        Ok(Response::new(StatusCode::CREATED, Value::Null))
    }
}

pub struct FakeConnector(pub Arc<FakeRedfish>);

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _config: &Config) -> Result<Arc<dyn RedfishClient>> {
        Ok(self.0.clone())
    }
}

/// IPMI endpoint keeping the KCS policy mode and chassis power in memory.
///
/// Chassis commands change the power state unless `stuck` is set.
#[derive(Default)]
pub struct FakeLan {
    pub manufacturer: String,
    pub fail: bool,
    pub power_on: AtomicBool,
    pub stuck: AtomicBool,
    pub status_reads: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub kcs_mode: Mutex<u8>,
    pub raw_calls: Mutex<Vec<(u8, u8, Vec<u8>)>>,
    pub chassis: Mutex<Vec<ChassisControl>>,
}

impl FakeLan {
    pub fn new() -> Arc<FakeLan> {
        Arc::new(FakeLan::default())
    }

    pub fn with_manufacturer(manufacturer: &str) -> Arc<FakeLan> {
        Arc::new(FakeLan {
            manufacturer: manufacturer.to_string(),
            ..Default::default()
        })
    }

    pub fn powered(on: bool) -> Arc<FakeLan> {
        Arc::new(FakeLan {
            power_on: AtomicBool::new(on),
            ..Default::default()
        })
    }

    pub fn is_on(&self) -> bool {
        self.power_on.load(Ordering::SeqCst)
    }

    pub fn failing() -> Arc<FakeLan> {
        Arc::new(FakeLan {
            fail: true,
            ..Default::default()
        })
    }
}

struct FakeChannel {
    lan: Arc<FakeLan>,
}

#[async_trait]
impl LanChannel for FakeChannel {
    async fn raw(&self, netfn: u8, cmd: u8, data: &[u8]) -> Result<Vec<u8>> {
        self.lan
            .raw_calls
            .lock()
            .unwrap()
            .push((netfn, cmd, data.to_vec()));
        let mut mode = self.lan.kcs_mode.lock().unwrap();
        match (netfn, cmd) {
            (0x30, 0xb4) => {
                *mode = data.first().copied().unwrap_or_default();
                Ok(Vec::new())
            }
            (0x30, 0xb3) => Ok(vec![*mode]),
            _ => Err(Error::new(ErrorKind::NotSupported, "unknown raw command")),
        }
    }

    async fn fru_manufacturer(&self) -> Result<String> {
        Ok(self.lan.manufacturer.clone())
    }

    async fn chassis_power(&self, control: ChassisControl) -> Result<()> {
        self.lan.chassis.lock().unwrap().push(control);
        if !self.lan.stuck.load(Ordering::SeqCst) {
            self.lan
                .power_on
                .store(control == ChassisControl::PowerUp, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn chassis_status(&self) -> Result<PowerState> {
        let _ = self.lan.status_reads.fetch_add(1, Ordering::SeqCst);
        Ok(if self.lan.is_on() {
            PowerState::On
        } else {
            PowerState::Off
        })
    }

    fn close(&mut self) {
        let _ = self.lan.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeLanConnector(pub Arc<FakeLan>);

#[async_trait]
impl LanConnector for FakeLanConnector {
    async fn connect(&self, _config: &Config) -> Result<Box<dyn LanChannel>> {
        if self.0.fail {
            return Err(Error::new(ErrorKind::ConnectionFailed, "no route to host"));
        }
        let _ = self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeChannel {
            lan: self.0.clone(),
        }))
    }
}

/// AMI web API with user slots and a KCS policy.
pub struct FakeWeb {
    pub users: Mutex<Value>,
    pub kcs: Mutex<Value>,
    pub puts: Mutex<Vec<Call>>,
    pub logins: AtomicUsize,
    pub logouts: AtomicUsize,
}

impl FakeWeb {
    pub fn new(users: Value) -> Arc<FakeWeb> {
        Arc::new(FakeWeb {
            users: Mutex::new(users),
            kcs: Mutex::new(json!({"kcs_policy_mode": "deny_all"})),
            puts: Mutex::new(Vec::new()),
            logins: AtomicUsize::new(0),
            logouts: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl WebApi for FakeWeb {
    async fn login(&self) -> Result<WebSession> {
        let _ = self.logins.fetch_add(1, Ordering::SeqCst);
        Ok(WebSession {
            csrf_token: "csrf".into(),
            cookie: "QSESSIONID=42".into(),
        })
    }

    async fn logout(&self, _session: &WebSession) -> Result<()> {
        let _ = self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, _session: &WebSession, path: &str) -> Result<Value> {
        match path {
            USERS_PATH => Ok(self.users.lock().unwrap().clone()),
            KCS_PATH => Ok(self.kcs.lock().unwrap().clone()),
            _ => Err(Error::new(ErrorKind::ResourceNotFound, path.to_string())),
        }
    }

    async fn put(&self, _session: &WebSession, path: &str, body: &Value) -> Result<Value> {
        self.puts.lock().unwrap().push(Call {
            method: "PUT",
            path: path.to_string(),
            body: body.clone(),
        });
        if path == KCS_PATH {
            *self.kcs.lock().unwrap() = body.clone();
        }
        Ok(body.clone())
    }

    async fn post(&self, _session: &WebSession, path: &str, _body: &Value) -> Result<Value> {
        Err(Error::new(ErrorKind::NotSupported, path.to_string()))
    }
}

pub struct FakeWebConnector(pub Arc<FakeWeb>);

impl WebConnector for FakeWebConnector {
    fn open(&self, _config: &Config) -> Result<Arc<dyn WebApi>> {
        Ok(self.0.clone())
    }
}

pub fn transports(redfish: Arc<FakeRedfish>, lan: Arc<FakeLan>, web: Arc<FakeWeb>) -> Transports {
    Transports::new(
        Arc::new(FakeConnector(redfish)),
        Arc::new(FakeLanConnector(lan)),
        Arc::new(FakeWebConnector(web)),
    )
}

pub fn redfish_only(redfish: Arc<FakeRedfish>) -> Transports {
    transports(redfish, FakeLan::new(), FakeWeb::new(json!([])))
}
