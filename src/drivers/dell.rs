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

//! Dell PowerEdge servers managed by iDRAC.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::sleep;

use super::super::discovery::summarize_cpus;
use super::super::redfish;
use super::super::redfish::protocol::{ManagerAttributes, Processor};
use super::super::types::{CpuInfo, GpuInfo, HardwareType};
use super::super::{Error, ErrorKind, Result, ResultExt};
use super::base::BaseDriver;
use super::Driver;

const ATTRIBUTES: &str = "/redfish/v1/Managers/iDRAC.Embedded.1/Attributes";
const HOST_INTERFACE_STATE: &str = "OS-BMC.1.AdminState";
const CPU_SOCKET_MARKER: &str = "CPU.Socket";
const RESERVED_ACCOUNT_ID: &str = "1";
const HOST_INTERFACE_SETTLE: Duration = Duration::from_secs(2);

/// Driver of Dell servers.
#[derive(Debug)]
pub struct DellDriver {
    base: BaseDriver,
}

impl DellDriver {
    pub(crate) fn new(base: BaseDriver) -> DellDriver {
        DellDriver { base }
    }

    async fn attributes(&self) -> Result<ManagerAttributes> {
        redfish::fetch(self.base.redfish(), ATTRIBUTES)
            .await
            .context("unable to read iDRAC attributes")
    }

    async fn set_host_interface(&self, state: &str) -> Result<()> {
        info!("Setting {} to {} on {}", HOST_INTERFACE_STATE, state, self.base.name());
        redfish::patch_checked(
            self.base.redfish(),
            ATTRIBUTES,
            &json!({ "Attributes": { HOST_INTERFACE_STATE: state } }),
        )
        .await
        .context("failed to change the host interface")?;
        sleep(HOST_INTERFACE_SETTLE).await;

        let attributes = self.attributes().await?;
        let actual = attributes
            .attributes
            .get(HOST_INTERFACE_STATE)
            .and_then(|value| value.as_str())
            .unwrap_or_default();
        if actual != state {
            return Err(Error::new(
                ErrorKind::OperationFailed,
                format!(
                    "{} is {:?} after the update, expected {}",
                    HOST_INTERFACE_STATE, actual, state
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for DellDriver {
    fn base(&self) -> &BaseDriver {
        &self.base
    }

    async fn get_host_cpu(&self) -> Result<CpuInfo> {
        let system = self.base.system().await?;
        let path = system
            .processors
            .map(|link| link.odata_id)
            .unwrap_or_else(|| format!("{}/Processors", system.odata_id));
        let members = redfish::members(self.base.redfish(), &path)
            .await
            .context("unable to list processors")?;

        let mut processors = Vec::new();
        for member in members.iter().filter(|m| m.contains(CPU_SOCKET_MARKER)) {
            let cpu: Processor = redfish::fetch(self.base.redfish(), member).await?;
            processors.push(cpu);
        }
        summarize_cpus(&processors)
    }

    async fn create_account(&self, username: &str, password: &str) -> Result<()> {
        let slot = self
            .base
            .accounts()
            .await?
            .into_iter()
            .find(|account| account.user_name.is_empty() && account.id != RESERVED_ACCOUNT_ID)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::ResourceNotFound,
                    format!("no free account slot on BMC {}", self.base.config().url),
                )
            })?;
        info!("Creating account {} in slot {} on {}", username, slot.id, self.base.name());

        redfish::patch_checked(
            self.base.redfish(),
            &slot.odata_id,
            &json!({
                "UserName": username,
                "Password": password,
                "RoleId": "Administrator",
                "Enabled": true,
            }),
        )
        .await
        .with_context(|| format!("failed to create account {:?}", username))?;

        let privilege = format!("Users.{}.IpmiLanPrivilege", slot.id);
        redfish::patch_checked(
            self.base.redfish(),
            ATTRIBUTES,
            &json!({ "Attributes": { privilege: "Administrator" } }),
        )
        .await
        .with_context(|| format!("failed to grant IPMI privilege to {:?}", username))
    }

    async fn gpu_discovery(&self) -> Result<GpuInfo> {
        Ok(match self.base.hardware_type() {
            HardwareType::Gaudi3Dell => GpuInfo::fixed(8, "HL-325"),
            HardwareType::Gaudi2Dell => GpuInfo::fixed(8, "HL-225"),
            _ => GpuInfo::default(),
        })
    }

    async fn enable_hci(&self) -> Result<()> {
        self.set_host_interface("Enabled").await
    }

    async fn disable_hci(&self) -> Result<()> {
        self.set_host_interface("Disabled").await
    }
}
