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

//! Supermicro servers.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::sleep;

use super::super::discovery::AcceleratorTally;
use super::super::redfish;
use super::super::redfish::protocol::{FanMode, PcieFunction};
use super::super::types::{GpuInfo, HardwareType};
use super::super::utils::odata_leaf;
use super::super::{Error, ErrorKind, Result, ResultExt};
use super::base::BaseDriver;
use super::Driver;

const PCIE_DEVICES: &str = "/redfish/v1/Chassis/1/PCIeDevices";
const KCS_INTERFACE: &str = "/redfish/v1/Managers/1/Oem/Supermicro/KCSInterface";
const HOST_INTERFACES: &str = "/redfish/v1/Managers/1/HostInterfaces";
const FAN_MODE: &str = "/redfish/v1/Managers/1/Oem/Supermicro/FanMode";

const KCS_PRIVILEGE_ENABLED: &str = "Administrator";
const KCS_PRIVILEGE_DISABLED: &str = "Callback";
const FAN_MODE_FULL_SPEED: &str = "FullSpeed";
const FAN_MODE_SETTLE: Duration = Duration::from_secs(1);

/// Driver of Supermicro servers.
#[derive(Debug)]
pub struct SupermicroDriver {
    base: BaseDriver,
}

impl SupermicroDriver {
    pub(crate) fn new(base: BaseDriver) -> SupermicroDriver {
        SupermicroDriver { base }
    }

    async fn set_kcs_privilege(&self, privilege: &str) -> Result<()> {
        info!("Setting KCS privilege {} on {}", privilege, self.base.name());
        redfish::patch_checked(
            self.base.redfish(),
            KCS_INTERFACE,
            &json!({ "Privilege": privilege }),
        )
        .await
        .with_context(|| format!("failed to set KCS privilege to {}", privilege))
    }

    async fn set_host_interfaces(&self, enabled: bool) -> Result<()> {
        let interfaces = redfish::members(self.base.redfish(), HOST_INTERFACES)
            .await
            .context("unable to list host interfaces")?;
        for path in interfaces {
            debug!(
                "Setting InterfaceEnabled={} on host interface {}",
                enabled,
                odata_leaf(&path)
            );
            redfish::patch_checked(
                self.base.redfish(),
                &path,
                &json!({ "InterfaceEnabled": enabled }),
            )
            .await
            .context("failed to change the host interface")?;
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for SupermicroDriver {
    fn base(&self) -> &BaseDriver {
        &self.base
    }

    async fn gpu_discovery(&self) -> Result<GpuInfo> {
        match self.base.hardware_type() {
            HardwareType::Smc821GVTNRT => return Ok(GpuInfo::fixed(8, "HL-225")),
            HardwareType::Smc822GANGR3IN001 => return Ok(GpuInfo::fixed(8, "HL-325")),
            _ => {}
        }

        let mut tally = AcceleratorTally::default();
        let devices = redfish::members(self.base.redfish(), PCIE_DEVICES)
            .await
            .context("unable to list PCIe devices")?;
        for device in devices {
            let path = format!("{}/PCIeFunctions", device);
            let functions: Vec<PcieFunction> = redfish::fetch_members(self.base.redfish(), &path)
                .await
                .context("unable to list PCIe functions")?;
            for function in functions.iter().filter(|f| f.id.contains("GPU")) {
                let _ = tally.add(&function.vendor_id, &function.device_id);
            }
        }
        let info = tally.finish();
        info!("Found {} accelerators {:?} on {}", info.count, info.model, self.base.name());
        Ok(info)
    }

    async fn enable_kcs(&self) -> Result<()> {
        self.set_kcs_privilege(KCS_PRIVILEGE_ENABLED).await
    }

    async fn disable_kcs(&self) -> Result<()> {
        self.set_kcs_privilege(KCS_PRIVILEGE_DISABLED).await
    }

    async fn enable_hci(&self) -> Result<()> {
        self.set_host_interfaces(true).await
    }

    async fn disable_hci(&self) -> Result<()> {
        self.set_host_interfaces(false).await
    }

    async fn set_fan_speed(&self) -> Result<()> {
        if self.base.hardware_type() != HardwareType::Smc822GANGR3IN001 {
            debug!("Fan speed is left alone on {}", self.base.name());
            return Ok(());
        }

        info!("Setting fans to full speed on {}", self.base.name());
        redfish::patch_checked(
            self.base.redfish(),
            FAN_MODE,
            &json!({ "Mode": FAN_MODE_FULL_SPEED }),
        )
        .await
        .context("failed to set fan mode")?;
        sleep(FAN_MODE_SETTLE).await;

        let mode: FanMode = redfish::fetch(self.base.redfish(), FAN_MODE)
            .await
            .context("unable to read fan mode")?;
        if mode.mode != FAN_MODE_FULL_SPEED {
            return Err(Error::new(
                ErrorKind::OperationFailed,
                format!("fan mode is {:?}, expected {}", mode.mode, FAN_MODE_FULL_SPEED),
            ));
        }
        Ok(())
    }
}
