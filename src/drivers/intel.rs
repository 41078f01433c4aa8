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

//! Intel reference platforms running OpenBMC.

use async_trait::async_trait;

use super::super::config::NtpServers;
use super::super::discovery::AcceleratorTally;
use super::super::ipmi::{KCS_POLICY_ALLOW_ALL, KCS_POLICY_DENY_ALL};
use super::super::redfish::protocol::{NetworkInterface, NetworkPort, PcieFunction};
use super::super::redfish;
use super::super::types::{GpuInfo, HardwareType, HostNic, MemoryMode};
use super::super::{Error, ErrorKind, Result, ResultExt};
use super::base::{parse_mac, BaseDriver};
use super::lan::LanControl;
use super::Driver;

/// PCIe vendor id of Mellanox ports as reported by OpenBMC.
pub(crate) const VENDOR_MELLANOX: &str = "15b3h";
/// PCIe vendor id of Intel ports as reported by OpenBMC.
pub(crate) const VENDOR_INTEL: &str = "8086h";

const NETWORK_PROTOCOL: &str = "/redfish/v1/Managers/bmc/NetworkProtocol";
const PROVISIONED_AND_LOCKED: &str = "ProvisionedAndLocked";

/// Constants of an Intel board family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntelFamily {
    /// Hardware type of the family.
    pub hardware_type: HardwareType,
    /// Board name.
    pub name: &'static str,
    /// Prefix of network boot entries in the boot order.
    pub boot_prefix: &'static str,
    /// Marker of boot entries of NICs in riser slots.
    pub riser_marker: &'static str,
    /// Marker of boot entries of NICs on the baseboard.
    pub baseboard_marker: &'static str,
    /// JSON pointer to the provisioning status inside the system `Oem` object.
    pub provisioning_pointer: &'static str,
    /// Whether NTP servers are pushed to the BMC.
    pub configures_ntp: bool,
}

const PROVISIONING_POINTER: &str = "/OpenBmc/FirmwareProvisioning/ProvisioningStatus";

/// Denali Pass (D50DNP).
pub const DENALI_PASS: IntelFamily = IntelFamily {
    hardware_type: HardwareType::DenaliPass,
    name: "DenaliPassBMC",
    boot_prefix: "UEFI PXEv4",
    riser_marker: "Riser",
    baseboard_marker: "Baseboard",
    provisioning_pointer: PROVISIONING_POINTER,
    configures_ntp: true,
};

/// Coyote Pass (M50CYP).
pub const COYOTE_PASS: IntelFamily = IntelFamily {
    hardware_type: HardwareType::CoyotePass,
    name: "CoyotePassBMC",
    boot_prefix: "UEFI PXEv4",
    riser_marker: "Riser",
    baseboard_marker: "Onboard",
    provisioning_pointer: PROVISIONING_POINTER,
    configures_ntp: false,
};

/// Gaudi 3 reference platform.
pub const GAUDI3_INTEL: IntelFamily = IntelFamily {
    hardware_type: HardwareType::Gaudi3Intel,
    name: "Gaudi3IntelBMC",
    boot_prefix: "UEFI PXEv4",
    riser_marker: "Riser",
    baseboard_marker: "OCP",
    provisioning_pointer: PROVISIONING_POINTER,
    configures_ntp: true,
};

impl IntelFamily {
    /// Family of a hardware type, if it is an Intel reference platform.
    pub fn from_hardware_type(hardware_type: HardwareType) -> Option<IntelFamily> {
        [DENALI_PASS, COYOTE_PASS, GAUDI3_INTEL]
            .iter()
            .find(|family| family.hardware_type == hardware_type)
            .copied()
    }

    /// Boot pattern of a port.
    ///
    /// Slot zero is the baseboard, everything else sits on a riser.
    pub fn boot_pattern(&self, port: &NetworkPort) -> String {
        let vendor = match port.vendor_id.as_str() {
            VENDOR_MELLANOX => "Mellanox",
            VENDOR_INTEL => "Intel",
            other => {
                warn!("Unknown network port vendor {}, assuming Intel", other);
                "Intel"
            }
        };
        let marker = if port.oem.open_bmc.slot_number > 0 {
            self.riser_marker
        } else {
            self.baseboard_marker
        };
        format!(
            "{}.*{}.*{}",
            regex::escape(self.boot_prefix),
            vendor,
            marker
        )
    }
}

fn is_eligible(port: &NetworkPort) -> bool {
    port.status.is_enabled_ok()
        && port.oem.open_bmc.media_state > 0
        && !port.associated_network_addresses.is_empty()
}

/// Pick the port to boot from: Mellanox first, otherwise the first eligible port.
pub(crate) fn select_port(ports: &[NetworkPort]) -> Option<&NetworkPort> {
    let mut eligible = ports.iter().filter(|port| is_eligible(port));
    let first = eligible.clone().next();
    eligible
        .find(|port| port.vendor_id == VENDOR_MELLANOX)
        .or(first)
}

/// Driver of Intel reference platforms.
#[derive(Debug)]
pub struct IntelDriver {
    base: BaseDriver,
    family: IntelFamily,
    lan: LanControl,
}

impl IntelDriver {
    pub(crate) fn new(base: BaseDriver, family: IntelFamily, lan: LanControl) -> IntelDriver {
        IntelDriver { base, family, lan }
    }

    /// Board family constants.
    pub fn family(&self) -> &IntelFamily {
        &self.family
    }

    async fn network_ports(&self) -> Result<Vec<NetworkPort>> {
        let system = self.base.system().await?;
        let path = system
            .network_interfaces
            .map(|link| link.odata_id)
            .unwrap_or_else(|| format!("{}/NetworkInterfaces", system.odata_id));
        let interfaces: Vec<NetworkInterface> =
            redfish::fetch_members(self.base.redfish(), &path)
                .await
                .context("unable to list network interfaces")?;

        let mut ports = Vec::new();
        for interface in interfaces {
            if let Some(link) = interface.network_ports {
                let mut found: Vec<NetworkPort> =
                    redfish::fetch_members(self.base.redfish(), &link.odata_id)
                        .await
                        .context("unable to list network ports")?;
                ports.append(&mut found);
            }
        }
        trace!("Found {} network ports on {}", ports.len(), self.family.name);
        Ok(ports)
    }
}

#[async_trait]
impl Driver for IntelDriver {
    fn base(&self) -> &BaseDriver {
        &self.base
    }

    async fn get_host_mac_address(&self) -> Result<HostNic> {
        let ports = self.network_ports().await?;
        let port = select_port(&ports).ok_or_else(|| {
            Error::new(
                ErrorKind::ResourceNotFound,
                format!("no active network port on {}", self.family.name),
            )
        })?;
        let mac = port
            .associated_network_addresses
            .first()
            .map(String::as_str)
            .unwrap_or_default();
        let boot_pattern = self.family.boot_pattern(port);
        info!(
            "Using port {} of vendor {} in slot {} with boot pattern {:?}",
            mac, port.vendor_id, port.oem.open_bmc.slot_number, boot_pattern
        );
        Ok(HostNic {
            mac_address: parse_mac(mac)?,
            boot_pattern: Some(boot_pattern),
        })
    }

    async fn sanitize_boot_order(&self, pattern: &str) -> Result<()> {
        self.base.rewrite_boot_order(pattern).await
    }

    async fn configure_ntp(&self, servers: &NtpServers) -> Result<()> {
        if !self.family.configures_ntp {
            debug!("NTP is not configured on {}", self.family.name);
            return Ok(());
        }
        self.base.configure_openbmc_ntp(NETWORK_PROTOCOL, servers).await
    }

    async fn verify_firmware_resilience(&self) -> Result<()> {
        let system = self.base.system().await?;
        let status = system
            .oem
            .pointer(self.family.provisioning_pointer)
            .and_then(|value| value.as_str())
            .unwrap_or_default();
        if status != PROVISIONED_AND_LOCKED {
            return Err(Error::new(
                ErrorKind::OperationFailed,
                format!(
                    "platform firmware resilience of {} is {:?}, expected {}",
                    self.family.name, status, PROVISIONED_AND_LOCKED
                ),
            ));
        }
        info!("Platform firmware of {} is provisioned and locked", self.family.name);
        Ok(())
    }

    async fn gpu_discovery(&self) -> Result<GpuInfo> {
        let system = self.base.system().await?;
        let mut tally = AcceleratorTally::default();
        for device in &system.pcie_devices {
            let path = format!("{}/PCIeFunctions/0", device.odata_id);
            let function: PcieFunction = redfish::fetch(self.base.redfish(), &path)
                .await
                .context("unable to get PCIe function")?;
            let _ = tally.add(&function.vendor_id, &function.device_id);
        }
        let info = tally.finish();
        info!("Found {} accelerators {:?} on {}", info.count, info.model, self.family.name);
        Ok(info)
    }

    async fn hbm_discovery(&self) -> Result<MemoryMode> {
        self.base.memory_census().await
    }

    async fn enable_kcs(&self) -> Result<()> {
        self.lan.set_kcs(&self.base, KCS_POLICY_ALLOW_ALL).await
    }

    async fn disable_kcs(&self) -> Result<()> {
        self.lan.set_kcs(&self.base, KCS_POLICY_DENY_ALL).await
    }
}
