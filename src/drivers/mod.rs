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

//! Vendor drivers.
//!
//! Every driver composes a [BaseDriver](struct.BaseDriver.html) and overrides the
//! capabilities of the [Driver](trait.Driver.html) trait that differ on its hardware.
//! Use [connect](fn.connect.html) to detect the hardware and build a driver.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::config::NtpServers;
use super::redfish::RedfishClient;
use super::types::{CpuInfo, GpuInfo, HardwareType, HostNic, MemoryMode, PowerState};
use super::{Error, ErrorKind, Result};

mod base;
mod dell;
mod factory;
mod intel;
mod lan;
mod quanta;
mod supermicro;
mod virtual_bmc;
mod wiwynn;

pub use self::base::BaseDriver;
pub use self::dell::DellDriver;
pub use self::factory::{connect, detect_hardware, Transports};
pub use self::intel::{IntelDriver, IntelFamily};
pub use self::quanta::{QuantaLanDriver, QuantaWebDriver};
pub use self::supermicro::SupermicroDriver;
pub use self::virtual_bmc::VirtualDriver;
pub use self::wiwynn::WiwynnDriver;

/// Capabilities of a BMC.
///
/// Provided methods implement the behavior shared by most boards; vendor drivers
/// override what differs.
#[async_trait]
pub trait Driver: fmt::Debug + Send + Sync {
    /// Shared driver state.
    fn base(&self) -> &BaseDriver;

    /// Redfish client of the BMC.
    fn client(&self) -> Arc<dyn RedfishClient> {
        self.base().client()
    }

    /// Whether the BMC is emulated.
    fn is_virtual(&self) -> bool {
        self.base().is_virtual()
    }

    /// Whether the board is an Intel platform.
    fn is_intel_platform(&self) -> bool {
        self.base().is_intel_platform()
    }

    /// Detected hardware type.
    fn hardware_type(&self) -> HardwareType {
        self.base().hardware_type()
    }

    /// Change the password of an existing account.
    ///
    /// Fails with `ErrorKind::AccountNotFound` if there is no such user.
    async fn update_account(&self, username: &str, password: &str) -> Result<()> {
        self.base().update_account(username, password).await
    }

    /// Create an administrator account.
    async fn create_account(&self, username: &str, password: &str) -> Result<()> {
        self.base().create_account(username, password).await
    }

    /// CPU inventory of the host.
    async fn get_host_cpu(&self) -> Result<CpuInfo> {
        self.base().get_host_cpu().await
    }

    /// Address to reach the BMC, e.g. `redfish+https://10.0.0.1/redfish/v1/Systems/1`.
    async fn get_host_bmc_address(&self) -> Result<String> {
        self.base().get_host_bmc_address().await
    }

    /// Network interface of the host.
    ///
    /// The returned boot pattern should be passed to
    /// [sanitize_boot_order](#method.sanitize_boot_order).
    async fn get_host_mac_address(&self) -> Result<HostNic> {
        self.base().get_host_mac_address().await
    }

    /// Current power state of the host.
    async fn get_power_state(&self) -> Result<PowerState> {
        self.base().get_power_state().await
    }

    /// Power the host on and wait for it.
    async fn power_on(&self) -> Result<()> {
        self.base().power_on().await
    }

    /// Power the host off and wait for it.
    async fn power_off(&self) -> Result<()> {
        self.base().power_off().await
    }

    /// Move boot devices matching `pattern` to the front of the boot order.
    async fn sanitize_boot_order(&self, pattern: &str) -> Result<()> {
        trace!(
            "Boot order is not managed on {} (pattern {:?})",
            self.base().name(),
            pattern
        );
        Ok(())
    }

    /// Push NTP servers to the BMC.
    async fn configure_ntp(&self, servers: &NtpServers) -> Result<()> {
        info!(
            "Configuring NTP ({}, {}) is not supported on {}",
            servers.primary,
            servers.secondary,
            self.base().name()
        );
        Ok(())
    }

    /// Verify that the platform firmware is provisioned and locked.
    async fn verify_firmware_resilience(&self) -> Result<()> {
        info!(
            "Platform firmware resilience is not supported on {}",
            self.base().name()
        );
        Ok(())
    }

    /// Accelerators attached to the host.
    async fn gpu_discovery(&self) -> Result<GpuInfo> {
        Ok(GpuInfo::default())
    }

    /// Memory topology of the host.
    async fn hbm_discovery(&self) -> Result<MemoryMode> {
        Ok(MemoryMode::None)
    }

    /// Allow host commands through the KCS interface.
    async fn enable_kcs(&self) -> Result<()> {
        Err(self.base().kcs_not_supported("enable KCS"))
    }

    /// Deny host commands through the KCS interface.
    async fn disable_kcs(&self) -> Result<()> {
        Err(self.base().kcs_not_supported("disable KCS"))
    }

    /// Enable the host interface.
    async fn enable_hci(&self) -> Result<()> {
        Err(self.base().hci_not_supported("enable host interface"))
    }

    /// Disable the host interface.
    async fn disable_hci(&self) -> Result<()> {
        Err(self.base().hci_not_supported("disable host interface"))
    }

    /// Run fans at full speed.
    async fn set_fan_speed(&self) -> Result<()> {
        info!("Setting fan speed is not supported on {}", self.base().name());
        Ok(())
    }
}

impl BaseDriver {
    fn kcs_not_supported(&self, action: &str) -> Error {
        info!("{} is not supported on {}", action, self.name());
        Error::new(
            ErrorKind::KcsNotSupported,
            format!("{} on {}", action, self.name()),
        )
    }

    fn hci_not_supported(&self, action: &str) -> Error {
        info!("{} is not supported on {}", action, self.name());
        Error::new(
            ErrorKind::HostInterfaceNotSupported,
            format!("{} on {}", action, self.name()),
        )
    }
}
