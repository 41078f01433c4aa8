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

//! State and default behavior shared by all drivers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use macaddr::MacAddr6;
use serde_json::json;
use tokio::time::{sleep, Instant};

use super::super::config::{Config, NtpServers};
use super::super::discovery::{classify_memory, move_matching_to_front, summarize_cpus};
use super::super::redfish::protocol::{
    AccountService, ComputerSystem, EthernetInterface, LinkStatus, ManagerAccount, Memory,
    Processor,
};
use super::super::redfish::{self, RedfishClient};
use super::super::types::{CpuInfo, HardwareType, HostNic, MemoryMode, PowerState, ResetType};
use super::super::{Error, ErrorKind, Result, ResultExt};

/// Manufacturer string of Intel boards.
pub(crate) const INTEL_CORPORATION: &str = "Intel Corporation";

pub(crate) const POWER_POLL_DELAY: Duration = Duration::from_secs(2);
pub(crate) const POWER_WAIT_TIMEOUT: Duration = Duration::from_secs(4);

/// Connection, detected hardware and the Redfish client of a BMC.
pub struct BaseDriver {
    config: Config,
    client: Arc<dyn RedfishClient>,
    hardware_type: HardwareType,
    manufacturer: String,
    name: String,
}

impl fmt::Debug for BaseDriver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BaseDriver")
            .field("config", &self.config)
            .field("hardware_type", &self.hardware_type)
            .field("manufacturer", &self.manufacturer)
            .field("name", &self.name)
            .finish()
    }
}

impl BaseDriver {
    /// Create the shared state of a driver.
    pub fn new<M, N>(
        config: Config,
        client: Arc<dyn RedfishClient>,
        hardware_type: HardwareType,
        manufacturer: M,
        name: N,
    ) -> BaseDriver
    where
        M: Into<String>,
        N: Into<String>,
    {
        BaseDriver {
            config,
            client,
            hardware_type,
            manufacturer: manufacturer.into(),
            name: name.into(),
        }
    }

    /// Connection configuration.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Redfish client.
    #[inline]
    pub fn client(&self) -> Arc<dyn RedfishClient> {
        self.client.clone()
    }

    /// Borrow the Redfish client.
    #[inline]
    pub fn redfish(&self) -> &dyn RedfishClient {
        self.client.as_ref()
    }

    /// Detected hardware type.
    #[inline]
    pub fn hardware_type(&self) -> HardwareType {
        self.hardware_type
    }

    /// Manufacturer reported by the BMC.
    #[inline]
    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    /// Human-readable board name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the BMC is emulated.
    #[inline]
    pub fn is_virtual(&self) -> bool {
        self.hardware_type == HardwareType::Virtual
    }

    /// Whether the manufacturer is Intel.
    pub fn is_intel_platform(&self) -> bool {
        self.manufacturer == INTEL_CORPORATION
    }

    /// First computer system of the BMC.
    pub async fn system(&self) -> Result<ComputerSystem> {
        redfish::first_system(self.redfish()).await
    }

    /// All processors of the system.
    pub async fn processors(&self) -> Result<Vec<Processor>> {
        let system = self.system().await?;
        let path = system
            .processors
            .map(|link| link.odata_id)
            .unwrap_or_else(|| format!("{}/Processors", system.odata_id));
        let processors: Vec<Processor> = redfish::fetch_members(self.redfish(), &path)
            .await
            .context("unable to list processors")?;
        if processors.is_empty() {
            return Err(Error::new(ErrorKind::ResourceNotFound, "no processors found"));
        }
        Ok(processors)
    }

    /// CPU inventory from the processors collection.
    pub async fn get_host_cpu(&self) -> Result<CpuInfo> {
        info!("Getting CPU information of {}", self.name);
        let processors = self.processors().await?;
        summarize_cpus(&processors)
    }

    /// Redfish address of the system.
    pub async fn get_host_bmc_address(&self) -> Result<String> {
        let system = self
            .system()
            .await
            .context("unable to get the computing system")?;
        Ok(format!("redfish+{}{}", self.config.url, system.odata_id))
    }

    /// First active ethernet interface of the system.
    ///
    /// Emulated BMCs report no link status, so enabled and healthy interfaces are used.
    pub async fn get_host_mac_address(&self) -> Result<HostNic> {
        info!("Getting ethernet interfaces of {}", self.hardware_type);
        let system = self.system().await?;
        let path = system
            .ethernet_interfaces
            .map(|link| link.odata_id)
            .unwrap_or_else(|| format!("{}/EthernetInterfaces", system.odata_id));
        let interfaces: Vec<EthernetInterface> = redfish::fetch_members(self.redfish(), &path)
            .await
            .context("unable to get the ethernet interface")?;

        let is_virtual = self.is_virtual();
        let candidates = interfaces
            .iter()
            .filter(|eth| {
                if is_virtual {
                    eth.status.is_enabled_ok()
                } else {
                    eth.link_status == Some(LinkStatus::LinkUp)
                }
            })
            .map(|eth| eth.mac_address.as_str())
            .collect::<Vec<_>>();
        let first = candidates.first().ok_or_else(|| {
            Error::new(
                ErrorKind::ResourceNotFound,
                "no available ethernet interface",
            )
        })?;
        debug!(
            "MAC addresses {:?} observed, using the first one as the host MAC",
            candidates
        );
        Ok(HostNic {
            mac_address: parse_mac(first)?,
            boot_pattern: None,
        })
    }

    /// Current power state.
    pub async fn get_power_state(&self) -> Result<PowerState> {
        let system = self.system().await?;
        let state = system.power_state();
        debug!("Power state of {} is {}", system.model, state);
        Ok(state)
    }

    /// Power on with a graceful `On` reset.
    pub async fn power_on(&self) -> Result<()> {
        info!("Powering on {}", self.name);
        self.set_power_state(PowerState::On, ResetType::On).await
    }

    /// Power off with a `ForceOff` reset.
    pub async fn power_off(&self) -> Result<()> {
        info!("Forcing power off of {}", self.name);
        self.set_power_state(PowerState::Off, ResetType::ForceOff)
            .await
    }

    async fn set_power_state(&self, target: PowerState, reset: ResetType) -> Result<()> {
        let system = self.system().await?;
        let current = system.power_state();
        if current == target {
            debug!(
                "Power state of {} already matches the requested {}",
                system.model, target
            );
            return Ok(());
        }

        let path = system.reset_target();
        redfish::post_checked(self.redfish(), &path, &json!({ "ResetType": reset }))
            .await
            .with_context(|| format!("failed to {} BMC {}", reset, self.config.url))?;
        self.wait_for_power_state(target).await
    }

    /// Poll the power state every 2 seconds until it matches or 4 seconds pass.
    pub async fn wait_for_power_state(&self, target: PowerState) -> Result<()> {
        let deadline = Instant::now() + POWER_WAIT_TIMEOUT;
        let mut model = String::new();
        loop {
            if Instant::now() >= deadline {
                return Err(Error::new(
                    ErrorKind::OperationTimedOut,
                    format!(
                        "timeout waiting for model '{}' to transition to power state '{}'",
                        model, target
                    ),
                ));
            }

            let system = self.system().await?;
            let current = system.power_state();
            model = system.model;
            if current == target {
                info!("{} reached power state {}", model, target);
                return Ok(());
            }
            debug!(
                "Power state of {} is {}, waiting for {}",
                model, current, target
            );
            sleep(POWER_POLL_DELAY).await;
        }
    }

    /// Move boot devices matching `pattern` to the front, writing only on change.
    pub async fn rewrite_boot_order(&self, pattern: &str) -> Result<()> {
        if self.is_virtual() {
            return Ok(());
        }

        let system = self
            .system()
            .await
            .context("unable to get the computing system")?;
        let boot = system.boot.ok_or_else(|| {
            Error::new(
                ErrorKind::ResourceNotFound,
                format!("no boot settings on {}", system.odata_id),
            )
        })?;
        debug!("Current boot order of {}: {:?}", system.model, boot.boot_order);

        let new_order = move_matching_to_front(&boot.boot_order, pattern)?;
        if new_order == boot.boot_order {
            debug!("Boot order of {} is already correct", system.model);
            return Ok(());
        }

        info!("Changing boot order of {} to {:?}", system.model, new_order);
        redfish::patch_checked(
            self.redfish(),
            &system.odata_id,
            &json!({ "Boot": { "BootOrder": new_order } }),
        )
        .await
        .with_context(|| format!("failed to change the boot order for BMC {}", self.config.url))
    }

    /// Census of DDR5 and HBM memory devices.
    pub async fn memory_census(&self) -> Result<MemoryMode> {
        let system = self.system().await?;
        let path = system
            .memory
            .map(|link| link.odata_id)
            .unwrap_or_else(|| format!("{}/Memory", system.odata_id));
        let modules: Vec<Memory> = redfish::fetch_members(self.redfish(), &path)
            .await
            .context("unable to list memory")?;
        let mode = classify_memory(modules.iter().map(|m| m.memory_device_type.as_str()));
        info!("Memory mode of {} is {}", self.name, mode);
        Ok(mode)
    }

    /// Set and enable NTP servers through the OpenBMC network protocol resource.
    pub async fn configure_openbmc_ntp(&self, path: &str, servers: &NtpServers) -> Result<()> {
        if self.is_virtual() {
            return Ok(());
        }

        info!(
            "Setting NTP servers {} and {} on {}",
            servers.primary, servers.secondary, self.name
        );
        redfish::patch_checked(
            self.redfish(),
            path,
            &json!({ "NTP": { "NTPServers": servers.to_vec() } }),
        )
        .await
        .context("failed to set NTP servers")?;

        redfish::patch_checked(
            self.redfish(),
            path,
            &json!({ "NTP": { "ProtocolEnabled": true } }),
        )
        .await
        .context("failed to enable NTP")?;
        debug!("NTP enabled on {}", self.name);
        Ok(())
    }

    /// All accounts of the account service.
    pub async fn accounts(&self) -> Result<Vec<ManagerAccount>> {
        let service: AccountService = redfish::fetch(self.redfish(), redfish::ACCOUNT_SERVICE)
            .await
            .with_context(|| {
                format!("failed to get AccountService for BMC {}", self.config.url)
            })?;
        redfish::fetch_members(self.redfish(), &service.accounts.odata_id)
            .await
            .with_context(|| format!("failed to get Accounts for BMC {}", self.config.url))
    }

    /// Change the password of an existing account.
    pub async fn update_account(&self, username: &str, password: &str) -> Result<()> {
        info!("Updating BMC credentials of {} on {}", username, self.name);
        let account = self
            .accounts()
            .await?
            .into_iter()
            .find(|account| account.user_name == username)
            .ok_or_else(|| Error::new(ErrorKind::AccountNotFound, username.to_string()))?;

        redfish::patch_checked(
            self.redfish(),
            &account.odata_id,
            &json!({ "Password": password }),
        )
        .await
        .with_context(|| {
            format!(
                "failed to update password for {:?} on BMC {}",
                username, self.config.url
            )
        })?;
        info!("Password of {} updated on {}", username, self.name);
        Ok(())
    }

    /// Create an administrator account.
    pub async fn create_account(&self, username: &str, password: &str) -> Result<()> {
        info!("Creating BMC account {} on {}", username, self.name);
        redfish::post_checked(
            self.redfish(),
            redfish::ACCOUNTS,
            &json!({
                "UserName": username,
                "Password": password,
                "RoleId": "Administrator",
                "Enabled": true,
            }),
        )
        .await
        .with_context(|| {
            format!(
                "failed to create new Admin account {:?} on BMC {}",
                username, self.config.url
            )
        })?;
        info!("Account {} created on {}", username, self.name);
        Ok(())
    }
}

/// Parse a MAC address reported by the BMC.
pub(crate) fn parse_mac(value: &str) -> Result<MacAddr6> {
    value.parse().map_err(|_| {
        Error::new(
            ErrorKind::InvalidResponse,
            format!("invalid MAC address {:?}", value),
        )
    })
}
