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

//! JSON structures of Redfish resources.

#![allow(missing_docs)]

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::types::PowerState;
use crate::utils::null_as_default;

protocol_enum! {
    /// State of a resource.
    enum ResourceState = Unknown {
        Enabled = "Enabled",
        Disabled = "Disabled",
        Absent = "Absent",
        StandbyOffline = "StandbyOffline",
        Unknown = ""
    }
}

protocol_enum! {
    /// Health of a resource.
    enum Health = Unknown {
        Ok = "OK",
        Warning = "Warning",
        Critical = "Critical",
        Unknown = ""
    }
}

protocol_enum! {
    /// Link status of an ethernet interface.
    enum LinkStatus = Unknown {
        LinkUp = "LinkUp",
        LinkDown = "LinkDown",
        NoLink = "NoLink",
        Unknown = ""
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Collection {
    #[serde(rename = "Members", default, deserialize_with = "null_as_default")]
    pub members: Vec<Link>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(rename = "State", default)]
    pub state: Option<ResourceState>,
    #[serde(rename = "Health", default)]
    pub health: Option<Health>,
}

impl Status {
    /// Enabled and healthy.
    pub fn is_enabled_ok(&self) -> bool {
        self.state == Some(ResourceState::Enabled) && self.health == Some(Health::Ok)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Boot {
    #[serde(rename = "BootOrder", default, deserialize_with = "null_as_default")]
    pub boot_order: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionTarget {
    pub target: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemActions {
    #[serde(rename = "#ComputerSystem.Reset", default)]
    pub reset: Option<ActionTarget>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComputerSystem {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
    #[serde(rename = "Manufacturer", default, deserialize_with = "null_as_default")]
    pub manufacturer: String,
    #[serde(rename = "Model", default, deserialize_with = "null_as_default")]
    pub model: String,
    #[serde(rename = "PowerState", default)]
    pub power_state: Option<PowerState>,
    #[serde(rename = "Boot", default)]
    pub boot: Option<Boot>,
    #[serde(rename = "Actions", default)]
    pub actions: SystemActions,
    #[serde(rename = "Processors", default)]
    pub processors: Option<Link>,
    #[serde(rename = "Memory", default)]
    pub memory: Option<Link>,
    #[serde(rename = "EthernetInterfaces", default)]
    pub ethernet_interfaces: Option<Link>,
    #[serde(rename = "NetworkInterfaces", default)]
    pub network_interfaces: Option<Link>,
    #[serde(rename = "PCIeDevices", default, deserialize_with = "null_as_default")]
    pub pcie_devices: Vec<Link>,
    #[serde(rename = "Oem", default)]
    pub oem: Value,
}

impl ComputerSystem {
    /// Reported power state, `Unknown` when absent.
    #[inline]
    pub fn power_state(&self) -> PowerState {
        self.power_state.unwrap_or(PowerState::Unknown)
    }

    /// Target of the `ComputerSystem.Reset` action.
    pub fn reset_target(&self) -> String {
        match self.actions.reset {
            Some(ref action) => action.target.clone(),
            None => format!("{}/Actions/ComputerSystem.Reset", self.odata_id),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessorId {
    #[serde(
        rename = "IdentificationRegisters",
        default,
        deserialize_with = "null_as_default"
    )]
    pub identification_registers: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Processor {
    #[serde(rename = "ProcessorType", default, deserialize_with = "null_as_default")]
    pub processor_type: String,
    #[serde(rename = "Status", default)]
    pub status: Status,
    #[serde(rename = "Manufacturer", default, deserialize_with = "null_as_default")]
    pub manufacturer: String,
    #[serde(rename = "TotalCores", default, deserialize_with = "null_as_default")]
    pub total_cores: u32,
    #[serde(rename = "TotalThreads", default, deserialize_with = "null_as_default")]
    pub total_threads: u32,
    #[serde(rename = "ProcessorId", default)]
    pub processor_id: ProcessorId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Memory {
    #[serde(rename = "MemoryDeviceType", default, deserialize_with = "null_as_default")]
    pub memory_device_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EthernetInterface {
    #[serde(rename = "MACAddress", default, deserialize_with = "null_as_default")]
    pub mac_address: String,
    #[serde(rename = "LinkStatus", default)]
    pub link_status: Option<LinkStatus>,
    #[serde(rename = "Status", default)]
    pub status: Status,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkInterface {
    #[serde(rename = "NetworkPorts", default)]
    pub network_ports: Option<Link>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenBmcPort {
    #[serde(rename = "MediaState", default, deserialize_with = "null_as_default")]
    pub media_state: u32,
    #[serde(rename = "SlotNumber", default, deserialize_with = "null_as_default")]
    pub slot_number: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortOem {
    #[serde(rename = "OpenBmc", default)]
    pub open_bmc: OpenBmcPort,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkPort {
    #[serde(rename = "Status", default)]
    pub status: Status,
    #[serde(
        rename = "AssociatedNetworkAddresses",
        default,
        deserialize_with = "null_as_default"
    )]
    pub associated_network_addresses: Vec<String>,
    #[serde(rename = "VendorId", default, deserialize_with = "null_as_default")]
    pub vendor_id: String,
    #[serde(rename = "Oem", default)]
    pub oem: PortOem,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PcieFunction {
    #[serde(rename = "Id", default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(rename = "VendorId", default, deserialize_with = "null_as_default")]
    pub vendor_id: String,
    #[serde(rename = "DeviceId", default, deserialize_with = "null_as_default")]
    pub device_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManagerAccount {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
    #[serde(rename = "Id", default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(rename = "UserName", default, deserialize_with = "null_as_default")]
    pub user_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountService {
    #[serde(rename = "Accounts")]
    pub accounts: Link,
}

/// iDRAC manager attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct ManagerAttributes {
    #[serde(rename = "Attributes", default)]
    pub attributes: HashMap<String, Value>,
}

/// Supermicro fan mode resource.
#[derive(Debug, Clone, Deserialize)]
pub struct FanMode {
    #[serde(rename = "Mode", default, deserialize_with = "null_as_default")]
    pub mode: String,
}
