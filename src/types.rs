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

//! Types shared by all drivers.

use macaddr::MacAddr6;
use serde::Serialize;

protocol_enum! {
    /// Board family handled by a driver.
    enum HardwareType {
        /// Intel Denali Pass reference board.
        DenaliPass = "DenaliPass",
        /// Intel Coyote Pass reference board.
        CoyotePass = "CoyotePass",
        /// Intel Gaudi 3 accelerator platform.
        Gaudi3Intel = "Gaudi3Intel",
        /// Emulated BMC.
        Virtual = "Virtual",
        /// Wiwynn Gaudi 2 platform.
        Gaudi2Wiwynn = "Gaudi2Wiwynn",
        /// Supermicro SYS-820GH-TNR2 (Gaudi 2).
        Gaudi2Smc = "Gaudi2Smc",
        /// Supermicro SYS-521GE-TNRT.
        Smc521GeTNRT = "Smc521GeTNRT",
        /// Supermicro SYS-821GV-TNRT.
        Smc821GVTNRT = "Smc821GVTNRT",
        /// Supermicro SYS-621C-TN12R.
        Smc621CTN12R = "Smc621CTN12R",
        /// Supermicro SYS-822GA-NGR3-IN001.
        Smc822GANGR3IN001 = "Smc822GANGR3IN001",
        /// Dell XE9680 with Gaudi 2.
        Gaudi2Dell = "Gaudi2Dell",
        /// Any other Dell server.
        DellServer = "DellServer",
        /// Dell XE9680 with Gaudi 3.
        Gaudi3Dell = "Gaudi3Dell",
        /// Quanta D54Q-2U, managed through the web API.
        QuantaD54Q2U = "QuantaD54Q2U",
        /// QuantaGrid D55Q-2U, managed over IPMI.
        QuantaGridD55Q2U = "QuantaGridD55Q2U"
    }
}

protocol_enum! {
    /// Power state of a system as reported by Redfish.
    enum PowerState = Unknown {
        /// Powered on.
        On = "On",
        /// Powered off.
        Off = "Off",
        /// Transitioning to on.
        PoweringOn = "PoweringOn",
        /// Transitioning to off.
        PoweringOff = "PoweringOff",
        /// Power state is not known.
        Unknown = ""
    }
}

protocol_enum! {
    /// Reset action sent to `ComputerSystem.Reset`.
    enum ResetType {
        /// Graceful power on.
        On = "On",
        /// Immediate power off.
        ForceOff = "ForceOff"
    }
}

protocol_enum! {
    /// Memory topology derived from the installed memory devices.
    enum MemoryMode {
        /// No DDR5 or HBM devices found.
        None = "None",
        /// Only high-bandwidth memory is installed.
        HbmOnly = "HBM-only",
        /// HBM and DDR5 in flat mode.
        Flat = "Flat-1LM",
        /// HBM as a cache in front of DDR5.
        Cache = "Cache-2LM"
    }
}

impl Default for MemoryMode {
    fn default() -> MemoryMode {
        MemoryMode::None
    }
}

/// CPU inventory of the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuInfo {
    /// Canonical identifier, e.g. `0x806F8`.
    pub cpu_id: String,
    /// Number of enabled sockets.
    pub sockets: u32,
    /// Total number of cores.
    pub cores: u32,
    /// Threads per core.
    pub threads: u32,
    /// CPU manufacturer.
    pub manufacturer: String,
}

/// Accelerators attached to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GpuInfo {
    /// Number of recognized accelerators.
    pub count: u32,
    /// Model name, empty when nothing was recognized.
    pub model: String,
}

impl GpuInfo {
    /// Fixed inventory for boards where live discovery is not used.
    pub fn fixed<S: Into<String>>(count: u32, model: S) -> GpuInfo {
        GpuInfo {
            count,
            model: model.into(),
        }
    }
}

/// Network interface the host boots from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostNic {
    /// MAC address of the interface.
    pub mac_address: MacAddr6,
    /// Boot order pattern matching this interface, if the driver knows one.
    pub boot_pattern: Option<String>,
}
