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

//! Hardware detection and driver construction.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::super::config::{Config, Settings};
use super::super::ipmi::{Ipmitool, LanConnector};
use super::super::redfish::{self, Connector, HttpConnector};
use super::super::types::HardwareType;
use super::super::websession::{WebClientConnector, WebConnector};
use super::super::{Error, ErrorKind, Result};
use super::base::{BaseDriver, INTEL_CORPORATION};
use super::dell::DellDriver;
use super::intel::{IntelDriver, IntelFamily};
use super::lan::LanControl;
use super::quanta::{QuantaLanDriver, QuantaWebDriver};
use super::supermicro::SupermicroDriver;
use super::virtual_bmc::VirtualDriver;
use super::wiwynn::WiwynnDriver;
use super::Driver;

const SUSHY_EMULATOR: &str = "Sushy Emulator";
const WIWYNN: &str = "WIWYNN";
const SUPERMICRO: &str = "Supermicro";
const DELL: &str = "Dell Inc.";
const QUANTA: &str = "Quanta Cloud Technology Inc.";

/// Model patterns per manufacturer. Accelerator SKUs come before generic patterns.
const MODELS: &[(&str, &str, HardwareType)] = &[
    (INTEL_CORPORATION, r"(?i)gaudi\s*3|HLS-G3", HardwareType::Gaudi3Intel),
    (INTEL_CORPORATION, r"^D50DNP", HardwareType::DenaliPass),
    (INTEL_CORPORATION, r"^M50CYP", HardwareType::CoyotePass),
    (SUPERMICRO, r"^SYS-820GH-TNR2", HardwareType::Gaudi2Smc),
    (SUPERMICRO, r"^SYS-521GE-TNRT", HardwareType::Smc521GeTNRT),
    (SUPERMICRO, r"^SYS-821GV-TNRT", HardwareType::Smc821GVTNRT),
    (SUPERMICRO, r"^SYS-621C-TN12R", HardwareType::Smc621CTN12R),
    (SUPERMICRO, r"^SYS-822GA-NGR3-IN001", HardwareType::Smc822GANGR3IN001),
    (DELL, r"(?i)XE9680.*(gaudi\s*3|HL-325)", HardwareType::Gaudi3Dell),
    (DELL, r"(?i)XE9680.*(gaudi\s*2|HL-225)", HardwareType::Gaudi2Dell),
    (DELL, r".+", HardwareType::DellServer),
    (QUANTA, r"D54Q-2U", HardwareType::QuantaD54Q2U),
    (QUANTA, r"D55Q-2U", HardwareType::QuantaGridD55Q2U),
];

/// Connectors used to reach BMCs.
#[derive(Clone)]
pub struct Transports {
    /// Redfish connector.
    pub redfish: Arc<dyn Connector>,
    /// IPMI LAN connector.
    pub lan: Arc<dyn LanConnector>,
    /// Vendor web API connector.
    pub web: Arc<dyn WebConnector>,
}

impl fmt::Debug for Transports {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Transports")
    }
}

impl Transports {
    /// Bundle connectors.
    pub fn new(
        redfish: Arc<dyn Connector>,
        lan: Arc<dyn LanConnector>,
        web: Arc<dyn WebConnector>,
    ) -> Transports {
        Transports { redfish, lan, web }
    }

    /// Network transports with the request timeout from the settings.
    pub fn from_settings(settings: &Settings) -> Transports {
        let timeout = settings.request_timeout();
        Transports::new(
            Arc::new(HttpConnector::new(timeout)),
            Arc::new(Ipmitool::default()),
            Arc::new(WebClientConnector::new(timeout)),
        )
    }
}

impl Default for Transports {
    fn default() -> Transports {
        Transports::new(
            Arc::new(HttpConnector::default()),
            Arc::new(Ipmitool::default()),
            Arc::new(WebClientConnector::default()),
        )
    }
}

/// Detect the hardware type from the manufacturer and model.
///
/// Manufacturers are compared case-insensitively. Emulated and Wiwynn BMCs
/// are recognized without a model.
pub fn detect_hardware(manufacturer: &str, model: &str) -> Result<HardwareType> {
    if manufacturer.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidResponse,
            "System.Manufacturer is missing",
        ));
    }
    if manufacturer.eq_ignore_ascii_case(SUSHY_EMULATOR) {
        return Ok(HardwareType::Virtual);
    }
    if manufacturer.eq_ignore_ascii_case(WIWYNN) {
        return Ok(HardwareType::Gaudi2Wiwynn);
    }
    if model.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidResponse,
            "System.Model is missing",
        ));
    }

    for (vendor, pattern, hardware_type) in MODELS {
        if !manufacturer.eq_ignore_ascii_case(vendor) {
            continue;
        }
        if Regex::new(pattern)?.is_match(model) {
            debug!(
                "Model {:?} of {:?} matches {}",
                model, manufacturer, hardware_type
            );
            return Ok(*hardware_type);
        }
    }

    Err(Error::new(
        ErrorKind::NotSupported,
        format!(
            "failed to determine BMC supported module for manufacturer {:?} and model {:?}",
            manufacturer, model
        ),
    ))
}

/// Board name reported by drivers.
pub(crate) fn board_name(hardware_type: HardwareType) -> &'static str {
    match hardware_type {
        HardwareType::DenaliPass => "DenaliPassBMC",
        HardwareType::CoyotePass => "CoyotePassBMC",
        HardwareType::Gaudi3Intel => "Gaudi3IntelBMC",
        HardwareType::Virtual => "VirtualBMC",
        HardwareType::Gaudi2Wiwynn | HardwareType::Gaudi2Smc => "Gaudi2",
        HardwareType::Smc521GeTNRT => "SYS-521GE-TNRT",
        HardwareType::Smc821GVTNRT => "SYS-821GV-TNRT",
        HardwareType::Smc621CTN12R => "SYS-621C-TN12R",
        HardwareType::Smc822GANGR3IN001 => "SYS-822GA-NGR3-IN001",
        HardwareType::Gaudi2Dell => "DellGaudi2",
        HardwareType::Gaudi3Dell => "DellGaudi3",
        HardwareType::DellServer => "DellServer",
        HardwareType::QuantaD54Q2U => "QuantaD54Q2U",
        HardwareType::QuantaGridD55Q2U => "QuantaGridD55Q2U",
    }
}

async fn ipmi_manufacturer(config: &Config, lan: &dyn LanConnector) -> Result<String> {
    let session = lan.open(config).await?;
    let manufacturer = session.fru_manufacturer().await?;
    drop(session);
    if manufacturer.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidResponse,
            "empty manufacturer in the FRU inventory",
        ));
    }
    Ok(manufacturer)
}

/// Connect to a BMC and build the driver matching its hardware.
///
/// When the system resource cannot be read, the manufacturer is read from the
/// FRU inventory over IPMI instead.
pub async fn connect(config: Config, transports: &Transports) -> Result<Box<dyn Driver>> {
    let client = transports.redfish.connect(&config).await?;

    let (manufacturer, model) = match redfish::first_system(client.as_ref()).await {
        Ok(system) => (system.manufacturer, system.model),
        Err(system_err) => {
            warn!(
                "Cannot read the system of BMC {}, falling back to IPMI: {}",
                config.url, system_err
            );
            let manufacturer = ipmi_manufacturer(&config, transports.lan.as_ref())
                .await
                .map_err(|ipmi_err| {
                    ipmi_err.context(format!(
                        "{}: unable to get the manufacturer using IPMI",
                        system_err
                    ))
                })?;
            (manufacturer, String::new())
        }
    };

    let hardware_type = detect_hardware(&manufacturer, &model)?;
    let name = board_name(hardware_type);
    info!(
        "Detected {} ({}) at {}, manufacturer {:?}, model {:?}",
        name, hardware_type, config.url, manufacturer, model
    );

    let web = if hardware_type == HardwareType::QuantaD54Q2U {
        Some(transports.web.open(&config)?)
    } else {
        None
    };
    let lan = LanControl::new(transports.lan.clone());
    let base = BaseDriver::new(config, client, hardware_type, manufacturer, name);

    let driver: Box<dyn Driver> = match (hardware_type, web) {
        (HardwareType::Virtual, _) => Box::new(VirtualDriver::new(base)),
        (HardwareType::Gaudi2Wiwynn, _) => Box::new(WiwynnDriver::new(base, lan)),
        (HardwareType::QuantaD54Q2U, Some(web)) => Box::new(QuantaWebDriver::new(base, web)),
        (HardwareType::QuantaGridD55Q2U, _) => Box::new(QuantaLanDriver::new(base, lan)),
        (
            HardwareType::Gaudi2Smc
            | HardwareType::Smc521GeTNRT
            | HardwareType::Smc821GVTNRT
            | HardwareType::Smc621CTN12R
            | HardwareType::Smc822GANGR3IN001,
            _,
        ) => Box::new(SupermicroDriver::new(base)),
        (HardwareType::Gaudi2Dell | HardwareType::Gaudi3Dell | HardwareType::DellServer, _) => {
            Box::new(DellDriver::new(base))
        }
        (hardware_type, _) => match IntelFamily::from_hardware_type(hardware_type) {
            Some(family) => Box::new(IntelDriver::new(base, family, lan)),
            None => {
                return Err(Error::new(
                    ErrorKind::NotSupported,
                    format!("no driver for {}", hardware_type),
                ))
            }
        },
    };
    Ok(driver)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_detect_intel() {
        assert_eq!(
            detect_hardware("Intel Corporation", "D50DNP1SB").unwrap(),
            HardwareType::DenaliPass
        );
        assert_eq!(
            detect_hardware("Intel Corporation", "M50CYP2SBSTD").unwrap(),
            HardwareType::CoyotePass
        );
        assert_eq!(
            detect_hardware("intel corporation", "HLS-Gaudi3").unwrap(),
            HardwareType::Gaudi3Intel
        );
    }

    #[test]
    fn test_detect_without_model() {
        assert_eq!(
            detect_hardware("Sushy Emulator", "").unwrap(),
            HardwareType::Virtual
        );
        assert_eq!(
            detect_hardware("Wiwynn", "").unwrap(),
            HardwareType::Gaudi2Wiwynn
        );
        let err = detect_hardware("Supermicro", "").unwrap_err();
        assert!(err.to_string().contains("System.Model is missing"));
    }

    #[test]
    fn test_detect_dell_specific_first() {
        assert_eq!(
            detect_hardware("Dell Inc.", "PowerEdge XE9680 Gaudi3").unwrap(),
            HardwareType::Gaudi3Dell
        );
        assert_eq!(
            detect_hardware("Dell Inc.", "PowerEdge XE9680 HL-225").unwrap(),
            HardwareType::Gaudi2Dell
        );
        assert_eq!(
            detect_hardware("Dell Inc.", "PowerEdge R760").unwrap(),
            HardwareType::DellServer
        );
    }

    #[test]
    fn test_detect_unsupported() {
        let err = detect_hardware("Supermicro", "SYS-999").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        let err = detect_hardware("Lenovo", "SR650").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        let err = detect_hardware("", "D50DNP").unwrap_err();
        assert!(err.to_string().contains("System.Manufacturer is missing"));
    }

    #[test]
    fn test_every_pattern_compiles() {
        for (_, pattern, _) in MODELS {
            assert!(Regex::new(pattern).is_ok(), "{}", pattern);
        }
    }
}
