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

//! IPMI channel driving the `ipmitool` binary.

use std::fmt;

use async_trait::async_trait;
use tokio::process::Command;

use super::super::config::Config;
use super::super::types::PowerState;
use super::super::{Error, ErrorKind, Result};
use super::{ChassisControl, LanChannel, LanConnector};

const CIPHER_SUITE: &str = "17";
const INTERFACE: &str = "lanplus";
const PASSWORD_ENV: &str = "IPMI_PASSWORD";

/// Connector spawning `ipmitool` for every command.
#[derive(Debug, Clone)]
pub struct Ipmitool {
    binary: String,
}

impl Ipmitool {
    /// Use `ipmitool` from `PATH`.
    pub fn new() -> Ipmitool {
        Ipmitool::with_binary("ipmitool")
    }

    /// Use a specific binary.
    pub fn with_binary<S: Into<String>>(binary: S) -> Ipmitool {
        Ipmitool {
            binary: binary.into(),
        }
    }
}

impl Default for Ipmitool {
    fn default() -> Ipmitool {
        Ipmitool::new()
    }
}

struct IpmitoolChannel {
    binary: String,
    host: String,
    username: String,
    password: String,
}

impl fmt::Debug for IpmitoolChannel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IpmitoolChannel")
            .field("host", &self.host)
            .field("username", &self.username)
            .finish()
    }
}

impl IpmitoolChannel {
    fn base_args(&self) -> Vec<String> {
        vec![
            "-I".into(),
            INTERFACE.into(),
            "-C".into(),
            CIPHER_SUITE.into(),
            "-H".into(),
            self.host.clone(),
            "-U".into(),
            self.username.clone(),
            // The password is passed through the environment.
            "-E".into(),
        ]
    }

    async fn execute(&self, command: &[String]) -> Result<String> {
        let mut args = self.base_args();
        args.extend(command.iter().cloned());
        trace!("Running {} against {}: {:?}", self.binary, self.host, command);

        let output = Command::new(&self.binary)
            .args(&args)
            .env(PASSWORD_ENV, &self.password)
            .kill_on_drop(true)
            .output()
            .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::new(
                ErrorKind::ProtocolError,
                format!(
                    "ipmitool {} failed with {}: {}",
                    command.join(" "),
                    output.status,
                    stderr.trim()
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Parse the hex dump printed by `ipmitool raw`.
pub(crate) fn parse_raw_output(output: &str) -> Result<Vec<u8>> {
    output
        .split_whitespace()
        .map(|byte| {
            u8::from_str_radix(byte, 16).map_err(|_| {
                Error::new(
                    ErrorKind::InvalidResponse,
                    format!("unexpected byte {:?} in ipmitool output", byte),
                )
            })
        })
        .collect()
}

/// Find the manufacturer in the output of `ipmitool fru print`.
pub(crate) fn parse_fru_manufacturer(output: &str) -> Option<String> {
    let mut product = None;
    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            "Board Mfg" => return Some(value.to_string()),
            "Product Manufacturer" if product.is_none() => product = Some(value.to_string()),
            _ => {}
        }
    }
    product
}

/// Parse the output of `ipmitool chassis power status`.
pub(crate) fn parse_power_status(output: &str) -> Result<PowerState> {
    match output.trim().strip_prefix("Chassis Power is ") {
        Some("on") => Ok(PowerState::On),
        Some("off") => Ok(PowerState::Off),
        _ => Err(Error::new(
            ErrorKind::InvalidResponse,
            format!("unexpected chassis power status {:?}", output.trim()),
        )),
    }
}

#[async_trait]
impl LanChannel for IpmitoolChannel {
    async fn raw(&self, netfn: u8, cmd: u8, data: &[u8]) -> Result<Vec<u8>> {
        let mut command = vec![
            "raw".to_string(),
            format!("{:#04x}", netfn),
            format!("{:#04x}", cmd),
        ];
        command.extend(data.iter().map(|b| format!("{:#04x}", b)));
        let output = self.execute(&command).await?;
        parse_raw_output(&output)
    }

    async fn fru_manufacturer(&self) -> Result<String> {
        let output = self
            .execute(&["fru".to_string(), "print".to_string(), "0".to_string()])
            .await?;
        parse_fru_manufacturer(&output).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidResponse,
                "no manufacturer in the FRU inventory",
            )
        })
    }

    async fn chassis_power(&self, control: ChassisControl) -> Result<()> {
        let _ = self
            .execute(&[
                "chassis".to_string(),
                "power".to_string(),
                control.to_string(),
            ])
            .await?;
        Ok(())
    }

    async fn chassis_status(&self) -> Result<PowerState> {
        let output = self
            .execute(&[
                "chassis".to_string(),
                "power".to_string(),
                "status".to_string(),
            ])
            .await?;
        parse_power_status(&output)
    }

    fn close(&mut self) {
        // Every command runs in its own ipmitool session.
        trace!("Released IPMI channel to {}", self.host);
    }
}

#[async_trait]
impl LanConnector for Ipmitool {
    async fn connect(&self, config: &Config) -> Result<Box<dyn LanChannel>> {
        let channel = IpmitoolChannel {
            binary: self.binary.clone(),
            host: config.host().to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        };
        // Verifies reachability and credentials.
        let _ = channel
            .execute(&["mc".to_string(), "info".to_string()])
            .await
            .map_err(|e| Error::new(ErrorKind::ConnectionFailed, e.to_string()))?;
        debug!("Opened IPMI session to {}", channel.host);
        Ok(Box::new(channel))
    }
}
