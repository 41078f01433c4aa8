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

//! IPMI over LAN.
//!
//! Sessions are opened through a [LanConnector](trait.LanConnector.html) and wrapped
//! into a [LanSession](struct.LanSession.html), which closes the channel when dropped.

use std::fmt;

use async_trait::async_trait;

use super::config::Config;
use super::types::PowerState;
use super::{Error, ErrorKind, Result, ResultExt};

mod ipmitool;

pub use self::ipmitool::Ipmitool;

/// Network function of the OEM commands controlling the KCS policy.
pub const NETFN_OEM: u8 = 0x30;
/// Command setting the KCS policy control mode.
pub const CMD_SET_KCS_POLICY: u8 = 0xb4;
/// Command reading the KCS policy control mode.
pub const CMD_GET_KCS_POLICY: u8 = 0xb3;
/// KCS policy mode allowing all commands.
pub const KCS_POLICY_ALLOW_ALL: u8 = 0x03;
/// KCS policy mode denying all commands.
pub const KCS_POLICY_DENY_ALL: u8 = 0x00;

/// Chassis power control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChassisControl {
    /// Power the chassis up.
    PowerUp,
    /// Power the chassis down.
    PowerDown,
}

impl fmt::Display for ChassisControl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ChassisControl::PowerUp => "on",
            ChassisControl::PowerDown => "off",
        })
    }
}

/// Authenticated IPMI channel to a BMC.
#[async_trait]
pub trait LanChannel: Send + Sync {
    /// Send a raw command and return the response bytes.
    async fn raw(&self, netfn: u8, cmd: u8, data: &[u8]) -> Result<Vec<u8>>;

    /// Board or product manufacturer from the FRU inventory.
    async fn fru_manufacturer(&self) -> Result<String>;

    /// Issue a chassis power command.
    async fn chassis_power(&self, control: ChassisControl) -> Result<()>;

    /// Current chassis power state.
    async fn chassis_status(&self) -> Result<PowerState>;

    /// Release the channel.
    fn close(&mut self);
}

/// Opens IPMI channels.
#[async_trait]
pub trait LanConnector: Send + Sync {
    /// Open a channel.
    async fn connect(&self, config: &Config) -> Result<Box<dyn LanChannel>>;

    /// Open a session that is closed when dropped.
    async fn open(&self, config: &Config) -> Result<LanSession> {
        let channel = self
            .connect(config)
            .await
            .context("unable to connect to IPMI")?;
        Ok(LanSession::new(channel))
    }
}

/// Open IPMI session.
pub struct LanSession {
    channel: Box<dyn LanChannel>,
}

impl LanSession {
    /// Wrap an open channel.
    pub fn new(channel: Box<dyn LanChannel>) -> LanSession {
        LanSession { channel }
    }

    /// Send a raw command.
    pub async fn raw(&self, netfn: u8, cmd: u8, data: &[u8]) -> Result<Vec<u8>> {
        trace!("Sending IPMI raw command {:#04x} {:#04x} {:02x?}", netfn, cmd, data);
        self.channel.raw(netfn, cmd, data).await
    }

    /// Manufacturer from the FRU inventory.
    pub async fn fru_manufacturer(&self) -> Result<String> {
        self.channel.fru_manufacturer().await
    }

    /// Issue a chassis power command.
    pub async fn chassis_power(&self, control: ChassisControl) -> Result<()> {
        debug!("Sending IPMI chassis power {}", control);
        self.channel.chassis_power(control).await
    }

    /// Read the chassis power state.
    pub async fn chassis_status(&self) -> Result<PowerState> {
        let state = self.channel.chassis_status().await?;
        trace!("IPMI chassis power is {}", state);
        Ok(state)
    }
}

impl fmt::Debug for LanSession {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("LanSession")
    }
}

impl Drop for LanSession {
    fn drop(&mut self) {
        trace!("Closing IPMI session");
        self.channel.close();
    }
}

/// Read back the KCS policy control mode and compare it with `expected`.
pub async fn verify_kcs_policy(
    session: &LanSession,
    expected: u8,
    netfn: u8,
    cmd: u8,
) -> Result<()> {
    let resp = session
        .raw(netfn, cmd, &[])
        .await
        .context("unable to read KCS policy control mode")?;
    let actual = *resp.first().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidResponse,
            "empty response when reading KCS policy control mode",
        )
    })?;
    if actual != expected {
        return Err(Error::new(
            ErrorKind::OperationFailed,
            format!(
                "KCS policy control mode is {:#04x}, expected {:#04x}",
                actual, expected
            ),
        ));
    }
    debug!("KCS policy control mode is {:#04x} as expected", actual);
    Ok(())
}

/// Set the KCS policy control mode and verify it.
pub async fn set_kcs_policy(session: &LanSession, mode: u8) -> Result<()> {
    let _ = session
        .raw(NETFN_OEM, CMD_SET_KCS_POLICY, &[mode])
        .await
        .context("unable to set KCS policy control mode")?;
    verify_kcs_policy(session, mode, NETFN_OEM, CMD_GET_KCS_POLICY).await
}
