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

//! Operations carried over the IPMI LAN channel.

use std::fmt;
use std::sync::Arc;

use tokio::time::{sleep, Instant};

use super::super::ipmi::{set_kcs_policy, ChassisControl, LanConnector, LanSession};
use super::super::types::PowerState;
use super::super::{Error, ErrorKind, Result, ResultExt};
use super::base::{BaseDriver, POWER_POLL_DELAY, POWER_WAIT_TIMEOUT};

/// IPMI operations shared by drivers that control the board over LAN.
#[derive(Clone)]
pub(crate) struct LanControl {
    lan: Arc<dyn LanConnector>,
}

impl fmt::Debug for LanControl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("LanControl")
    }
}

impl LanControl {
    pub(crate) fn new(lan: Arc<dyn LanConnector>) -> LanControl {
        LanControl { lan }
    }

    /// Set the KCS policy control mode and read it back.
    pub(crate) async fn set_kcs(&self, base: &BaseDriver, mode: u8) -> Result<()> {
        info!(
            "Setting KCS policy control mode {:#04x} on {}",
            mode,
            base.name()
        );
        let session = self.lan.open(base.config()).await?;
        set_kcs_policy(&session, mode)
            .await
            .with_context(|| format!("KCS policy update on {}", base.name()))
    }

    /// Issue a chassis power command unless the chassis is already in `target`.
    ///
    /// The state is read and polled over the same IPMI session.
    pub(crate) async fn set_power(
        &self,
        base: &BaseDriver,
        target: PowerState,
        control: ChassisControl,
    ) -> Result<()> {
        let session = self.lan.open(base.config()).await?;
        let current = session
            .chassis_status()
            .await
            .context("unable to read the chassis power state")?;
        if current == target {
            debug!(
                "Power state of {} already matches the requested {}",
                base.name(),
                target
            );
            return Ok(());
        }

        session
            .chassis_power(control)
            .await
            .with_context(|| format!("failed to power {} BMC {}", control, base.config().url))?;
        wait_for_chassis(&session, base.name(), target).await
    }
}

async fn wait_for_chassis(session: &LanSession, name: &str, target: PowerState) -> Result<()> {
    let deadline = Instant::now() + POWER_WAIT_TIMEOUT;
    loop {
        if Instant::now() >= deadline {
            return Err(Error::new(
                ErrorKind::OperationTimedOut,
                format!(
                    "timeout waiting for model '{}' to transition to power state '{}'",
                    name, target
                ),
            ));
        }

        let current = session
            .chassis_status()
            .await
            .context("unable to read the chassis power state")?;
        if current == target {
            info!("{} reached power state {}", name, target);
            return Ok(());
        }
        debug!(
            "Chassis power of {} is {}, waiting for {}",
            name, current, target
        );
        sleep(POWER_POLL_DELAY).await;
    }
}
