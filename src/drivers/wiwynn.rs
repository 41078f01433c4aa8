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

//! Wiwynn Gaudi 2 servers, controlled over IPMI LAN.

use async_trait::async_trait;

use super::super::ipmi::{ChassisControl, KCS_POLICY_ALLOW_ALL, KCS_POLICY_DENY_ALL};
use super::super::types::{GpuInfo, PowerState};
use super::super::Result;
use super::base::BaseDriver;
use super::lan::LanControl;
use super::Driver;

/// Driver of Wiwynn servers.
#[derive(Debug)]
pub struct WiwynnDriver {
    base: BaseDriver,
    lan: LanControl,
}

impl WiwynnDriver {
    pub(crate) fn new(base: BaseDriver, lan: LanControl) -> WiwynnDriver {
        WiwynnDriver { base, lan }
    }
}

#[async_trait]
impl Driver for WiwynnDriver {
    fn base(&self) -> &BaseDriver {
        &self.base
    }

    async fn power_on(&self) -> Result<()> {
        self.lan
            .set_power(&self.base, PowerState::On, ChassisControl::PowerUp)
            .await
    }

    async fn power_off(&self) -> Result<()> {
        self.lan
            .set_power(&self.base, PowerState::Off, ChassisControl::PowerDown)
            .await
    }

    async fn gpu_discovery(&self) -> Result<GpuInfo> {
        Ok(GpuInfo::fixed(8, "HL-225"))
    }

    async fn enable_kcs(&self) -> Result<()> {
        self.lan.set_kcs(&self.base, KCS_POLICY_ALLOW_ALL).await
    }

    async fn disable_kcs(&self) -> Result<()> {
        self.lan.set_kcs(&self.base, KCS_POLICY_DENY_ALL).await
    }
}
