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

//! Emulated BMCs (sushy-tools).

use async_trait::async_trait;

use super::super::config::NtpServers;
use super::super::Result;
use super::base::BaseDriver;
use super::Driver;

/// Driver of emulated BMCs.
#[derive(Debug)]
pub struct VirtualDriver {
    base: BaseDriver,
}

impl VirtualDriver {
    pub(crate) fn new(base: BaseDriver) -> VirtualDriver {
        VirtualDriver { base }
    }
}

#[async_trait]
impl Driver for VirtualDriver {
    fn base(&self) -> &BaseDriver {
        &self.base
    }

    async fn sanitize_boot_order(&self, _pattern: &str) -> Result<()> {
        debug!("Boot order is never changed on an emulated BMC");
        Ok(())
    }

    async fn configure_ntp(&self, _servers: &NtpServers) -> Result<()> {
        debug!("NTP is never configured on an emulated BMC");
        Ok(())
    }
}
