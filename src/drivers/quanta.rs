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

//! Quanta servers.
//!
//! The D54Q-2U is managed through its AMI web API, the D55Q-2U over IPMI LAN.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::super::ipmi::{ChassisControl, KCS_POLICY_ALLOW_ALL, KCS_POLICY_DENY_ALL};
use super::super::types::{CpuInfo, PowerState};
use super::super::websession::protocol::{
    KcsPolicy, UserRecord, KCS_ALLOW_ALL, KCS_DENY_ALL, KCS_PATH, RESERVED_USER_SLOT, USERS_PATH,
};
use super::super::websession::{with_session, WebApi, WebSession};
use super::super::{Error, ErrorKind, Result, ResultExt};
use super::base::BaseDriver;
use super::lan::LanControl;
use super::Driver;

/// CPU id of the D54Q-2U, which does not report one.
pub const QUANTA_D54Q_CPU_ID: &str = "0x806F8";

async fn list_users(api: &dyn WebApi, session: &WebSession) -> Result<Vec<UserRecord>> {
    let users = api
        .get(session, USERS_PATH)
        .await
        .context("unable to list users")?;
    Ok(serde_json::from_value(users)?)
}

async fn put_user(api: &dyn WebApi, session: &WebSession, user: &UserRecord) -> Result<()> {
    let path = format!("{}/{}", USERS_PATH, user.id);
    let body = serde_json::to_value(user)?;
    let _ = api
        .put(session, &path, &body)
        .await
        .with_context(|| format!("failed to update user slot {}", user.id))?;
    Ok(())
}

/// Driver of the Quanta D54Q-2U using the web API.
pub struct QuantaWebDriver {
    base: BaseDriver,
    web: Arc<dyn WebApi>,
}

impl fmt::Debug for QuantaWebDriver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("QuantaWebDriver")
            .field("base", &self.base)
            .finish()
    }
}

impl QuantaWebDriver {
    pub(crate) fn new(base: BaseDriver, web: Arc<dyn WebApi>) -> QuantaWebDriver {
        QuantaWebDriver { base, web }
    }

    async fn set_kcs_policy(&self, mode: &'static str) -> Result<()> {
        info!("Setting KCS policy {} on {}", mode, self.base.name());
        with_session(self.web.as_ref(), move |api, session| {
            Box::pin(async move {
                let body = json!({ "kcs_policy_mode": mode });
                let _ = api
                    .put(session, KCS_PATH, &body)
                    .await
                    .context("failed to set KCS policy")?;

                let current: KcsPolicy = serde_json::from_value(api.get(session, KCS_PATH).await?)?;
                if current.kcs_policy_mode != mode {
                    return Err(Error::new(
                        ErrorKind::OperationFailed,
                        format!(
                            "KCS policy is {:?} after the update, expected {}",
                            current.kcs_policy_mode, mode
                        ),
                    ));
                }
                Ok(())
            })
        })
        .await
    }
}

#[async_trait]
impl Driver for QuantaWebDriver {
    fn base(&self) -> &BaseDriver {
        &self.base
    }

    async fn update_account(&self, username: &str, password: &str) -> Result<()> {
        info!("Updating BMC credentials of {} on {}", username, self.base.name());
        let username = username.to_string();
        let password = password.to_string();
        with_session(self.web.as_ref(), move |api, session| {
            Box::pin(async move {
                let mut user = list_users(api, session)
                    .await?
                    .into_iter()
                    .find(|user| user.name == username)
                    .ok_or_else(|| Error::new(ErrorKind::AccountNotFound, username.clone()))?;
                user.set_password(&password);
                put_user(api, session, &user).await
            })
        })
        .await
    }

    async fn create_account(&self, username: &str, password: &str) -> Result<()> {
        info!("Creating BMC account {} on {}", username, self.base.name());
        let username = username.to_string();
        let password = password.to_string();
        with_session(self.web.as_ref(), move |api, session| {
            Box::pin(async move {
                let mut user = list_users(api, session)
                    .await?
                    .into_iter()
                    .find(|user| user.name.is_empty() && user.id != RESERVED_USER_SLOT)
                    .ok_or_else(|| {
                        Error::new(ErrorKind::ResourceNotFound, "no free user slot")
                    })?;
                debug!("Using user slot {} for {}", user.id, username);
                user.make_admin(&username, &password);
                put_user(api, session, &user).await
            })
        })
        .await
    }

    async fn get_host_cpu(&self) -> Result<CpuInfo> {
        let mut info = self.base.get_host_cpu().await?;
        info.cpu_id = QUANTA_D54Q_CPU_ID.to_string();
        Ok(info)
    }

    async fn enable_kcs(&self) -> Result<()> {
        self.set_kcs_policy(KCS_ALLOW_ALL).await
    }

    async fn disable_kcs(&self) -> Result<()> {
        self.set_kcs_policy(KCS_DENY_ALL).await
    }
}

/// Driver of the QuantaGrid D55Q-2U using IPMI LAN.
#[derive(Debug)]
pub struct QuantaLanDriver {
    base: BaseDriver,
    lan: LanControl,
}

impl QuantaLanDriver {
    pub(crate) fn new(base: BaseDriver, lan: LanControl) -> QuantaLanDriver {
        QuantaLanDriver { base, lan }
    }
}

#[async_trait]
impl Driver for QuantaLanDriver {
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

    async fn enable_kcs(&self) -> Result<()> {
        self.lan.set_kcs(&self.base, KCS_POLICY_ALLOW_ALL).await
    }

    async fn disable_kcs(&self) -> Result<()> {
        self.lan.set_kcs(&self.base, KCS_POLICY_DENY_ALL).await
    }
}
