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

//! JSON structures of the AMI web API.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

/// Session resource: POST to log in, DELETE to log out.
pub const SESSION_PATH: &str = "/api/session";
/// User slots.
pub const USERS_PATH: &str = "/api/settings/users";
/// KCS interface policy.
pub const KCS_PATH: &str = "/api/settings/ipmi/kcs-policy";

/// Slot of the anonymous user, never reused.
pub const RESERVED_USER_SLOT: u32 = 1;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "CSRFToken")]
    pub csrf_token: String,
}

/// User slot as returned and accepted by the web API.
///
/// PUT requests are rejected unless every field is present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub access: u8,
    #[serde(default)]
    pub kvm: u8,
    #[serde(default)]
    pub vmedia: u8,
    #[serde(default)]
    pub snmp: u8,
    #[serde(default)]
    pub prev_snmp: u8,
    #[serde(default)]
    pub network_privilege: String,
    #[serde(default)]
    pub fixed_user_count: u32,
    #[serde(default)]
    pub snmp_access: String,
    #[serde(default)]
    pub snmp_authentication_protocol: String,
    #[serde(default)]
    pub snmp_privacy_protocol: String,
    #[serde(default)]
    pub email_id: String,
    #[serde(default)]
    pub email_format: String,
    #[serde(default)]
    pub ssh_key: String,
    #[serde(default)]
    pub creation_time: u64,
    #[serde(default)]
    pub changepassword: u8,
    #[serde(default, rename = "UserOperation")]
    pub user_operation: u8,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub password_size: String,
}

impl UserRecord {
    /// Fill in the password fields.
    pub fn set_password(&mut self, password: &str) {
        self.changepassword = 1;
        self.password = password.to_string();
        self.confirm_password = password.to_string();
        self.password_size = if password.len() > 16 {
            "bytes_20".into()
        } else {
            "bytes_16".into()
        };
    }

    /// Turn a free slot into an enabled administrator.
    pub fn make_admin(&mut self, name: &str, password: &str) {
        self.name = name.to_string();
        self.access = 1;
        self.kvm = 1;
        self.vmedia = 1;
        self.network_privilege = "administrator".into();
        self.snmp_access = "read_only".into();
        self.snmp_authentication_protocol = "sha".into();
        self.snmp_privacy_protocol = "des".into();
        self.email_format = "ami_format".into();
        self.user_operation = 1;
        self.set_password(password);
    }
}

/// KCS policy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KcsPolicy {
    pub kcs_policy_mode: String,
}

/// Mode allowing every command over KCS.
pub const KCS_ALLOW_ALL: &str = "allow_all";
/// Mode denying every command over KCS.
pub const KCS_DENY_ALL: &str = "deny_all";
