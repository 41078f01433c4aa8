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

//! Connection configuration and enrollment settings.

use std::env;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use super::{Error, ErrorKind, Result};

/// Environment variable with the primary NTP server.
pub const NTP_SERVER1_ENV: &str = "BMC_NTP_SERVER1";
/// Environment variable with the secondary NTP server.
pub const NTP_SERVER2_ENV: &str = "BMC_NTP_SERVER2";

const DEFAULT_NTP_SERVER1: &str = "10.104.196.174";
const DEFAULT_NTP_SERVER2: &str = "10.104.192.105";

const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Connection details of one BMC.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Endpoint URL, e.g. `https://10.0.0.5`.
    pub url: String,
    /// BMC user name.
    pub username: String,
    /// BMC password.
    pub password: String,
}

impl Config {
    /// Create a new connection configuration.
    pub fn new<U, N, P>(url: U, username: N, password: P) -> Config
    where
        U: Into<String>,
        N: Into<String>,
        P: Into<String>,
    {
        Config {
            url: url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Host part of the URL, used by IPMI which has no notion of schemes.
    pub fn host(&self) -> &str {
        let rest = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        let authority = rest.split('/').next().unwrap_or(rest);
        // IPv6 literals keep their brackets out of the result.
        if let Some(stripped) = authority.strip_prefix('[') {
            return stripped.split(']').next().unwrap_or(stripped);
        }
        authority.split(':').next().unwrap_or(authority)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// NTP servers pushed to the BMC.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NtpServers {
    /// Primary server.
    pub primary: String,
    /// Secondary server.
    pub secondary: String,
}

impl NtpServers {
    /// Create from explicit addresses.
    pub fn new<S1: Into<String>, S2: Into<String>>(primary: S1, secondary: S2) -> NtpServers {
        NtpServers {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    /// Read the servers from `BMC_NTP_SERVER1` and `BMC_NTP_SERVER2`.
    ///
    /// Unset or empty variables fall back to the built-in defaults.
    pub fn from_env() -> NtpServers {
        let dflt = NtpServers::default();
        let primary = non_empty_var(NTP_SERVER1_ENV).unwrap_or(dflt.primary);
        let secondary = non_empty_var(NTP_SERVER2_ENV).unwrap_or(dflt.secondary);
        debug!("Using NTP servers {} and {}", primary, secondary);
        NtpServers { primary, secondary }
    }

    /// Both servers in order.
    pub fn to_vec(&self) -> Vec<String> {
        vec![self.primary.clone(), self.secondary.clone()]
    }
}

impl Default for NtpServers {
    fn default() -> NtpServers {
        NtpServers::new(DEFAULT_NTP_SERVER1, DEFAULT_NTP_SERVER2)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Settings of the enrollment process, usually loaded from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// NTP servers to configure on BMCs.
    #[serde(default)]
    pub ntp: NtpServers,
    /// Timeout of a single Redfish or web API request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            ntp: NtpServers::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Settings> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Cannot read {}: {}", path.display(), e),
            )
        })?;
        let settings: Settings = serde_yaml::from_reader(file).map_err(|e| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Cannot parse {}: {}", path.display(), e),
            )
        })?;
        trace!("Loaded settings {:?} from {}", settings, path.display());
        Ok(settings)
    }

    /// Parse settings from a YAML string.
    pub fn from_yaml(source: &str) -> Result<Settings> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Request timeout as a duration.
    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}
