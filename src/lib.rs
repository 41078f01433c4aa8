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

//! Vendor-aware BMC drivers for bare metal enrollment.
//!
//! The entry point is [connect](drivers/fn.connect.html), which detects the
//! board behind a BMC and returns a [Driver](drivers/trait.Driver.html) for it:
//!
//! ```rust,no_run
//! use baremetal_bmc::{Config, NtpServers, Transports};
//!
//! # async fn enroll() -> baremetal_bmc::Result<()> {
//! let config = Config::new("https://10.0.0.10", "root", "password");
//! let driver = baremetal_bmc::connect(config, &Transports::default()).await?;
//! let nic = driver.get_host_mac_address().await?;
//! if let Some(pattern) = nic.boot_pattern {
//!     driver.sanitize_boot_order(&pattern).await?;
//! }
//! driver.configure_ntp(&NtpServers::from_env()).await?;
//! println!("{}: {:?}", driver.hardware_type(), driver.get_host_cpu().await?);
//! # Ok(()) }
//! ```
//!
//! # Transports
//!
//! Boards are reached over Redfish, IPMI over LAN and AMI-style web APIs.
//! Each transport sits behind a trait, so all of them can be replaced through
//! [Transports](drivers/struct.Transports.html).

#![crate_name = "baremetal_bmc"]
#![crate_type = "lib"]
// NOTE: we do not use generic deny(warnings) to avoid breakages with new
// versions of the compiler. Add more warnings here as you discover them.
#![deny(unsafe_code)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    non_shorthand_field_patterns,
    overflowing_literals,
    path_statements,
    trivial_casts,
    trivial_numeric_casts,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_extern_crates,
    unused_import_braces,
    unused_parens,
    unused_qualifications,
    unused_results,
    while_true
)]

#[macro_use]
extern crate log;

#[macro_use]
mod utils;

pub mod config;
pub mod discovery;
pub mod drivers;
mod error;
pub mod ipmi;
pub mod redfish;
pub mod types;
pub mod websession;

pub use crate::config::{Config, NtpServers, Settings};
pub use crate::drivers::{connect, detect_hardware, BaseDriver, Driver, Transports};
pub use crate::error::{Error, ErrorKind, Result, ResultExt};
pub use crate::types::{CpuInfo, GpuInfo, HardwareType, HostNic, MemoryMode, PowerState, ResetType};
