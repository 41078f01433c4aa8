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

//! Hardware classification shared by drivers.

use regex::Regex;

use super::redfish::protocol::{Processor, ResourceState};
use super::types::{CpuInfo, GpuInfo, MemoryMode};
use super::{Error, ErrorKind, Result, ResultExt};

/// CPU id reported when the BMC does not provide one.
pub const DEFAULT_CPU_ID: &str = "0x00000";

/// Memory device type of DDR5 DIMMs.
pub const MEMORY_DDR5: &str = "DDR5";
/// Memory device type of on-package HBM.
pub const MEMORY_HBM: &str = "HBM2";

const CPU_PROCESSOR_TYPE: &str = "CPU";

/// Known accelerators by `vendor:device` id.
const ACCELERATORS: &[(&str, &str)] = &[
    ("0x8086:0x56c0", "GPU-Flex-170"),
    ("0x8086:0x0bda", "GPU-Max-1100"),
    ("0x1da3:0x1020", "HL-225"),
    ("0x1da3:0x1060", "HL-325"),
    ("0x10de:0x20b5", "A100"),
];

fn normalize_pci_id(id: &str) -> String {
    let id = id.trim().to_ascii_lowercase();
    if id.starts_with("0x") {
        id
    } else {
        format!("0x{}", id)
    }
}

/// Look up an accelerator model by PCI vendor and device ids.
pub fn accelerator_model(vendor_id: &str, device_id: &str) -> Option<&'static str> {
    let key = format!(
        "{}:{}",
        normalize_pci_id(vendor_id),
        normalize_pci_id(device_id)
    );
    ACCELERATORS
        .iter()
        .find(|(id, _)| *id == key)
        .map(|(_, model)| *model)
}

/// Accumulates accelerators found during a PCIe walk.
#[derive(Debug, Clone, Default)]
pub struct AcceleratorTally {
    count: u32,
    model: String,
}

impl AcceleratorTally {
    /// Count the function if its ids are known.
    ///
    /// Returns whether the function was recognized.
    pub fn add(&mut self, vendor_id: &str, device_id: &str) -> bool {
        match accelerator_model(vendor_id, device_id) {
            Some(model) => {
                self.count += 1;
                self.model = model.to_string();
                true
            }
            None => {
                trace!("Skipping unknown PCIe function {}:{}", vendor_id, device_id);
                false
            }
        }
    }

    /// Final inventory.
    pub fn finish(self) -> GpuInfo {
        GpuInfo {
            count: self.count,
            model: self.model,
        }
    }
}

/// Canonical five digit CPU id.
pub fn canonical_cpu_id(registers: &str) -> String {
    if registers.is_empty() {
        return DEFAULT_CPU_ID.to_string();
    }

    let mut id = registers.replace('-', "");
    if registers.len() > 5 {
        let skip = id.chars().count().saturating_sub(5);
        id = id.chars().skip(skip).collect();
    }
    if id.starts_with("0x") {
        id
    } else {
        format!("0x{}", id)
    }
}

fn overflow(what: &str) -> Error {
    Error::new(
        ErrorKind::InvalidResponse,
        format!("total number of CPU {} does not fit into 32 bits", what),
    )
}

/// Summarize enabled CPUs.
pub fn summarize_cpus(processors: &[Processor]) -> Result<CpuInfo> {
    let available = processors
        .iter()
        .filter(|p| p.processor_type == CPU_PROCESSOR_TYPE)
        .filter(|p| p.status.state == Some(ResourceState::Enabled))
        .collect::<Vec<_>>();
    let first = available.first().ok_or_else(|| {
        Error::new(ErrorKind::ResourceNotFound, "no available CPU information")
    })?;

    let mut info = CpuInfo {
        cpu_id: canonical_cpu_id(&first.processor_id.identification_registers),
        sockets: 0,
        cores: 0,
        threads: 0,
        manufacturer: first.manufacturer.clone(),
    };
    for cpu in &available {
        info.sockets += 1;
        info.cores = info
            .cores
            .checked_add(cpu.total_cores)
            .ok_or_else(|| overflow("cores"))?;
        info.threads = info
            .threads
            .checked_add(cpu.total_threads)
            .ok_or_else(|| overflow("threads"))?;
    }
    if info.cores == 0 {
        return Err(Error::new(
            ErrorKind::InvalidResponse,
            format!("no available CPU resource: {:?}", info),
        ));
    }
    info.threads /= info.cores;
    Ok(info)
}

/// Classify the memory topology from memory device types.
///
/// The census cannot tell flat mode from cache mode, so `Cache` is never returned.
pub fn classify_memory<'a, I>(device_types: I) -> MemoryMode
where
    I: IntoIterator<Item = &'a str>,
{
    let (mut ddr5, mut hbm) = (0usize, 0usize);
    for device_type in device_types {
        match device_type {
            MEMORY_DDR5 => ddr5 += 1,
            MEMORY_HBM => hbm += 1,
            _ => {}
        }
    }
    trace!("Memory census: {} DDR5, {} HBM", ddr5, hbm);
    match (ddr5, hbm) {
        (_, 0) => MemoryMode::None,
        (0, _) => MemoryMode::HbmOnly,
        _ => MemoryMode::Flat,
    }
}

/// Move entries matching `pattern` to the front, keeping relative order.
pub fn move_matching_to_front(order: &[String], pattern: &str) -> Result<Vec<String>> {
    let regex = Regex::new(pattern)
        .map_err(|e| Error::new(ErrorKind::InvalidInput, e.to_string()))
        .with_context(|| format!("invalid boot pattern {:?}", pattern))?;
    let (mut matching, rest): (Vec<String>, Vec<String>) =
        order.iter().cloned().partition(|item| regex.is_match(item));
    matching.extend(rest);
    Ok(matching)
}
