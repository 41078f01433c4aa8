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

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::{json, Value};

use baremetal_bmc::ipmi::ChassisControl;
use baremetal_bmc::{connect, Driver, ErrorKind, GpuInfo, HardwareType, MemoryMode};

use common::{
    config, redfish_only, set_up, transports, FakeLan, FakeRedfish, FakeWeb, SYSTEM,
};

async fn driver_with(
    redfish: &Arc<FakeRedfish>,
    lan: &Arc<FakeLan>,
    web: &Arc<FakeWeb>,
) -> Box<dyn Driver> {
    set_up();
    connect(config(), &transports(redfish.clone(), lan.clone(), web.clone()))
        .await
        .unwrap()
}

async fn driver(redfish: &Arc<FakeRedfish>) -> Box<dyn Driver> {
    set_up();
    connect(config(), &redfish_only(redfish.clone()))
        .await
        .unwrap()
}

fn port(vendor: &str, mac: &str, slot: u32, media: u32) -> Value {
    json!({
        "AssociatedNetworkAddresses": [mac],
        "VendorId": vendor,
        "Status": {"State": "Enabled", "Health": "OK"},
        "Oem": {"OpenBmc": {"MediaState": media, "SlotNumber": slot}},
    })
}

fn intel(model: &str) -> Arc<FakeRedfish> {
    let redfish = FakeRedfish::with_system(json!({
        "Manufacturer": "Intel Corporation",
        "Model": model,
        "PowerState": "On",
        "NetworkInterfaces": {"@odata.id": format!("{}/NetworkInterfaces", SYSTEM)},
        "Memory": {"@odata.id": format!("{}/Memory", SYSTEM)},
        "PCIeDevices": [
            {"@odata.id": "/redfish/v1/Chassis/1/PCIeDevices/1"},
            {"@odata.id": "/redfish/v1/Chassis/1/PCIeDevices/2"},
            {"@odata.id": "/redfish/v1/Chassis/1/PCIeDevices/3"},
        ],
        "Oem": {"OpenBmc": {"FirmwareProvisioning": {"ProvisioningStatus": "ProvisionedAndLocked"}}},
    }));
    redfish.insert_collection(
        &format!("{}/NetworkInterfaces", SYSTEM),
        vec![
            (
                format!("{}/NetworkInterfaces/0", SYSTEM),
                json!({"NetworkPorts": {"@odata.id": format!("{}/NetworkInterfaces/0/Ports", SYSTEM)}}),
            ),
            (
                format!("{}/NetworkInterfaces/1", SYSTEM),
                json!({"NetworkPorts": {"@odata.id": format!("{}/NetworkInterfaces/1/Ports", SYSTEM)}}),
            ),
        ],
    );
    redfish.insert_collection(
        &format!("{}/NetworkInterfaces/0/Ports", SYSTEM),
        vec![(
            format!("{}/NetworkInterfaces/0/Ports/0", SYSTEM),
            port("8086h", "a4:bf:01:00:00:01", 0, 1),
        )],
    );
    redfish.insert_collection(
        &format!("{}/NetworkInterfaces/1/Ports", SYSTEM),
        vec![
            (
                format!("{}/NetworkInterfaces/1/Ports/0", SYSTEM),
                port("15b3h", "b8:ce:f6:00:00:01", 2, 0),
            ),
            (
                format!("{}/NetworkInterfaces/1/Ports/1", SYSTEM),
                port("15b3h", "b8:ce:f6:00:00:02", 2, 1),
            ),
        ],
    );
    redfish.insert_collection(
        &format!("{}/Memory", SYSTEM),
        vec![
            (
                format!("{}/Memory/0", SYSTEM),
                json!({"MemoryDeviceType": "DDR5"}),
            ),
            (
                format!("{}/Memory/1", SYSTEM),
                json!({"MemoryDeviceType": "HBM2"}),
            ),
        ],
    );
    redfish.insert(
        "/redfish/v1/Chassis/1/PCIeDevices/1/PCIeFunctions/0",
        json!({"Id": "0", "VendorId": "0x8086", "DeviceId": "0x0bda"}),
    );
    redfish.insert(
        "/redfish/v1/Chassis/1/PCIeDevices/2/PCIeFunctions/0",
        json!({"Id": "0", "VendorId": "0x15b3", "DeviceId": "0x1021"}),
    );
    redfish.insert(
        "/redfish/v1/Chassis/1/PCIeDevices/3/PCIeFunctions/0",
        json!({"Id": "0", "VendorId": "0x8086", "DeviceId": "0x0bda"}),
    );
    redfish
}

#[tokio::test]
async fn test_intel_mac_prefers_mellanox() {
    let redfish = intel("D50DNP1SBB");
    let nic = driver(&redfish).await.get_host_mac_address().await.unwrap();
    assert_eq!(nic.mac_address.to_string(), "B8:CE:F6:00:00:02");
    assert_eq!(
        nic.boot_pattern.as_deref(),
        Some("UEFI PXEv4.*Mellanox.*Riser")
    );
}

#[tokio::test]
async fn test_intel_mac_baseboard_fallback() {
    let redfish = intel("M50CYP2SB2U");
    redfish.insert_collection(&format!("{}/NetworkInterfaces/1/Ports", SYSTEM), vec![]);
    let nic = driver(&redfish).await.get_host_mac_address().await.unwrap();
    assert_eq!(nic.mac_address.to_string(), "A4:BF:01:00:00:01");
    assert_eq!(
        nic.boot_pattern.as_deref(),
        Some("UEFI PXEv4.*Intel.*Onboard")
    );
}

#[tokio::test]
async fn test_intel_gpu_discovery() {
    let redfish = intel("D50DNP1SBB");
    let gpus = driver(&redfish).await.gpu_discovery().await.unwrap();
    assert_eq!(gpus, GpuInfo::fixed(2, "GPU-Max-1100"));
}

#[tokio::test]
async fn test_intel_hbm_discovery() {
    let redfish = intel("D50DNP1SBB");
    let driver = driver(&redfish).await;
    assert_eq!(driver.hbm_discovery().await.unwrap(), MemoryMode::Flat);

    redfish.insert_collection(
        &format!("{}/Memory", SYSTEM),
        vec![(
            format!("{}/Memory/0", SYSTEM),
            json!({"MemoryDeviceType": "HBM2"}),
        )],
    );
    assert_eq!(driver.hbm_discovery().await.unwrap(), MemoryMode::HbmOnly);
}

#[tokio::test]
async fn test_intel_firmware_resilience() {
    let redfish = intel("D50DNP1SBB");
    let driver = driver(&redfish).await;
    driver.verify_firmware_resilience().await.unwrap();

    redfish.insert(
        SYSTEM,
        json!({
            "@odata.id": SYSTEM,
            "Manufacturer": "Intel Corporation",
            "Model": "D50DNP1SBB",
            "Oem": {"OpenBmc": {"FirmwareProvisioning": {"ProvisioningStatus": "NotProvisioned"}}},
        }),
    );
    let err = driver.verify_firmware_resilience().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationFailed);
}

#[tokio::test]
async fn test_intel_kcs_over_lan() {
    let redfish = intel("HLS-Gaudi3");
    let lan = FakeLan::new();
    let driver = driver_with(&redfish, &lan, &FakeWeb::new(json!([]))).await;

    driver.enable_kcs().await.unwrap();
    assert_eq!(*lan.kcs_mode.lock().unwrap(), 0x03);
    driver.disable_kcs().await.unwrap();
    assert_eq!(*lan.kcs_mode.lock().unwrap(), 0x00);

    let calls = lan.raw_calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            (0x30, 0xb4, vec![0x03]),
            (0x30, 0xb3, vec![]),
            (0x30, 0xb4, vec![0x00]),
            (0x30, 0xb3, vec![]),
        ]
    );
    assert_eq!(lan.opened.load(Ordering::SeqCst), 2);
    assert_eq!(lan.closed.load(Ordering::SeqCst), 2);
}

fn supermicro(model: &str) -> Arc<FakeRedfish> {
    let redfish = FakeRedfish::with_system(json!({
        "Manufacturer": "Supermicro",
        "Model": model,
        "PowerState": "On",
    }));
    redfish.insert_collection(
        "/redfish/v1/Chassis/1/PCIeDevices",
        vec![
            ("/redfish/v1/Chassis/1/PCIeDevices/GPU1".to_string(), json!({})),
            ("/redfish/v1/Chassis/1/PCIeDevices/NIC1".to_string(), json!({})),
        ],
    );
    redfish.insert_collection(
        "/redfish/v1/Chassis/1/PCIeDevices/GPU1/PCIeFunctions",
        vec![
            (
                "/redfish/v1/Chassis/1/PCIeDevices/GPU1/PCIeFunctions/1".to_string(),
                json!({"Id": "GPU1", "VendorId": "0x1da3", "DeviceId": "0x1020"}),
            ),
            (
                "/redfish/v1/Chassis/1/PCIeDevices/GPU1/PCIeFunctions/2".to_string(),
                json!({"Id": "GPU2", "VendorId": "0x1da3", "DeviceId": "0x1020"}),
            ),
        ],
    );
    redfish.insert_collection(
        "/redfish/v1/Chassis/1/PCIeDevices/NIC1/PCIeFunctions",
        vec![(
            "/redfish/v1/Chassis/1/PCIeDevices/NIC1/PCIeFunctions/1".to_string(),
            json!({"Id": "NIC1", "VendorId": "0x1da3", "DeviceId": "0x1020"}),
        )],
    );
    redfish.insert(
        "/redfish/v1/Managers/1/Oem/Supermicro/KCSInterface",
        json!({"Privilege": "Callback"}),
    );
    redfish.insert_collection(
        "/redfish/v1/Managers/1/HostInterfaces",
        vec![(
            "/redfish/v1/Managers/1/HostInterfaces/1".to_string(),
            json!({"InterfaceEnabled": true}),
        )],
    );
    redfish.insert(
        "/redfish/v1/Managers/1/Oem/Supermicro/FanMode",
        json!({"Mode": "Standard"}),
    );
    redfish
}

#[tokio::test]
async fn test_supermicro_gpu_walk() {
    let redfish = supermicro("SYS-820GH-TNR2");
    let gpus = driver(&redfish).await.gpu_discovery().await.unwrap();
    assert_eq!(gpus, GpuInfo::fixed(2, "HL-225"));
}

#[tokio::test]
async fn test_supermicro_gpu_fixed() {
    let redfish = supermicro("SYS-822GA-NGR3-IN001");
    let gpus = driver(&redfish).await.gpu_discovery().await.unwrap();
    assert_eq!(gpus, GpuInfo::fixed(8, "HL-325"));

    let redfish = supermicro("SYS-821GV-TNRT");
    let gpus = driver(&redfish).await.gpu_discovery().await.unwrap();
    assert_eq!(gpus, GpuInfo::fixed(8, "HL-225"));
    assert_eq!(redfish.count("GET", "/redfish/v1/Chassis/1/PCIeDevices"), 0);
}

#[tokio::test]
async fn test_supermicro_kcs_and_hci() {
    let redfish = supermicro("SYS-521GE-TNRT");
    let driver = driver(&redfish).await;

    driver.enable_kcs().await.unwrap();
    assert_eq!(
        redfish.resource("/redfish/v1/Managers/1/Oem/Supermicro/KCSInterface")["Privilege"],
        "Administrator"
    );
    driver.disable_kcs().await.unwrap();
    assert_eq!(
        redfish.resource("/redfish/v1/Managers/1/Oem/Supermicro/KCSInterface")["Privilege"],
        "Callback"
    );

    driver.disable_hci().await.unwrap();
    assert_eq!(
        redfish.resource("/redfish/v1/Managers/1/HostInterfaces/1")["InterfaceEnabled"],
        false
    );
    driver.enable_hci().await.unwrap();
    assert_eq!(
        redfish.resource("/redfish/v1/Managers/1/HostInterfaces/1")["InterfaceEnabled"],
        true
    );
}

#[tokio::test(start_paused = true)]
async fn test_supermicro_fan_speed() {
    let redfish = supermicro("SYS-822GA-NGR3-IN001");
    driver(&redfish).await.set_fan_speed().await.unwrap();
    assert_eq!(
        redfish.resource("/redfish/v1/Managers/1/Oem/Supermicro/FanMode")["Mode"],
        "FullSpeed"
    );

    let redfish = supermicro("SYS-521GE-TNRT");
    driver(&redfish).await.set_fan_speed().await.unwrap();
    assert!(redfish.writes().is_empty());
}

const DELL_ATTRIBUTES: &str = "/redfish/v1/Managers/iDRAC.Embedded.1/Attributes";

fn dell(model: &str) -> Arc<FakeRedfish> {
    let redfish = FakeRedfish::with_system(json!({
        "Manufacturer": "Dell Inc.",
        "Model": model,
        "PowerState": "On",
        "Processors": {"@odata.id": format!("{}/Processors", SYSTEM)},
    }));
    redfish.insert(
        &format!("{}/Processors", SYSTEM),
        json!({"Members": [
            {"@odata.id": format!("{}/Processors/CPU.Socket.1", SYSTEM)},
            {"@odata.id": format!("{}/Processors/Video.Embedded.1", SYSTEM)},
            {"@odata.id": format!("{}/Processors/CPU.Socket.2", SYSTEM)},
        ]}),
    );
    for socket in &["CPU.Socket.1", "CPU.Socket.2"] {
        redfish.insert(
            &format!("{}/Processors/{}", SYSTEM, socket),
            json!({
                "ProcessorType": "CPU",
                "Status": {"State": "Enabled", "Health": "OK"},
                "Manufacturer": "Intel",
                "TotalCores": 48,
                "TotalThreads": 96,
                "ProcessorId": {"IdentificationRegisters": "0x000806F8"},
            }),
        );
    }
    redfish.insert(
        "/redfish/v1/AccountService",
        json!({"Accounts": {"@odata.id": "/redfish/v1/Managers/iDRAC.Embedded.1/Accounts"}}),
    );
    let accounts = (1..=4)
        .map(|id| {
            let path = format!("/redfish/v1/Managers/iDRAC.Embedded.1/Accounts/{}", id);
            let name = if id == 2 { "root" } else { "" };
            let body = json!({"@odata.id": path.clone(), "Id": id.to_string(), "UserName": name});
            (path, body)
        })
        .collect();
    redfish.insert_collection("/redfish/v1/Managers/iDRAC.Embedded.1/Accounts", accounts);
    redfish.insert(
        DELL_ATTRIBUTES,
        json!({"Attributes": {"OS-BMC.1.AdminState": "Disabled"}}),
    );
    redfish
}

#[tokio::test]
async fn test_dell_cpu_sockets_only() {
    let redfish = dell("PowerEdge R760");
    let cpu = driver(&redfish).await.get_host_cpu().await.unwrap();
    assert_eq!(cpu.sockets, 2);
    assert_eq!(cpu.cores, 96);
    assert_eq!(cpu.threads, 2);
    assert_eq!(
        redfish.count(
            "GET",
            &format!("{}/Processors/Video.Embedded.1", SYSTEM)
        ),
        0
    );
}

#[tokio::test]
async fn test_dell_create_account() {
    let redfish = dell("PowerEdge R760");
    driver(&redfish)
        .await
        .create_account("enroll", "s3cret")
        .await
        .unwrap();

    let writes = redfish.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(
        writes[0].path,
        "/redfish/v1/Managers/iDRAC.Embedded.1/Accounts/3"
    );
    assert_eq!(writes[0].body["UserName"], "enroll");
    assert_eq!(writes[0].body["RoleId"], "Administrator");
    assert_eq!(writes[1].path, DELL_ATTRIBUTES);
    assert_eq!(
        writes[1].body,
        json!({"Attributes": {"Users.3.IpmiLanPrivilege": "Administrator"}})
    );
}

#[tokio::test(start_paused = true)]
async fn test_dell_hci() {
    let redfish = dell("PowerEdge R760");
    let driver = driver(&redfish).await;
    driver.enable_hci().await.unwrap();
    assert_eq!(
        redfish.resource(DELL_ATTRIBUTES)["Attributes"]["OS-BMC.1.AdminState"],
        "Enabled"
    );
    driver.disable_hci().await.unwrap();
    assert_eq!(
        redfish.resource(DELL_ATTRIBUTES)["Attributes"]["OS-BMC.1.AdminState"],
        "Disabled"
    );
}

#[tokio::test]
async fn test_dell_gpus() {
    let gpus = driver(&dell("PowerEdge XE9680 HL-325"))
        .await
        .gpu_discovery()
        .await
        .unwrap();
    assert_eq!(gpus, GpuInfo::fixed(8, "HL-325"));
    let gpus = driver(&dell("PowerEdge XE9680 Gaudi2"))
        .await
        .gpu_discovery()
        .await
        .unwrap();
    assert_eq!(gpus, GpuInfo::fixed(8, "HL-225"));
    let gpus = driver(&dell("PowerEdge R760"))
        .await
        .gpu_discovery()
        .await
        .unwrap();
    assert_eq!(gpus, GpuInfo::default());
}

fn quanta(model: &str, power: &str) -> Arc<FakeRedfish> {
    let redfish = FakeRedfish::with_system(json!({
        "Manufacturer": "Quanta Cloud Technology Inc.",
        "Model": model,
        "PowerState": power,
        "Processors": {"@odata.id": format!("{}/Processors", SYSTEM)},
    }));
    redfish.insert_collection(
        &format!("{}/Processors", SYSTEM),
        vec![(
            format!("{}/Processors/CPU0", SYSTEM),
            json!({
                "ProcessorType": "CPU",
                "Status": {"State": "Enabled"},
                "TotalCores": 32,
                "TotalThreads": 64,
            }),
        )],
    );
    redfish
}

fn web_users() -> Value {
    json!([
        {"id": 1, "name": ""},
        {"id": 2, "name": "admin"},
        {"id": 3, "name": ""},
    ])
}

#[tokio::test]
async fn test_quanta_web_update_account() {
    let web = FakeWeb::new(web_users());
    let driver = driver_with(&quanta("D54Q-2U", "On"), &FakeLan::new(), &web).await;
    driver.update_account("admin", "s3cret").await.unwrap();

    let puts = web.puts.lock().unwrap().clone();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].path, "/api/settings/users/2");
    assert_eq!(puts[0].body["password"], "s3cret");
    assert_eq!(puts[0].body["changepassword"], 1);
    assert_eq!(web.logins.load(Ordering::SeqCst), 1);
    assert_eq!(web.logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_quanta_web_update_missing_account() {
    let web = FakeWeb::new(web_users());
    let driver = driver_with(&quanta("D54Q-2U", "On"), &FakeLan::new(), &web).await;
    let err = driver.update_account("nobody", "s3cret").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccountNotFound);
    assert_eq!(web.logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_quanta_web_create_account() {
    let web = FakeWeb::new(web_users());
    let driver = driver_with(&quanta("D54Q-2U", "On"), &FakeLan::new(), &web).await;
    driver.create_account("enroll", "s3cret").await.unwrap();

    let puts = web.puts.lock().unwrap().clone();
    assert_eq!(puts[0].path, "/api/settings/users/3");
    assert_eq!(puts[0].body["name"], "enroll");
    assert_eq!(puts[0].body["network_privilege"], "administrator");
    assert_eq!(web.logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_quanta_web_kcs() {
    let web = FakeWeb::new(web_users());
    let driver = driver_with(&quanta("D54Q-2U", "On"), &FakeLan::new(), &web).await;
    driver.enable_kcs().await.unwrap();
    assert_eq!(web.kcs.lock().unwrap()["kcs_policy_mode"], "allow_all");
    driver.disable_kcs().await.unwrap();
    assert_eq!(web.kcs.lock().unwrap()["kcs_policy_mode"], "deny_all");
    assert_eq!(web.logins.load(Ordering::SeqCst), 2);
    assert_eq!(web.logouts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_quanta_web_cpu_id() {
    let driver = driver_with(
        &quanta("D54Q-2U", "On"),
        &FakeLan::new(),
        &FakeWeb::new(web_users()),
    )
    .await;
    let cpu = driver.get_host_cpu().await.unwrap();
    assert_eq!(cpu.cpu_id, "0x806F8");
    assert_eq!(cpu.threads, 2);
}

#[tokio::test(start_paused = true)]
async fn test_quanta_lan_power() {
    let redfish = quanta("QuantaGrid D55Q-2U", "Off");
    let lan = FakeLan::powered(false);
    let driver = driver_with(&redfish, &lan, &FakeWeb::new(json!([]))).await;
    let detection_calls = redfish.calls().len();

    driver.power_on().await.unwrap();
    assert!(lan.is_on());
    driver.power_on().await.unwrap();
    driver.power_off().await.unwrap();
    assert!(!lan.is_on());
    assert_eq!(
        *lan.chassis.lock().unwrap(),
        vec![ChassisControl::PowerUp, ChassisControl::PowerDown]
    );
    assert_eq!(lan.opened.load(Ordering::SeqCst), 3);
    assert_eq!(lan.closed.load(Ordering::SeqCst), 3);
    // Power control never touches Redfish.
    assert_eq!(redfish.calls().len(), detection_calls);
}

#[tokio::test]
async fn test_quanta_lan_kcs() {
    let redfish = quanta("QuantaGrid D55Q-2U", "On");
    let lan = FakeLan::new();
    let driver = driver_with(&redfish, &lan, &FakeWeb::new(json!([]))).await;
    driver.enable_kcs().await.unwrap();
    assert_eq!(*lan.kcs_mode.lock().unwrap(), 0x03);
    assert_eq!(lan.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wiwynn() {
    let redfish = FakeRedfish::with_system(json!({
        "Manufacturer": "WIWYNN",
        "Model": "",
        "PowerState": "On",
    }));
    let lan = FakeLan::powered(true);
    let driver = driver_with(&redfish, &lan, &FakeWeb::new(json!([]))).await;

    assert_eq!(
        driver.gpu_discovery().await.unwrap(),
        GpuInfo::fixed(8, "HL-225")
    );
    driver.power_off().await.unwrap();
    assert_eq!(*lan.chassis.lock().unwrap(), vec![ChassisControl::PowerDown]);
    driver.disable_kcs().await.unwrap();
    assert_eq!(*lan.kcs_mode.lock().unwrap(), 0x00);
}

fn wiwynn_lan() -> Arc<FakeLan> {
    Arc::new(FakeLan {
        manufacturer: "WIWYNN".to_string(),
        ..Default::default()
    })
}

#[tokio::test(start_paused = true)]
async fn test_wiwynn_power_without_redfish() {
    let redfish = FakeRedfish::new();
    let lan = wiwynn_lan();
    let driver = driver_with(&redfish, &lan, &FakeWeb::new(json!([]))).await;
    assert_eq!(driver.hardware_type(), HardwareType::Gaudi2Wiwynn);
    let detection_calls = redfish.calls().len();

    driver.power_on().await.unwrap();
    assert!(lan.is_on());
    driver.power_off().await.unwrap();
    assert!(!lan.is_on());
    assert_eq!(
        *lan.chassis.lock().unwrap(),
        vec![ChassisControl::PowerUp, ChassisControl::PowerDown]
    );
    assert_eq!(redfish.calls().len(), detection_calls);
    assert_eq!(
        lan.opened.load(Ordering::SeqCst),
        lan.closed.load(Ordering::SeqCst)
    );
}

#[tokio::test(start_paused = true)]
async fn test_lan_power_timeout() {
    let lan = wiwynn_lan();
    lan.stuck.store(true, Ordering::SeqCst);
    let driver = driver_with(&FakeRedfish::new(), &lan, &FakeWeb::new(json!([]))).await;

    let started = tokio::time::Instant::now();
    let err = driver.power_on().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationTimedOut);
    assert!(err
        .to_string()
        .contains("to transition to power state 'On'"));
    assert_eq!(started.elapsed().as_secs(), 4);
    // Initial read plus polls at 0 and 2 seconds.
    assert_eq!(lan.status_reads.load(Ordering::SeqCst), 3);
    assert_eq!(*lan.chassis.lock().unwrap(), vec![ChassisControl::PowerUp]);
    assert_eq!(
        lan.opened.load(Ordering::SeqCst),
        lan.closed.load(Ordering::SeqCst)
    );
}
