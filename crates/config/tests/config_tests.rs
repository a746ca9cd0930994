// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use mcp23017_config::{DeviceManifest, ManifestError};
use mcp23017_driver::{PinLevel, PinMode};
use std::io::Write;

#[test]
fn test_full_manifest_parses() {
    let yaml = r#"
schema_version: "1.0"
name: "door-panel"
bus_id: 1
address_pins:
  a0: true
interrupts:
  bank_a: 17
  bank_b: 17
pins:
  - pin: 0
    mode: output
    level: high
    label: "status-led"
  - pin: 8
    mode: input_with_pull_up
    interrupt: true
    label: "door"
"#;
    let manifest = DeviceManifest::from_yaml(yaml).unwrap();
    assert_eq!(manifest.name, "door-panel");
    assert_eq!(manifest.resolved_address().unwrap(), 0x21);
    assert_eq!(manifest.interrupts.bank_a, Some(17));
    assert_eq!(manifest.pins.len(), 2);
    assert_eq!(manifest.pins[0].level, Some(PinLevel::High));
    assert_eq!(manifest.binding(8).unwrap().mode, PinMode::InputWithPullUp);
    assert!(manifest.binding(8).unwrap().interrupt);
}

#[test]
fn test_defaults_apply() {
    let yaml = r#"
name: "minimal"
bus_id: 0
address: 0x27
pins:
  - pin: 5
"#;
    let manifest = DeviceManifest::from_yaml(yaml).unwrap();
    assert_eq!(manifest.schema_version, "1.0");
    assert_eq!(manifest.pins[0].mode, PinMode::Input);
    assert!(!manifest.pins[0].interrupt);
    assert!(!manifest.interrupts.is_wired());
}

#[test]
fn test_invalid_manifest_reports_rule() {
    let yaml = r#"
name: "broken"
bus_id: 1
address: 0x20
pins:
  - pin: 2
    mode: output
  - pin: 2
    mode: input
"#;
    let err = DeviceManifest::from_yaml(yaml).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ManifestError>(),
        Some(&ManifestError::DuplicatePin(2))
    );
}

#[test]
fn test_unknown_schema_rejected() {
    let yaml = r#"
schema_version: "2.0"
name: "future"
bus_id: 1
address: 0x20
"#;
    let err = DeviceManifest::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("2.0"));
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "name: \"on-disk\"\nbus_id: 2\naddress: 0x22\npins:\n  - pin: 15\n    mode: output\n    level: low"
    )
    .unwrap();

    let manifest = DeviceManifest::from_file(file.path()).unwrap();
    assert_eq!(manifest.bus_id, 2);
    assert_eq!(manifest.pins[0].level, Some(PinLevel::Low));
}

#[test]
fn test_missing_file_has_context() {
    let dir = tempfile::tempdir().unwrap();
    let err = DeviceManifest::from_file(dir.path().join("absent.yaml")).unwrap_err();
    assert!(err.to_string().contains("Failed to open device manifest"));
}
