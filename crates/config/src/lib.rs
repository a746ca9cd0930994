// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! YAML device manifests describing one MCP23017 and how its pins are used.

use anyhow::{Context, Result};
use mcp23017_driver::builder::{address_from_pins, BASE_ADDRESS, MAX_ADDRESS};
use mcp23017_driver::pins::PIN_COUNT;
use mcp23017_driver::{PinLevel, PinMode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const SCHEMA_VERSION: &str = "1.0";

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    #[error("Unsupported schema_version '{0}'. Supported versions: '1.0'")]
    UnsupportedSchema(String),
    #[error("Give either 'address' or 'address_pins', not both")]
    ConflictingAddress,
    #[error("Missing 'address' or 'address_pins'")]
    MissingAddress,
    #[error("Address {0:#04x} is outside 0x20-0x27")]
    AddressOutOfRange(u8),
    #[error("Pin {0} is out of range (expected 0-15)")]
    PinOutOfRange(u8),
    #[error("Pin {0} is bound more than once")]
    DuplicatePin(u8),
    #[error("Pin {0} is an output and cannot raise interrupts")]
    InterruptOnOutput(u8),
    #[error("Pin {0} is an input; initial 'level' only applies to outputs")]
    LevelOnInput(u8),
    #[error("Pin {0} enables interrupts but no interrupt lines are wired")]
    InterruptWithoutWiring(u8),
}

/// Strap levels of the A2/A1/A0 pins.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressPins {
    #[serde(default)]
    pub a2: bool,
    #[serde(default)]
    pub a1: bool,
    #[serde(default)]
    pub a0: bool,
}

impl AddressPins {
    pub fn address(&self) -> u8 {
        address_from_pins(self.a2, self.a1, self.a0)
    }
}

/// Host input line ids the INTA/INTB outputs are wired to. Equal ids mean
/// both outputs share one line.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptWiringConfig {
    #[serde(default)]
    pub bank_a: Option<u32>,
    #[serde(default)]
    pub bank_b: Option<u32>,
}

impl InterruptWiringConfig {
    pub fn is_wired(&self) -> bool {
        self.bank_a.is_some() || self.bank_b.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PinBinding {
    pub pin: u8,
    #[serde(default)]
    pub mode: PinMode,
    /// Initial level for outputs.
    #[serde(default)]
    pub level: Option<PinLevel>,
    #[serde(default)]
    pub interrupt: bool,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeviceManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    pub bus_id: i32,
    #[serde(default)]
    pub address: Option<u8>,
    #[serde(default)]
    pub address_pins: Option<AddressPins>,
    #[serde(default)]
    pub interrupts: InterruptWiringConfig,
    #[serde(default)]
    pub pins: Vec<PinBinding>,
}

impl DeviceManifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to open device manifest at {:?}", path.as_ref()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let manifest: Self =
            serde_yaml::from_str(content).context("Failed to parse Device Manifest YAML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Address from whichever form the manifest uses.
    pub fn resolved_address(&self) -> Result<u8, ManifestError> {
        let address = match (self.address, self.address_pins) {
            (Some(_), Some(_)) => return Err(ManifestError::ConflictingAddress),
            (None, None) => return Err(ManifestError::MissingAddress),
            (Some(address), None) => address,
            (None, Some(pins)) => pins.address(),
        };
        if !(BASE_ADDRESS..=MAX_ADDRESS).contains(&address) {
            return Err(ManifestError::AddressOutOfRange(address));
        }
        Ok(address)
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ManifestError::UnsupportedSchema(
                self.schema_version.clone(),
            ));
        }
        self.resolved_address()?;

        let mut seen = HashSet::new();
        for binding in &self.pins {
            let pin = binding.pin;
            if pin >= PIN_COUNT {
                return Err(ManifestError::PinOutOfRange(pin));
            }
            if !seen.insert(pin) {
                return Err(ManifestError::DuplicatePin(pin));
            }
            if binding.mode.is_output() {
                if binding.interrupt {
                    return Err(ManifestError::InterruptOnOutput(pin));
                }
            } else if binding.level.is_some() {
                return Err(ManifestError::LevelOnInput(pin));
            }
            if binding.interrupt && !self.interrupts.is_wired() {
                return Err(ManifestError::InterruptWithoutWiring(pin));
            }
        }
        Ok(())
    }

    pub fn binding(&self, pin: u8) -> Option<&PinBinding> {
        self.pins.iter().find(|b| b.pin == pin)
    }

    /// Looks a binding up by its label.
    pub fn find_label(&self, label: &str) -> Option<&PinBinding> {
        self.pins
            .iter()
            .find(|b| b.label.as_deref() == Some(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> DeviceManifest {
        DeviceManifest {
            schema_version: "1.0".to_string(),
            name: "bench".to_string(),
            bus_id: 1,
            address: Some(0x20),
            address_pins: None,
            interrupts: InterruptWiringConfig::default(),
            pins: vec![],
        }
    }

    #[test]
    fn test_address_forms() {
        let mut m = base();
        assert_eq!(m.resolved_address(), Ok(0x20));

        m.address_pins = Some(AddressPins { a2: true, a1: true, a0: false });
        assert_eq!(m.resolved_address(), Err(ManifestError::ConflictingAddress));

        m.address = None;
        assert_eq!(m.resolved_address(), Ok(0x26));

        m.address_pins = None;
        assert_eq!(m.resolved_address(), Err(ManifestError::MissingAddress));

        m.address = Some(0x40);
        assert_eq!(m.resolved_address(), Err(ManifestError::AddressOutOfRange(0x40)));
    }

    #[test]
    fn test_binding_rules() {
        let output = |pin, interrupt| PinBinding {
            pin,
            mode: PinMode::Output,
            level: None,
            interrupt,
            label: None,
        };

        let mut m = base();
        m.pins = vec![output(3, false), output(3, false)];
        assert_eq!(m.validate(), Err(ManifestError::DuplicatePin(3)));

        m.pins = vec![output(16, false)];
        assert_eq!(m.validate(), Err(ManifestError::PinOutOfRange(16)));

        m.interrupts.bank_a = Some(1);
        m.interrupts.bank_b = Some(1);
        m.pins = vec![output(4, true)];
        assert_eq!(m.validate(), Err(ManifestError::InterruptOnOutput(4)));

        m.pins = vec![PinBinding {
            pin: 9,
            mode: PinMode::Input,
            level: Some(PinLevel::High),
            interrupt: false,
            label: None,
        }];
        assert_eq!(m.validate(), Err(ManifestError::LevelOnInput(9)));
    }

    #[test]
    fn test_interrupt_needs_wiring() {
        let mut m = base();
        m.pins = vec![PinBinding {
            pin: 12,
            mode: PinMode::InputWithPullUp,
            level: None,
            interrupt: true,
            label: Some("button".to_string()),
        }];
        assert_eq!(m.validate(), Err(ManifestError::InterruptWithoutWiring(12)));

        m.interrupts.bank_b = Some(4);
        m.interrupts.bank_a = Some(4);
        assert_eq!(m.validate(), Ok(()));
        assert_eq!(m.find_label("button").map(|b| b.pin), Some(12));
    }
}
