// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! A simulated chip on a simulated host, assembled from a device manifest.

use mcp23017_config::DeviceManifest;
use mcp23017_driver::pins::PIN_COUNT;
use mcp23017_driver::sim::{SimBusProvider, SimChip, SimLine};
use mcp23017_driver::{
    Builder, Edge, ExpanderError, ExpanderResult, Mcp23017, PinEvent, PinLevel, PinMode,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

#[derive(Debug, Serialize)]
pub struct PinReport {
    pub pin: u8,
    pub mode: PinMode,
    pub level: PinLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

pub struct Bench {
    pub device: Mcp23017,
    pub chip: SimChip,
    events: Arc<Mutex<Vec<PinEvent>>>,
    manifest: DeviceManifest,
}

impl Bench {
    /// Builds the device through the regular builder and applies every
    /// pin binding.
    pub fn bring_up(manifest: &DeviceManifest) -> ExpanderResult<Self> {
        let address = manifest
            .resolved_address()
            .map_err(|e| ExpanderError::InvalidConfig(e.to_string()))?;

        let chip = SimChip::new();
        let mut provider = SimBusProvider::new();
        if let Ok(bus_id) = u32::try_from(manifest.bus_id) {
            provider.attach(bus_id, address, chip.clone());
        }

        let (line_a, line_b) = match (manifest.interrupts.bank_a, manifest.interrupts.bank_b) {
            (Some(a), Some(b)) if a == b => {
                let line = SimLine::new(a);
                (Some(Arc::clone(&line)), Some(line))
            }
            (a, b) => (a.map(SimLine::new), b.map(SimLine::new)),
        };
        chip.attach_interrupt_lines(line_a.clone(), line_b.clone());

        let mut builder = Builder::new().bus_id(manifest.bus_id).address(address);
        if let Some(line) = line_a {
            builder = builder.interrupt_bank_a(line);
        }
        if let Some(line) = line_b {
            builder = builder.interrupt_bank_b(line);
        }
        let device = builder.build(&provider)?;

        let events: Arc<Mutex<Vec<PinEvent>>> = Arc::default();
        for binding in &manifest.pins {
            device.set_pin_mode(binding.pin, binding.mode)?;
            if let Some(level) = binding.level {
                device.write_pin(binding.pin, level)?;
            }
            if binding.interrupt {
                let log = Arc::clone(&events);
                device.register_interrupt_handler(binding.pin, move |pin: u8, edge: Edge| {
                    log.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(PinEvent { pin, edge });
                })?;
                device.enable_interrupt(binding.pin)?;
            }
            debug!("Bound pin {} as {:?}", binding.pin, binding.mode);
        }

        info!(
            "Bench '{}' up: bus {} @ {:#04x}, {} pin bindings",
            manifest.name,
            manifest.bus_id,
            address,
            manifest.pins.len()
        );
        Ok(Self {
            device,
            chip,
            events,
            manifest: manifest.clone(),
        })
    }

    /// Pin number for a numeric or labelled target.
    pub fn resolve(&self, target: &str) -> Option<u8> {
        if let Ok(pin) = target.parse::<u8>() {
            return (pin < PIN_COUNT).then_some(pin);
        }
        self.manifest.find_label(target).map(|b| b.pin)
    }

    fn label(&self, pin: u8) -> Option<String> {
        self.manifest.binding(pin).and_then(|b| b.label.clone())
    }

    /// Drives an input pin from outside. Outputs are refused.
    pub fn drive(&self, pin: u8, level: PinLevel) -> ExpanderResult<()> {
        let mode = self.device.pin_mode(pin)?;
        if mode.is_output() {
            return Err(ExpanderError::WrongDirection { pin, mode });
        }
        debug!("Driving pin {} {:?}", pin, level);
        self.chip.drive_input(pin, level);
        Ok(())
    }

    pub fn events(&self) -> Vec<PinEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mode and level of every pin. Inputs are read through the driver,
    /// outputs from the chip's latch.
    pub fn pins(&self) -> ExpanderResult<Vec<PinReport>> {
        (0..PIN_COUNT)
            .map(|pin| {
                let mode = self.device.pin_mode(pin)?;
                let level = if mode.is_output() {
                    self.chip.pin_level(pin)
                } else {
                    self.device.read_pin(pin)?
                };
                Ok(PinReport {
                    pin,
                    mode,
                    level,
                    label: self.label(pin),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(yaml: &str) -> DeviceManifest {
        DeviceManifest::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_bring_up_applies_bindings() {
        let m = manifest(
            "name: t\nbus_id: 1\naddress: 0x20\ninterrupts: {bank_a: 3, bank_b: 3}\npins:\n  - {pin: 0, mode: output, level: high, label: led}\n  - {pin: 9, mode: input_with_pull_up, interrupt: true, label: key}\n",
        );
        let bench = Bench::bring_up(&m).unwrap();
        assert_eq!(bench.chip.pin_level(0), PinLevel::High);
        assert_eq!(bench.resolve("key"), Some(9));
        assert_eq!(bench.resolve("16"), None);
        assert_eq!(bench.resolve("nothing"), None);
        let pins = bench.pins().unwrap();
        assert_eq!(pins[0].label.as_deref(), Some("led"));
        assert_eq!(pins[1].label, None);

        bench.drive(9, PinLevel::Low).unwrap();
        assert_eq!(
            bench.events(),
            vec![PinEvent { pin: 9, edge: Edge::Falling }]
        );
        assert!(bench.drive(0, PinLevel::Low).is_err());
    }

    #[test]
    fn test_single_bank_wiring_is_rejected() {
        let m = manifest("name: t\nbus_id: 1\naddress: 0x20\ninterrupts: {bank_a: 3}\n");
        assert!(matches!(
            Bench::bring_up(&m),
            Err(ExpanderError::InvalidConfig(_))
        ));
    }
}
