// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Software model of the chip, its interrupt wires and the host bus.
//!
//! Used by tests and by the `mcp23017 simulate` command to run the driver
//! without hardware.

mod chip;
mod line;

pub use chip::{ChipRegisters, SimChip};
pub use line::SimLine;

use crate::bus::BusError;
use crate::{BusProvider, RegisterBus};
use std::collections::{HashMap, HashSet};

/// Bus endpoint for one address. With no chip present every transfer is
/// not acknowledged.
#[derive(Debug, Clone)]
pub struct SimBus {
    address: u8,
    chip: Option<SimChip>,
}

impl SimBus {
    pub fn new(address: u8, chip: Option<SimChip>) -> Self {
        Self { address, chip }
    }

    fn nack(&self) -> String {
        format!("no acknowledge from {:#04x}", self.address)
    }
}

impl RegisterBus for SimBus {
    fn read(&mut self, register: u8) -> Result<u8, BusError> {
        match &self.chip {
            Some(chip) => chip.read(register),
            None => Err(BusError::Read {
                register,
                reason: self.nack(),
            }),
        }
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        match &self.chip {
            Some(chip) => chip.write(register, value),
            None => Err(BusError::Write {
                register,
                reason: self.nack(),
            }),
        }
    }
}

/// Host with a set of numbered buses and chips attached to them.
#[derive(Debug, Default)]
pub struct SimBusProvider {
    buses: HashSet<u32>,
    chips: HashMap<(u32, u8), SimChip>,
}

impl SimBusProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes an empty bus available.
    pub fn add_bus(&mut self, bus_id: u32) -> &mut Self {
        self.buses.insert(bus_id);
        self
    }

    /// Places `chip` at `address` on `bus_id`, creating the bus if needed.
    pub fn attach(&mut self, bus_id: u32, address: u8, chip: SimChip) -> &mut Self {
        self.buses.insert(bus_id);
        self.chips.insert((bus_id, address), chip);
        self
    }

    pub fn chip(&self, bus_id: u32, address: u8) -> Option<&SimChip> {
        self.chips.get(&(bus_id, address))
    }
}

impl BusProvider for SimBusProvider {
    fn open(&self, bus_id: u32, address: u8) -> Result<Box<dyn RegisterBus>, String> {
        if !self.buses.contains(&bus_id) {
            return Err(format!("no such bus: {}", bus_id));
        }
        let chip = self.chips.get(&(bus_id, address)).cloned();
        Ok(Box::new(SimBus::new(address, chip)))
    }
}
