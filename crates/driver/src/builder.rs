// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::device::Mcp23017;
use crate::interrupt::InterruptWiring;
use crate::{BusProvider, EdgeSource, ExpanderError, ExpanderResult};
use std::sync::Arc;
use tracing::info;

pub const BASE_ADDRESS: u8 = 0x20;
pub const MAX_ADDRESS: u8 = 0x27;

/// Address selected by the A2/A1/A0 strap pins.
pub const fn address_from_pins(a2: bool, a1: bool, a0: bool) -> u8 {
    BASE_ADDRESS + 4 * a2 as u8 + 2 * a1 as u8 + a0 as u8
}

/// Collects and validates everything needed to bring up one chip.
#[derive(Debug, Default, Clone)]
pub struct Builder {
    bus_id: Option<i32>,
    address: Option<u8>,
    interrupt_a: Option<Arc<dyn EdgeSource>>,
    interrupt_b: Option<Arc<dyn EdgeSource>>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bus_id(mut self, bus_id: i32) -> Self {
        self.bus_id = Some(bus_id);
        self
    }

    pub fn address(mut self, address: u8) -> Self {
        self.address = Some(address);
        self
    }

    pub fn address_pins(self, a2: bool, a1: bool, a0: bool) -> Self {
        self.address(address_from_pins(a2, a1, a0))
    }

    /// Host input wired to INTA.
    pub fn interrupt_bank_a(mut self, source: Arc<dyn EdgeSource>) -> Self {
        self.interrupt_a = Some(source);
        self
    }

    /// Host input wired to INTB.
    pub fn interrupt_bank_b(mut self, source: Arc<dyn EdgeSource>) -> Self {
        self.interrupt_b = Some(source);
        self
    }

    /// Both outputs tied to one host input.
    pub fn interrupts_joint(self, source: Arc<dyn EdgeSource>) -> Self {
        self.interrupt_bank_a(Arc::clone(&source))
            .interrupt_bank_b(source)
    }

    /// Checks bus id and address, returning them in usable form.
    pub fn validate(&self) -> ExpanderResult<(u32, u8)> {
        let bus_id = match self.bus_id {
            None => return Err(ExpanderError::InvalidConfig("bus id is not set".to_string())),
            Some(id) => u32::try_from(id).map_err(|_| {
                ExpanderError::InvalidConfig(format!("bus id {} is negative", id))
            })?,
        };
        let address = self
            .address
            .ok_or_else(|| ExpanderError::InvalidConfig("address is not set".to_string()))?;
        if !(BASE_ADDRESS..=MAX_ADDRESS).contains(&address) {
            return Err(ExpanderError::InvalidConfig(format!(
                "address {:#04x} is outside {:#04x}-{:#04x}",
                address, BASE_ADDRESS, MAX_ADDRESS
            )));
        }
        Ok((bus_id, address))
    }

    /// Interrupt wiring implied by the configured edge sources.
    pub fn select_dispatcher(&self) -> ExpanderResult<InterruptWiring> {
        InterruptWiring::select(self.interrupt_a.clone(), self.interrupt_b.clone())
    }

    /// Validates, opens the bus and initializes the chip.
    pub fn build(&self, provider: &impl BusProvider) -> ExpanderResult<Mcp23017> {
        let (bus_id, address) = self.validate()?;
        let wiring = self.select_dispatcher()?;

        info!("Opening bus {} for MCP23017 @ {:#04x}", bus_id, address);
        let bus = provider
            .open(bus_id, address)
            .map_err(|reason| ExpanderError::BusUnavailable { bus_id, reason })?;

        let device = Mcp23017::new(bus, address, wiring);
        device.initialize()?;
        Ok(device)
    }
}
