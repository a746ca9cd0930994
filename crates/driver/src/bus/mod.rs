// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod i2c;
mod memory;

pub use i2c::I2cRegisterBus;
pub use memory::MemoryBus;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("Read of register {register:#04x} failed: {reason}")]
    Read { register: u8, reason: String },
    #[error("Write of register {register:#04x} failed: {reason}")]
    Write { register: u8, reason: String },
}

impl BusError {
    pub fn register(&self) -> u8 {
        match self {
            BusError::Read { register, .. } | BusError::Write { register, .. } => *register,
        }
    }
}
