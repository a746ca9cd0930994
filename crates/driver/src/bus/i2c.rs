// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::BusError;
use crate::RegisterBus;
use embedded_hal::i2c::{Error as _, I2c};

/// [`RegisterBus`] over any `embedded-hal` I2C master.
///
/// Reads send the register pointer and read one byte back in a single
/// repeated-start transaction; writes send pointer and value together.
#[derive(Debug)]
pub struct I2cRegisterBus<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> I2cRegisterBus<I> {
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c + Send> RegisterBus for I2cRegisterBus<I> {
    fn read(&mut self, register: u8) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(|e| BusError::Read {
                register,
                reason: format!("{:?}", e.kind()),
            })?;
        Ok(buf[0])
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(|e| BusError::Write {
                register,
                reason: format!("{:?}", e.kind()),
            })
    }
}
