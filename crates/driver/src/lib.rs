// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Driver for the MCP23017 16-bit I/O expander.
//!
//! The chip is reached through a [`RegisterBus`] (one byte per register
//! access) and reports pin changes through one or two open-drain interrupt
//! outputs, observed here as [`EdgeSource`]s. [`Builder`] validates the bus
//! id, address and interrupt wiring and returns an initialized [`Mcp23017`].

pub mod builder;
pub mod bus;
pub mod device;
pub mod interrupt;
pub mod pins;
pub mod registers;
pub mod sim;


pub use builder::Builder;
pub use bus::{BusError, I2cRegisterBus};
pub use device::Mcp23017;
pub use interrupt::{DispatcherKind, Edge, EdgeListener, InterruptHandler, PinEvent};
pub use pins::{Bank, PinLevel, PinMode};

#[derive(Debug, thiserror::Error)]
pub enum ExpanderError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Pin {0} is out of range (expected 0-15)")]
    InvalidPin(u8),
    #[error("Pin {pin} is configured as {mode:?}")]
    WrongDirection { pin: u8, mode: PinMode },
    #[error("Bus {bus_id} is unavailable: {reason}")]
    BusUnavailable { bus_id: u32, reason: String },
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
}

pub type ExpanderResult<T> = Result<T, ExpanderError>;

/// Single-register access to one chip on a two-wire bus.
///
/// Implementations block until the transfer completes or fails.
pub trait RegisterBus: Send {
    fn read(&mut self, register: u8) -> Result<u8, BusError>;
    fn write(&mut self, register: u8, value: u8) -> Result<(), BusError>;

    /// Read a register, pass it through `f` and write the result back.
    ///
    /// Not atomic from the chip's point of view; callers serialize.
    fn modify(&mut self, register: u8, f: &mut dyn FnMut(u8) -> u8) -> Result<u8, BusError> {
        let current = self.read(register)?;
        let updated = f(current);
        self.write(register, updated)?;
        Ok(updated)
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn read(&mut self, register: u8) -> Result<u8, BusError> {
        (**self).read(register)
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        (**self).write(register, value)
    }
}

/// Opens a [`RegisterBus`] for a chip at `address` on bus `bus_id`.
pub trait BusProvider {
    fn open(&self, bus_id: u32, address: u8) -> Result<Box<dyn RegisterBus>, String>;
}

/// A platform digital input that reports level transitions.
///
/// `line` identifies the physical input; two sources with the same line are
/// the same wire.
pub trait EdgeSource: Send + Sync {
    fn line(&self) -> u32;
    fn subscribe(&self, listener: EdgeListener);
}

impl std::fmt::Debug for dyn EdgeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeSource")
            .field("line", &self.line())
            .finish()
    }
}
