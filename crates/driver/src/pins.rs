// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{ExpanderError, ExpanderResult};
use serde::{Deserialize, Serialize};

pub const PIN_COUNT: u8 = 16;
pub const PINS_PER_BANK: u8 = 8;

/// One 8-pin port of the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bank {
    A,
    B,
}

impl Bank {
    pub const ALL: [Bank; 2] = [Bank::A, Bank::B];

    pub fn of(pin: u8) -> Self {
        if pin > 7 {
            Bank::B
        } else {
            Bank::A
        }
    }

    /// Address offset of this bank within a register pair.
    pub const fn offset(self) -> u8 {
        match self {
            Bank::A => 0,
            Bank::B => 1,
        }
    }

    /// Pin number of bit 0 in this bank.
    pub const fn first_pin(self) -> u8 {
        match self {
            Bank::A => 0,
            Bank::B => PINS_PER_BANK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinMode {
    Output,
    #[default]
    Input,
    InputWithPullUp,
}

impl PinMode {
    pub fn is_output(self) -> bool {
        matches!(self, PinMode::Output)
    }
}

/// Electrical level of a pin; `High` is a set bit in GPIO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinLevel {
    #[default]
    Low,
    High,
}

impl From<bool> for PinLevel {
    fn from(b: bool) -> Self {
        if b {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    }
}

impl From<PinLevel> for bool {
    fn from(level: PinLevel) -> Self {
        match level {
            PinLevel::High => true,
            PinLevel::Low => false,
        }
    }
}

impl std::ops::Not for PinLevel {
    type Output = PinLevel;

    fn not(self) -> Self::Output {
        match self {
            PinLevel::High => PinLevel::Low,
            PinLevel::Low => PinLevel::High,
        }
    }
}

pub fn validate_pin(pin: u8) -> ExpanderResult<u8> {
    if pin < PIN_COUNT {
        Ok(pin)
    } else {
        Err(ExpanderError::InvalidPin(pin))
    }
}

/// In-memory mirror of every pin's configured mode.
#[derive(Debug, Clone, Default)]
pub struct PinTable {
    modes: [PinMode; PIN_COUNT as usize],
}

impl PinTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.modes = [PinMode::Input; PIN_COUNT as usize];
    }

    /// Mode of `pin`; callers validate the index first.
    pub fn mode(&self, pin: u8) -> PinMode {
        self.modes[pin as usize]
    }

    pub fn set_mode(&mut self, pin: u8, mode: PinMode) {
        self.modes[pin as usize] = mode;
    }

    /// Fails with `WrongDirection` when `pin` is an output.
    pub fn require_input(&self, pin: u8) -> ExpanderResult<()> {
        match self.mode(pin) {
            PinMode::Output => Err(ExpanderError::WrongDirection {
                pin,
                mode: PinMode::Output,
            }),
            _ => Ok(()),
        }
    }

    /// Fails with `WrongDirection` when `pin` is not an output.
    pub fn require_output(&self, pin: u8) -> ExpanderResult<()> {
        match self.mode(pin) {
            PinMode::Output => Ok(()),
            mode => Err(ExpanderError::WrongDirection { pin, mode }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, PinMode)> + '_ {
        self.modes
            .iter()
            .enumerate()
            .map(|(pin, mode)| (pin as u8, *mode))
    }
}
