// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! MCP23017 register map in IOCON.BANK = 0 (paired) layout.
//!
//! Every functional register is a pair: bank A at the base address and
//! bank B at base + 1. IOCON is a single register that answers at both
//! addresses of its pair.

use crate::pins::Bank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    Iodir = 0x00,   // direction, 1 = input
    Ipol = 0x02,    // input polarity
    Gpinten = 0x04, // interrupt-on-change enable
    Defval = 0x06,  // default compare value
    Intcon = 0x08,  // compare mode
    Iocon = 0x0A,   // configuration
    Gppu = 0x0C,    // pull-up enable
    Intf = 0x0E,    // interrupt flags (RO)
    Intcap = 0x10,  // interrupt capture (RO)
    Gpio = 0x12,    // port level
    Olat = 0x14,    // output latch
}

impl Register {
    pub const ALL: [Register; 11] = [
        Register::Iodir,
        Register::Ipol,
        Register::Gpinten,
        Register::Defval,
        Register::Intcon,
        Register::Iocon,
        Register::Gppu,
        Register::Intf,
        Register::Intcap,
        Register::Gpio,
        Register::Olat,
    ];

    pub const fn base(self) -> u8 {
        self as u8
    }

    pub const fn at(self, bank: Bank) -> u8 {
        self.base() + bank.offset()
    }

    /// Physical address of this register for the bank `pin` lives in.
    pub const fn for_pin(self, pin: u8) -> u8 {
        bank_address(self.base(), pin)
    }

    pub fn is_read_only(self) -> bool {
        matches!(self, Register::Intf | Register::Intcap)
    }

    /// Value after power-on reset.
    pub fn reset_value(self) -> u8 {
        match self {
            Register::Iodir => 0xFF,
            _ => 0x00,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::Iodir => "IODIR",
            Register::Ipol => "IPOL",
            Register::Gpinten => "GPINTEN",
            Register::Defval => "DEFVAL",
            Register::Intcon => "INTCON",
            Register::Iocon => "IOCON",
            Register::Gppu => "GPPU",
            Register::Intf => "INTF",
            Register::Intcap => "INTCAP",
            Register::Gpio => "GPIO",
            Register::Olat => "OLAT",
        }
    }

    /// Reverse lookup of a physical address.
    pub fn decode(address: u8) -> Option<(Register, Bank)> {
        let base = address & !1;
        let bank = if address & 1 == 0 { Bank::A } else { Bank::B };
        Register::ALL
            .iter()
            .find(|r| r.base() == base)
            .map(|r| (*r, bank))
    }
}

pub const fn bank_address(base: u8, pin: u8) -> u8 {
    base + if pin > 7 { 1 } else { 0 }
}

pub const fn bit_mask(pin: u8) -> u8 {
    1 << (pin % 8)
}

bitflags::bitflags! {
    /// IOCON configuration bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Iocon: u8 {
        const BANK = 0x80;
        const MIRROR = 0x40;
        const SEQOP = 0x20;
        const DISSLW = 0x10;
        const HAEN = 0x08;
        const ODR = 0x04;
        const INTPOL = 0x02;
    }
}

impl Iocon {
    /// Open-drain interrupt output, optionally mirrored onto both INT pins.
    pub fn for_wiring(mirror: bool) -> Self {
        if mirror {
            Iocon::ODR | Iocon::MIRROR
        } else {
            Iocon::ODR
        }
    }
}
