// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::line::SimLine;
use crate::bus::BusError;
use crate::pins::{Bank, PinLevel, PIN_COUNT};
use crate::registers::{bit_mask, Iocon, Register};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// MCP23017 register file in BANK = 0 layout.
#[derive(Debug, serde::Serialize)]
pub struct ChipRegisters {
    pub iodir: [u8; 2],
    pub ipol: [u8; 2],
    pub gpinten: [u8; 2],
    pub defval: [u8; 2],
    pub intcon: [u8; 2],
    pub iocon: u8,
    pub gppu: [u8; 2],
    pub intf: [u8; 2],
    pub intcap: [u8; 2],
    pub olat: [u8; 2],

    // Externally driven levels; bits in `floating` are undriven.
    pub external: [u8; 2],
    pub floating: [u8; 2],
    #[serde(skip)]
    faults: HashSet<u8>,
}

impl Default for ChipRegisters {
    fn default() -> Self {
        Self {
            iodir: [Register::Iodir.reset_value(); 2],
            ipol: [Register::Ipol.reset_value(); 2],
            gpinten: [Register::Gpinten.reset_value(); 2],
            defval: [Register::Defval.reset_value(); 2],
            intcon: [Register::Intcon.reset_value(); 2],
            iocon: Register::Iocon.reset_value(),
            gppu: [Register::Gppu.reset_value(); 2],
            intf: [Register::Intf.reset_value(); 2],
            intcap: [Register::Intcap.reset_value(); 2],
            olat: [Register::Olat.reset_value(); 2],
            external: [0; 2],
            floating: [0xFF; 2],
            faults: HashSet::new(),
        }
    }
}

fn idx(bank: Bank) -> usize {
    bank.offset() as usize
}

impl ChipRegisters {
    /// Electrical level of each input pin before polarity inversion.
    fn input_levels(&self, bank: Bank) -> u8 {
        let i = idx(bank);
        (self.external[i] & !self.floating[i]) | (self.gppu[i] & self.floating[i])
    }

    /// What a GPIO read returns: inputs (after IPOL) and output latches.
    pub fn port(&self, bank: Bank) -> u8 {
        let i = idx(bank);
        let inputs = self.input_levels(bank) ^ self.ipol[i];
        (self.iodir[i] & inputs) | (!self.iodir[i] & self.olat[i])
    }

    /// Register value without read side effects.
    pub fn peek(&self, register: Register, bank: Bank) -> u8 {
        let i = idx(bank);
        match register {
            Register::Iodir => self.iodir[i],
            Register::Ipol => self.ipol[i],
            Register::Gpinten => self.gpinten[i],
            Register::Defval => self.defval[i],
            Register::Intcon => self.intcon[i],
            Register::Iocon => self.iocon,
            Register::Gppu => self.gppu[i],
            Register::Intf => self.intf[i],
            Register::Intcap => self.intcap[i],
            Register::Gpio => self.port(bank),
            Register::Olat => self.olat[i],
        }
    }

    fn read(&mut self, address: u8) -> Result<u8, BusError> {
        if self.faults.contains(&address) {
            return Err(BusError::Read {
                register: address,
                reason: "injected fault".to_string(),
            });
        }
        let Some((register, bank)) = Register::decode(address) else {
            return Ok(0);
        };
        let value = self.peek(register, bank);
        // Reading INTCAP or GPIO releases the bank's interrupt.
        if matches!(register, Register::Intcap | Register::Gpio) {
            self.intf[idx(bank)] = 0;
        }
        Ok(value)
    }

    fn write(&mut self, address: u8, value: u8) -> Result<(), BusError> {
        if self.faults.contains(&address) {
            return Err(BusError::Write {
                register: address,
                reason: "injected fault".to_string(),
            });
        }
        let Some((register, bank)) = Register::decode(address) else {
            return Ok(());
        };
        if register.is_read_only() {
            tracing::warn!("Write to read-only {} ignored", register.name());
            return Ok(());
        }
        let i = idx(bank);
        match register {
            Register::Iodir => self.iodir[i] = value,
            Register::Ipol => self.ipol[i] = value,
            Register::Gpinten => self.gpinten[i] = value,
            Register::Defval => self.defval[i] = value,
            Register::Intcon => self.intcon[i] = value,
            Register::Iocon => {
                if value & Iocon::BANK.bits() != 0 {
                    tracing::warn!("IOCON.BANK=1 is not modelled; register map stays paired");
                }
                self.iocon = value & !Iocon::BANK.bits();
            }
            Register::Gppu => self.gppu[i] = value,
            Register::Intf | Register::Intcap => {}
            Register::Gpio | Register::Olat => self.olat[i] = value,
        }
        Ok(())
    }

    /// Applies an external level change and latches interrupt state.
    fn drive(&mut self, pin: u8, level: Option<PinLevel>) {
        let bank = Bank::of(pin);
        let i = idx(bank);
        let mask = bit_mask(pin);
        let before = self.input_levels(bank);

        match level {
            Some(level) => {
                self.floating[i] &= !mask;
                if bool::from(level) {
                    self.external[i] |= mask;
                } else {
                    self.external[i] &= !mask;
                }
            }
            None => self.floating[i] |= mask,
        }

        let after = self.input_levels(bank);
        let armed = self.gpinten[i] & self.iodir[i] & mask;
        if armed == 0 {
            return;
        }
        let fire = if self.intcon[i] & mask != 0 {
            (after ^ self.defval[i]) & mask != 0
        } else {
            (after ^ before) & mask != 0
        };
        if fire {
            self.intf[i] |= mask;
            let port = self.port(bank);
            self.intcap[i] = (self.intcap[i] & !mask) | (port & mask);
        }
    }

    /// Levels of the INTA and INTB outputs.
    pub fn interrupt_outputs(&self) -> [PinLevel; 2] {
        let iocon = Iocon::from_bits_truncate(self.iocon);
        let mut asserted = [self.intf[0] != 0, self.intf[1] != 0];
        if iocon.contains(Iocon::MIRROR) {
            let any = asserted[0] || asserted[1];
            asserted = [any, any];
        }
        let active = if !iocon.contains(Iocon::ODR) && iocon.contains(Iocon::INTPOL) {
            PinLevel::High
        } else {
            PinLevel::Low
        };
        asserted.map(|on| if on { active } else { !active })
    }
}

struct ChipInner {
    regs: Mutex<ChipRegisters>,
    lines: Mutex<[Option<Arc<SimLine>>; 2]>,
}

/// Simulated MCP23017 with INTA/INTB outputs.
///
/// Clones share one chip. Interrupt lines are driven after the register
/// lock is released, so listeners may read the chip re-entrantly.
#[derive(Clone)]
pub struct SimChip {
    inner: Arc<ChipInner>,
}

impl std::fmt::Debug for SimChip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimChip").field("regs", &*self.regs()).finish()
    }
}

impl Default for SimChip {
    fn default() -> Self {
        Self::new()
    }
}

impl SimChip {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ChipInner {
                regs: Mutex::new(ChipRegisters::default()),
                lines: Mutex::new([None, None]),
            }),
        }
    }

    fn regs(&self) -> MutexGuard<'_, ChipRegisters> {
        self.inner.regs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connects INTA and INTB to host lines. Passing the same line twice
    /// models a wired-OR of both outputs.
    pub fn attach_interrupt_lines(&self, int_a: Option<Arc<SimLine>>, int_b: Option<Arc<SimLine>>) {
        *self.inner.lines.lock().unwrap_or_else(PoisonError::into_inner) = [int_a, int_b];
        self.update_lines();
    }

    fn update_lines(&self) {
        let levels = self.regs().interrupt_outputs();
        let lines = self
            .inner
            .lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match &lines {
            [Some(a), Some(b)] if Arc::ptr_eq(a, b) => {
                // Open-drain outputs on one wire: low wins.
                let level = if levels.contains(&PinLevel::Low) {
                    PinLevel::Low
                } else {
                    PinLevel::High
                };
                a.drive(level);
            }
            _ => {
                for (line, level) in lines.iter().zip(levels) {
                    if let Some(line) = line {
                        line.drive(level);
                    }
                }
            }
        }
    }

    pub fn read(&self, address: u8) -> Result<u8, BusError> {
        let value = self.regs().read(address);
        self.update_lines();
        value
    }

    pub fn write(&self, address: u8, value: u8) -> Result<(), BusError> {
        let result = self.regs().write(address, value);
        self.update_lines();
        result
    }

    /// Drives an input pin from outside the chip.
    pub fn drive_input(&self, pin: u8, level: PinLevel) {
        if pin >= PIN_COUNT {
            tracing::warn!("Ignoring drive of nonexistent pin {}", pin);
            return;
        }
        self.regs().drive(pin, Some(level));
        self.update_lines();
    }

    /// Stops driving a pin; it then follows its pull-up.
    pub fn release_input(&self, pin: u8) {
        if pin >= PIN_COUNT {
            return;
        }
        self.regs().drive(pin, None);
        self.update_lines();
    }

    pub fn peek(&self, register: Register, bank: Bank) -> u8 {
        self.regs().peek(register, bank)
    }

    /// Level the chip presents on `pin` (latch for outputs, external or
    /// pulled-up level for inputs).
    pub fn pin_level(&self, pin: u8) -> PinLevel {
        let regs = self.regs();
        let bank = Bank::of(pin);
        let mask = bit_mask(pin);
        let value = if regs.iodir[idx(bank)] & mask != 0 {
            regs.input_levels(bank)
        } else {
            regs.olat[idx(bank)]
        };
        PinLevel::from(value & mask != 0)
    }

    pub fn interrupt_outputs(&self) -> [PinLevel; 2] {
        self.regs().interrupt_outputs()
    }

    pub fn inject_fault(&self, address: u8) {
        self.regs().faults.insert(address);
    }

    pub fn clear_faults(&self) {
        self.regs().faults.clear();
    }

    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(&*self.regs()).unwrap_or(serde_json::Value::Null)
    }
}
