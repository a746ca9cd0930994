// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use super::BusError;
use crate::RegisterBus;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    regs: [u8; 0x16],
    reads: Vec<u8>,
    writes: Vec<(u8, u8)>,
    failing_reads: HashSet<u8>,
    failing_writes: HashSet<u8>,
}

/// Plain register file with no chip side effects.
///
/// Every access is recorded. Clones share the same storage, so a copy kept
/// by the caller can inspect traffic once another copy belongs to a device.
#[derive(Debug, Clone, Default)]
pub struct MemoryBus {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn peek(&self, register: u8) -> u8 {
        self.state()
            .regs
            .get(register as usize)
            .copied()
            .unwrap_or(0)
    }

    pub fn poke(&self, register: u8, value: u8) {
        if let Some(slot) = self.state().regs.get_mut(register as usize) {
            *slot = value;
        }
    }

    pub fn reads(&self) -> Vec<u8> {
        self.state().reads.clone()
    }

    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.state().writes.clone()
    }

    pub fn clear_log(&self) {
        let mut state = self.state();
        state.reads.clear();
        state.writes.clear();
    }

    pub fn fail_reads_of(&self, register: u8) {
        self.state().failing_reads.insert(register);
    }

    pub fn fail_writes_of(&self, register: u8) {
        self.state().failing_writes.insert(register);
    }

    pub fn heal(&self) {
        let mut state = self.state();
        state.failing_reads.clear();
        state.failing_writes.clear();
    }
}

impl RegisterBus for MemoryBus {
    fn read(&mut self, register: u8) -> Result<u8, BusError> {
        let mut state = self.state();
        if state.failing_reads.contains(&register) {
            return Err(BusError::Read {
                register,
                reason: "injected fault".to_string(),
            });
        }
        state.reads.push(register);
        Ok(state.regs.get(register as usize).copied().unwrap_or(0))
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        let mut state = self.state();
        if state.failing_writes.contains(&register) {
            return Err(BusError::Write {
                register,
                reason: "injected fault".to_string(),
            });
        }
        state.writes.push((register, value));
        if let Some(slot) = state.regs.get_mut(register as usize) {
            *slot = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_storage() {
        let bus = MemoryBus::new();
        let mut handle = bus.clone();
        handle.write(0x14, 0xA5).unwrap();
        assert_eq!(bus.peek(0x14), 0xA5);
        assert_eq!(bus.writes(), vec![(0x14, 0xA5)]);
    }

    #[test]
    fn test_injected_faults() {
        let bus = MemoryBus::new();
        let mut handle = bus.clone();
        bus.fail_reads_of(0x0E);
        assert!(handle.read(0x0E).is_err());
        assert!(handle.read(0x0F).is_ok());
        bus.heal();
        assert!(handle.read(0x0E).is_ok());
    }
}
