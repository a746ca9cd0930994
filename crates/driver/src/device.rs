// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::BusError;
use crate::interrupt::{DispatcherKind, InterruptDispatcher, InterruptHandler, InterruptWiring};
use crate::pins::{validate_pin, Bank, PinLevel, PinMode, PinTable};
use crate::registers::{bit_mask, Iocon, Register};
use crate::{ExpanderResult, RegisterBus};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Bus and pin bookkeeping, guarded together by the device lock.
struct DeviceState {
    bus: Box<dyn RegisterBus>,
    pins: PinTable,
}

impl DeviceState {
    /// Read-modify-write of the bit for `pin` in `register`.
    fn update_bit(&mut self, register: Register, pin: u8, set: bool) -> Result<(), BusError> {
        let address = register.for_pin(pin);
        let mask = bit_mask(pin);
        let value = self
            .bus
            .modify(address, &mut |v| if set { v | mask } else { v & !mask })?;
        tracing::debug!("{} ({:#04x}) <- {:#010b}", register.name(), address, value);
        Ok(())
    }
}

struct Shared {
    address: u8,
    state: Mutex<DeviceState>,
    dispatcher: InterruptDispatcher,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Dispatch routine behind the edge listeners.
    fn service(&self, banks: &[Bank]) {
        let events = {
            let mut state = self.lock();
            self.dispatcher.drain(state.bus.as_mut(), banks)
        };
        self.dispatcher.deliver(&events);
    }

    /// Runs `op` under the lock once `check` accepts the pin table,
    /// draining pending interrupts in between.
    ///
    /// Drained events are delivered after the lock is released, whether or
    /// not `op` succeeded.
    fn drained<T>(
        &self,
        check: impl FnOnce(&PinTable) -> ExpanderResult<()>,
        op: impl FnOnce(&mut DeviceState) -> ExpanderResult<T>,
    ) -> ExpanderResult<T> {
        let (result, events) = {
            let mut state = self.lock();
            check(&state.pins)?;
            let events = self.dispatcher.drain_pending(state.bus.as_mut());
            (op(&mut *state), events)
        };
        self.dispatcher.deliver(&events);
        result
    }
}

/// Handle to one MCP23017.
///
/// Clones refer to the same chip. Every register sequence, from any clone
/// or from an interrupt callback, runs under a single device lock.
#[derive(Clone)]
pub struct Mcp23017 {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Mcp23017 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mcp23017")
            .field("address", &self.shared.address)
            .field("dispatcher", &self.shared.dispatcher)
            .finish()
    }
}

impl Mcp23017 {
    /// Wraps an open bus. The chip is untouched until [`Self::initialize`].
    pub fn new(bus: Box<dyn RegisterBus>, address: u8, wiring: InterruptWiring) -> Self {
        Self {
            shared: Arc::new(Shared {
                address,
                state: Mutex::new(DeviceState {
                    bus,
                    pins: PinTable::new(),
                }),
                dispatcher: InterruptDispatcher::new(wiring),
            }),
        }
    }

    pub fn address(&self) -> u8 {
        self.shared.address
    }

    pub fn dispatcher_kind(&self) -> DispatcherKind {
        self.shared.dispatcher.kind()
    }

    /// Puts the chip into a known state and subscribes the interrupt wiring.
    ///
    /// All pins become inputs without pull-ups, interrupts are disabled and
    /// the interrupt output is open-drain (mirrored for joint wiring). A
    /// failed write leaves the chip partially configured; call again or drop
    /// the handle.
    pub fn initialize(&self) -> ExpanderResult<()> {
        let iocon = Iocon::for_wiring(self.shared.dispatcher.mirror_interrupts());
        {
            let mut state = self.shared.lock();
            state.pins.reset();
            state.bus.write(Register::Iocon.base(), iocon.bits())?;
            for bank in Bank::ALL {
                for register in [
                    Register::Gpinten,
                    Register::Iodir,
                    Register::Gppu,
                    Register::Intcon,
                    Register::Ipol,
                ] {
                    state.bus.write(register.at(bank), register.reset_value())?;
                }
            }
        }

        let weak = Arc::downgrade(&self.shared);
        self.shared.dispatcher.subscribe(move |banks| {
            if let Some(shared) = weak.upgrade() {
                shared.service(banks);
            }
        });

        tracing::info!(
            "MCP23017 @ {:#04x} initialized (IOCON={:#04x}, interrupts: {:?})",
            self.shared.address,
            iocon.bits(),
            self.dispatcher_kind()
        );
        Ok(())
    }

    pub fn pin_mode(&self, pin: u8) -> ExpanderResult<PinMode> {
        let pin = validate_pin(pin)?;
        Ok(self.shared.lock().pins.mode(pin))
    }

    pub fn set_pin_mode(&self, pin: u8, mode: PinMode) -> ExpanderResult<()> {
        let pin = validate_pin(pin)?;
        self.shared.drained(
            |_| Ok(()),
            |state| {
                match mode {
                    PinMode::Output => state.update_bit(Register::Iodir, pin, false)?,
                    PinMode::Input | PinMode::InputWithPullUp => {
                        state.update_bit(Register::Iodir, pin, true)?;
                        state.update_bit(
                            Register::Gppu,
                            pin,
                            mode == PinMode::InputWithPullUp,
                        )?;
                    }
                }
                state.pins.set_mode(pin, mode);
                Ok(())
            },
        )
    }

    pub fn read_pin(&self, pin: u8) -> ExpanderResult<PinLevel> {
        let pin = validate_pin(pin)?;
        self.shared.drained(
            |pins| pins.require_input(pin),
            |state| {
                let port = state.bus.read(Register::Gpio.for_pin(pin))?;
                Ok(PinLevel::from(port & bit_mask(pin) != 0))
            },
        )
    }

    pub fn write_pin(&self, pin: u8, level: PinLevel) -> ExpanderResult<()> {
        let pin = validate_pin(pin)?;
        self.shared.drained(
            |pins| pins.require_output(pin),
            |state| Ok(state.update_bit(Register::Gpio, pin, level.into())?),
        )
    }

    /// Enables interrupt-on-change (against the previous value) for an
    /// input pin.
    pub fn enable_interrupt(&self, pin: u8) -> ExpanderResult<()> {
        let pin = validate_pin(pin)?;
        let mut state = self.shared.lock();
        state.pins.require_input(pin)?;
        state.update_bit(Register::Gpinten, pin, true)?;
        Ok(())
    }

    pub fn disable_interrupt(&self, pin: u8) -> ExpanderResult<()> {
        let pin = validate_pin(pin)?;
        let mut state = self.shared.lock();
        state.update_bit(Register::Gpinten, pin, false)?;
        Ok(())
    }

    /// Appends `handler` to the pin's handler list.
    pub fn register_interrupt_handler<H>(&self, pin: u8, handler: H) -> ExpanderResult<()>
    where
        H: InterruptHandler + 'static,
    {
        self.shared
            .dispatcher
            .register_handler(pin, Arc::new(handler))
    }

    /// Services any interrupt the chip is holding, without waiting for an
    /// edge notification.
    pub fn dispatch_pending(&self) {
        let events = {
            let mut state = self.shared.lock();
            self.shared.dispatcher.drain_pending(state.bus.as_mut())
        };
        self.shared.dispatcher.deliver(&events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use crate::ExpanderError;

    fn device(bus: &MemoryBus) -> Mcp23017 {
        let dev = Mcp23017::new(Box::new(bus.clone()), 0x20, InterruptWiring::None);
        dev.initialize().unwrap();
        bus.clear_log();
        dev
    }

    #[test]
    fn test_initialize_register_values() {
        let bus = MemoryBus::new();
        bus.poke(0x00, 0x00);
        bus.poke(0x0C, 0xFF);
        let dev = Mcp23017::new(Box::new(bus.clone()), 0x20, InterruptWiring::None);
        dev.initialize().unwrap();

        assert_eq!(bus.writes()[0], (0x0A, 0x04));
        assert_eq!(bus.peek(0x00), 0xFF);
        assert_eq!(bus.peek(0x01), 0xFF);
        assert_eq!(bus.peek(0x0C), 0x00);
        for reg in [0x02, 0x03, 0x08, 0x09] {
            assert!(bus.writes().contains(&(reg, 0x00)), "missing write to {reg:#04x}");
        }
        for pin in 0..16 {
            assert_eq!(dev.pin_mode(pin).unwrap(), PinMode::Input);
        }
    }

    #[test]
    fn test_initialize_failure_propagates() {
        let bus = MemoryBus::new();
        bus.fail_writes_of(0x08);
        let dev = Mcp23017::new(Box::new(bus.clone()), 0x20, InterruptWiring::None);
        assert!(matches!(dev.initialize(), Err(ExpanderError::Bus(_))));

        bus.heal();
        assert!(dev.initialize().is_ok());
    }

    #[test]
    fn test_set_pin_mode_bits() {
        let bus = MemoryBus::new();
        let dev = device(&bus);

        dev.set_pin_mode(9, PinMode::Output).unwrap();
        assert_eq!(bus.peek(0x01), 0b1111_1101);

        dev.set_pin_mode(2, PinMode::InputWithPullUp).unwrap();
        assert_eq!(bus.peek(0x00) & 0b100, 0b100);
        assert_eq!(bus.peek(0x0C), 0b0000_0100);

        dev.set_pin_mode(2, PinMode::Input).unwrap();
        assert_eq!(bus.peek(0x0C), 0);
        assert_eq!(dev.pin_mode(9).unwrap(), PinMode::Output);
    }

    #[test]
    fn test_failed_mode_change_keeps_table() {
        let bus = MemoryBus::new();
        let dev = device(&bus);
        bus.fail_writes_of(0x00);
        assert!(dev.set_pin_mode(4, PinMode::Output).is_err());
        assert_eq!(dev.pin_mode(4).unwrap(), PinMode::Input);
    }

    #[test]
    fn test_read_pin_uses_bank_register() {
        let bus = MemoryBus::new();
        let dev = device(&bus);
        bus.poke(0x13, 0b0000_1000);
        assert_eq!(dev.read_pin(11).unwrap(), PinLevel::High);
        assert_eq!(dev.read_pin(3).unwrap(), PinLevel::Low);
    }

    #[test]
    fn test_write_pin_preserves_other_bits() {
        let bus = MemoryBus::new();
        let dev = device(&bus);
        bus.poke(0x12, 0b1000_0000);
        dev.set_pin_mode(0, PinMode::Output).unwrap();
        dev.write_pin(0, PinLevel::High).unwrap();
        assert_eq!(bus.peek(0x12), 0b1000_0001);
        dev.write_pin(0, PinLevel::Low).unwrap();
        assert_eq!(bus.peek(0x12), 0b1000_0000);
    }

    #[test]
    fn test_invalid_pin_rejected_without_traffic() {
        let bus = MemoryBus::new();
        let dev = device(&bus);
        assert!(matches!(dev.set_pin_mode(16, PinMode::Output), Err(ExpanderError::InvalidPin(16))));
        assert!(matches!(dev.read_pin(200), Err(ExpanderError::InvalidPin(200))));
        assert!(matches!(dev.write_pin(16, PinLevel::High), Err(ExpanderError::InvalidPin(16))));
        assert!(matches!(dev.enable_interrupt(16), Err(ExpanderError::InvalidPin(16))));
        assert!(bus.reads().is_empty());
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn test_disable_interrupt_clears_bit() {
        let bus = MemoryBus::new();
        let dev = device(&bus);
        dev.enable_interrupt(12).unwrap();
        dev.enable_interrupt(13).unwrap();
        assert_eq!(bus.peek(0x05), 0b0011_0000);
        dev.disable_interrupt(12).unwrap();
        assert_eq!(bus.peek(0x05), 0b0010_0000);
    }
}
