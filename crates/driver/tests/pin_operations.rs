// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko

use mcp23017_driver::bus::{BusError, MemoryBus};
use mcp23017_driver::interrupt::InterruptWiring;
use mcp23017_driver::registers::Register;
use mcp23017_driver::{Bank, ExpanderError, Mcp23017, PinLevel, PinMode, RegisterBus};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn device_on(bus: &MemoryBus) -> Mcp23017 {
    let device = Mcp23017::new(Box::new(bus.clone()), 0x20, InterruptWiring::None);
    device.initialize().unwrap();
    bus.clear_log();
    device
}

#[test]
fn test_direction_is_enforced_on_every_pin() {
    let bus = MemoryBus::new();
    let device = device_on(&bus);

    for pin in 0..16 {
        device.set_pin_mode(pin, PinMode::Output).unwrap();
        assert!(matches!(
            device.read_pin(pin),
            Err(ExpanderError::WrongDirection { pin: p, mode: PinMode::Output }) if p == pin
        ));

        for mode in [PinMode::Input, PinMode::InputWithPullUp] {
            device.set_pin_mode(pin, mode).unwrap();
            assert!(matches!(
                device.write_pin(pin, PinLevel::High),
                Err(ExpanderError::WrongDirection { .. })
            ));
        }
    }
}

#[test]
fn test_write_then_read_through_gpio_register() -> anyhow::Result<()> {
    let bus = MemoryBus::new();
    let device = device_on(&bus);

    for pin in [0, 7, 8, 15] {
        for level in [PinLevel::High, PinLevel::Low] {
            device.set_pin_mode(pin, PinMode::Output)?;
            device.write_pin(pin, level)?;
            // A plain register file echoes the written GPIO value back.
            device.set_pin_mode(pin, PinMode::Input)?;
            assert_eq!(device.read_pin(pin)?, level);
        }
    }
    Ok(())
}

#[test]
fn test_pull_up_mode_sets_both_registers() {
    let bus = MemoryBus::new();
    let device = device_on(&bus);

    device.set_pin_mode(12, PinMode::InputWithPullUp).unwrap();
    assert_eq!(bus.peek(Register::Iodir.at(Bank::B)) & 0x10, 0x10);
    assert_eq!(bus.peek(Register::Gppu.at(Bank::B)) & 0x10, 0x10);
    assert_eq!(device.pin_mode(12).unwrap(), PinMode::InputWithPullUp);

    device.set_pin_mode(12, PinMode::Input).unwrap();
    assert_eq!(bus.peek(Register::Gppu.at(Bank::B)) & 0x10, 0);
}

#[test]
fn test_enable_interrupt_on_output_writes_nothing() {
    let bus = MemoryBus::new();
    let device = device_on(&bus);
    device.set_pin_mode(5, PinMode::Output).unwrap();
    bus.clear_log();

    assert!(matches!(
        device.enable_interrupt(5),
        Err(ExpanderError::WrongDirection { pin: 5, .. })
    ));
    assert!(bus.writes().is_empty());
    assert_eq!(bus.peek(Register::Gpinten.at(Bank::A)), 0);
}

#[test]
fn test_bus_error_surfaces_from_pin_operation() {
    let bus = MemoryBus::new();
    let device = device_on(&bus);
    bus.fail_reads_of(Register::Gpio.at(Bank::A));

    assert!(matches!(
        device.read_pin(3),
        Err(ExpanderError::Bus(BusError::Read { register: 0x12, .. }))
    ));
}

/// Register file that stalls between reading and writing back.
#[derive(Clone)]
struct SlowBus(MemoryBus);

impl RegisterBus for SlowBus {
    fn read(&mut self, register: u8) -> Result<u8, BusError> {
        let value = self.0.read(register)?;
        thread::sleep(Duration::from_millis(5));
        Ok(value)
    }

    fn write(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        self.0.write(register, value)
    }
}

#[test]
fn test_concurrent_mode_changes_keep_both_bits() {
    let memory = MemoryBus::new();
    let device = Mcp23017::new(
        Box::new(SlowBus(memory.clone())),
        0x20,
        InterruptWiring::None,
    );
    device.initialize().unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let workers: Vec<_> = [1u8, 6u8]
        .into_iter()
        .map(|pin| {
            let device = device.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                device.set_pin_mode(pin, PinMode::Output).unwrap();
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(memory.peek(Register::Iodir.at(Bank::A)), 0xFF & !0b0100_0010);
    assert_eq!(device.pin_mode(1).unwrap(), PinMode::Output);
    assert_eq!(device.pin_mode(6).unwrap(), PinMode::Output);
}
