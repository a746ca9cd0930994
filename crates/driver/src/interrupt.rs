// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::BusError;
use crate::pins::{validate_pin, Bank, PIN_COUNT};
use crate::registers::Register;
use crate::{EdgeSource, ExpanderError, ExpanderResult, RegisterBus};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Direction of a level transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Rising,
    Falling,
}

/// A per-pin change recovered from the chip's flag and capture registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PinEvent {
    pub pin: u8,
    pub edge: Edge,
}

/// Callback for pin change notifications.
///
/// Handlers run on whatever thread delivered the edge (or on the thread of
/// the pin operation that drained it) and never under the device lock.
pub trait InterruptHandler: Send + Sync {
    fn on_edge(&self, pin: u8, edge: Edge);
}

impl<F> InterruptHandler for F
where
    F: Fn(u8, Edge) + Send + Sync,
{
    fn on_edge(&self, pin: u8, edge: Edge) {
        self(pin, edge)
    }
}

/// Listener handed to an [`EdgeSource`].
pub type EdgeListener = Box<dyn Fn(Edge) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatcherKind {
    None,
    Joint,
    Separate,
}

/// How the chip's INTA/INTB outputs reach the host.
#[derive(Debug, Clone)]
pub enum InterruptWiring {
    /// Interrupt outputs are not connected.
    None,
    /// Both outputs mirrored onto one host input.
    Joint(Arc<dyn EdgeSource>),
    /// INTA and INTB on separate host inputs.
    Separate {
        bank_a: Arc<dyn EdgeSource>,
        bank_b: Arc<dyn EdgeSource>,
    },
}

impl InterruptWiring {
    /// Picks the wiring from the edge sources given for each bank.
    ///
    /// Both absent is `None`, the same line for both is `Joint` and two
    /// different lines are `Separate`. A single source is rejected.
    pub fn select(
        bank_a: Option<Arc<dyn EdgeSource>>,
        bank_b: Option<Arc<dyn EdgeSource>>,
    ) -> ExpanderResult<Self> {
        match (bank_a, bank_b) {
            (None, None) => Ok(InterruptWiring::None),
            (Some(a), Some(b)) if a.line() == b.line() => Ok(InterruptWiring::Joint(a)),
            (Some(bank_a), Some(bank_b)) => Ok(InterruptWiring::Separate { bank_a, bank_b }),
            (Some(_), None) => Err(ExpanderError::InvalidConfig(
                "interrupt source given for bank A only; wire both banks or neither".to_string(),
            )),
            (None, Some(_)) => Err(ExpanderError::InvalidConfig(
                "interrupt source given for bank B only; wire both banks or neither".to_string(),
            )),
        }
    }

    pub fn kind(&self) -> DispatcherKind {
        match self {
            InterruptWiring::None => DispatcherKind::None,
            InterruptWiring::Joint(_) => DispatcherKind::Joint,
            InterruptWiring::Separate { .. } => DispatcherKind::Separate,
        }
    }

    /// Whether IOCON.MIRROR must be set for this wiring.
    pub fn mirror_interrupts(&self) -> bool {
        matches!(self, InterruptWiring::Joint(_))
    }

    /// Banks drained by `dispatch_pending`.
    pub fn banks(&self) -> &'static [Bank] {
        match self {
            InterruptWiring::None => &[],
            InterruptWiring::Joint(_) | InterruptWiring::Separate { .. } => &Bank::ALL,
        }
    }
}

/// INTF and INTCAP of one bank, read in a single pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BankCapture {
    pub flags: u8,
    pub captured: u8,
}

impl BankCapture {
    /// Reads INTF then INTCAP for `bank`.
    ///
    /// The chip releases its interrupt latch when INTCAP is read, so the
    /// flags have to be fetched first. INTCAP is read even when the INTF
    /// read fails; otherwise the latch stays asserted and no further edge
    /// arrives. The first failure is returned.
    pub fn read(bus: &mut dyn RegisterBus, bank: Bank) -> Result<Self, BusError> {
        let flags = bus.read(Register::Intf.at(bank));
        let captured = bus.read(Register::Intcap.at(bank));
        match (flags, captured) {
            (Ok(flags), Ok(captured)) => Ok(Self { flags, captured }),
            (Err(flags_err), Err(capture_err)) => {
                tracing::error!("INTCAP read for bank {:?} failed: {}", bank, capture_err);
                Err(flags_err)
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
        }
    }

    /// Rising or falling event for every flagged pin, lowest bit first.
    pub fn events(self, bank: Bank) -> impl Iterator<Item = PinEvent> {
        BitIter(self.flags).map(move |bit| PinEvent {
            pin: bank.first_pin() + bit,
            edge: if self.captured & (1 << bit) != 0 {
                Edge::Rising
            } else {
                Edge::Falling
            },
        })
    }
}

struct BitIter(u8);

impl Iterator for BitIter {
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item> {
        match self.0.trailing_zeros() {
            8 => None,
            b => {
                self.0 &= !(1 << b);
                Some(b as u8)
            }
        }
    }
}

#[derive(Default)]
struct HandlerTable {
    lists: [Vec<Arc<dyn InterruptHandler>>; PIN_COUNT as usize],
}

/// Owns the wiring and per-pin handler lists of one device.
pub struct InterruptDispatcher {
    wiring: InterruptWiring,
    handlers: Mutex<HandlerTable>,
    subscribed: AtomicBool,
}

impl std::fmt::Debug for InterruptDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptDispatcher")
            .field("wiring", &self.wiring)
            .field("subscribed", &self.subscribed.load(Ordering::SeqCst))
            .finish()
    }
}

impl InterruptDispatcher {
    pub fn new(wiring: InterruptWiring) -> Self {
        Self {
            wiring,
            handlers: Mutex::new(HandlerTable::default()),
            subscribed: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> DispatcherKind {
        self.wiring.kind()
    }

    pub fn mirror_interrupts(&self) -> bool {
        self.wiring.mirror_interrupts()
    }

    fn handlers(&self) -> MutexGuard<'_, HandlerTable> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_handler(&self, pin: u8, handler: Arc<dyn InterruptHandler>) -> ExpanderResult<()> {
        if matches!(self.wiring, InterruptWiring::None) {
            return Err(ExpanderError::UnsupportedOperation(
                "interrupt handlers need interrupt wiring",
            ));
        }
        let pin = validate_pin(pin)?;
        self.handlers().lists[pin as usize].push(handler);
        Ok(())
    }

    /// Connects the edge source(s) to `route`, which receives the banks a
    /// falling edge on that source covers. Only the first call subscribes.
    pub fn subscribe<R>(&self, route: R)
    where
        R: Fn(&'static [Bank]) + Send + Sync + 'static,
    {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return;
        }
        let route = Arc::new(route);
        let wire = |source: &Arc<dyn EdgeSource>, banks: &'static [Bank]| {
            let route = Arc::clone(&route);
            tracing::debug!("Subscribing to line {} for banks {:?}", source.line(), banks);
            source.subscribe(Box::new(move |edge: Edge| {
                if edge == Edge::Falling {
                    route(banks);
                }
            }));
        };
        match &self.wiring {
            InterruptWiring::None => {}
            InterruptWiring::Joint(source) => wire(source, &Bank::ALL),
            InterruptWiring::Separate { bank_a, bank_b } => {
                wire(bank_a, &[Bank::A]);
                wire(bank_b, &[Bank::B]);
            }
        }
    }

    /// Reads and decodes every pending interrupt in `banks`.
    ///
    /// Must be called with the device lock held. Bus failures are logged
    /// and the bank skipped; they never reach the caller.
    pub fn drain(&self, bus: &mut dyn RegisterBus, banks: &[Bank]) -> Vec<PinEvent> {
        let mut events = Vec::new();
        for &bank in banks {
            match BankCapture::read(bus, bank) {
                Ok(capture) => {
                    if capture.flags != 0 {
                        tracing::debug!(
                            "Bank {:?}: INTF={:#010b} INTCAP={:#010b}",
                            bank,
                            capture.flags,
                            capture.captured
                        );
                    }
                    events.extend(capture.events(bank));
                }
                Err(e) => tracing::error!("Interrupt dispatch for bank {:?} failed: {}", bank, e),
            }
        }
        events
    }

    /// Drains every bank this wiring can signal.
    pub fn drain_pending(&self, bus: &mut dyn RegisterBus) -> Vec<PinEvent> {
        self.drain(bus, self.wiring.banks())
    }

    /// Invokes the handlers of each event's pin in registration order.
    ///
    /// Must be called without the device lock held.
    pub fn deliver(&self, events: &[PinEvent]) {
        for event in events {
            let handlers = self.handlers().lists[event.pin as usize].clone();
            if handlers.is_empty() {
                tracing::trace!("No handler for pin {} ({:?})", event.pin, event.edge);
            }
            for handler in handlers {
                handler.on_edge(event.pin, event.edge);
            }
        }
    }
}
