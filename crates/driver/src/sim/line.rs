// MCP23017 Driver - I2C GPIO Expander Support
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::interrupt::{Edge, EdgeListener};
use crate::pins::PinLevel;
use crate::EdgeSource;
use std::sync::{Arc, Mutex, PoisonError};

type SharedListener = Arc<dyn Fn(Edge) + Send + Sync>;

struct LineState {
    level: PinLevel,
    listeners: Vec<SharedListener>,
}

/// Host input pin with a pull-up, driven by a simulated chip.
///
/// Listeners run on the thread that changes the level, after the line's
/// own lock is released.
pub struct SimLine {
    id: u32,
    state: Mutex<LineState>,
}

impl std::fmt::Debug for SimLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimLine")
            .field("id", &self.id)
            .field("level", &self.level())
            .finish()
    }
}

impl SimLine {
    pub fn new(id: u32) -> Arc<Self> {
        Arc::new(Self {
            id,
            state: Mutex::new(LineState {
                level: PinLevel::High,
                listeners: Vec::new(),
            }),
        })
    }

    pub fn level(&self) -> PinLevel {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).level
    }

    pub fn listener_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }

    /// Sets the level and notifies listeners if it changed.
    pub fn drive(&self, level: PinLevel) {
        let listeners = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.level == level {
                return;
            }
            state.level = level;
            state.listeners.clone()
        };
        let edge = match level {
            PinLevel::High => Edge::Rising,
            PinLevel::Low => Edge::Falling,
        };
        tracing::trace!("Line {} {:?}", self.id, edge);
        for listener in listeners {
            listener(edge);
        }
    }
}

impl EdgeSource for SimLine {
    fn line(&self) -> u32 {
        self.id
    }

    fn subscribe(&self, listener: EdgeListener) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .push(Arc::from(listener));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_notifies_only_on_change() {
        let line = SimLine::new(4);
        let falls = Arc::new(AtomicUsize::new(0));
        let counter = falls.clone();
        line.subscribe(Box::new(move |edge| {
            if edge == Edge::Falling {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));

        line.drive(PinLevel::High);
        line.drive(PinLevel::Low);
        line.drive(PinLevel::Low);
        line.drive(PinLevel::High);
        line.drive(PinLevel::Low);

        assert_eq!(falls.load(Ordering::SeqCst), 2);
        assert_eq!(line.level(), PinLevel::Low);
        assert_eq!(line.line(), 4);
    }
}
