// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Value handles and the slot arena that owns the values behind them.
//!
//! A handle never points into the engine. It names a slot in its context's
//! arena together with the slot's generation, so a released or reused slot is
//! detected instead of dereferenced.
//!
//! ```text
//! ValueHandle { context: 3, slot: 1, generation: 2 }
//!                                │
//!   arena of context 3:  [ gen 1 | gen 2: Some(v) | gen 4: None ]
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::HandleError;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate the next identifier.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identifier
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Host-held reference to a value produced inside a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueHandle {
    context: ContextId,
    slot: u32,
    generation: u32,
}

impl ValueHandle {
    /// The context that produced the value
    pub fn context(&self) -> ContextId {
        self.context
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational slot storage owned by one context.
#[derive(Debug)]
pub(crate) struct SlotArena<T> {
    context: ContextId,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> SlotArena<T> {
    pub(crate) fn new(context: ContextId) -> Self {
        Self {
            context,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Store a value, reusing a released slot when one is available.
    pub(crate) fn insert(&mut self, value: T) -> ValueHandle {
        let slot = match self.free.pop() {
            Some(index) => {
                let entry = &mut self.slots[index as usize];
                entry.value = Some(value);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.live += 1;
        ValueHandle {
            context: self.context,
            slot,
            generation: self.slots[slot as usize].generation,
        }
    }

    pub(crate) fn get(&self, handle: &ValueHandle) -> Result<&T, HandleError> {
        self.check(handle)?;
        self.slots[handle.slot as usize]
            .value
            .as_ref()
            .ok_or(HandleError::Stale)
    }

    /// Release a slot. Returns the value if the handle was live.
    pub(crate) fn remove(&mut self, handle: &ValueHandle) -> Result<T, HandleError> {
        self.check(handle)?;
        let entry = &mut self.slots[handle.slot as usize];
        let value = entry.value.take().ok_or(HandleError::Stale)?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.slot);
        self.live -= 1;
        Ok(value)
    }

    /// Number of live values
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Release every value at once.
    pub(crate) fn clear(&mut self) {
        for (index, entry) in self.slots.iter_mut().enumerate() {
            if entry.value.take().is_some() {
                entry.generation = entry.generation.wrapping_add(1);
                self.free.push(index as u32);
            }
        }
        self.live = 0;
    }

    fn check(&self, handle: &ValueHandle) -> Result<(), HandleError> {
        if handle.context != self.context {
            return Err(HandleError::ForeignContext);
        }
        match self.slots.get(handle.slot as usize) {
            Some(entry) if entry.generation == handle.generation => Ok(()),
            _ => Err(HandleError::Stale),
        }
    }
}
