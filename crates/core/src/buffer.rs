//! Bounded, lock-guarded character buffer shared by the pipeline workers.
//!
//! The buffer is the only mutable state the producer, transformer and
//! packetizer share. Its storage is reachable only through a [`BufferGuard`],
//! which holds the mutex for its whole lifetime, so every check-then-act
//! sequence (`is_full` then `add`, `is_empty` then `drain`) happens inside a
//! single lock acquisition.
//!
//! # Capacity
//!
//! Capacity is enforced by [`BufferGuard::add`] itself. Adding to a full
//! buffer hands the character back to the caller instead of dropping it, so
//! the length can never exceed capacity regardless of caller discipline.
//!
//! # Normalization tracking
//!
//! Each slot remembers whether a transformer pass has already been applied
//! to it. The packetizer uses this to decide which characters are ready to
//! leave the buffer (see [`DrainPolicy`]).

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default buffer capacity in characters.
pub const DEFAULT_CAPACITY: usize = 12;

/// Which characters the packetizer may remove from the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrainPolicy {
    /// Only the leading run of characters a transformer pass has already
    /// normalized. Packet contents are deterministic.
    #[default]
    Normalized,

    /// Every character present, transformed or not.
    Immediate,
}

impl fmt::Display for DrainPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrainPolicy::Normalized => f.write_str("normalized"),
            DrainPolicy::Immediate => f.write_str("immediate"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    ch: char,
    normalized: bool,
}

/// Fixed-capacity FIFO of characters behind a mutex.
#[derive(Debug)]
pub struct BoundedBuffer {
    capacity: usize,
    slots: Mutex<VecDeque<Slot>>,
}

impl BoundedBuffer {
    /// Create an empty buffer holding at most `capacity` characters.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Maximum number of characters the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Acquire the buffer's lock.
    ///
    /// The returned guard is the only way to read or mutate the contents.
    /// Every operation on the guard leaves the sequence consistent, so a
    /// poisoned lock is recovered rather than propagated.
    pub fn lock(&self) -> BufferGuard<'_> {
        BufferGuard {
            slots: self.slots.lock().unwrap_or_else(PoisonError::into_inner),
            capacity: self.capacity,
        }
    }

    /// Number of characters currently held (single lock acquisition).
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the buffer is empty (single lock acquisition).
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for BoundedBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Exclusive access to the buffer contents. The lock is released on drop.
pub struct BufferGuard<'a> {
    slots: MutexGuard<'a, VecDeque<Slot>>,
    capacity: usize,
}

impl BufferGuard<'_> {
    /// Append a character at the back.
    ///
    /// # Errors
    /// Returns the character unchanged when the buffer is full.
    pub fn add(&mut self, ch: char) -> Result<(), char> {
        if self.is_full() {
            return Err(ch);
        }
        self.slots.push_back(Slot {
            ch,
            normalized: false,
        });
        Ok(())
    }

    /// Remove and return the oldest character.
    pub fn remove_front(&mut self) -> Option<char> {
        self.slots.pop_front().map(|slot| slot.ch)
    }

    /// The oldest character, without removing it.
    pub fn peek(&self) -> Option<char> {
        self.slots.front().map(|slot| slot.ch)
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replace every character with `f(ch)` and mark it normalized.
    ///
    /// Returns how many characters actually changed. With an idempotent `f`
    /// a second pass over the same contents changes nothing.
    pub fn transform_in_place<F>(&mut self, f: F) -> usize
    where
        F: Fn(char) -> char,
    {
        let mut changed = 0;
        for slot in self.slots.iter_mut() {
            let mapped = f(slot.ch);
            if mapped != slot.ch {
                slot.ch = mapped;
                changed += 1;
            }
            slot.normalized = true;
        }
        changed
    }

    /// Remove characters from the front according to `policy`.
    ///
    /// Under [`DrainPolicy::Normalized`] removal stops at the first slot no
    /// transformer pass has reached yet, so arrival order is never broken.
    pub fn drain(&mut self, policy: DrainPolicy) -> Vec<char> {
        let ready = match policy {
            DrainPolicy::Immediate => self.slots.len(),
            DrainPolicy::Normalized => self
                .slots
                .iter()
                .take_while(|slot| slot.normalized)
                .count(),
        };
        self.slots.drain(..ready).map(|slot| slot.ch).collect()
    }

    /// Snapshot of the contents in arrival order.
    pub fn contents(&self) -> String {
        self.slots.iter().map(|slot| slot.ch).collect()
    }
}

impl fmt::Debug for BufferGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferGuard")
            .field("contents", &self.contents())
            .field("capacity", &self.capacity)
            .finish()
    }
}
