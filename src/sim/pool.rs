//! Fixed-capacity recycling pools with generational handles
//!
//! Slots are constructed lazily up to capacity and never freed; released slots
//! go on a free list and are handed out again on the next acquire. A handle
//! carries the generation of the slot it was issued for, so a handle kept past
//! its release can never reach the slot's next occupant.

use serde::{Deserialize, Serialize};

use super::error::{SimError, SimResult};

/// Reference to a live pooled entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Slot index (stable for the lifetime of the pool, shared across generations)
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    value: T,
    generation: u32,
    live: bool,
}

/// Fixed-size pool of `T`
#[derive(Debug, Clone)]
pub struct EntityPool<T> {
    name: &'static str,
    capacity: usize,
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    /// Live handles in acquisition order (membership iff the slot is live)
    active: Vec<Handle>,
}

impl<T: Default> EntityPool<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            active: Vec::with_capacity(capacity),
        }
    }

    /// Take a recycled or freshly constructed instance.
    ///
    /// Recycled instances keep whatever state they were released with; callers
    /// that need a clean value should use [`EntityPool::spawn`].
    pub fn acquire(&mut self) -> SimResult<Handle> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.slots.len() < self.capacity => {
                self.slots.push(Slot {
                    value: T::default(),
                    generation: 0,
                    live: false,
                });
                self.slots.len() - 1
            }
            None => {
                return Err(SimError::PoolExhausted {
                    pool: self.name,
                    capacity: self.capacity,
                });
            }
        };

        let slot = &mut self.slots[index];
        slot.live = true;
        let handle = Handle {
            index: index as u32,
            generation: slot.generation,
        };
        self.active.push(handle);
        log::debug!("{}: acquired slot {} ({} live)", self.name, index, self.active.len());
        Ok(handle)
    }

    /// Acquire a slot and overwrite it with `value`
    pub fn spawn(&mut self, value: T) -> SimResult<Handle> {
        let handle = self.acquire()?;
        self.slots[handle.index()].value = value;
        Ok(handle)
    }
}

impl<T> EntityPool<T> {
    /// Return an instance to the free list and drop it from the active list
    pub fn release(&mut self, handle: Handle) -> SimResult<()> {
        let name = self.name;
        let stale = || SimError::DoubleRelease {
            pool: name,
            index: handle.index,
        };
        let Some(slot) = self.slots.get_mut(handle.index()) else {
            return Err(stale());
        };
        if !slot.live || slot.generation != handle.generation {
            return Err(stale());
        }

        slot.live = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        self.active.retain(|h| *h != handle);
        log::debug!("{}: released slot {} ({} live)", self.name, handle.index, self.active.len());
        Ok(())
    }

    /// Force-release every outstanding instance, returning how many were live
    pub fn release_all(&mut self) -> usize {
        let handles = std::mem::take(&mut self.active);
        for handle in &handles {
            let slot = &mut self.slots[handle.index()];
            slot.live = false;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(handle.index());
        }
        if !handles.is_empty() {
            log::debug!("{}: force-released {} slots", self.name, handles.len());
        }
        handles.len()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.slots
            .get(handle.index())
            .is_some_and(|slot| slot.live && slot.generation == handle.generation)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slots
            .get(handle.index())
            .filter(|slot| slot.live && slot.generation == handle.generation)
            .map(|slot| &slot.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.live && slot.generation == handle.generation)
            .map(|slot| &mut slot.value)
    }

    /// Live entries in acquisition order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.active
            .iter()
            .map(move |h| (*h, &self.slots[h.index()].value))
    }

    /// Visit every live entry mutably, in acquisition order
    pub fn for_each_mut(&mut self, mut f: impl FnMut(Handle, &mut T)) {
        for handle in &self.active {
            f(*handle, &mut self.slots[handle.index()].value);
        }
    }

    /// Snapshot of live handles, for loops that release while iterating
    pub fn handles(&self) -> Vec<Handle> {
        self.active.clone()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.active.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
