use std::fmt;
use std::marker::PhantomData;

use crate::time::clock::ClockError;

/// Objects that can live in a [`Pool`]. `on_retrieved` must reset every
/// field a previous user could have changed.
pub trait Poolable: Default {
    fn on_retrieved(&mut self);
    fn on_released(&mut self);
}

/// Index plus generation. A handle whose generation no longer matches its
/// slot refers to an object that has since been released (and possibly
/// reused); every access through it is a checked error.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    in_use: bool,
    value: T,
}

/// Expanding object pool with generation-checked handles.
///
/// Storage doubles when every slot is in use. Released objects stay in
/// their slot so their allocations are reused by the next retrieval.
pub struct Pool<T: Poolable> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    name: &'static str,
}

impl<T: Poolable> Pool<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let mut pool = Self { slots: Vec::new(), free: Vec::new(), name };
        pool.grow(capacity);
        pool
    }

    fn grow(&mut self, additional: usize) {
        let start = self.slots.len();
        for _ in 0..additional {
            self.slots.push(Slot { generation: 0, in_use: false, value: T::default() });
        }
        // Lowest indices are handed out first.
        self.free.extend((start..self.slots.len()).rev().map(|i| i as u32));
    }

    pub fn retrieve(&mut self) -> Handle<T> {
        if self.free.is_empty() {
            let additional = self.slots.len().max(1);
            log::debug!("{} pool exhausted; growing {} -> {}", self.name, self.slots.len(), self.slots.len() + additional);
            self.grow(additional);
        }
        let index = self.free.pop().unwrap_or_default();
        let slot = &mut self.slots[index as usize];
        slot.in_use = true;
        slot.value.on_retrieved();
        Handle { index, generation: slot.generation, _marker: PhantomData }
    }

    pub fn release(&mut self, handle: Handle<T>) -> Result<(), ClockError> {
        let slot = self.slot_mut(handle)?;
        slot.in_use = false;
        slot.generation = slot.generation.wrapping_add(1);
        slot.value.on_released();
        self.free.push(handle.index);
        Ok(())
    }

    fn slot_mut(&mut self, handle: Handle<T>) -> Result<&mut Slot<T>, ClockError> {
        match self.slots.get_mut(handle.index as usize) {
            Some(slot) if slot.in_use && slot.generation == handle.generation => Ok(slot),
            _ => Err(ClockError::StaleHandle { index: handle.index, generation: handle.generation }),
        }
    }

    pub fn get(&self, handle: Handle<T>) -> Result<&T, ClockError> {
        match self.slots.get(handle.index as usize) {
            Some(slot) if slot.in_use && slot.generation == handle.generation => Ok(&slot.value),
            _ => Err(ClockError::StaleHandle { index: handle.index, generation: handle.generation }),
        }
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Result<&mut T, ClockError> {
        self.slot_mut(handle).map(|slot| &mut slot.value)
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_ok()
    }

    /// Objects currently retrieved.
    pub fn active(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Handles of every retrieved object, in slot order.
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.in_use)
            .map(|(i, s)| Handle { index: i as u32, generation: s.generation, _marker: PhantomData })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        value: u32,
        valid: bool,
        retrieved: u32,
    }

    impl Poolable for Counter {
        fn on_retrieved(&mut self) {
            self.value = 0;
            self.valid = true;
            self.retrieved += 1;
        }

        fn on_released(&mut self) {
            self.valid = false;
        }
    }

    #[test]
    fn retrieve_resets_and_reuses_slots() {
        let mut pool: Pool<Counter> = Pool::new("counter", 1);
        let a = pool.retrieve();
        pool.get_mut(a).unwrap().value = 42;
        pool.release(a).unwrap();

        let b = pool.retrieve();
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        let counter = pool.get(b).unwrap();
        assert_eq!(counter.value, 0);
        assert_eq!(counter.retrieved, 2);
        assert!(counter.valid);
    }

    #[test]
    fn stale_handles_are_rejected() {
        let mut pool: Pool<Counter> = Pool::new("counter", 2);
        let a = pool.retrieve();
        pool.release(a).unwrap();
        assert!(matches!(pool.get(a), Err(ClockError::StaleHandle { .. })));
        assert!(pool.release(a).is_err());
        let _reused = pool.retrieve();
        assert!(pool.get_mut(a).is_err());
    }

    #[test]
    fn expands_when_exhausted() {
        let mut pool: Pool<Counter> = Pool::new("counter", 1);
        let handles: Vec<_> = (0..5).map(|_| pool.retrieve()).collect();
        assert_eq!(pool.active(), 5);
        assert!(pool.capacity() >= 5);
        assert_eq!(pool.handles(), handles);
    }

    #[test]
    fn empty_pool_grows_from_zero() {
        let mut pool: Pool<Counter> = Pool::new("counter", 0);
        let h = pool.retrieve();
        assert!(pool.contains(h));
    }
}
