/// A generational slab allocator.
///
/// A `Slab` stores values of type `T` in a contiguous array and hands out
/// `(index, generation)` keys. A slot's generation is bumped every time its
/// value is removed, so a key kept after [`remove`](Self::remove) no longer
/// resolves, even once the index has been reused.
///
/// Watchers are stored here; the keys are what the application holds.
pub(crate) struct Slab<T> {
    /// Storage for items, `None` for free slots.
    slots: Vec<Slot<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
    /// Number of occupied slots.
    len: usize,
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

impl<T> Slab<T> {
    /// Creates a new `Slab` with room for `size` values before growing.
    pub(crate) fn new(size: usize) -> Self {
        Self {
            slots: Vec::with_capacity(size),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Inserts a value and returns its `(index, generation)` key.
    ///
    /// Free slots are reused before the storage grows.
    pub(crate) fn insert(&mut self, item: T) -> (usize, u32) {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.value = Some(item);
            return (index, slot.generation);
        }

        self.slots.push(Slot {
            generation: 0,
            value: Some(item),
        });

        (self.slots.len() - 1, 0)
    }

    /// Removes and returns the value for `key`, or `None` if the key is stale.
    pub(crate) fn remove(&mut self, index: usize, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index)?;
        if slot.generation != generation {
            return None;
        }

        let item = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.len -= 1;

        Some(item)
    }

    /// Returns a reference to the value for `key`.
    pub(crate) fn get(&self, index: usize, generation: u32) -> Option<&T> {
        self.slots
            .get(index)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Returns a mutable reference to the value for `key`.
    pub(crate) fn get_mut(&mut self, index: usize, generation: u32) -> Option<&mut T> {
        self.slots
            .get_mut(index)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Returns the occupied value at `index` regardless of generation.
    ///
    /// Used by registry traversal, which only knows indices.
    pub(crate) fn at_mut(&mut self, index: usize) -> Option<(u32, &mut T)> {
        let slot = self.slots.get_mut(index)?;
        let generation = slot.generation;
        slot.value.as_mut().map(|value| (generation, value))
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Iterates over every occupied slot.
    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(|slot| slot.value.as_mut())
    }
}
