use core::num::NonZero;

#[cfg(test)]
type RawSlot = u16;
#[cfg(not(test))]
type RawSlot = u32;

/// Compact arena index. `NonZero` gives `Option<Slot>` the niche so it costs
/// no extra space in node child lists.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub(crate) struct Slot(NonZero<RawSlot>);

impl Slot {
    pub(crate) const MAX: usize = (RawSlot::MAX - 1) as usize;

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) const fn from_index(index: usize) -> Self {
        assert!(index <= Self::MAX, "`Slot::from_index()` - `index` > `Slot::MAX`!");
        // `index + 1` cannot be zero and cannot overflow.
        match NonZero::new((index + 1) as RawSlot) {
            Some(raw) => Self(raw),
            None => unreachable!(),
        }
    }

    #[inline]
    pub(crate) const fn to_index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Slab storage for nodes. Splits allocate, merges take; freed slots are
/// recycled through a free list, so a `Slot` is only valid while its node is
/// live and is never a stable identity.
#[derive(Clone)]
pub(crate) struct Arena<T> {
    slots: Vec<Option<T>>,
    free: Vec<Slot>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn alloc(&mut self, value: T) -> Slot {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot.to_index()] = Some(value);
                slot
            }
            None => {
                let index = self.slots.len();
                // Strict less-than keeps every post-push index representable.
                assert!(
                    index < Slot::MAX,
                    "`Arena::alloc()` - arena is at maximum capacity ({})",
                    Slot::MAX
                );
                self.slots.push(Some(value));
                Slot::from_index(index)
            }
        }
    }

    #[inline]
    pub(crate) fn get(&self, slot: Slot) -> &T {
        self.slots[slot.to_index()].as_ref().expect("`Arena::get()` - `slot` is invalid!")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, slot: Slot) -> &mut T {
        self.slots[slot.to_index()].as_mut().expect("`Arena::get_mut()` - `slot` is invalid!")
    }

    pub(crate) fn take(&mut self, slot: Slot) -> T {
        let value = self.slots[slot.to_index()].take().expect("`Arena::take()` - `slot` is invalid!");
        self.free.push(slot);
        value
    }

    pub(crate) fn free(&mut self, slot: Slot) {
        drop(self.take(slot));
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
