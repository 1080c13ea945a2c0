//! Sprite storage
//!
//! Sprites are off-screen surfaces owned by a slot registry. A handle carries
//! a slot index plus a generation counter; deleting a sprite bumps the slot's
//! generation so stale handles are detected instead of resolving to whatever
//! occupies the slot next.

use crate::engine::Handle;
use crate::surface::Surface;

/// An off-screen drawing surface parented to another target.
pub(crate) struct Sprite {
    pub surface: Surface,
    /// Target recorded at creation; pushes composite onto it.
    pub parent: Handle,
}

struct Slot {
    generation: u16,
    entry: Option<Sprite>,
}

/// Index-based sprite registry with generation checking.
pub(crate) struct Registry {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

/// Handles encode the slot index in 16 bits.
const MAX_SLOTS: usize = 0x1_0000;

impl Registry {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of live sprites.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    /// Store a fully constructed sprite. Returns its slot index and
    /// generation, or `None` when the handle space is exhausted.
    pub fn insert(&mut self, sprite: Sprite) -> Option<(usize, u16)> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.entry = Some(sprite);
            return Some((index, slot.generation));
        }
        if self.slots.len() >= MAX_SLOTS {
            return None;
        }
        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            entry: Some(sprite),
        });
        Some((index, 0))
    }

    pub fn get(&self, index: usize, generation: u16) -> Option<&Sprite> {
        let slot = self.slots.get(index)?;
        if slot.generation != generation {
            return None;
        }
        slot.entry.as_ref()
    }

    pub fn get_mut(&mut self, index: usize, generation: u16) -> Option<&mut Sprite> {
        let slot = self.slots.get_mut(index)?;
        if slot.generation != generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Remove a sprite, bumping the slot generation so the handle goes stale.
    pub fn remove(&mut self, index: usize, generation: u16) -> Option<Sprite> {
        let slot = self.slots.get_mut(index)?;
        if slot.generation != generation {
            return None;
        }
        let sprite = slot.entry.take()?;
        // Generations wrap within the 15 bits the handle encoding carries.
        slot.generation = (slot.generation + 1) & 0x7FFF;
        self.free.push(index);
        Some(sprite)
    }

    /// Borrow two distinct slots at once, the first immutably (blit source)
    /// and the second mutably (blit destination).
    pub fn pair_mut(
        &mut self,
        src: (usize, u16),
        dst: (usize, u16),
    ) -> Option<(&Sprite, &mut Sprite)> {
        if src.0 == dst.0 {
            return None;
        }
        let (lo, hi) = (src.0.min(dst.0), src.0.max(dst.0));
        if hi >= self.slots.len() {
            return None;
        }
        let (left, right) = self.slots.split_at_mut(hi);
        let (lo_slot, hi_slot) = (&mut left[lo], &mut right[0]);
        let (src_slot, dst_slot) = if src.0 < dst.0 {
            (lo_slot, hi_slot)
        } else {
            (hi_slot, lo_slot)
        };
        if src_slot.generation != src.1 || dst_slot.generation != dst.1 {
            return None;
        }
        match (src_slot.entry.as_ref(), dst_slot.entry.as_mut()) {
            (Some(s), Some(d)) => Some((s, d)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PixelFormat;

    fn sprite() -> Sprite {
        Sprite {
            surface: Surface::new(4, 4, PixelFormat::Rgb888),
            parent: Handle::ROOT,
        }
    }

    #[test]
    fn stale_generation_does_not_resolve() {
        let mut reg = Registry::new();
        let (index, generation) = reg.insert(sprite()).unwrap();
        assert!(reg.get(index, generation).is_some());
        assert!(reg.remove(index, generation).is_some());
        assert!(reg.get(index, generation).is_none());
        assert!(reg.remove(index, generation).is_none());

        // The slot is reused under a new generation.
        let (index2, generation2) = reg.insert(sprite()).unwrap();
        assert_eq!(index2, index);
        assert_ne!(generation2, generation);
        assert!(reg.get(index, generation).is_none());
        assert!(reg.get(index2, generation2).is_some());
    }

    #[test]
    fn len_counts_live_entries() {
        let mut reg = Registry::new();
        let a = reg.insert(sprite()).unwrap();
        let _b = reg.insert(sprite()).unwrap();
        assert_eq!(reg.len(), 2);
        reg.remove(a.0, a.1);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn pair_mut_borrows_two_slots() {
        let mut reg = Registry::new();
        let a = reg.insert(sprite()).unwrap();
        let b = reg.insert(sprite()).unwrap();
        assert!(reg.pair_mut(a, b).is_some());
        assert!(reg.pair_mut(b, a).is_some());
        assert!(reg.pair_mut(a, a).is_none());
    }
}
