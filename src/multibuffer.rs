// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Multibuffering implementation.

This implements a generic multibuffering algorithm. The main idea is,

1.  We have one CPU-visible staging copy
2.  We have N GPU-visible copies ("slots"), one per command buffer in the rotation
3.  We write to the CPU side, which invalidates every GPU side.  Before a command buffer
    is handed to the render worker, the GPU copy for its slot is brought up to date.

The objects here are fully generic, and may support buffers or textures.

Slots are never raw integers outside this module.  A [Slot] is only produced by the
[Rotation], so indexing a [Multibuffer] always names one of the fill/complete/draw roles.
*/

use std::fmt::{Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::bittricks::{low_bits, slot_bit};

/// Number of slots used when no other count is configured.
pub const DEFAULT_SLOT_COUNT: usize = 3;
/// The validity mask is 32 bits wide.
pub const MAX_SLOT_COUNT: usize = 32;
/// Below this, there is no way to record while another slot is drawn.
pub const MIN_SLOT_COUNT: usize = 2;

/**
One position in the rotation.

A slot names both a command buffer and the matching physical copy of every dynamic resource.
*/
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot(u8);

impl Slot {
    pub(crate) const fn new(index: usize) -> Self {
        assert!(index < MAX_SLOT_COUNT, "slot index out of range");
        Slot(index as u8)
    }
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl Debug for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}

/**
Tracks which physical slots hold data equal to the staging copy.
*/
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ValidityMask(u32);

impl ValidityMask {
    pub const fn empty() -> Self {
        ValidityMask(0)
    }
    pub const fn contains(self, slot: Slot) -> bool {
        self.0 & slot_bit(slot.index()) != 0
    }
    #[cfg(test)]
    fn insert(&mut self, slot: Slot) {
        self.0 |= slot_bit(slot.index());
    }
    #[cfg(test)]
    fn clear(&mut self) {
        self.0 = 0;
    }
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }
    pub const fn bits(self) -> u32 {
        self.0
    }
    /// True once every slot in a rotation of `slot_count` is up to date.
    pub const fn is_saturated(self, slot_count: usize) -> bool {
        self.0 & low_bits(slot_count) == low_bits(slot_count)
    }
}

impl Debug for ValidityMask {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValidityMask({:#b})", self.0)
    }
}

/**
The three rotating roles.

* `fill`: the buffer the client is recording into.
* `complete`: the most recently finished recording, next to be drawn.
* `draw`: the buffer the render worker replays (or last replayed).
*/
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    fill: Slot,
    complete: Slot,
    draw: Slot,
    slot_count: u8,
}

impl Rotation {
    pub(crate) fn new(slot_count: usize) -> Self {
        assert!(
            (MIN_SLOT_COUNT..=MAX_SLOT_COUNT).contains(&slot_count),
            "slot count {slot_count} outside {MIN_SLOT_COUNT}..={MAX_SLOT_COUNT}"
        );
        Rotation {
            fill: Slot::new(0),
            complete: Slot::new(0),
            draw: Slot::new(0),
            slot_count: slot_count as u8,
        }
    }
    pub fn fill(&self) -> Slot {
        self.fill
    }
    pub fn complete(&self) -> Slot {
        self.complete
    }
    pub fn draw(&self) -> Slot {
        self.draw
    }
    pub fn slot_count(&self) -> usize {
        self.slot_count as usize
    }

    /**
    Promotes the fill slot to complete and picks a new fill slot.

    The new fill slot is neither the new complete slot nor the draw slot.  With only two
    slots the draw slot is reusable once the worker is idle; when it is not, there is no
    candidate and `None` is returned without changing anything.
    */
    pub(crate) fn advance(&mut self, drawing: bool) -> Option<Slot> {
        let complete = self.fill;
        let exclude_draw = drawing || self.slot_count > 2;
        let next = (0..self.slot_count as usize)
            .map(Slot::new)
            .find(|s| *s != complete && !(exclude_draw && *s == self.draw))?;
        self.complete = complete;
        self.fill = next;
        Some(complete)
    }

    /// The worker takes the complete slot.
    pub(crate) fn begin_draw(&mut self) -> Slot {
        self.draw = self.complete;
        self.draw
    }
}

impl Debug for Rotation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rotation {{ fill: {}, complete: {}, draw: {} }}",
            self.fill.0, self.complete.0, self.draw.0
        )
    }
}

/**
A fixed-size set of physical copies, one per slot.
*/
pub(crate) struct Multibuffer<T> {
    copies: Box<[T]>,
}

impl<T> Multibuffer<T> {
    pub fn from_fn(count: usize, mut f: impl FnMut(Slot) -> T) -> Self {
        Multibuffer {
            copies: (0..count).map(|i| f(Slot::new(i))).collect(),
        }
    }

    /// Builds every copy, or none: copies built before a failure are handed to `undo`.
    pub fn try_from_fn<E>(
        count: usize,
        mut f: impl FnMut(Slot) -> Result<T, E>,
        mut undo: impl FnMut(T),
    ) -> Result<Self, E> {
        let mut copies = Vec::with_capacity(count);
        for i in 0..count {
            match f(Slot::new(i)) {
                Ok(copy) => copies.push(copy),
                Err(e) => {
                    copies.into_iter().for_each(&mut undo);
                    return Err(e);
                }
            }
        }
        Ok(Multibuffer {
            copies: copies.into_boxed_slice(),
        })
    }

    pub fn get(&self, slot: Slot) -> &T {
        &self.copies[slot.index()]
    }

    pub fn len(&self) -> usize {
        self.copies.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.copies.iter()
    }
}

impl<T: Debug> Debug for Multibuffer<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.copies.iter()).finish()
    }
}

/**
CPU staging bytes plus one GPU copy per slot.

`H` is the backend handle of one physical copy.  The validity mask sits outside the staging
lock so it can be read while the staging copy is mapped; it is only written with the lock held.
*/
#[derive(Debug)]
pub(crate) struct DynamicData<H> {
    gpu: Multibuffer<H>,
    byte_len: usize,
    staging: Mutex<Vec<u8>>,
    valid: AtomicU32,
    mapped: AtomicBool,
}

impl<H> DynamicData<H> {
    pub fn new(gpu: Multibuffer<H>, byte_len: usize) -> Self {
        DynamicData {
            gpu,
            byte_len,
            staging: Mutex::new(vec![0; byte_len]),
            valid: AtomicU32::new(0),
            mapped: AtomicBool::new(false),
        }
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn gpu(&self, slot: Slot) -> &H {
        self.gpu.get(slot)
    }

    pub fn copies(&self) -> impl Iterator<Item = &H> {
        self.gpu.iter()
    }

    /**
    Copies as many bytes as fit and invalidates every slot.  Returns the count copied.

    # Panics
    While the staging copy is mapped.
    */
    pub fn load(&self, data: &[u8]) -> usize {
        assert!(
            !self.mapped.load(Ordering::Acquire),
            "load() while the staging copy is mapped; unmap it first"
        );
        let mut staging = self.staging.lock().unwrap();
        let len = data.len().min(self.byte_len);
        staging[..len].copy_from_slice(&data[..len]);
        self.valid.store(0, Ordering::Release);
        len
    }

    /**
    # Panics
    While the staging copy is already mapped.
    */
    pub fn map(&self, size_hint: usize) -> Option<MappedStaging<'_>> {
        if size_hint > self.byte_len {
            return None;
        }
        assert!(
            !self.mapped.load(Ordering::Acquire),
            "map() while the staging copy is already mapped"
        );
        let guard = self.staging.lock().unwrap();
        self.mapped.store(true, Ordering::Release);
        Some(MappedStaging {
            guard,
            valid: &self.valid,
            mapped: &self.mapped,
        })
    }

    pub fn validity(&self) -> ValidityMask {
        ValidityMask(self.valid.load(Ordering::Acquire))
    }

    /**
    Brings the copy for `slot` up to date.

    Returns true if `upload` ran.  While the staging copy is mapped, the slot is left
    invalid and will be retried on its next turn in the rotation.
    */
    pub fn update_slot(&self, slot: Slot, upload: impl FnOnce(&H, &[u8])) -> bool {
        if self.mapped.load(Ordering::Acquire) {
            logwise::warn_sync!(
                "Staging is mapped during execute; slot {slot} left stale",
                slot = slot.index()
            );
            return false;
        }
        let staging = self.staging.lock().unwrap();
        if self.validity().contains(slot) {
            return false;
        }
        upload(self.gpu.get(slot), &staging);
        self.valid.fetch_or(slot_bit(slot.index()), Ordering::AcqRel);
        true
    }
}

/**
A writable view of a dynamic resource's staging copy.

Unmapping (explicitly or by dropping) invalidates every slot, exactly like a load.
*/
pub struct MappedStaging<'a> {
    guard: MutexGuard<'a, Vec<u8>>,
    valid: &'a AtomicU32,
    mapped: &'a AtomicBool,
}

impl MappedStaging<'_> {
    pub fn unmap(self) {
        drop(self)
    }
}

impl Deref for MappedStaging<'_> {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for MappedStaging<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl Drop for MappedStaging<'_> {
    fn drop(&mut self) {
        self.valid.store(0, Ordering::Release);
        self.mapped.store(false, Ordering::Release);
    }
}

impl Debug for MappedStaging<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedStaging")
            .field("len", &self.guard.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn data(slots: usize, len: usize) -> DynamicData<usize> {
        DynamicData::new(Multibuffer::from_fn(slots, |s| s.index()), len)
    }

    #[test]
    fn rotation_never_fills_the_draw_slot() {
        let mut rotation = Rotation::new(3);
        for _ in 0..20 {
            let complete = rotation.advance(true).unwrap();
            assert_eq!(complete, rotation.complete());
            assert_ne!(rotation.fill(), rotation.complete());
            assert_ne!(rotation.fill(), rotation.draw());
            rotation.begin_draw();
            assert_ne!(rotation.fill(), rotation.draw());
        }
    }

    #[test]
    fn rotation_starts_at_zero() {
        let mut rotation = Rotation::new(3);
        assert_eq!(rotation.advance(false), Some(Slot::new(0)));
        assert_eq!(rotation.fill(), Slot::new(1));
        assert_eq!(rotation.advance(false), Some(Slot::new(1)));
        assert_eq!(rotation.fill(), Slot::new(2));
    }

    #[test]
    fn two_slots_wait_for_the_worker() {
        let mut rotation = Rotation::new(2);
        rotation.advance(false).unwrap();
        rotation.begin_draw();
        //fill is 1, draw is 0 and busy: nothing left
        assert_eq!(rotation.advance(true), None);
        assert_eq!(rotation.fill(), Slot::new(1));
        assert_eq!(rotation.advance(false), Some(Slot::new(1)));
        assert_eq!(rotation.fill(), Slot::new(0));
    }

    #[test]
    #[should_panic]
    fn one_slot_is_rejected() {
        Rotation::new(1);
    }

    #[test]
    fn mask() {
        let mut mask = ValidityMask::empty();
        mask.insert(Slot::new(0));
        mask.insert(Slot::new(2));
        assert!(mask.contains(Slot::new(2)));
        assert!(!mask.contains(Slot::new(1)));
        assert!(!mask.is_saturated(3));
        mask.insert(Slot::new(1));
        assert!(mask.is_saturated(3));
        assert_eq!(mask.count(), 3);
        mask.clear();
        assert_eq!(mask, ValidityMask::empty());
    }

    #[test]
    fn update_slot_uploads_once_per_load() {
        let data = data(3, 4);
        let uploads = RefCell::new(Vec::new());
        let upload = |h: &usize, bytes: &[u8]| uploads.borrow_mut().push((*h, bytes.to_vec()));
        assert!(data.update_slot(Slot::new(0), upload));
        assert!(!data.update_slot(Slot::new(0), upload));
        data.load(&[1, 2, 3, 4]);
        assert!(data.update_slot(Slot::new(0), upload));
        assert!(data.update_slot(Slot::new(1), upload));
        assert_eq!(
            uploads.into_inner(),
            vec![(0, vec![0; 4]), (0, vec![1, 2, 3, 4]), (1, vec![1, 2, 3, 4])]
        );
    }

    #[test]
    fn load_truncates() {
        let data = data(3, 2);
        assert_eq!(data.load(&[9, 8, 7]), 2);
        assert_eq!(&*data.map(2).unwrap(), &[9, 8]);
    }

    #[test]
    fn map_rejects_oversized_hints() {
        let data = data(3, 8);
        assert!(data.map(9).is_none());
        assert!(data.map(8).is_some());
        assert!(data.map(0).is_some());
    }

    #[test]
    fn validity_is_readable_while_mapped() {
        let data = data(3, 2);
        data.update_slot(Slot::new(2), |_, _| {});
        let mapped = data.map(2).unwrap();
        assert!(data.validity().contains(Slot::new(2)));
        drop(mapped);
        assert_eq!(data.validity(), ValidityMask::empty());
    }

    #[test]
    #[should_panic(expected = "mapped")]
    fn load_while_mapped_panics() {
        let data = data(3, 2);
        let _mapped = data.map(2).unwrap();
        data.load(&[1, 2]);
    }

    #[test]
    #[should_panic(expected = "already mapped")]
    fn second_map_panics() {
        let data = data(3, 2);
        let _mapped = data.map(2).unwrap();
        let _ = data.map(1);
    }

    #[test]
    fn unmap_invalidates() {
        let data = data(3, 2);
        data.update_slot(Slot::new(1), |_, _| {});
        assert!(data.validity().contains(Slot::new(1)));
        let mut mapped = data.map(2).unwrap();
        mapped[0] = 5;
        mapped.unmap();
        assert_eq!(data.validity(), ValidityMask::empty());
    }

    #[test]
    fn mapped_staging_skips_upload() {
        let data = data(3, 2);
        let mapped = data.map(2).unwrap();
        assert!(!data.update_slot(Slot::new(0), |_, _| panic!("uploaded while mapped")));
        drop(mapped);
        assert!(data.update_slot(Slot::new(0), |_, _| {}));
    }

    #[test]
    fn try_from_fn_undoes_partial_work() {
        let undone = RefCell::new(Vec::new());
        let result: Result<Multibuffer<usize>, ()> = Multibuffer::try_from_fn(
            3,
            |s| if s.index() == 2 { Err(()) } else { Ok(s.index()) },
            |copy| undone.borrow_mut().push(copy),
        );
        assert!(result.is_err());
        assert_eq!(undone.into_inner(), vec![0, 1]);
    }
}
