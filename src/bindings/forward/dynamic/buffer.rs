// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Dynamic buffer implementation.

A dynamic buffer is data we expect to change dynamically.
It is not necessarily every frame; a slot that is already current is never uploaded again.
*/

use std::sync::Arc;

use crate::bindings::buffer_types::BufferUse;
use crate::imp::{self, BufferDescriptor, BufferHandle, Device};
use crate::multibuffer::{DynamicData, MappedStaging, Multibuffer, Slot, ValidityMask};

pub struct Buffer {
    data: DynamicData<BufferHandle>,
    usage: BufferUse,
    debug_name: String,
    device: Arc<dyn Device>,
}

impl Buffer {
    /**
    Creates one physical buffer per slot.  `initial` seeds the staging copy; it reaches the GPU
    the first time each slot is submitted.

    # Panics
    If `size` is zero.
    */
    pub(crate) fn new(
        device: &Arc<dyn Device>,
        usage: BufferUse,
        size: usize,
        slot_count: usize,
        initial: Option<&[u8]>,
        debug_name: &str,
    ) -> Result<Self, imp::Error> {
        assert!(size > 0, "dynamic buffer {debug_name} has zero size");
        let descriptor = BufferDescriptor { usage, size };
        let copies = Multibuffer::try_from_fn(
            slot_count,
            |_| device.create_buffer(&descriptor, None),
            |handle| device.destroy_buffer(handle),
        )?;
        let data = DynamicData::new(copies, size);
        if let Some(initial) = initial {
            data.load(initial);
        }
        Ok(Buffer {
            data,
            usage,
            debug_name: debug_name.to_string(),
            device: device.clone(),
        })
    }

    pub fn size(&self) -> usize {
        self.data.byte_len()
    }
    pub fn usage(&self) -> BufferUse {
        self.usage
    }
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    /**
    Copies up to [Self::size] bytes into the staging copy.  Every slot becomes stale.

    # Panics
    While a [MappedStaging] view of this buffer is alive.
    */
    pub fn load(&self, bytes: &[u8]) {
        self.data.load(bytes);
    }

    /**
    Maps the staging copy for writing.

    Returns `None` if `size_hint` exceeds [Self::size].  Unmapping makes every slot stale.
    [Self::validity] may be read while mapped; [Self::load] and a second `map` panic.
    */
    pub fn map(&self, size_hint: usize) -> Option<MappedStaging<'_>> {
        self.data.map(size_hint)
    }

    pub fn validity(&self) -> ValidityMask {
        self.data.validity()
    }

    pub(crate) fn update_slot(&self, slot: Slot) -> bool {
        self.data.update_slot(slot, |handle, bytes| {
            logwise::trace_sync!(
                "upload buffer {name} slot {slot}",
                name = logwise::privacy::LogIt(&self.debug_name),
                slot = slot.index()
            );
            self.device.upload_buffer(*handle, bytes);
        })
    }

    pub(crate) fn handle(&self, slot: Slot) -> BufferHandle {
        *self.data.gpu(slot)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        for handle in self.data.copies() {
            self.device.destroy_buffer(*handle);
        }
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("debug_name", &self.debug_name)
            .field("usage", &self.usage)
            .field("data", &self.data)
            .finish()
    }
}
