// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Static buffer type.
*/

use std::sync::Arc;

use crate::bindings::buffer_types::BufferUse;
use crate::imp::{self, BufferDescriptor, BufferHandle, Device};

pub struct Buffer {
    handle: BufferHandle,
    usage: BufferUse,
    size: usize,
    debug_name: String,
    device: Arc<dyn Device>,
}

impl Buffer {
    /**
    Creates the buffer from `data`.

    # Panics
    If `data` is empty.
    */
    pub(crate) fn new(
        device: &Arc<dyn Device>,
        usage: BufferUse,
        data: &[u8],
        debug_name: &str,
    ) -> Result<Self, imp::Error> {
        assert!(!data.is_empty(), "static buffer {debug_name} has no data");
        let descriptor = BufferDescriptor {
            usage,
            size: data.len(),
        };
        let handle = device.create_buffer(&descriptor, Some(data))?;
        Ok(Buffer {
            handle,
            usage,
            size: data.len(),
            debug_name: debug_name.to_string(),
            device: device.clone(),
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }
    pub fn usage(&self) -> BufferUse {
        self.usage
    }
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }
    pub(crate) fn handle(&self) -> BufferHandle {
        self.handle
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.device.destroy_buffer(self.handle);
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("debug_name", &self.debug_name)
            .field("usage", &self.usage)
            .field("size", &self.size)
            .finish()
    }
}
