// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A texture whose contents change between frames.

Dynamic textures are uncompressed, since the staging copy is written directly by the client.
*/

use std::sync::Arc;

use crate::imp::{self, Device, TextureDescriptor, TextureHandle, TextureKind};
use crate::multibuffer::{DynamicData, MappedStaging, Multibuffer, Slot, ValidityMask};
use crate::pixel_formats::TextureFormat;

#[derive(Debug)]
pub struct Texture {
    data: DynamicData<TextureHandle>,
    format: TextureFormat,
    width: u32,
    height: u32,
    device: Arc<dyn Device>,
}

impl Texture {
    /**
    # Panics
    If the size is zero or `format` is compressed.
    */
    pub(crate) fn new(
        device: &Arc<dyn Device>,
        format: TextureFormat,
        width: u32,
        height: u32,
        slot_count: usize,
    ) -> Result<Self, imp::Error> {
        assert!(
            !format.is_compressed(),
            "unsupported tex format {format:?} for a dynamic texture"
        );
        assert!(width > 0 && height > 0, "dynamic texture has zero size");
        let descriptor = TextureDescriptor {
            format,
            width,
            height,
            kind: TextureKind::Dynamic,
        };
        let copies = Multibuffer::try_from_fn(
            slot_count,
            |_| device.create_texture(&descriptor, None),
            |handle| device.destroy_texture(handle),
        )?;
        Ok(Texture {
            data: DynamicData::new(copies, format.image_size(width, height)),
            format,
            width,
            height,
            device: device.clone(),
        })
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    /// Bytes in one image.
    pub fn size(&self) -> usize {
        self.data.byte_len()
    }

    /// Panics while the staging copy is mapped.
    pub fn load(&self, bytes: &[u8]) {
        self.data.load(bytes);
    }
    pub fn map(&self, size_hint: usize) -> Option<MappedStaging<'_>> {
        self.data.map(size_hint)
    }
    pub fn validity(&self) -> ValidityMask {
        self.data.validity()
    }

    pub(crate) fn update_slot(&self, slot: Slot) -> bool {
        self.data.update_slot(slot, |handle, bytes| {
            logwise::trace_sync!(
                "upload texture slot {slot}",
                slot = slot.index()
            );
            self.device.upload_texture(*handle, bytes);
        })
    }

    pub(crate) fn handle(&self, slot: Slot) -> TextureHandle {
        *self.data.gpu(slot)
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        for handle in self.data.copies() {
            self.device.destroy_texture(*handle);
        }
    }
}
