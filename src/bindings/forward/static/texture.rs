// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Static textures, single images and arrays of equal-sized layers.
*/

use std::sync::Arc;

use crate::imp::{self, Device, TextureDescriptor, TextureHandle, TextureKind};
use crate::pixel_formats::TextureFormat;

#[derive(Debug)]
pub struct Texture {
    handle: TextureHandle,
    format: TextureFormat,
    width: u32,
    height: u32,
    mips: u32,
    device: Arc<dyn Device>,
}

impl Texture {
    /**
    Creates a texture from `data`, which holds `mips` levels back to back.

    # Panics
    If the size is zero, `mips` is zero, or `data` is shorter than the mip chain.
    */
    pub(crate) fn new(
        device: &Arc<dyn Device>,
        format: TextureFormat,
        width: u32,
        height: u32,
        mips: u32,
        data: &[u8],
    ) -> Result<Self, imp::Error> {
        assert!(width > 0 && height > 0, "static texture has zero size");
        assert!(mips > 0, "static texture needs at least one mip level");
        let expected = format.mip_chain_size(width, height, mips);
        assert!(
            data.len() >= expected,
            "static texture data is {} bytes, {format:?} {width}x{height} with {mips} mips needs {expected}",
            data.len()
        );
        let descriptor = TextureDescriptor {
            format,
            width,
            height,
            kind: TextureKind::Static { mips },
        };
        let handle = device.create_texture(&descriptor, Some(&data[..expected]))?;
        Ok(Texture {
            handle,
            format,
            width,
            height,
            mips,
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
    pub fn mips(&self) -> u32 {
        self.mips
    }
    pub(crate) fn handle(&self) -> TextureHandle {
        self.handle
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.device.destroy_texture(self.handle);
    }
}

/**
A static texture with several layers sampled by index.
*/
#[derive(Debug)]
pub struct ArrayTexture {
    handle: TextureHandle,
    format: TextureFormat,
    width: u32,
    height: u32,
    layers: u32,
    device: Arc<dyn Device>,
}

impl ArrayTexture {
    /**
    # Panics
    If the size or layer count is zero, or `data` is shorter than `layers` images.
    */
    pub(crate) fn new(
        device: &Arc<dyn Device>,
        format: TextureFormat,
        width: u32,
        height: u32,
        layers: u32,
        data: &[u8],
    ) -> Result<Self, imp::Error> {
        assert!(width > 0 && height > 0, "array texture has zero size");
        assert!(layers > 0, "array texture has no layers");
        let expected = format.image_size(width, height) * layers as usize;
        assert!(
            data.len() >= expected,
            "array texture data is {} bytes, {layers} layers of {format:?} {width}x{height} need {expected}",
            data.len()
        );
        let descriptor = TextureDescriptor {
            format,
            width,
            height,
            kind: TextureKind::Array { layers },
        };
        let handle = device.create_texture(&descriptor, Some(&data[..expected]))?;
        Ok(ArrayTexture {
            handle,
            format,
            width,
            height,
            layers,
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
    pub fn layers(&self) -> u32 {
        self.layers
    }
    pub(crate) fn handle(&self) -> TextureHandle {
        self.handle
    }
}

impl Drop for ArrayTexture {
    fn drop(&mut self) {
        self.device.destroy_texture(self.handle);
    }
}
