// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Texture formats understood by the resource layer.
//!
//! # Available Formats
//!
//! - [`TextureFormat::RGBA8`] - 4-channel 8-bit normalized (4 bytes per pixel)
//! - [`TextureFormat::I8`] - single 8-bit intensity channel (1 byte per pixel)
//! - [`TextureFormat::DXT1`] - block compressed, 4x4 blocks of 8 bytes (half a byte per pixel)
//!
//! Compressed formats may only back static textures, since a dynamic texture's staging copy
//! is written a pixel at a time.
//!
//! ```
//! use slots_and_frames::pixel_formats::TextureFormat;
//! assert_eq!(TextureFormat::RGBA8.image_size(2, 2), 16);
//! assert_eq!(TextureFormat::DXT1.image_size(4, 4), 8);
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    RGBA8,
    I8,
    DXT1,
}

impl TextureFormat {
    pub const fn is_compressed(self) -> bool {
        matches!(self, TextureFormat::DXT1)
    }

    /// Bytes per pixel, for uncompressed formats.
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            TextureFormat::RGBA8 => Some(4),
            TextureFormat::I8 => Some(1),
            TextureFormat::DXT1 => None,
        }
    }

    /// Bytes occupied by one `width` x `height` image.
    pub const fn image_size(self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            TextureFormat::RGBA8 => pixels * 4,
            TextureFormat::I8 => pixels,
            TextureFormat::DXT1 => pixels / 2,
        }
    }

    /**
    Bytes occupied by `mips` levels starting at `width` x `height`, each level half the size of the last.
    */
    pub fn mip_chain_size(self, width: u32, height: u32, mips: u32) -> usize {
        let (mut w, mut h) = (width, height);
        let mut total = 0;
        for _ in 0..mips {
            total += self.image_size(w, h);
            w = (w / 2).max(1);
            h = (h / 2).max(1);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::TextureFormat;

    #[test]
    fn sizes() {
        assert_eq!(TextureFormat::RGBA8.image_size(4, 2), 32);
        assert_eq!(TextureFormat::I8.image_size(4, 2), 8);
        assert_eq!(TextureFormat::DXT1.image_size(8, 8), 32);
        assert_eq!(TextureFormat::I8.bytes_per_pixel(), Some(1));
        assert!(TextureFormat::DXT1.bytes_per_pixel().is_none());
    }

    #[test]
    fn mip_chain() {
        //4x4 + 2x2 + 1x1
        assert_eq!(TextureFormat::RGBA8.mip_chain_size(4, 4, 3), (16 + 4 + 1) * 4);
        assert_eq!(TextureFormat::I8.mip_chain_size(4, 1, 3), 4 + 2 + 1);
    }
}
