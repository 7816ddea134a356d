// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Resources that pass data in the 'forward' direction, that is, CPU=>GPU.

## Choosing Between Static and Dynamic

### Use `static` when:
- Data is uploaded once and used many times
- Examples: mesh geometry, texture atlases, lookup tables

### Use `dynamic` when:
- Data changes frequently (per frame or per draw)
- Examples: camera matrices, animation data, particle positions
- Each dynamic resource keeps one physical copy per command-buffer slot, so the
  client can write while the worker reads an older copy.
*/

use std::sync::Arc;

use crate::imp::{BufferHandle, TextureHandle};
use crate::multibuffer::Slot;

pub mod dynamic;
pub mod r#static;

/**
A buffer of either class, as referenced by a vertex format or a data binding.
*/
#[derive(Debug, Clone)]
pub enum BufferRef {
    Static(Arc<r#static::buffer::Buffer>),
    Dynamic(Arc<dynamic::buffer::Buffer>),
}

impl BufferRef {
    /// The physical buffer a command in `slot` reads.
    pub(crate) fn handle(&self, slot: Slot) -> BufferHandle {
        match self {
            BufferRef::Static(b) => b.handle(),
            BufferRef::Dynamic(b) => b.handle(slot),
        }
    }
    pub fn size(&self) -> usize {
        match self {
            BufferRef::Static(b) => b.size(),
            BufferRef::Dynamic(b) => b.size(),
        }
    }
}

impl From<Arc<r#static::buffer::Buffer>> for BufferRef {
    fn from(value: Arc<r#static::buffer::Buffer>) -> Self {
        BufferRef::Static(value)
    }
}

impl From<Arc<dynamic::buffer::Buffer>> for BufferRef {
    fn from(value: Arc<dynamic::buffer::Buffer>) -> Self {
        BufferRef::Dynamic(value)
    }
}

/**
A texture a shader can sample.
*/
#[derive(Debug, Clone)]
pub enum TextureRef {
    Static(Arc<r#static::texture::Texture>),
    StaticArray(Arc<r#static::texture::ArrayTexture>),
    Dynamic(Arc<dynamic::texture::Texture>),
    /// The bindable color copy of a render target.
    RenderColor(Arc<crate::bindings::render_target::RenderTexture>),
    /// The bindable depth copy of a render target.
    RenderDepth(Arc<crate::bindings::render_target::RenderTexture>),
}

impl TextureRef {
    /// `None` for a render target created without the requested bindable copy.
    pub(crate) fn handle(&self, slot: Slot) -> Option<TextureHandle> {
        match self {
            TextureRef::Static(t) => Some(t.handle()),
            TextureRef::StaticArray(t) => Some(t.handle()),
            TextureRef::Dynamic(t) => Some(t.handle(slot)),
            TextureRef::RenderColor(t) => t.bindable_color(),
            TextureRef::RenderDepth(t) => t.bindable_depth(),
        }
    }
}
