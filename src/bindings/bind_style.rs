// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Defines the way resources are bound for a draw.
//!
//! A [BindStyle] collects which uniform buffers and textures go in which slots.  Combined with a
//! pipeline and an optional vertex format it becomes a [ShaderDataBinding], the object draw
//! commands refer to.
//!
//! # Key Concepts
//!
//! - **Bind Slots**: Resources are bound to numbered slots that correspond to the uniform block
//!   and texture indices of the pipeline
//! - **Ranges**: A uniform binding may cover part of a buffer.  Range offsets must respect the
//!   backend's uniform alignment, and range sizes are rounded up to it
//! - **Slots vs bind slots**: a dynamic resource resolves to a different physical copy for every
//!   command-buffer slot, so a binding is resolved once per replay

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::bindings::forward::{BufferRef, TextureRef};
use crate::bindings::pipeline::{Primitive, ShaderPipeline};
use crate::bindings::vertex_format::VertexFormat;
use crate::bittricks::{align_up, is_aligned};
use crate::imp::{Capabilities, ResolvedBinding, UniformBinding};
use crate::multibuffer::Slot;

/// Describes how resources are bound for a draw.
///
/// Resources are not bound when methods are called; this struct builds up a description
/// that is validated when the [ShaderDataBinding] is created.
#[derive(Debug, Clone, Default)]
pub struct BindStyle {
    pub(crate) uniforms: HashMap<u32, UniformTarget>,
    pub(crate) textures: HashMap<u32, TextureRef>,
}

#[derive(Debug, Clone)]
pub(crate) enum UniformTarget {
    Whole(BufferRef),
    Range {
        buffer: BufferRef,
        offset: usize,
        size: usize,
    },
}

/// A binding slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindSlot {
    pub(crate) pass_index: u32,
}

impl BindSlot {
    pub const fn new(pass_index: u32) -> Self {
        BindSlot { pass_index }
    }
}

impl BindStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds all of `buffer` to a uniform block.
    ///
    /// # Panics
    ///
    /// Panics if a uniform buffer is already bound to the specified slot.
    pub fn bind_uniform_buffer(&mut self, slot: BindSlot, buffer: impl Into<BufferRef>) {
        self.bind_uniform(slot, UniformTarget::Whole(buffer.into()));
    }

    /// Binds `size` bytes of `buffer` starting at `offset` to a uniform block.
    ///
    /// # Panics
    ///
    /// Panics if a uniform buffer is already bound to the specified slot.
    pub fn bind_uniform_range(
        &mut self,
        slot: BindSlot,
        buffer: impl Into<BufferRef>,
        offset: usize,
        size: usize,
    ) {
        self.bind_uniform(
            slot,
            UniformTarget::Range {
                buffer: buffer.into(),
                offset,
                size,
            },
        );
    }

    /// # Panics
    ///
    /// Panics if a texture is already bound to the specified slot.
    pub fn bind_texture(&mut self, slot: BindSlot, texture: TextureRef) {
        let old = self.textures.insert(slot.pass_index, texture);
        assert!(old.is_none(), "Already bound texture to slot {:?}", slot);
    }

    fn bind_uniform(&mut self, slot: BindSlot, target: UniformTarget) {
        let old = self.uniforms.insert(slot.pass_index, target);
        assert!(old.is_none(), "Already bound uniform to slot {:?}", slot);
    }
}

#[derive(Debug)]
struct Uniform {
    index: u32,
    buffer: BufferRef,
    offset: usize,
    size: usize,
}

/**
A pipeline with its vertex format and resources, ready to be referenced by draw commands.
*/
#[derive(Debug)]
pub struct ShaderDataBinding {
    pipeline: Arc<ShaderPipeline>,
    vertex_format: Option<Arc<VertexFormat>>,
    uniforms: Vec<Uniform>,
    textures: Vec<(u32, TextureRef)>,
}

impl ShaderDataBinding {
    /**
    # Panics
    * If the backend needs a vertex format and none is given.
    * If a uniform range offset is not aligned, or a range runs past its buffer.
    * If a render target is bound for sampling without the matching bindable copy.
    */
    pub(crate) fn new(
        capabilities: Capabilities,
        pipeline: Arc<ShaderPipeline>,
        vertex_format: Option<Arc<VertexFormat>>,
        style: BindStyle,
    ) -> Self {
        assert!(
            vertex_format.is_some() || !capabilities.binding_needs_vertex_format,
            "this backend requires a vertex format for every data binding"
        );
        let alignment = capabilities.uniform_buffer_alignment;
        let mut uniforms: Vec<Uniform> = style
            .uniforms
            .into_iter()
            .map(|(index, target)| match target {
                UniformTarget::Whole(buffer) => Uniform {
                    index,
                    size: buffer.size(),
                    buffer,
                    offset: 0,
                },
                UniformTarget::Range {
                    buffer,
                    offset,
                    size,
                } => {
                    assert!(
                        is_aligned(offset, alignment),
                        "uniform range offset {offset} is not {alignment}-byte aligned"
                    );
                    assert!(
                        offset + size <= buffer.size(),
                        "uniform range {offset}+{size} runs past a {}-byte buffer",
                        buffer.size()
                    );
                    Uniform {
                        index,
                        buffer,
                        offset,
                        size: align_up(size, alignment),
                    }
                }
            })
            .collect();
        uniforms.sort_by_key(|u| u.index);

        let mut textures: Vec<(u32, TextureRef)> = style.textures.into_iter().collect();
        for (index, texture) in &textures {
            let bindable = match texture {
                TextureRef::RenderColor(t) => t.bindable_color().is_some(),
                TextureRef::RenderDepth(t) => t.bindable_depth().is_some(),
                _ => true,
            };
            assert!(
                bindable,
                "texture slot {index} samples a render target that has no bindable copy"
            );
        }
        textures.sort_by_key(|(index, _)| *index);

        ShaderDataBinding {
            pipeline,
            vertex_format,
            uniforms,
            textures,
        }
    }

    pub fn pipeline(&self) -> &Arc<ShaderPipeline> {
        &self.pipeline
    }
    pub fn vertex_format(&self) -> Option<&Arc<VertexFormat>> {
        self.vertex_format.as_ref()
    }
    pub(crate) fn primitive(&self) -> Primitive {
        self.pipeline.primitive()
    }

    /// Resolves every resource to the physical copy for `slot`.
    pub(crate) fn resolve(&self, slot: Slot) -> ResolvedBinding {
        ResolvedBinding {
            pipeline: self.pipeline.handle(),
            vertex_array: self
                .vertex_format
                .as_ref()
                .and_then(|f| f.vertex_array(slot)),
            uniforms: self
                .uniforms
                .iter()
                .map(|u| UniformBinding {
                    index: u.index,
                    buffer: u.buffer.handle(slot),
                    offset: u.offset,
                    size: u.size,
                })
                .collect(),
            textures: self
                .textures
                .iter()
                .filter_map(|(index, t)| t.handle(slot).map(|h| (*index, h)))
                .collect(),
        }
    }
}
