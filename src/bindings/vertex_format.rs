// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Vertex formats.
//!
//! A vertex format lists the attributes a pipeline reads and the buffers they come from.
//! Because the buffers may be dynamic, the format is realized as one vertex-array object per
//! slot.  Those objects live in the render worker's context, so they are configured there,
//! the frame after the format is created.
//!
//! # Example
//!
//! ```
//! use slots_and_frames::bindings::vertex_format::VertexSemantic;
//!
//! // interleaved position + packed color
//! let stride = VertexSemantic::Position3.byte_size() + VertexSemantic::ColorUNorm.byte_size();
//! assert_eq!(stride, 16);
//! ```

use std::sync::{Arc, Mutex, Weak};

use crate::bindings::forward::BufferRef;
use crate::images::pending::PendingChanges;
use crate::imp::{AttributeKind, Context, VertexArrayHandle, VertexArrayLayout, VertexAttribute};
use crate::multibuffer::Slot;

/// What a vertex attribute means, and so how it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    Position3,
    Position4,
    Normal3,
    Normal4,
    /// Four floats.
    Color,
    /// Four normalized bytes.
    ColorUNorm,
    UV2,
    UV4,
    Weight,
    /// One row of a model-view matrix.
    ModelView,
}

impl VertexSemantic {
    pub const fn components(self) -> u8 {
        match self {
            VertexSemantic::Position3 | VertexSemantic::Normal3 => 3,
            VertexSemantic::UV2 => 2,
            VertexSemantic::Position4
            | VertexSemantic::Normal4
            | VertexSemantic::Color
            | VertexSemantic::ColorUNorm
            | VertexSemantic::UV4
            | VertexSemantic::Weight
            | VertexSemantic::ModelView => 4,
        }
    }

    pub const fn kind(self) -> AttributeKind {
        match self {
            VertexSemantic::ColorUNorm => AttributeKind::UNorm8,
            _ => AttributeKind::Float,
        }
    }

    pub const fn byte_size(self) -> usize {
        match self.kind() {
            AttributeKind::UNorm8 => self.components() as usize,
            AttributeKind::Float => self.components() as usize * 4,
        }
    }
}

/**
One attribute of a vertex format.
*/
#[derive(Debug, Clone)]
pub struct VertexElement {
    pub semantic: VertexSemantic,
    /// Distinguishes repeated semantics, e.g. the four rows of a matrix.
    pub semantic_index: u32,
    pub buffer: Option<BufferRef>,
    pub index_buffer: Option<BufferRef>,
    /// Advances once per instance instead of once per vertex.
    pub instanced: bool,
}

impl VertexElement {
    pub fn new(semantic: VertexSemantic, buffer: impl Into<BufferRef>) -> Self {
        VertexElement {
            semantic,
            semantic_index: 0,
            buffer: Some(buffer.into()),
            index_buffer: None,
            instanced: false,
        }
    }
    pub fn semantic_index(mut self, index: u32) -> Self {
        self.semantic_index = index;
        self
    }
    pub fn index_buffer(mut self, buffer: impl Into<BufferRef>) -> Self {
        self.index_buffer = Some(buffer.into());
        self
    }
    pub fn instanced(mut self) -> Self {
        self.instanced = true;
        self
    }
}

/// Byte stride of the per-vertex and per-instance streams.
pub(crate) fn strides(elements: &[VertexElement]) -> (usize, usize) {
    elements.iter().fold((0, 0), |(vertex, instance), e| {
        if e.instanced {
            (vertex, instance + e.semantic.byte_size())
        } else {
            (vertex + e.semantic.byte_size(), instance)
        }
    })
}

/**
Resolves `elements` against the physical buffers of `slot`.

Attributes are numbered in list order.  Each stream takes the buffer of its first element;
the index buffer is the last one any element names.
*/
pub(crate) fn layout(elements: &[VertexElement], slot: Slot) -> VertexArrayLayout {
    let (vertex_stride, instance_stride) = strides(elements);
    let mut vertex_offset = 0;
    let mut instance_offset = 0;
    let mut result = VertexArrayLayout {
        attributes: Vec::with_capacity(elements.len()),
        vertex_buffer: None,
        vertex_stride,
        instance_buffer: None,
        instance_stride,
        index_buffer: None,
    };
    for (location, element) in elements.iter().enumerate() {
        let offset = if element.instanced {
            &mut instance_offset
        } else {
            &mut vertex_offset
        };
        result.attributes.push(VertexAttribute {
            location: location as u32,
            components: element.semantic.components(),
            kind: element.semantic.kind(),
            offset: *offset,
            instanced: element.instanced,
        });
        *offset += element.semantic.byte_size();

        let stream = if element.instanced {
            &mut result.instance_buffer
        } else {
            &mut result.vertex_buffer
        };
        if stream.is_none() {
            *stream = element.buffer.as_ref().map(|b| b.handle(slot));
        }
        if let Some(index) = &element.index_buffer {
            result.index_buffer = Some(index.handle(slot));
        }
    }
    result
}

/**
A vertex format, with one vertex-array object per slot once the worker has configured it.
*/
#[derive(Debug)]
pub struct VertexFormat {
    elements: Vec<VertexElement>,
    slot_count: usize,
    arrays: Mutex<Option<Box<[VertexArrayHandle]>>>,
    id: u64,
    pending: Weak<PendingChanges>,
}

impl VertexFormat {
    /**
    Creates the format and queues its configuration.

    # Panics
    If `elements` is empty.
    */
    pub(crate) fn new(
        elements: Vec<VertexElement>,
        slot_count: usize,
        pending: &Arc<PendingChanges>,
    ) -> Arc<Self> {
        assert!(!elements.is_empty(), "vertex format has no elements");
        let id = pending.next_id();
        let format = Arc::new(VertexFormat {
            elements,
            slot_count,
            arrays: Mutex::new(None),
            id,
            pending: Arc::downgrade(pending),
        });
        pending.add_vertex_format(id, Arc::downgrade(&format));
        format
    }

    pub fn elements(&self) -> &[VertexElement] {
        &self.elements
    }
    pub fn vertex_stride(&self) -> usize {
        strides(&self.elements).0
    }
    pub fn instance_stride(&self) -> usize {
        strides(&self.elements).1
    }
    pub fn is_configured(&self) -> bool {
        self.arrays.lock().unwrap().is_some()
    }

    /// Runs on the render worker.
    pub(crate) fn configure(&self, context: &mut dyn Context) {
        let mut arrays = self.arrays.lock().unwrap();
        if arrays.is_some() {
            return;
        }
        *arrays = Some(
            (0..self.slot_count)
                .map(|i| context.configure_vertex_array(&layout(&self.elements, Slot::new(i))))
                .collect(),
        );
    }

    pub(crate) fn vertex_array(&self, slot: Slot) -> Option<VertexArrayHandle> {
        self.arrays
            .lock()
            .unwrap()
            .as_ref()
            .map(|arrays| arrays[slot.index()])
    }
}

impl Drop for VertexFormat {
    fn drop(&mut self) {
        let configured = self.arrays.get_mut().unwrap().take();
        if let Some(pending) = self.pending.upgrade() {
            pending.remove_vertex_format(self.id, configured);
        }
    }
}
