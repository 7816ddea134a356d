// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Resource tracking for committed data.
//!
//! Every resource created in one transaction lands in one [ResourceSet].  Committing a
//! transaction publishes its set in the [Registry]; destroying the token removes it again.
//!
//! # Overview
//!
//! The registry is what `execute()` walks to find dynamic resources that need an upload.  It
//! is guarded by its own lock, and the lock is only ever held for short, allocation-only work:
//!
//! - inserting or removing a whole set
//! - cloning the list of dynamic resources for the upload pass
//!
//! GPU objects are released when the last `Arc` to them drops, which always happens after the
//! registry lock is released.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use wasm_safe_mutex::Mutex;

use crate::bindings::bind_style::ShaderDataBinding;
use crate::bindings::forward::dynamic::buffer::Buffer as DynamicBuffer;
use crate::bindings::forward::dynamic::texture::Texture as DynamicTexture;
use crate::bindings::forward::r#static::buffer::Buffer as StaticBuffer;
use crate::bindings::forward::r#static::texture::{ArrayTexture, Texture as StaticTexture};
use crate::bindings::pipeline::ShaderPipeline;
use crate::bindings::render_target::RenderTexture;
use crate::bindings::vertex_format::VertexFormat;
use crate::multibuffer::Slot;

/**
Everything created by one transaction.
*/
#[derive(Debug, Default)]
pub struct ResourceSet {
    pub(crate) bindings: Vec<Arc<ShaderDataBinding>>,
    pub(crate) pipelines: Vec<Arc<ShaderPipeline>>,
    pub(crate) vertex_formats: Vec<Arc<VertexFormat>>,
    pub(crate) static_buffers: Vec<Arc<StaticBuffer>>,
    pub(crate) dynamic_buffers: Vec<Arc<DynamicBuffer>>,
    pub(crate) static_textures: Vec<Arc<StaticTexture>>,
    pub(crate) array_textures: Vec<Arc<ArrayTexture>>,
    pub(crate) dynamic_textures: Vec<Arc<DynamicTexture>>,
    pub(crate) render_textures: Vec<Arc<RenderTexture>>,
}

impl ResourceSet {
    pub fn len(&self) -> usize {
        self.bindings.len()
            + self.pipelines.len()
            + self.vertex_formats.len()
            + self.static_buffers.len()
            + self.dynamic_buffers.len()
            + self.static_textures.len()
            + self.array_textures.len()
            + self.dynamic_textures.len()
            + self.render_textures.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dynamic_resources(&self) -> impl Iterator<Item = DynamicResource> + '_ {
        self.dynamic_buffers
            .iter()
            .cloned()
            .map(DynamicResource::Buffer)
            .chain(
                self.dynamic_textures
                    .iter()
                    .cloned()
                    .map(DynamicResource::Texture),
            )
    }
}

#[derive(Debug, Clone)]
pub(crate) enum DynamicResource {
    Buffer(Arc<DynamicBuffer>),
    Texture(Arc<DynamicTexture>),
}

impl DynamicResource {
    pub fn update_slot(&self, slot: Slot) -> bool {
        match self {
            DynamicResource::Buffer(b) => b.update_slot(slot),
            DynamicResource::Texture(t) => t.update_slot(slot),
        }
    }
}

/**
The committed sets, keyed by token id.
*/
#[derive(Debug)]
pub(crate) struct Registry {
    sets: Mutex<HashMap<u64, ResourceSet>>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            sets: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn insert(&self, set: ResourceSet) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sets.lock_sync().insert(id, set);
        id
    }

    /// The caller drops the set, after the lock is released.
    #[must_use]
    pub fn remove(&self, id: u64) -> Option<ResourceSet> {
        self.sets.lock_sync().remove(&id)
    }

    #[must_use]
    pub fn remove_all(&self) -> Vec<ResourceSet> {
        self.sets.lock_sync().drain().map(|(_, set)| set).collect()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.sets.lock_sync().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sets.lock_sync().len()
    }

    /// Every dynamic resource of every committed set.
    pub fn dynamic_snapshot(&self) -> Vec<DynamicResource> {
        self.sets
            .lock_sync()
            .values()
            .flat_map(ResourceSet::dynamic_resources)
            .collect()
    }
}
