// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Transactional resource creation.

Resources are created inside a [Transaction].  Committing publishes everything the transaction
created, as one [ResourceSet], and returns a [DataToken].  A transaction that is dropped, or
whose closure returns an error, destroys everything it created; the registry never sees part
of a set.

```
use slots_and_frames::bindings::buffer_types::BufferUse;
use slots_and_frames::images::Engine;
use slots_and_frames::images::engine::EngineConfig;

let engine = Engine::headless(EngineConfig::default()).unwrap();
let mut factory = engine.factory();
let (token, buffer) = factory
    .commit_transaction(|t| t.new_dynamic_buffer(BufferUse::Uniform, 64, "camera"))
    .unwrap();
buffer.load(&[0; 64]);
assert_eq!(factory.committed_count(), 1);
drop(token);
assert_eq!(factory.committed_count(), 0);
```
*/

use std::sync::{Arc, Weak};

use crate::bindings::bind_style::{BindStyle, ShaderDataBinding};
use crate::bindings::buffer_types::BufferUse;
use crate::bindings::forward::dynamic::buffer::Buffer as DynamicBuffer;
use crate::bindings::forward::dynamic::texture::Texture as DynamicTexture;
use crate::bindings::forward::r#static::buffer::Buffer as StaticBuffer;
use crate::bindings::forward::r#static::texture::{ArrayTexture, Texture as StaticTexture};
use crate::bindings::pipeline::{PipelineDescriptor, ShaderPipeline};
use crate::bindings::render_target::RenderTexture;
use crate::bindings::resource_tracking::{Registry, ResourceSet};
use crate::bindings::vertex_format::{VertexElement, VertexFormat};
use crate::images::pending::PendingChanges;
use crate::imp::{self, Device, Platform};
use crate::pixel_formats::TextureFormat;

#[derive(Debug, thiserror::Error)]
#[error("Can't create resource: {0}")]
pub struct CreateError(#[from] imp::Error);

impl CreateError {
    pub fn imp(&self) -> &imp::Error {
        &self.0
    }
}

/**
Creates resources.  Cheap to clone; clones share the same registry.
*/
#[derive(Debug, Clone)]
pub struct DataFactory {
    device: Arc<dyn Device>,
    registry: Arc<Registry>,
    pending: Arc<PendingChanges>,
    slot_count: usize,
    draw_samples: u32,
}

impl DataFactory {
    pub(crate) fn new(
        device: Arc<dyn Device>,
        registry: Arc<Registry>,
        pending: Arc<PendingChanges>,
        slot_count: usize,
        draw_samples: u32,
    ) -> Self {
        DataFactory {
            device,
            registry,
            pending,
            slot_count,
            draw_samples,
        }
    }

    pub fn platform(&self) -> Platform {
        self.device.platform()
    }
    pub fn platform_name(&self) -> &'static str {
        self.device.platform().name()
    }
    pub fn binding_needs_vertex_format(&self) -> bool {
        self.device.capabilities().binding_needs_vertex_format
    }
    /// Physical copies per dynamic resource.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }
    /// Sets currently in the committed registry.
    pub fn committed_count(&self) -> usize {
        self.registry.len()
    }
    pub fn is_committed(&self, token: &DataToken) -> bool {
        self.registry.contains(token.id)
    }

    /**
    Opens a transaction.  The borrow ends when the transaction is committed or dropped, so a
    factory can't have two open at once.
    */
    pub fn begin_transaction(&mut self) -> Transaction<'_> {
        Transaction {
            factory: self,
            set: ResourceSet::default(),
        }
    }

    /**
    Runs `f` in a fresh transaction.  `Ok` commits and returns the token with `f`'s value;
    `Err` destroys everything `f` created and returns the error.
    */
    pub fn commit_transaction<T, E>(
        &mut self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T, E>,
    ) -> Result<(DataToken, T), E> {
        let mut transaction = self.begin_transaction();
        let value = f(&mut transaction)?;
        Ok((transaction.commit(), value))
    }

    /// Destroys one committed set.
    pub fn destroy_data(&self, token: DataToken) {
        drop(token);
    }

    /// Destroys every committed set, including those whose tokens are still held.
    pub fn destroy_all_data(&self) {
        let sets = self.registry.remove_all();
        logwise::info_sync!("destroying {count} committed sets", count = sets.len());
        drop(sets);
    }
}

/**
Owns a committed [ResourceSet].  Dropping the token destroys the set.
*/
#[derive(Debug)]
#[must_use = "dropping the token destroys its resources"]
pub struct DataToken {
    id: u64,
    registry: Weak<Registry>,
}

impl Drop for DataToken {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let set = registry.remove(self.id);
            drop(set);
        }
    }
}

/**
An open transaction.
*/
#[derive(Debug)]
pub struct Transaction<'f> {
    factory: &'f mut DataFactory,
    set: ResourceSet,
}

impl Transaction<'_> {
    /// Publishes everything created so far.
    pub fn commit(mut self) -> DataToken {
        let set = std::mem::take(&mut self.set);
        let resources = set.len();
        let id = self.factory.registry.insert(set);
        self.factory.device.flush();
        logwise::info_sync!(
            "committed set {id} with {resources} resources",
            id = id,
            resources = resources
        );
        DataToken {
            id,
            registry: Arc::downgrade(&self.factory.registry),
        }
    }

    pub fn new_static_buffer(
        &mut self,
        usage: BufferUse,
        data: &[u8],
        debug_name: &str,
    ) -> Result<Arc<StaticBuffer>, CreateError> {
        let buffer = Arc::new(StaticBuffer::new(
            &self.factory.device,
            usage,
            data,
            debug_name,
        )?);
        self.set.static_buffers.push(buffer.clone());
        Ok(buffer)
    }

    /// Every copy starts zeroed.
    pub fn new_dynamic_buffer(
        &mut self,
        usage: BufferUse,
        size: usize,
        debug_name: &str,
    ) -> Result<Arc<DynamicBuffer>, CreateError> {
        self.dynamic_buffer(usage, size, None, debug_name)
    }

    /**
    Like [Self::new_dynamic_buffer], with the staging copy seeded from `initial`.

    Bytes past `size` are ignored.  Each slot receives the seed on its first execute.
    */
    pub fn new_dynamic_buffer_with(
        &mut self,
        usage: BufferUse,
        size: usize,
        initial: &[u8],
        debug_name: &str,
    ) -> Result<Arc<DynamicBuffer>, CreateError> {
        self.dynamic_buffer(usage, size, Some(initial), debug_name)
    }

    fn dynamic_buffer(
        &mut self,
        usage: BufferUse,
        size: usize,
        initial: Option<&[u8]>,
        debug_name: &str,
    ) -> Result<Arc<DynamicBuffer>, CreateError> {
        let buffer = Arc::new(DynamicBuffer::new(
            &self.factory.device,
            usage,
            size,
            self.factory.slot_count,
            initial,
            debug_name,
        )?);
        self.set.dynamic_buffers.push(buffer.clone());
        Ok(buffer)
    }

    /// `data` holds `mips` levels back to back.
    pub fn new_static_texture(
        &mut self,
        format: TextureFormat,
        width: u32,
        height: u32,
        mips: u32,
        data: &[u8],
    ) -> Result<Arc<StaticTexture>, CreateError> {
        let texture = Arc::new(StaticTexture::new(
            &self.factory.device,
            format,
            width,
            height,
            mips,
            data,
        )?);
        self.set.static_textures.push(texture.clone());
        Ok(texture)
    }

    pub fn new_static_array_texture(
        &mut self,
        format: TextureFormat,
        width: u32,
        height: u32,
        layers: u32,
        data: &[u8],
    ) -> Result<Arc<ArrayTexture>, CreateError> {
        let texture = Arc::new(ArrayTexture::new(
            &self.factory.device,
            format,
            width,
            height,
            layers,
            data,
        )?);
        self.set.array_textures.push(texture.clone());
        Ok(texture)
    }

    pub fn new_dynamic_texture(
        &mut self,
        format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Arc<DynamicTexture>, CreateError> {
        let texture = Arc::new(DynamicTexture::new(
            &self.factory.device,
            format,
            width,
            height,
            self.factory.slot_count,
        )?);
        self.set.dynamic_textures.push(texture.clone());
        Ok(texture)
    }

    /// Multisampled with the factory's draw sample count.
    pub fn new_render_texture(
        &mut self,
        width: u32,
        height: u32,
        color_bindable: bool,
        depth_bindable: bool,
    ) -> Result<Arc<RenderTexture>, CreateError> {
        let target = RenderTexture::new(
            &self.factory.device,
            &self.factory.pending,
            width,
            height,
            self.factory.draw_samples,
            color_bindable,
            depth_bindable,
        )?;
        self.set.render_textures.push(target.clone());
        Ok(target)
    }

    pub fn new_pipeline(
        &mut self,
        descriptor: &PipelineDescriptor,
    ) -> Result<Arc<ShaderPipeline>, CreateError> {
        let pipeline = Arc::new(ShaderPipeline::new(&self.factory.device, descriptor)?);
        self.set.pipelines.push(pipeline.clone());
        Ok(pipeline)
    }

    pub fn new_vertex_format(&mut self, elements: Vec<VertexElement>) -> Arc<VertexFormat> {
        let format = VertexFormat::new(elements, self.factory.slot_count, &self.factory.pending);
        self.set.vertex_formats.push(format.clone());
        format
    }

    pub fn new_shader_data_binding(
        &mut self,
        pipeline: &Arc<ShaderPipeline>,
        vertex_format: Option<&Arc<VertexFormat>>,
        style: BindStyle,
    ) -> Arc<ShaderDataBinding> {
        let binding = Arc::new(ShaderDataBinding::new(
            self.factory.device.capabilities(),
            pipeline.clone(),
            vertex_format.cloned(),
            style,
        ));
        self.set.bindings.push(binding.clone());
        binding
    }

    /// Resources created so far.
    pub fn len(&self) -> usize {
        self.set.len()
    }
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.set.is_empty() {
            logwise::warn_sync!(
                "discarding uncommitted transaction with {resources} resources",
                resources = self.set.len()
            );
        }
    }
}
