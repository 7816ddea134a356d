// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A backend that records every call.

All three parts of the backend share one [TraceLog], so a test can look at device uploads,
worker replays and presents in the order they happened.  The log can also be told to fail,
which is how transaction rollback is exercised.
*/
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::bindings::buffer_types::BufferUse;
use crate::bindings::coordinates::WindowRect;
use crate::bindings::pipeline::PipelineDescriptor;
use crate::imp::{
    BufferDescriptor, BufferHandle, Capabilities, ClearFlags, Context, ContextOwner, Device,
    DrawCall, Error, FramebufferHandle, PipelineHandle, Platform, RenderStorage,
    RenderStorageDescriptor, ResolveOp, ResolvedBinding, ShaderStage, TextureDescriptor,
    TextureHandle, VertexArrayHandle, VertexArrayLayout,
};
use crate::pixel_formats::TextureFormat;

#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    CreateBuffer {
        buffer: BufferHandle,
        usage: BufferUse,
        size: usize,
        initial: Option<Vec<u8>>,
    },
    UploadBuffer {
        buffer: BufferHandle,
        bytes: Vec<u8>,
    },
    DestroyBuffer {
        buffer: BufferHandle,
    },
    CreateTexture {
        texture: TextureHandle,
        format: TextureFormat,
        width: u32,
        height: u32,
    },
    UploadTexture {
        texture: TextureHandle,
        bytes: Vec<u8>,
    },
    DestroyTexture {
        texture: TextureHandle,
    },
    CreateRenderStorage {
        storage: RenderStorage,
        width: u32,
        height: u32,
        samples: u32,
    },
    DestroyRenderStorage {
        storage: RenderStorage,
    },
    CompilePipeline {
        pipeline: PipelineHandle,
    },
    DestroyPipeline {
        pipeline: PipelineHandle,
    },
    Flush,

    Initialize,
    ConfigureFramebuffer {
        framebuffer: FramebufferHandle,
        samples: u32,
    },
    ResizeRenderStorage {
        framebuffer: Option<FramebufferHandle>,
        width: u32,
        height: u32,
    },
    DeleteFramebuffer {
        framebuffer: FramebufferHandle,
    },
    ConfigureVertexArray {
        array: VertexArrayHandle,
        layout: VertexArrayLayout,
    },
    DeleteVertexArray {
        array: VertexArrayHandle,
    },
    BindDefaultFramebuffer,
    Bind {
        binding: ResolvedBinding,
    },
    SetRenderTarget {
        target: Option<FramebufferHandle>,
    },
    SetViewport {
        rect: WindowRect,
        znear: f32,
        zfar: f32,
    },
    SetScissor {
        rect: Option<WindowRect>,
    },
    SetClearColor {
        color: [f32; 4],
    },
    Clear {
        flags: ClearFlags,
    },
    Draw {
        call: DrawCall,
    },
    Resolve {
        op: ResolveOp,
    },
    BlitToDisplay {
        source: FramebufferHandle,
    },

    MakeCurrent,
    ClearCurrent,
    PostInit,
    SwapBuffers,
    Present,
}

impl TraceEvent {
    /// True for the calls the worker makes while replaying a command buffer.
    pub fn is_replay(&self) -> bool {
        matches!(
            self,
            TraceEvent::Bind { .. }
                | TraceEvent::SetRenderTarget { .. }
                | TraceEvent::SetViewport { .. }
                | TraceEvent::SetScissor { .. }
                | TraceEvent::SetClearColor { .. }
                | TraceEvent::Clear { .. }
                | TraceEvent::Draw { .. }
                | TraceEvent::Resolve { .. }
                | TraceEvent::BlitToDisplay { .. }
                | TraceEvent::Present
        )
    }
}

#[derive(Debug, Default)]
struct Faults {
    /// Number of creations to allow before one fails.
    fail_after: Option<usize>,
    compile_log: Option<String>,
    capacity: Option<usize>,
    allocated: usize,
    sizes: HashMap<u64, usize>,
    replay_delay: Duration,
}

#[derive(Debug)]
struct Shared {
    events: Mutex<Vec<TraceEvent>>,
    faults: Mutex<Faults>,
    next: AtomicU64,
    capabilities: Capabilities,
}

/**
The shared recording behind a trace backend.
*/
#[derive(Debug, Clone)]
pub struct TraceLog {
    shared: Arc<Shared>,
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceLog {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::default())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        TraceLog {
            shared: Arc::new(Shared {
                events: Mutex::new(Vec::new()),
                faults: Mutex::new(Faults::default()),
                next: AtomicU64::new(0),
                capabilities,
            }),
        }
    }

    pub fn device(&self) -> Arc<TraceDevice> {
        Arc::new(TraceDevice { log: self.clone() })
    }
    pub fn context(&self) -> TraceContext {
        TraceContext { log: self.clone() }
    }
    pub fn owner(&self) -> TraceOwner {
        TraceOwner { log: self.clone() }
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.shared.events.lock().unwrap().clone()
    }
    /// Returns and forgets everything recorded so far.
    pub fn take(&self) -> Vec<TraceEvent> {
        std::mem::take(&mut *self.shared.events.lock().unwrap())
    }
    pub fn count(&self, predicate: impl Fn(&TraceEvent) -> bool) -> usize {
        self.shared
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| predicate(e))
            .count()
    }

    /// Objects created through the device and not yet destroyed.
    pub fn live_objects(&self) -> usize {
        let events = self.shared.events.lock().unwrap();
        let mut live = HashSet::new();
        for event in events.iter() {
            match event {
                TraceEvent::CreateBuffer { buffer, .. } => {
                    live.insert(buffer.0);
                }
                TraceEvent::DestroyBuffer { buffer } => {
                    live.remove(&buffer.0);
                }
                TraceEvent::CreateTexture { texture, .. } => {
                    live.insert(texture.0);
                }
                TraceEvent::DestroyTexture { texture } => {
                    live.remove(&texture.0);
                }
                TraceEvent::CreateRenderStorage { storage, .. } => {
                    live.insert(storage.color.0);
                }
                TraceEvent::DestroyRenderStorage { storage } => {
                    live.remove(&storage.color.0);
                }
                TraceEvent::CompilePipeline { pipeline } => {
                    live.insert(pipeline.0);
                }
                TraceEvent::DestroyPipeline { pipeline } => {
                    live.remove(&pipeline.0);
                }
                _ => {}
            }
        }
        live.len()
    }

    /// Lets `successes` more creations through, then fails the next one with a capacity error.
    pub fn fail_after(&self, successes: usize) {
        self.shared.faults.lock().unwrap().fail_after = Some(successes);
    }
    /// Every pipeline compiled from now on fails with `log`.
    pub fn fail_compile(&self, log: &str) {
        self.shared.faults.lock().unwrap().compile_log = Some(log.to_string());
    }
    /// Total bytes the device may allocate for buffers and textures.
    pub fn set_capacity(&self, bytes: usize) {
        self.shared.faults.lock().unwrap().capacity = Some(bytes);
    }
    pub fn clear_faults(&self) {
        let mut faults = self.shared.faults.lock().unwrap();
        faults.fail_after = None;
        faults.compile_log = None;
        faults.capacity = None;
    }
    /// The context sleeps this long at the start of every frame.
    pub fn set_replay_delay(&self, delay: Duration) {
        self.shared.faults.lock().unwrap().replay_delay = delay;
    }

    fn record(&self, event: TraceEvent) {
        self.shared.events.lock().unwrap().push(event);
    }

    fn next(&self) -> u64 {
        self.shared.next.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn admit(&self, bytes: usize) -> Result<(), Error> {
        let mut faults = self.shared.faults.lock().unwrap();
        if let Some(remaining) = faults.fail_after.as_mut() {
            if *remaining == 0 {
                faults.fail_after = None;
                return Err(Error::Capacity { requested: bytes });
            }
            *remaining -= 1;
        }
        if let Some(capacity) = faults.capacity {
            if faults.allocated + bytes > capacity {
                return Err(Error::Capacity { requested: bytes });
            }
        }
        faults.allocated += bytes;
        Ok(())
    }

    fn remember(&self, handle: u64, bytes: usize) {
        self.shared.faults.lock().unwrap().sizes.insert(handle, bytes);
    }

    fn release(&self, handle: u64) {
        let mut faults = self.shared.faults.lock().unwrap();
        if let Some(bytes) = faults.sizes.remove(&handle) {
            faults.allocated -= bytes;
        }
    }
}

#[derive(Debug)]
pub struct TraceDevice {
    log: TraceLog,
}

impl TraceDevice {
    fn byte_size(&self, descriptor: &TextureDescriptor) -> usize {
        let layers = match descriptor.kind {
            crate::imp::TextureKind::Array { layers } => layers as usize,
            _ => 1,
        };
        descriptor
            .format
            .image_size(descriptor.width, descriptor.height)
            * layers
    }
}

impl Device for TraceDevice {
    fn platform(&self) -> Platform {
        Platform::Trace
    }
    fn capabilities(&self) -> Capabilities {
        self.log.shared.capabilities
    }

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        initial: Option<&[u8]>,
    ) -> Result<BufferHandle, Error> {
        self.log.admit(descriptor.size)?;
        let buffer = BufferHandle(self.log.next());
        self.log.remember(buffer.0, descriptor.size);
        self.log.record(TraceEvent::CreateBuffer {
            buffer,
            usage: descriptor.usage,
            size: descriptor.size,
            initial: initial.map(<[u8]>::to_vec),
        });
        Ok(buffer)
    }
    fn upload_buffer(&self, buffer: BufferHandle, bytes: &[u8]) {
        self.log.record(TraceEvent::UploadBuffer {
            buffer,
            bytes: bytes.to_vec(),
        });
    }
    fn destroy_buffer(&self, buffer: BufferHandle) {
        self.log.release(buffer.0);
        self.log.record(TraceEvent::DestroyBuffer { buffer });
    }

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        _initial: Option<&[u8]>,
    ) -> Result<TextureHandle, Error> {
        let bytes = self.byte_size(descriptor);
        self.log.admit(bytes)?;
        let texture = TextureHandle(self.log.next());
        self.log.remember(texture.0, bytes);
        self.log.record(TraceEvent::CreateTexture {
            texture,
            format: descriptor.format,
            width: descriptor.width,
            height: descriptor.height,
        });
        Ok(texture)
    }
    fn upload_texture(&self, texture: TextureHandle, bytes: &[u8]) {
        self.log.record(TraceEvent::UploadTexture {
            texture,
            bytes: bytes.to_vec(),
        });
    }
    fn destroy_texture(&self, texture: TextureHandle) {
        self.log.release(texture.0);
        self.log.record(TraceEvent::DestroyTexture { texture });
    }

    fn create_render_storage(
        &self,
        descriptor: &RenderStorageDescriptor,
    ) -> Result<RenderStorage, Error> {
        self.log.admit(0)?;
        let storage = RenderStorage {
            color: TextureHandle(self.log.next()),
            depth: TextureHandle(self.log.next()),
            bind_color: descriptor
                .color_bindable
                .then(|| TextureHandle(self.log.next())),
            bind_depth: descriptor
                .depth_bindable
                .then(|| TextureHandle(self.log.next())),
        };
        self.log.record(TraceEvent::CreateRenderStorage {
            storage,
            width: descriptor.width,
            height: descriptor.height,
            samples: descriptor.samples,
        });
        Ok(storage)
    }
    fn destroy_render_storage(&self, storage: &RenderStorage) {
        self.log
            .record(TraceEvent::DestroyRenderStorage { storage: *storage });
    }

    fn compile_pipeline(&self, _descriptor: &PipelineDescriptor) -> Result<PipelineHandle, Error> {
        let compile_log = self.log.shared.faults.lock().unwrap().compile_log.clone();
        if let Some(log) = compile_log {
            return Err(Error::Compile {
                stage: ShaderStage::Fragment,
                log,
            });
        }
        self.log.admit(0)?;
        let pipeline = PipelineHandle(self.log.next());
        self.log.record(TraceEvent::CompilePipeline { pipeline });
        Ok(pipeline)
    }
    fn destroy_pipeline(&self, pipeline: PipelineHandle) {
        self.log.record(TraceEvent::DestroyPipeline { pipeline });
    }

    fn flush(&self) {
        self.log.record(TraceEvent::Flush);
    }
}

#[derive(Debug)]
pub struct TraceContext {
    log: TraceLog,
}

impl Context for TraceContext {
    fn initialize(&mut self) -> String {
        self.log.record(TraceEvent::Initialize);
        "trace 1.0".to_string()
    }
    fn configure_framebuffer(&mut self, _storage: &RenderStorage, samples: u32) -> FramebufferHandle {
        let framebuffer = FramebufferHandle(self.log.next());
        self.log.record(TraceEvent::ConfigureFramebuffer {
            framebuffer,
            samples,
        });
        framebuffer
    }
    fn resize_render_storage(
        &mut self,
        framebuffer: Option<FramebufferHandle>,
        _storage: &RenderStorage,
        width: u32,
        height: u32,
    ) {
        self.log.record(TraceEvent::ResizeRenderStorage {
            framebuffer,
            width,
            height,
        });
    }
    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.log
            .record(TraceEvent::DeleteFramebuffer { framebuffer });
    }
    fn configure_vertex_array(&mut self, layout: &VertexArrayLayout) -> VertexArrayHandle {
        let array = VertexArrayHandle(self.log.next());
        self.log.record(TraceEvent::ConfigureVertexArray {
            array,
            layout: layout.clone(),
        });
        array
    }
    fn delete_vertex_array(&mut self, array: VertexArrayHandle) {
        self.log.record(TraceEvent::DeleteVertexArray { array });
    }
    fn bind_default_framebuffer(&mut self) {
        let delay = self.log.shared.faults.lock().unwrap().replay_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.log.record(TraceEvent::BindDefaultFramebuffer);
    }
    fn bind(&mut self, binding: &ResolvedBinding) {
        self.log.record(TraceEvent::Bind {
            binding: binding.clone(),
        });
    }
    fn set_render_target(&mut self, target: Option<FramebufferHandle>) {
        self.log.record(TraceEvent::SetRenderTarget { target });
    }
    fn set_viewport(&mut self, rect: WindowRect, znear: f32, zfar: f32) {
        self.log
            .record(TraceEvent::SetViewport { rect, znear, zfar });
    }
    fn set_scissor(&mut self, rect: Option<WindowRect>) {
        self.log.record(TraceEvent::SetScissor { rect });
    }
    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.log.record(TraceEvent::SetClearColor { color });
    }
    fn clear(&mut self, flags: ClearFlags) {
        self.log.record(TraceEvent::Clear { flags });
    }
    fn draw(&mut self, call: DrawCall) {
        self.log.record(TraceEvent::Draw { call });
    }
    fn resolve(&mut self, op: &ResolveOp) {
        self.log.record(TraceEvent::Resolve { op: *op });
    }
    fn blit_to_display(&mut self, source: FramebufferHandle) {
        self.log.record(TraceEvent::BlitToDisplay { source });
    }
}

#[derive(Debug)]
pub struct TraceOwner {
    log: TraceLog,
}

impl ContextOwner for TraceOwner {
    fn make_current(&mut self) {
        self.log.record(TraceEvent::MakeCurrent);
    }
    fn clear_current(&mut self) {
        self.log.record(TraceEvent::ClearCurrent);
    }
    fn post_init(&mut self) {
        self.log.record(TraceEvent::PostInit);
    }
    fn swap_buffers(&mut self) {
        self.log.record(TraceEvent::SwapBuffers);
    }
    fn present(&mut self) {
        self.log.record(TraceEvent::Present);
    }
}
