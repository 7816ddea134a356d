// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The backend contract.

Everything that issues driver calls lives behind three traits:

* [Device] creates and destroys objects.  It is shared between the client thread and the render worker.
* [Context] is owned by the render worker and replays recorded work.
* [ContextOwner] is the platform glue that makes a context current and presents frames.

Two backends ship with the crate.  [nop] allocates handles and does nothing else, [trace] records
every call so the rest of the crate can be observed.
*/

use std::fmt::{Debug, Display};

use crate::bindings::buffer_types::BufferUse;
use crate::bindings::coordinates::WindowRect;
use crate::bindings::pipeline::{PipelineDescriptor, Primitive};
use crate::pixel_formats::TextureFormat;

pub mod nop;
pub mod trace;

/**
Identifies a backend family.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Platform {
    Nop,
    Trace,
    OpenGL,
    Vulkan,
    Metal,
    D3D11,
}

impl Platform {
    pub const fn name(self) -> &'static str {
        match self {
            Platform::Nop => "nop",
            Platform::Trace => "trace",
            Platform::OpenGL => "OpenGL",
            Platform::Vulkan => "Vulkan",
            Platform::Metal => "Metal",
            Platform::D3D11 => "D3D11",
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/**
The few backend facts the core consults.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Data bindings on this backend must name a vertex format.
    pub binding_needs_vertex_format: bool,
    /// Uniform range offsets must be a multiple of this; range sizes are rounded up to it.
    pub uniform_buffer_alignment: usize,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            binding_needs_vertex_format: false,
            uniform_buffer_alignment: 256,
        }
    }
}

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);
    };
}

handle!(
    /// A backend buffer object.
    BufferHandle
);
handle!(
    /// A backend texture object.
    TextureHandle
);
handle!(PipelineHandle);
handle!(
    /// A configured framebuffer.  Only meaningful on the worker's context.
    FramebufferHandle
);
handle!(
    /// A configured vertex-array object.  Only meaningful on the worker's context.
    VertexArrayHandle
);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub usage: BufferUse,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// Immutable, with `mips` levels packed one after another in the initial data.
    Static { mips: u32 },
    /// Immutable, `layers` images of equal size.
    Array { layers: u32 },
    /// One physical copy of a dynamic texture.
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub kind: TextureKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStorageDescriptor {
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub color_bindable: bool,
    pub depth_bindable: bool,
}

/**
Storage behind an offscreen render target.

The bindable copies are separate textures a shader can sample while the target itself is being drawn.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStorage {
    pub color: TextureHandle,
    pub depth: TextureHandle,
    pub bind_color: Option<TextureHandle>,
    pub bind_depth: Option<TextureHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Float,
    /// Unsigned bytes normalized to 0..=1.
    UNorm8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u8,
    pub kind: AttributeKind,
    pub offset: usize,
    pub instanced: bool,
}

/**
A vertex format resolved against one slot's physical buffers.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexArrayLayout {
    pub attributes: Vec<VertexAttribute>,
    pub vertex_buffer: Option<BufferHandle>,
    pub vertex_stride: usize,
    pub instance_buffer: Option<BufferHandle>,
    pub instance_stride: usize,
    pub index_buffer: Option<BufferHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformBinding {
    pub index: u32,
    pub buffer: BufferHandle,
    pub offset: usize,
    pub size: usize,
}

/**
A data binding with every dynamic resource replaced by the copy for the slot being drawn.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub pipeline: PipelineHandle,
    pub vertex_array: Option<VertexArrayHandle>,
    pub uniforms: Vec<UniformBinding>,
    pub textures: Vec<(u32, TextureHandle)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClearFlags {
    pub color: bool,
    pub depth: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub primitive: Primitive,
    pub indexed: bool,
    pub start: u32,
    pub count: u32,
    /// `None` for a non-instanced draw.
    pub instances: Option<u32>,
}

/// Copies a target's framebuffer into its bindable textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOp {
    pub source: FramebufferHandle,
    pub color: Option<TextureHandle>,
    pub depth: Option<TextureHandle>,
    /// Already clipped to the target and in bottom-left coordinates.
    pub rect: WindowRect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Out of GPU memory ({requested} bytes requested)")]
    Capacity { requested: usize },
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("Program failed to link: {log}")]
    Link { log: String },
}

/**
Creates and destroys backend objects.

Called from the client thread during transactions and `execute()`, and from drops on either thread.
*/
pub trait Device: Send + Sync + Debug {
    fn platform(&self) -> Platform;
    fn capabilities(&self) -> Capabilities;

    fn create_buffer(
        &self,
        descriptor: &BufferDescriptor,
        initial: Option<&[u8]>,
    ) -> Result<BufferHandle, Error>;
    fn upload_buffer(&self, buffer: BufferHandle, bytes: &[u8]);
    fn destroy_buffer(&self, buffer: BufferHandle);

    fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
        initial: Option<&[u8]>,
    ) -> Result<TextureHandle, Error>;
    fn upload_texture(&self, texture: TextureHandle, bytes: &[u8]);
    fn destroy_texture(&self, texture: TextureHandle);

    fn create_render_storage(
        &self,
        descriptor: &RenderStorageDescriptor,
    ) -> Result<RenderStorage, Error>;
    fn destroy_render_storage(&self, storage: &RenderStorage);

    fn compile_pipeline(&self, descriptor: &PipelineDescriptor) -> Result<PipelineHandle, Error>;
    fn destroy_pipeline(&self, pipeline: PipelineHandle);

    /// Makes every object created so far visible to the worker's context.
    fn flush(&self);
}

/**
The live graphics context.  Owned by the render worker for its whole life.
*/
pub trait Context: Send {
    /// Returns a version string for the log.
    fn initialize(&mut self) -> String;

    fn configure_framebuffer(&mut self, storage: &RenderStorage, samples: u32) -> FramebufferHandle;
    fn resize_render_storage(
        &mut self,
        framebuffer: Option<FramebufferHandle>,
        storage: &RenderStorage,
        width: u32,
        height: u32,
    );
    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle);
    fn configure_vertex_array(&mut self, layout: &VertexArrayLayout) -> VertexArrayHandle;
    fn delete_vertex_array(&mut self, array: VertexArrayHandle);

    fn bind_default_framebuffer(&mut self);
    fn bind(&mut self, binding: &ResolvedBinding);
    /// `None` is the display.
    fn set_render_target(&mut self, target: Option<FramebufferHandle>);
    fn set_viewport(&mut self, rect: WindowRect, znear: f32, zfar: f32);
    /// `None` disables scissoring.
    fn set_scissor(&mut self, rect: Option<WindowRect>);
    fn set_clear_color(&mut self, color: [f32; 4]);
    fn clear(&mut self, flags: ClearFlags);
    fn draw(&mut self, call: DrawCall);
    fn resolve(&mut self, op: &ResolveOp);
    fn blit_to_display(&mut self, source: FramebufferHandle);
}

/**
Platform glue around a [Context].
*/
pub trait ContextOwner: Send {
    fn make_current(&mut self);
    fn clear_current(&mut self);
    /// Runs once on the worker after the context is initialized.
    fn post_init(&mut self) {}
    fn swap_buffers(&mut self);
    fn present(&mut self) {
        self.swap_buffers()
    }
}
