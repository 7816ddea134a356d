// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
A backend that hands out handles and performs no work.
*/
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bindings::coordinates::WindowRect;
use crate::bindings::pipeline::PipelineDescriptor;
use crate::imp::{
    BufferDescriptor, BufferHandle, Capabilities, ClearFlags, Context, ContextOwner, Device,
    DrawCall, Error, FramebufferHandle, PipelineHandle, Platform, RenderStorage,
    RenderStorageDescriptor, ResolveOp, ResolvedBinding, TextureDescriptor, TextureHandle,
    VertexArrayHandle, VertexArrayLayout,
};

#[derive(Debug, Default)]
pub struct NopDevice {
    next: AtomicU64,
    capabilities: Capabilities,
}

impl NopDevice {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        NopDevice {
            next: AtomicU64::new(0),
            capabilities,
        }
    }
    fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Device for NopDevice {
    fn platform(&self) -> Platform {
        Platform::Nop
    }
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
    fn create_buffer(&self, _: &BufferDescriptor, _: Option<&[u8]>) -> Result<BufferHandle, Error> {
        Ok(BufferHandle(self.next()))
    }
    fn upload_buffer(&self, _: BufferHandle, _: &[u8]) {}
    fn destroy_buffer(&self, _: BufferHandle) {}
    fn create_texture(
        &self,
        _: &TextureDescriptor,
        _: Option<&[u8]>,
    ) -> Result<TextureHandle, Error> {
        Ok(TextureHandle(self.next()))
    }
    fn upload_texture(&self, _: TextureHandle, _: &[u8]) {}
    fn destroy_texture(&self, _: TextureHandle) {}
    fn create_render_storage(
        &self,
        descriptor: &RenderStorageDescriptor,
    ) -> Result<RenderStorage, Error> {
        Ok(RenderStorage {
            color: TextureHandle(self.next()),
            depth: TextureHandle(self.next()),
            bind_color: descriptor
                .color_bindable
                .then(|| TextureHandle(self.next())),
            bind_depth: descriptor
                .depth_bindable
                .then(|| TextureHandle(self.next())),
        })
    }
    fn destroy_render_storage(&self, _: &RenderStorage) {}
    fn compile_pipeline(&self, _: &PipelineDescriptor) -> Result<PipelineHandle, Error> {
        Ok(PipelineHandle(self.next()))
    }
    fn destroy_pipeline(&self, _: PipelineHandle) {}
    fn flush(&self) {}
}

#[derive(Debug, Default)]
pub struct NopContext {
    next: u64,
}

impl NopContext {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Context for NopContext {
    fn initialize(&mut self) -> String {
        "nop".to_string()
    }
    fn configure_framebuffer(&mut self, _: &RenderStorage, _: u32) -> FramebufferHandle {
        self.next += 1;
        FramebufferHandle(self.next)
    }
    fn resize_render_storage(&mut self, _: Option<FramebufferHandle>, _: &RenderStorage, _: u32, _: u32) {}
    fn delete_framebuffer(&mut self, _: FramebufferHandle) {}
    fn configure_vertex_array(&mut self, _: &VertexArrayLayout) -> VertexArrayHandle {
        self.next += 1;
        VertexArrayHandle(self.next)
    }
    fn delete_vertex_array(&mut self, _: VertexArrayHandle) {}
    fn bind_default_framebuffer(&mut self) {}
    fn bind(&mut self, _: &ResolvedBinding) {}
    fn set_render_target(&mut self, _: Option<FramebufferHandle>) {}
    fn set_viewport(&mut self, _: WindowRect, _: f32, _: f32) {}
    fn set_scissor(&mut self, _: Option<WindowRect>) {}
    fn set_clear_color(&mut self, _: [f32; 4]) {}
    fn clear(&mut self, _: ClearFlags) {}
    fn draw(&mut self, _: DrawCall) {}
    fn resolve(&mut self, _: &ResolveOp) {}
    fn blit_to_display(&mut self, _: FramebufferHandle) {}
}

#[derive(Debug, Default)]
pub struct NopOwner;

impl ContextOwner for NopOwner {
    fn make_current(&mut self) {}
    fn clear_current(&mut self) {}
    fn swap_buffers(&mut self) {}
}

/// A device, context and owner that together render nothing.
pub fn backend() -> (Arc<NopDevice>, NopContext, NopOwner) {
    (Arc::new(NopDevice::new()), NopContext::new(), NopOwner)
}
