// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Shader pipelines.
//!
//! A pipeline is a compiled shader program plus the fixed-function state it draws with:
//! blending, depth and culling, and the primitive topology later draw calls use.
//!
//! # Example
//!
//! ```
//! use slots_and_frames::bindings::pipeline::{BlendFactor, PipelineDescriptor, Primitive};
//!
//! let descriptor = PipelineDescriptor::new("void main() {}", "void main() {}")
//!     .blend(BlendFactor::SrcAlpha, BlendFactor::InvSrcAlpha)
//!     .primitive(Primitive::TriStrips)
//!     .uniform_blocks(&["Camera"])
//!     .textures(&["albedo"]);
//! assert!(descriptor.blending_enabled());
//! ```

use std::sync::Arc;

use crate::imp::{self, Device, PipelineHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    DstColor,
    InvDstColor,
    SrcAlpha,
    InvSrcAlpha,
    DstAlpha,
    InvDstAlpha,
    SrcColor1,
    InvSrcColor1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Primitive {
    #[default]
    Triangles,
    TriStrips,
}

/// Describes a pipeline to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDescriptor {
    pub vertex_source: String,
    pub fragment_source: String,
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub primitive: Primitive,
    pub depth_test: bool,
    pub depth_write: bool,
    pub backface_culling: bool,
    /// Uniform blocks, in binding-index order.
    pub uniform_block_names: Vec<String>,
    /// Sampled textures, in binding-index order.
    pub texture_names: Vec<String>,
    pub debug_name: String,
}

impl PipelineDescriptor {
    /// Opaque triangles with depth testing, depth writes and backface culling.
    pub fn new(vertex_source: &str, fragment_source: &str) -> Self {
        PipelineDescriptor {
            vertex_source: vertex_source.to_string(),
            fragment_source: fragment_source.to_string(),
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            primitive: Primitive::Triangles,
            depth_test: true,
            depth_write: true,
            backface_culling: true,
            uniform_block_names: Vec::new(),
            texture_names: Vec::new(),
            debug_name: String::new(),
        }
    }

    pub fn blend(mut self, src: BlendFactor, dst: BlendFactor) -> Self {
        self.src_factor = src;
        self.dst_factor = dst;
        self
    }
    pub fn primitive(mut self, primitive: Primitive) -> Self {
        self.primitive = primitive;
        self
    }
    pub fn depth(mut self, test: bool, write: bool) -> Self {
        self.depth_test = test;
        self.depth_write = write;
        self
    }
    pub fn backface_culling(mut self, enabled: bool) -> Self {
        self.backface_culling = enabled;
        self
    }
    pub fn uniform_blocks(mut self, names: &[&str]) -> Self {
        self.uniform_block_names = names.iter().map(|n| n.to_string()).collect();
        self
    }
    pub fn textures(mut self, names: &[&str]) -> Self {
        self.texture_names = names.iter().map(|n| n.to_string()).collect();
        self
    }
    pub fn debug_name(mut self, name: &str) -> Self {
        self.debug_name = name.to_string();
        self
    }

    /// Blending is off when the destination is discarded.
    pub fn blending_enabled(&self) -> bool {
        self.dst_factor != BlendFactor::Zero
    }
}

/**
A compiled pipeline.
*/
#[derive(Debug)]
pub struct ShaderPipeline {
    handle: PipelineHandle,
    primitive: Primitive,
    debug_name: String,
    device: Arc<dyn Device>,
}

impl ShaderPipeline {
    /// Compiles `descriptor`.  Diagnostics are logged along with the offending source.
    pub(crate) fn new(
        device: &Arc<dyn Device>,
        descriptor: &PipelineDescriptor,
    ) -> Result<Self, imp::Error> {
        let handle = match device.compile_pipeline(descriptor) {
            Ok(handle) => handle,
            Err(err) => {
                log_compile_error(descriptor, &err);
                return Err(err);
            }
        };
        Ok(ShaderPipeline {
            handle,
            primitive: descriptor.primitive,
            debug_name: descriptor.debug_name.clone(),
            device: device.clone(),
        })
    }

    pub fn primitive(&self) -> Primitive {
        self.primitive
    }
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }
    pub(crate) fn handle(&self) -> PipelineHandle {
        self.handle
    }
}

impl Drop for ShaderPipeline {
    fn drop(&mut self) {
        self.device.destroy_pipeline(self.handle);
    }
}

fn log_compile_error(descriptor: &PipelineDescriptor, err: &imp::Error) {
    match err {
        imp::Error::Compile { stage, log } => {
            let source = match stage {
                imp::ShaderStage::Vertex => &descriptor.vertex_source,
                imp::ShaderStage::Fragment => &descriptor.fragment_source,
            };
            logwise::error_sync!(
                "Compile error in {stage} shader {name}:\n{log}\n{source}",
                stage = logwise::privacy::LogIt(stage),
                name = logwise::privacy::LogIt(&descriptor.debug_name),
                log = logwise::privacy::LogIt(log),
                source = logwise::privacy::LogIt(source)
            );
        }
        imp::Error::Link { log } => {
            logwise::error_sync!(
                "Link error in pipeline {name}:\n{log}\n{vertex}\n{fragment}",
                name = logwise::privacy::LogIt(&descriptor.debug_name),
                log = logwise::privacy::LogIt(log),
                vertex = logwise::privacy::LogIt(&descriptor.vertex_source),
                fragment = logwise::privacy::LogIt(&descriptor.fragment_source)
            );
        }
        other => {
            logwise::error_sync!(
                "Can't create pipeline {name}: {err}",
                name = logwise::privacy::LogIt(&descriptor.debug_name),
                err = logwise::privacy::LogIt(other)
            );
        }
    }
}
