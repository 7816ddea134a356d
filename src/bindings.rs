// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Defines binding types */

pub mod bind_style;
pub mod buffer_types;
pub mod coordinates;
pub mod forward;
pub mod pipeline;
pub mod render_target;
pub mod resource_tracking;
pub mod vertex_format;

pub use bind_style::{BindSlot, BindStyle, ShaderDataBinding};
