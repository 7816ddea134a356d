// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! The submission side of slots_and_frames: resource creation, command queues and the render worker. */

pub use engine::Engine;
pub use factory::{DataFactory, DataToken, Transaction};
pub use command_queue::{CommandQueue, PostFrameHandler};

pub mod engine;
pub mod factory;
pub mod command_queue;

mod command_buffer;
pub(crate) mod pending;
mod render_worker;
