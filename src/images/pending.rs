// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Structural changes waiting for the render worker.

Framebuffers and vertex-array objects belong to the worker's context, so creating, resizing or
deleting them is queued here and applied at the start of the next frame.  These lists have their
own lock; nothing holds it while also holding the handoff or registry locks.
*/

use std::sync::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use wasm_safe_mutex::Mutex;

use crate::bindings::render_target::RenderTexture;
use crate::bindings::vertex_format::VertexFormat;
use crate::imp::{FramebufferHandle, VertexArrayHandle};

/// One batch of changes, applied by the worker in field order.
#[derive(Debug, Default)]
pub(crate) struct PendingLists {
    pub framebuffer_adds: Vec<(u64, Weak<RenderTexture>)>,
    pub resizes: Vec<(Weak<RenderTexture>, u32, u32)>,
    pub vertex_format_adds: Vec<(u64, Weak<VertexFormat>)>,
    pub vertex_format_dels: Vec<Box<[VertexArrayHandle]>>,
    pub framebuffer_dels: Vec<FramebufferHandle>,
}

impl PendingLists {
    pub fn is_empty(&self) -> bool {
        self.framebuffer_adds.is_empty()
            && self.resizes.is_empty()
            && self.vertex_format_adds.is_empty()
            && self.vertex_format_dels.is_empty()
            && self.framebuffer_dels.is_empty()
    }
}

#[derive(Debug)]
pub(crate) struct PendingChanges {
    lists: Mutex<PendingLists>,
    next_id: AtomicU64,
}

impl PendingChanges {
    pub fn new() -> Self {
        PendingChanges {
            lists: Mutex::new(PendingLists::default()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Identifies an object in the add lists.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn add_framebuffer(&self, id: u64, target: Weak<RenderTexture>) {
        self.lists.lock_sync().framebuffer_adds.push((id, target));
    }

    pub fn resize(&self, target: Weak<RenderTexture>, width: u32, height: u32) {
        self.lists.lock_sync().resizes.push((target, width, height));
    }

    pub fn add_vertex_format(&self, id: u64, format: Weak<VertexFormat>) {
        self.lists.lock_sync().vertex_format_adds.push((id, format));
    }

    /**
    Forgets a render target.  A framebuffer that was configured is queued for deletion;
    otherwise the pending add is withdrawn.
    */
    pub fn remove_framebuffer(&self, id: u64, configured: Option<FramebufferHandle>) {
        let mut lists = self.lists.lock_sync();
        match configured {
            Some(framebuffer) => lists.framebuffer_dels.push(framebuffer),
            None => lists.framebuffer_adds.retain(|(add, _)| *add != id),
        }
    }

    /// Like [Self::remove_framebuffer], for a vertex format's per-slot arrays.
    pub fn remove_vertex_format(&self, id: u64, configured: Option<Box<[VertexArrayHandle]>>) {
        let mut lists = self.lists.lock_sync();
        match configured {
            Some(arrays) => lists.vertex_format_dels.push(arrays),
            None => lists.vertex_format_adds.retain(|(add, _)| *add != id),
        }
    }

    pub fn take(&self) -> PendingLists {
        std::mem::take(&mut *self.lists.lock_sync())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_removal_withdraws_the_add() {
        let pending = PendingChanges::new();
        let a = pending.next_id();
        let b = pending.next_id();
        pending.add_vertex_format(a, Weak::new());
        pending.add_vertex_format(b, Weak::new());
        pending.remove_vertex_format(a, None);
        let lists = pending.take();
        assert_eq!(lists.vertex_format_adds.len(), 1);
        assert_eq!(lists.vertex_format_adds[0].0, b);
        assert!(lists.vertex_format_dels.is_empty());
    }

    #[test]
    fn configured_removal_queues_a_delete() {
        let pending = PendingChanges::new();
        let id = pending.next_id();
        pending.remove_framebuffer(id, Some(FramebufferHandle(7)));
        let lists = pending.take();
        assert_eq!(lists.framebuffer_dels, vec![FramebufferHandle(7)]);
        assert!(pending.take().is_empty());
    }
}
