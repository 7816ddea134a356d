// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Offscreen render targets.

A [RenderTexture] owns color and depth storage, created immediately, and a framebuffer that
only exists on the render worker's context.  Creating, resizing and dropping a target queues
the matching framebuffer work for the worker.
*/

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::bindings::coordinates::WindowRect;
use crate::images::pending::PendingChanges;
use crate::imp::{
    self, Context, Device, FramebufferHandle, RenderStorage, RenderStorageDescriptor, ResolveOp,
    TextureHandle,
};

#[derive(Debug)]
pub struct RenderTexture {
    storage: RenderStorage,
    width: AtomicU32,
    height: AtomicU32,
    samples: u32,
    framebuffer: Mutex<Option<FramebufferHandle>>,
    id: u64,
    pending: Weak<PendingChanges>,
    device: Arc<dyn Device>,
}

impl RenderTexture {
    /**
    # Panics
    If the size is zero.
    */
    pub(crate) fn new(
        device: &Arc<dyn Device>,
        pending: &Arc<PendingChanges>,
        width: u32,
        height: u32,
        samples: u32,
        color_bindable: bool,
        depth_bindable: bool,
    ) -> Result<Arc<Self>, imp::Error> {
        assert!(width > 0 && height > 0, "render texture has zero size");
        let storage = device.create_render_storage(&RenderStorageDescriptor {
            width,
            height,
            samples,
            color_bindable,
            depth_bindable,
        })?;
        let id = pending.next_id();
        let target = Arc::new(RenderTexture {
            storage,
            width: AtomicU32::new(width),
            height: AtomicU32::new(height),
            samples,
            framebuffer: Mutex::new(None),
            id,
            pending: Arc::downgrade(pending),
            device: device.clone(),
        });
        pending.add_framebuffer(id, Arc::downgrade(&target));
        pending.resize(Arc::downgrade(&target), width, height);
        Ok(target)
    }

    pub fn width(&self) -> u32 {
        self.width.load(Ordering::Relaxed)
    }
    pub fn height(&self) -> u32 {
        self.height.load(Ordering::Relaxed)
    }
    pub fn samples(&self) -> u32 {
        self.samples
    }
    /// True once the worker has built the framebuffer.
    pub fn is_configured(&self) -> bool {
        self.framebuffer.lock().unwrap().is_some()
    }

    /**
    Requests new storage dimensions.  The reported size changes now; the storage follows on the
    next frame.
    */
    pub fn resize(self: &Arc<Self>, width: u32, height: u32) {
        assert!(width > 0 && height > 0, "render texture resized to zero");
        self.width.store(width, Ordering::Relaxed);
        self.height.store(height, Ordering::Relaxed);
        if let Some(pending) = self.pending.upgrade() {
            pending.resize(Arc::downgrade(self), width, height);
        }
    }

    pub(crate) fn bindable_color(&self) -> Option<TextureHandle> {
        self.storage.bind_color
    }
    pub(crate) fn bindable_depth(&self) -> Option<TextureHandle> {
        self.storage.bind_depth
    }
    pub(crate) fn framebuffer(&self) -> Option<FramebufferHandle> {
        *self.framebuffer.lock().unwrap()
    }

    /// Runs on the render worker.
    pub(crate) fn configure(&self, context: &mut dyn Context) {
        let mut framebuffer = self.framebuffer.lock().unwrap();
        if framebuffer.is_none() {
            *framebuffer = Some(context.configure_framebuffer(&self.storage, self.samples));
        }
    }

    /// Runs on the render worker.
    pub(crate) fn apply_resize(&self, context: &mut dyn Context, width: u32, height: u32) {
        context.resize_render_storage(self.framebuffer(), &self.storage, width, height);
    }

    /**
    Clips `rect` to the target's current size and converts it to a bottom-left origin.

    With `tl_origin`, `rect` is measured from the top-left.
    */
    pub(crate) fn clip_rect(&self, rect: WindowRect, tl_origin: bool) -> WindowRect {
        let height = self.height() as i32;
        let bounds = WindowRect::new(0, 0, self.width() as i32, height);
        let rect = rect.intersect(&bounds);
        if tl_origin { rect.flipped(height) } else { rect }
    }

    /**
    Builds the copy into the bindable textures for a rect already passed through
    [Self::clip_rect].  Returns `None` before the framebuffer exists.
    */
    pub(crate) fn resolve_op(&self, rect: WindowRect, color: bool, depth: bool) -> Option<ResolveOp> {
        let source = self.framebuffer()?;
        Some(ResolveOp {
            source,
            color: if color { self.storage.bind_color } else { None },
            depth: if depth { self.storage.bind_depth } else { None },
            rect,
        })
    }
}

impl Drop for RenderTexture {
    fn drop(&mut self) {
        self.device.destroy_render_storage(&self.storage);
        let configured = self.framebuffer.get_mut().unwrap().take();
        if let Some(pending) = self.pending.upgrade() {
            pending.remove_framebuffer(self.id, configured);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imp::nop::{NopContext, NopDevice};

    fn target(pending: &Arc<PendingChanges>) -> Arc<RenderTexture> {
        let device: Arc<dyn Device> = Arc::new(NopDevice::new());
        RenderTexture::new(&device, pending, 100, 50, 1, true, false).unwrap()
    }

    #[test]
    fn creation_queues_add_and_resize() {
        let pending = Arc::new(PendingChanges::new());
        let target = target(&pending);
        let lists = pending.take();
        assert_eq!(lists.framebuffer_adds.len(), 1);
        assert_eq!(lists.resizes.len(), 1);
        assert_eq!(lists.resizes[0].1, 100);
        drop(target);
    }

    #[test]
    fn resolve_clips_and_flips() {
        let pending = Arc::new(PendingChanges::new());
        let target = target(&pending);
        let rect = target.clip_rect(WindowRect::new(90, 0, 20, 10), true);
        assert_eq!(rect, WindowRect::new(90, 40, 10, 10));
        assert!(target.resolve_op(rect, true, true).is_none());
        target.configure(&mut NopContext::new());
        let op = target.resolve_op(rect, true, true).unwrap();
        assert_eq!(op.rect, rect);
        assert!(op.color.is_some());
        assert!(op.depth.is_none(), "no bindable depth copy was requested");
    }

    #[test]
    fn clip_uses_the_requested_size() {
        let pending = Arc::new(PendingChanges::new());
        let target = target(&pending);
        target.resize(200, 100);
        assert_eq!(
            target.clip_rect(WindowRect::new(0, 0, 150, 10), true),
            WindowRect::new(0, 90, 150, 10)
        );
    }

    #[test]
    fn drop_before_configure_withdraws_add() {
        let pending = Arc::new(PendingChanges::new());
        let target = target(&pending);
        drop(target);
        let lists = pending.take();
        assert!(lists.framebuffer_adds.is_empty());
        assert!(lists.framebuffer_dels.is_empty());
    }

    #[test]
    fn drop_after_configure_queues_delete() {
        let pending = Arc::new(PendingChanges::new());
        let target = target(&pending);
        pending.take();
        target.configure(&mut NopContext::new());
        let framebuffer = target.framebuffer().unwrap();
        drop(target);
        assert_eq!(pending.take().framebuffer_dels, vec![framebuffer]);
    }
}
