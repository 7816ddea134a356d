// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The render worker: the only thread that touches the live graphics context.
*/

use std::sync::Arc;
use std::thread::JoinHandle;

use r#continue::continuation;

use crate::images::command_queue::Shared;
use crate::images::pending::{PendingChanges, PendingLists};
use crate::imp::{Context, ContextOwner};

/**
Starts the worker and waits until its context is initialized.

Returns the join handle and the version string the context reported.
*/
pub(crate) fn spawn(
    name: &str,
    shared: Arc<Shared>,
    pending: Arc<PendingChanges>,
    context: Box<dyn Context>,
    owner: Box<dyn ContextOwner>,
) -> std::io::Result<(JoinHandle<()>, String)> {
    let prior = logwise::context::Context::current();
    let (sender, initialized) = continuation();
    let handle = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let c = logwise::context::Context::new_task(Some(prior), "render worker".to_string());
            let id = c.context_id();
            c.set_current();
            let mut worker = Worker {
                shared,
                pending,
                context,
                owner,
            };
            worker.owner.make_current();
            let version = worker.context.initialize();
            worker.owner.post_init();
            logwise::info_sync!("render worker started: {version}", version = version.clone());
            sender.send(version);
            worker.run();
            worker.owner.clear_current();
            logwise::info_sync!("render worker stopped");
            logwise::context::Context::pop(id);
        })?;
    let version = pollster::block_on(initialized);
    Ok((handle, version))
}

struct Worker {
    shared: Arc<Shared>,
    pending: Arc<PendingChanges>,
    context: Box<dyn Context>,
    owner: Box<dyn ContextOwner>,
}

impl Worker {
    fn run(&mut self) {
        loop {
            let (slot, posts) = {
                let mut handoff = self.shared.handoff.lock().unwrap();
                while handoff.running && !handoff.frame_ready {
                    handoff = self.shared.wake.wait(handoff).unwrap();
                }
                if !handoff.running {
                    return;
                }
                handoff.frame_ready = false;
                handoff.drawing = true;
                let slot = handoff.rotation.begin_draw();
                (slot, std::mem::take(&mut handoff.posts))
            };

            self.context.bind_default_framebuffer();
            self.apply(self.pending.take());

            {
                let mut buffer = self.shared.buffers.get(slot).lock().unwrap();
                logwise::trace_sync!(
                    "replaying slot {slot}: {commands} commands",
                    slot = slot.index(),
                    commands = buffer.len()
                );
                buffer.replay(slot, self.context.as_mut(), self.owner.as_mut());
                buffer.clear();
            }

            {
                let mut handoff = self.shared.handoff.lock().unwrap();
                handoff.drawing = false;
                handoff.frames_drawn += 1;
            }
            self.shared.idle.notify_all();

            for post in posts {
                post();
            }
        }
    }

    /// Applies structural changes in dependency order.
    fn apply(&mut self, lists: PendingLists) {
        if lists.is_empty() {
            return;
        }
        logwise::trace_sync!(
            "applying pending changes: {fbo_adds} framebuffer adds, {resizes} resizes, {vf_adds} vertex format adds, {vf_dels} vertex format deletions, {fbo_dels} framebuffer deletions",
            fbo_adds = lists.framebuffer_adds.len(),
            resizes = lists.resizes.len(),
            vf_adds = lists.vertex_format_adds.len(),
            vf_dels = lists.vertex_format_dels.len(),
            fbo_dels = lists.framebuffer_dels.len()
        );
        for (_, target) in lists.framebuffer_adds {
            if let Some(target) = target.upgrade() {
                target.configure(self.context.as_mut());
            }
        }
        for (target, width, height) in lists.resizes {
            if let Some(target) = target.upgrade() {
                target.apply_resize(self.context.as_mut(), width, height);
            }
        }
        for (_, format) in lists.vertex_format_adds {
            if let Some(format) = format.upgrade() {
                format.configure(self.context.as_mut());
            }
        }
        for arrays in lists.vertex_format_dels {
            for array in arrays {
                self.context.delete_vertex_array(array);
            }
        }
        for framebuffer in lists.framebuffer_dels {
            self.context.delete_framebuffer(framebuffer);
        }
    }
}
