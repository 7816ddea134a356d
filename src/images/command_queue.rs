// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The client side of command submission.

The queue owns `N` command buffers that rotate through three roles (see [Rotation]).  Recording
methods append to the fill buffer and never touch the driver.  [CommandQueue::execute] is the
only point where the client hands work to the render worker, and it never waits for the worker
to finish drawing, except with two slots, where there is nowhere else to record.
*/

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::bindings::bind_style::ShaderDataBinding;
use crate::bindings::coordinates::WindowRect;
use crate::bindings::render_target::RenderTexture;
use crate::bindings::resource_tracking::Registry;
use crate::images::command_buffer::{Command, CommandBuffer};
use crate::imp::{ClearFlags, Device, Platform};
use crate::multibuffer::{Multibuffer, Rotation, Slot};

/// Runs on the render worker once the frame it was scheduled with has been replayed.
pub type PostFrameHandler = Box<dyn FnOnce() + Send + 'static>;

pub(crate) struct Handoff {
    pub rotation: Rotation,
    /// A complete buffer is waiting for the worker.
    pub frame_ready: bool,
    /// The worker is replaying the draw buffer.
    pub drawing: bool,
    pub running: bool,
    pub frames_drawn: u64,
    pub posts: Vec<PostFrameHandler>,
}

impl std::fmt::Debug for Handoff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handoff")
            .field("rotation", &self.rotation)
            .field("frame_ready", &self.frame_ready)
            .field("drawing", &self.drawing)
            .field("running", &self.running)
            .field("frames_drawn", &self.frames_drawn)
            .field("posts", &self.posts.len())
            .finish()
    }
}

/// State shared between the queue and the render worker.
#[derive(Debug)]
pub(crate) struct Shared {
    pub handoff: Mutex<Handoff>,
    /// Signals the worker: a frame is ready, or it should stop.
    pub wake: Condvar,
    /// Signals the client: the worker finished a replay.
    pub idle: Condvar,
    pub buffers: Multibuffer<Mutex<CommandBuffer>>,
}

impl Shared {
    pub fn new(slot_count: usize) -> Self {
        Shared {
            handoff: Mutex::new(Handoff {
                rotation: Rotation::new(slot_count),
                frame_ready: false,
                drawing: false,
                running: true,
                frames_drawn: 0,
                posts: Vec::new(),
            }),
            wake: Condvar::new(),
            idle: Condvar::new(),
            buffers: Multibuffer::from_fn(slot_count, |_| Mutex::new(CommandBuffer::default())),
        }
    }
}

/**
Records draw work and submits it to the render worker.
*/
pub struct CommandQueue {
    shared: Arc<Shared>,
    fill: Slot,
    scheduled: Vec<PostFrameHandler>,
    registry: Arc<Registry>,
    device: Arc<dyn Device>,
    worker: Option<JoinHandle<()>>,
}

impl CommandQueue {
    pub(crate) fn new(
        shared: Arc<Shared>,
        registry: Arc<Registry>,
        device: Arc<dyn Device>,
        worker: JoinHandle<()>,
    ) -> Self {
        let fill = shared.handoff.lock().unwrap().rotation.fill();
        CommandQueue {
            shared,
            fill,
            scheduled: Vec::new(),
            registry,
            device,
            worker: Some(worker),
        }
    }

    pub fn platform(&self) -> Platform {
        self.device.platform()
    }
    pub fn platform_name(&self) -> &'static str {
        self.device.platform().name()
    }

    /// The current roles of the command buffers.
    pub fn rotation(&self) -> Rotation {
        self.shared.handoff.lock().unwrap().rotation
    }

    /// Frames the worker has replayed so far.
    pub fn frames_drawn(&self) -> u64 {
        self.shared.handoff.lock().unwrap().frames_drawn
    }

    /// Commands recorded since the last [Self::execute].
    pub fn recorded(&self) -> usize {
        self.shared.buffers.get(self.fill).lock().unwrap().len()
    }

    fn record(&mut self, command: Command) {
        self.shared
            .buffers
            .get(self.fill)
            .lock()
            .unwrap()
            .push(command);
    }

    pub fn set_shader_data_binding(&mut self, binding: &Arc<ShaderDataBinding>) {
        self.record(Command::SetShaderDataBinding(Arc::downgrade(binding)));
    }

    /// `None` targets the display.
    pub fn set_render_target(&mut self, target: Option<&Arc<RenderTexture>>) {
        self.record(Command::SetRenderTarget(target.map(Arc::downgrade)));
    }

    pub fn set_viewport(&mut self, rect: WindowRect, znear: f32, zfar: f32) {
        self.record(Command::SetViewport { rect, znear, zfar });
    }

    /// A zero-sized rectangle disables scissoring.
    pub fn set_scissor(&mut self, rect: WindowRect) {
        self.record(Command::SetScissor(rect));
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.record(Command::SetClearColor(color));
    }

    pub fn clear_target(&mut self, color: bool, depth: bool) {
        self.record(Command::ClearTarget(ClearFlags { color, depth }));
    }

    pub fn draw(&mut self, start: u32, count: u32) {
        self.record(Command::Draw {
            indexed: false,
            start,
            count,
            instances: None,
        });
    }

    pub fn draw_indexed(&mut self, start: u32, count: u32) {
        self.record(Command::Draw {
            indexed: true,
            start,
            count,
            instances: None,
        });
    }

    pub fn draw_instances(&mut self, start: u32, count: u32, instances: u32) {
        self.record(Command::Draw {
            indexed: false,
            start,
            count,
            instances: Some(instances),
        });
    }

    pub fn draw_instances_indexed(&mut self, start: u32, count: u32, instances: u32) {
        self.record(Command::Draw {
            indexed: true,
            start,
            count,
            instances: Some(instances),
        });
    }

    /**
    Copies part of `target` into its bindable textures, so it can be sampled while still being
    rendered to.  `rect` is clipped to the target's size at the time of the call; `tl_origin`
    means it is measured from the top-left.
    */
    pub fn resolve_bind_texture(
        &mut self,
        target: &Arc<RenderTexture>,
        rect: WindowRect,
        tl_origin: bool,
        color: bool,
        depth: bool,
    ) {
        self.record(Command::ResolveBindTexture {
            target: Arc::downgrade(target),
            rect: target.clip_rect(rect, tl_origin),
            color,
            depth,
        });
    }

    /// Presents the frame, first copying `source` to the display if given.
    pub fn resolve_display(&mut self, source: Option<&Arc<RenderTexture>>) {
        self.record(Command::Present {
            source: source.map(Arc::downgrade),
        });
    }

    pub fn resize_render_texture(&mut self, target: &Arc<RenderTexture>, width: u32, height: u32) {
        target.resize(width, height);
    }

    /// `handler` runs on the render worker after the next executed frame is replayed.
    pub fn schedule_post_frame_handler(&mut self, handler: impl FnOnce() + Send + 'static) {
        self.scheduled.push(Box::new(handler));
    }

    /**
    Hands the recorded commands to the render worker.

    Returns the slot that was submitted.  Dynamic resources are brought up to date for that slot
    before the worker is signalled.
    */
    pub fn execute(&mut self) -> Slot {
        let complete = {
            let mut handoff = self.shared.handoff.lock().unwrap();
            if !handoff.running {
                logwise::warn_sync!("execute() after the renderer stopped; nothing will draw");
            }
            let complete = loop {
                let drawing = handoff.drawing;
                if let Some(complete) = handoff.rotation.advance(drawing) {
                    break complete;
                }
                handoff = self.shared.idle.wait(handoff).unwrap();
            };
            handoff.frame_ready = false;
            self.fill = handoff.rotation.fill();
            logwise::trace_sync!(
                "execute {rotation}",
                rotation = logwise::privacy::LogIt(&handoff.rotation)
            );
            complete
        };

        let dynamic = self.registry.dynamic_snapshot();
        let uploads = dynamic
            .iter()
            .filter(|resource| resource.update_slot(complete))
            .count();
        drop(dynamic);
        logwise::trace_sync!(
            "uploaded {uploads} dynamic resources for slot {slot}",
            uploads = uploads,
            slot = complete.index()
        );

        self.device.flush();

        {
            let mut handoff = self.shared.handoff.lock().unwrap();
            if handoff.running {
                handoff.posts.append(&mut self.scheduled);
                handoff.frame_ready = true;
            } else if !self.scheduled.is_empty() {
                logwise::warn_sync!(
                    "dropping {count} post-frame handlers; the renderer is stopped",
                    count = self.scheduled.len()
                );
                self.scheduled.clear();
            }
        }
        self.shared.wake.notify_one();

        self.shared.buffers.get(self.fill).lock().unwrap().clear();
        complete
    }

    /**
    Stops the render worker and waits for it to exit.

    Frames not yet drawn are dropped, along with their post-frame handlers.  Handlers
    scheduled after this never run.
    */
    pub fn stop_renderer(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.shared.handoff.lock().unwrap().running = false;
        self.shared.wake.notify_all();
        if worker.join().is_err() {
            logwise::error_sync!("render worker panicked");
        }
        self.shared.handoff.lock().unwrap().posts.clear();
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue")
            .field("fill", &self.fill)
            .field("scheduled", &self.scheduled.len())
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl Drop for CommandQueue {
    fn drop(&mut self) {
        self.stop_renderer();
    }
}
