// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Recorded commands and their replay.

Commands only carry what replay needs.  Resources are referenced weakly: recording a command
does not keep a resource alive, and a command whose resource was destroyed before replay is
skipped.
*/

use std::sync::{Arc, Weak};

use crate::bindings::bind_style::ShaderDataBinding;
use crate::bindings::coordinates::WindowRect;
use crate::bindings::pipeline::Primitive;
use crate::bindings::render_target::RenderTexture;
use crate::imp::{ClearFlags, Context, ContextOwner, DrawCall};
use crate::multibuffer::Slot;

#[derive(Debug)]
pub(crate) enum Command {
    SetShaderDataBinding(Weak<ShaderDataBinding>),
    /// `None` is the display.
    SetRenderTarget(Option<Weak<RenderTexture>>),
    SetViewport {
        rect: WindowRect,
        znear: f32,
        zfar: f32,
    },
    SetScissor(WindowRect),
    SetClearColor([f32; 4]),
    ClearTarget(ClearFlags),
    Draw {
        indexed: bool,
        start: u32,
        count: u32,
        instances: Option<u32>,
    },
    ResolveBindTexture {
        target: Weak<RenderTexture>,
        /// Clipped to the target and bottom-left origin, as of recording.
        rect: WindowRect,
        color: bool,
        depth: bool,
    },
    Present {
        source: Option<Weak<RenderTexture>>,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::SetShaderDataBinding(_) => "SetShaderDataBinding",
            Command::SetRenderTarget(_) => "SetRenderTarget",
            Command::SetViewport { .. } => "SetViewport",
            Command::SetScissor(_) => "SetScissor",
            Command::SetClearColor(_) => "SetClearColor",
            Command::ClearTarget(_) => "ClearTarget",
            Command::Draw { .. } => "Draw",
            Command::ResolveBindTexture { .. } => "ResolveBindTexture",
            Command::Present { .. } => "Present",
        }
    }
}

fn upgrade<T>(command: &Command, weak: &Weak<T>) -> Option<Arc<T>> {
    let strong = weak.upgrade();
    if strong.is_none() {
        logwise::warn_sync!(
            "Skipping {command}: its resource was destroyed",
            command = logwise::privacy::LogIt(command.name())
        );
    }
    strong
}

fn framebuffer_of(command: &Command, target: &RenderTexture) -> Option<crate::imp::FramebufferHandle> {
    let framebuffer = target.framebuffer();
    if framebuffer.is_none() {
        logwise::warn_sync!(
            "Skipping {command}: render target is not configured yet",
            command = logwise::privacy::LogIt(command.name())
        );
    }
    framebuffer
}

/**
The commands for one slot.
*/
#[derive(Debug, Default)]
pub(crate) struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }
    pub fn len(&self) -> usize {
        self.commands.len()
    }
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /**
    Issues every command against `context`.

    Draws use the primitive of the pipeline bound most recently in this buffer, triangles until
    something is bound.
    */
    pub fn replay(&self, slot: Slot, context: &mut dyn Context, owner: &mut dyn ContextOwner) {
        let mut primitive = Primitive::Triangles;
        for command in &self.commands {
            match command {
                Command::SetShaderDataBinding(binding) => {
                    if let Some(binding) = upgrade(command, binding) {
                        primitive = binding.primitive();
                        context.bind(&binding.resolve(slot));
                    }
                }
                Command::SetRenderTarget(None) => context.set_render_target(None),
                Command::SetRenderTarget(Some(target)) => {
                    if let Some(target) = upgrade(command, target)
                        && let Some(framebuffer) = framebuffer_of(command, &target)
                    {
                        context.set_render_target(Some(framebuffer));
                    }
                }
                Command::SetViewport { rect, znear, zfar } => {
                    context.set_viewport(*rect, *znear, *zfar)
                }
                Command::SetScissor(rect) => {
                    context.set_scissor((!rect.is_empty()).then_some(*rect))
                }
                Command::SetClearColor(color) => context.set_clear_color(*color),
                Command::ClearTarget(flags) => context.clear(*flags),
                Command::Draw {
                    indexed,
                    start,
                    count,
                    instances,
                } => context.draw(DrawCall {
                    primitive,
                    indexed: *indexed,
                    start: *start,
                    count: *count,
                    instances: *instances,
                }),
                Command::ResolveBindTexture {
                    target,
                    rect,
                    color,
                    depth,
                } => {
                    if let Some(target) = upgrade(command, target) {
                        match target.resolve_op(*rect, *color, *depth) {
                            Some(op) => context.resolve(&op),
                            None => {
                                framebuffer_of(command, &target);
                            }
                        }
                    }
                }
                Command::Present { source } => {
                    if let Some(source) = source
                        && let Some(target) = upgrade(command, source)
                        && let Some(framebuffer) = framebuffer_of(command, &target)
                    {
                        context.blit_to_display(framebuffer);
                    }
                    owner.present();
                }
            }
        }
    }
}
