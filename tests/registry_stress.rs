// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Creating and destroying resources on one thread while another submits frames.

use std::sync::mpsc;
use std::time::Duration;

use slots_and_frames::bindings::buffer_types::BufferUse;
use slots_and_frames::bindings::forward::TextureRef;
use slots_and_frames::bindings::pipeline::PipelineDescriptor;
use slots_and_frames::bindings::vertex_format::{VertexElement, VertexSemantic};
use slots_and_frames::bindings::{BindSlot, BindStyle};
use slots_and_frames::images::engine::EngineConfig;
use slots_and_frames::images::factory::CreateError;
use slots_and_frames::images::{CommandQueue, DataFactory, Engine};
use slots_and_frames::imp::trace::{TraceEvent, TraceLog};

fn frame(queue: &mut CommandQueue) {
    let (sender, receiver) = mpsc::channel();
    queue.schedule_post_frame_handler(move || {
        let _ = sender.send(());
    });
    queue.execute();
    receiver
        .recv_timeout(Duration::from_secs(10))
        .expect("frame was not drawn");
}

const ITERATIONS: usize = 200;

fn churn(
    mut factory: DataFactory,
    to_client: mpsc::SyncSender<(
        std::sync::Arc<slots_and_frames::bindings::ShaderDataBinding>,
        std::sync::Arc<slots_and_frames::bindings::render_target::RenderTexture>,
    )>,
) {
    for i in 0..ITERATIONS {
        let (token, (binding, target, uniforms)) = factory
            .commit_transaction(|t| {
                let vertices = t.new_static_buffer(BufferUse::Vertex, &[0; 36], "triangle")?;
                let uniforms = t.new_dynamic_buffer(BufferUse::Uniform, 64, "transform")?;
                let target = t.new_render_texture(8, 8, true, true)?;
                let pipeline = t.new_pipeline(&PipelineDescriptor::new("vs", "fs"))?;
                let format = t.new_vertex_format(vec![VertexElement::new(
                    VertexSemantic::Position3,
                    vertices,
                )]);
                let mut style = BindStyle::new();
                style.bind_uniform_buffer(BindSlot::new(0), uniforms.clone());
                style.bind_texture(BindSlot::new(0), TextureRef::RenderColor(target.clone()));
                let binding = t.new_shader_data_binding(&pipeline, Some(&format), style);
                Ok::<_, CreateError>((binding, target, uniforms))
            })
            .unwrap();
        uniforms.load(&[i as u8; 64]);
        if i % 3 == 0 {
            // the client may or may not still hold these when the set is destroyed
            let _ = to_client.try_send((binding, target));
        }
        drop(uniforms);
        if i % 7 == 0 {
            std::thread::yield_now();
        }
        factory.destroy_data(token);
    }
}

#[test]
fn churn_while_executing() {
    let log = TraceLog::new();
    let config = EngineConfig::default().worker_name("stress worker");
    let mut engine = Engine::new(log.device(), log.context(), log.owner(), config).unwrap();
    let factory = engine.factory();
    let (sender, receiver) = mpsc::sync_channel(4);
    let background = std::thread::Builder::new()
        .name("churn".to_string())
        .spawn(move || churn(factory, sender))
        .unwrap();

    let queue = engine.queue();
    let mut frames = 0;
    loop {
        match receiver.try_recv() {
            Ok((binding, target)) => {
                queue.set_render_target(Some(&target));
                queue.set_shader_data_binding(&binding);
                queue.draw(0, 3);
                queue.resolve_bind_texture(&target, target_rect(), false, true, true);
                queue.set_render_target(None);
                queue.resolve_display(Some(&target));
            }
            Err(mpsc::TryRecvError::Empty) => {
                queue.clear_target(true, true);
            }
            Err(mpsc::TryRecvError::Disconnected) => break,
        }
        queue.execute();
        frames += 1;
    }
    background.join().unwrap();
    assert!(frames > 0);

    // let the worker release what it was holding, then apply the queued deletions
    frame(queue);
    frame(queue);

    assert_eq!(engine.factory().committed_count(), 0);
    assert_eq!(log.live_objects(), 0);
    let configured = log.count(|e| matches!(e, TraceEvent::ConfigureFramebuffer { .. }));
    let deleted = log.count(|e| matches!(e, TraceEvent::DeleteFramebuffer { .. }));
    assert_eq!(configured, deleted);
    let arrays = log.count(|e| matches!(e, TraceEvent::ConfigureVertexArray { .. }));
    let arrays_deleted = log.count(|e| matches!(e, TraceEvent::DeleteVertexArray { .. }));
    assert_eq!(arrays, arrays_deleted);
}

fn target_rect() -> slots_and_frames::bindings::coordinates::WindowRect {
    slots_and_frames::bindings::coordinates::WindowRect::new(0, 0, 8, 8)
}

#[test]
fn parallel_transactions_get_distinct_sets() {
    let engine = Engine::headless(EngineConfig::default()).unwrap();
    let threads: Vec<_> = (0..4)
        .map(|n| {
            let mut factory = engine.factory();
            std::thread::spawn(move || {
                (0..25)
                    .map(|i| {
                        factory
                            .commit_transaction(|t| {
                                t.new_dynamic_buffer(
                                    BufferUse::Uniform,
                                    16,
                                    &format!("thread {n} set {i}"),
                                )
                            })
                            .unwrap()
                            .0
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let tokens: Vec<_> = threads
        .into_iter()
        .flat_map(|t| t.join().unwrap())
        .collect();
    let factory = engine.factory();
    assert_eq!(factory.committed_count(), 100);
    assert!(tokens.iter().all(|t| factory.is_committed(t)));
    drop(tokens);
    assert_eq!(factory.committed_count(), 0);
}
