// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Dynamic resources upload each slot once per change.

use std::sync::mpsc;
use std::time::Duration;

use slots_and_frames::bindings::buffer_types::BufferUse;
use slots_and_frames::bindings::forward::TextureRef;
use slots_and_frames::bindings::pipeline::PipelineDescriptor;
use slots_and_frames::bindings::vertex_format::{VertexElement, VertexSemantic};
use slots_and_frames::bindings::{BindSlot, BindStyle};
use slots_and_frames::images::engine::EngineConfig;
use slots_and_frames::images::{CommandQueue, Engine};
use slots_and_frames::imp::BufferHandle;
use slots_and_frames::imp::trace::{TraceEvent, TraceLog};
use slots_and_frames::pixel_formats::TextureFormat;
use slots_and_frames::{Slot, ValidityMask};

fn engine(log: &TraceLog, slot_count: usize) -> Engine {
    let config = EngineConfig::default().slot_count(slot_count);
    Engine::new(log.device(), log.context(), log.owner(), config).unwrap()
}

/// Executes and waits until the worker has replayed the frame.
fn frame(queue: &mut CommandQueue) -> Slot {
    let (sender, receiver) = mpsc::channel();
    queue.schedule_post_frame_handler(move || {
        let _ = sender.send(());
    });
    let slot = queue.execute();
    receiver
        .recv_timeout(Duration::from_secs(10))
        .expect("frame was not drawn");
    slot
}

fn uploads(log: &TraceLog) -> Vec<(BufferHandle, Vec<u8>)> {
    log.events()
        .into_iter()
        .filter_map(|e| match e {
            TraceEvent::UploadBuffer { buffer, bytes } => Some((buffer, bytes)),
            _ => None,
        })
        .collect()
}

fn created_buffers(log: &TraceLog) -> Vec<BufferHandle> {
    log.events()
        .into_iter()
        .filter_map(|e| match e {
            TraceEvent::CreateBuffer { buffer, .. } => Some(buffer),
            _ => None,
        })
        .collect()
}

#[test]
fn each_slot_uploads_once_per_load() {
    let log = TraceLog::new();
    let mut engine = engine(&log, 3);
    let mut factory = engine.factory();
    let (_token, buffer) = factory
        .commit_transaction(|t| t.new_dynamic_buffer(BufferUse::Uniform, 4, "camera"))
        .unwrap();
    let copies = created_buffers(&log);
    assert_eq!(copies.len(), 3);

    buffer.load(&[1, 2, 3, 4]);
    assert_eq!(buffer.validity(), ValidityMask::empty());
    for _ in 0..4 {
        engine.queue().execute();
    }
    let uploads = uploads(&log);
    assert_eq!(uploads.len(), 3);
    for (i, (handle, bytes)) in uploads.iter().enumerate() {
        assert_eq!(*handle, copies[i]);
        assert_eq!(bytes, &[1, 2, 3, 4]);
    }
    assert!(buffer.validity().is_saturated(3));
    assert_eq!(buffer.validity().count(), 3);

    // a new load invalidates every copy again
    buffer.load(&[9, 9]);
    assert_eq!(buffer.validity().count(), 0);
    engine.queue().execute();
    let last = self::uploads(&log).pop().unwrap();
    assert_eq!(last.1, vec![9, 9, 3, 4]);
}

#[test]
fn unchanged_buffers_are_not_uploaded() {
    let log = TraceLog::new();
    let mut engine = engine(&log, 3);
    let mut factory = engine.factory();
    let (_token, _buffer) = factory
        .commit_transaction(|t| t.new_dynamic_buffer(BufferUse::Uniform, 16, "idle"))
        .unwrap();
    for _ in 0..3 {
        engine.queue().execute();
    }
    // the initial zeroed staging reaches every copy once
    assert_eq!(uploads(&log).len(), 3);
    for _ in 0..5 {
        engine.queue().execute();
    }
    assert_eq!(uploads(&log).len(), 3);
}

#[test]
fn seeded_buffers_upload_the_seed_to_every_slot() {
    let log = TraceLog::new();
    let mut engine = engine(&log, 3);
    let mut factory = engine.factory();
    let (_token, buffer) = factory
        .commit_transaction(|t| {
            t.new_dynamic_buffer_with(BufferUse::Vertex, 4, &[7, 6, 5, 4, 3], "seeded")
        })
        .unwrap();
    assert_eq!(buffer.size(), 4);
    assert_eq!(&buffer.map(4).unwrap()[..], &[7, 6, 5, 4]);
    let copies = created_buffers(&log);
    for _ in 0..3 {
        engine.queue().execute();
    }
    let uploads = uploads(&log);
    assert_eq!(uploads.len(), 3);
    for (i, (handle, bytes)) in uploads.iter().enumerate() {
        assert_eq!(*handle, copies[i]);
        assert_eq!(bytes, &[7, 6, 5, 4]);
    }
}

#[test]
fn map_matches_load() {
    let log = TraceLog::new();
    let mut engine = engine(&log, 3);
    let mut factory = engine.factory();
    let (_token, (loaded, mapped)) = factory
        .commit_transaction(|t| {
            Ok::<_, slots_and_frames::images::factory::CreateError>((
                t.new_dynamic_buffer(BufferUse::Uniform, 8, "loaded")?,
                t.new_dynamic_buffer(BufferUse::Uniform, 8, "mapped")?,
            ))
        })
        .unwrap();
    assert!(mapped.map(9).is_none());

    loaded.load(&[5, 6, 7]);
    {
        let mut staging = mapped.map(3).unwrap();
        staging[..3].copy_from_slice(&[5, 6, 7]);
        staging.unmap();
    }
    assert_eq!(loaded.validity(), mapped.validity());
    engine.queue().execute();
    let uploads = uploads(&log);
    let n = uploads.len();
    assert_eq!(uploads[n - 1].1, uploads[n - 2].1);
    assert_eq!(uploads[n - 1].1, vec![5, 6, 7, 0, 0, 0, 0, 0]);
}

#[test]
fn execute_skips_mapped_resources() {
    let log = TraceLog::new();
    let mut engine = engine(&log, 3);
    let mut factory = engine.factory();
    let (_token, buffer) = factory
        .commit_transaction(|t| t.new_dynamic_buffer(BufferUse::Uniform, 4, "held"))
        .unwrap();
    let staging = buffer.map(4).unwrap();
    engine.queue().execute();
    engine.queue().execute();
    assert!(uploads(&log).is_empty());
    drop(staging);
    assert_eq!(buffer.validity().count(), 0);
    engine.queue().execute();
    assert_eq!(uploads(&log).len(), 1);
}

#[test]
fn dynamic_textures_follow_the_same_rules() {
    let log = TraceLog::new();
    let mut engine = engine(&log, 2);
    let mut factory = engine.factory();
    let (_token, texture) = factory
        .commit_transaction(|t| t.new_dynamic_texture(TextureFormat::RGBA8, 2, 1))
        .unwrap();
    assert_eq!(texture.size(), 8);
    texture.load(&[0xff; 8]);
    for _ in 0..4 {
        frame(engine.queue());
    }
    let uploads = log.count(|e| matches!(e, TraceEvent::UploadTexture { .. }));
    assert_eq!(uploads, 2);
    assert!(texture.validity().is_saturated(2));
}

#[test]
#[should_panic(expected = "unsupported tex format")]
fn compressed_dynamic_textures_are_rejected() {
    let engine = Engine::headless(EngineConfig::default()).unwrap();
    let mut factory = engine.factory();
    let _ = factory.commit_transaction(|t| t.new_dynamic_texture(TextureFormat::DXT1, 4, 4));
}

#[test]
fn bindings_resolve_the_submitted_slot() {
    let log = TraceLog::new();
    let mut engine = engine(&log, 3);
    let mut factory = engine.factory();
    let (_token, binding) = factory
        .commit_transaction(|t| {
            let uniforms = t.new_dynamic_buffer(BufferUse::Uniform, 64, "per frame")?;
            let pixels = t.new_dynamic_texture(TextureFormat::I8, 4, 4)?;
            let pipeline = t.new_pipeline(&PipelineDescriptor::new("vs", "fs"))?;
            let mut style = BindStyle::new();
            style.bind_uniform_buffer(BindSlot::new(1), uniforms);
            style.bind_texture(BindSlot::new(0), TextureRef::Dynamic(pixels));
            Ok::<_, slots_and_frames::images::factory::CreateError>(
                t.new_shader_data_binding(&pipeline, None, style),
            )
        })
        .unwrap();
    let copies = created_buffers(&log);

    let mut submitted = Vec::new();
    for _ in 0..3 {
        let queue = engine.queue();
        queue.set_shader_data_binding(&binding);
        queue.draw(0, 3);
        submitted.push(frame(queue));
    }
    let bound: Vec<BufferHandle> = log
        .events()
        .into_iter()
        .filter_map(|e| match e {
            TraceEvent::Bind { binding } => Some(binding.uniforms[0].buffer),
            _ => None,
        })
        .collect();
    assert_eq!(bound.len(), 3);
    for (slot, handle) in submitted.iter().zip(&bound) {
        assert_eq!(*handle, copies[slot.index()]);
    }
}

#[test]
fn load_between_executes_reaches_later_slots() {
    let log = TraceLog::new();
    let mut engine = engine(&log, 3);
    let mut factory = engine.factory();
    let initial = [7u8; 16];
    let (_token, (dynamic, binding)) = factory
        .commit_transaction(|t| {
            let mesh = t.new_static_buffer(BufferUse::Vertex, &initial, "static")?;
            let dynamic = t.new_dynamic_buffer(BufferUse::Vertex, 16, "dynamic")?;
            let format = t.new_vertex_format(vec![
                VertexElement::new(VertexSemantic::Position4, mesh),
                VertexElement::new(VertexSemantic::Position4, dynamic.clone()).instanced(),
            ]);
            let pipeline = t.new_pipeline(&PipelineDescriptor::new("vs", "fs"))?;
            let binding = t.new_shader_data_binding(&pipeline, Some(&format), BindStyle::new());
            Ok::<_, slots_and_frames::images::factory::CreateError>((dynamic, binding))
        })
        .unwrap();
    dynamic.load(&initial);
    // the static buffer is created first
    let dynamic_copies = created_buffers(&log)[1..].to_vec();
    assert_eq!(dynamic_copies.len(), 3);

    let new_bytes = [42u8; 16];
    for i in 0..3 {
        let queue = engine.queue();
        queue.set_shader_data_binding(&binding);
        queue.draw_instances(0, 4, 1);
        queue.execute();
        if i == 0 {
            dynamic.load(&new_bytes);
        }
    }

    let uploads = uploads(&log);
    assert_eq!(uploads.len(), 3);
    assert_eq!(uploads[0].1, initial);
    assert_eq!(uploads[1].1, new_bytes);
    assert_eq!(uploads[2].1, new_bytes);
    let targets: Vec<_> = uploads.iter().map(|(h, _)| *h).collect();
    assert_eq!(targets, dynamic_copies);
}

#[test]
fn loaded_bytes_are_visible_through_map() {
    let engine = Engine::headless(EngineConfig::default()).unwrap();
    let mut factory = engine.factory();
    let (_token, buffer) = factory
        .commit_transaction(|t| t.new_dynamic_buffer(BufferUse::Uniform, 6, "round trip"))
        .unwrap();
    buffer.load(&[1, 2, 3, 4, 5, 6]);
    let staging = buffer.map(6).unwrap();
    assert_eq!(&staging[..], &[1, 2, 3, 4, 5, 6]);
    drop(staging);
    // oversize loads are truncated to the buffer
    buffer.load(&[9; 10]);
    assert_eq!(&buffer.map(0).unwrap()[..], &[9; 6]);
}
