// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! slots_and_frames is a GPU resource and command-submission layer.

It sits between an application's render code and a graphics backend, and solves one problem:
recording and uploading the next frame on one thread while another thread is still drawing the
last one, without either of them waiting on the other.

# Slots

Everything that changes per frame is multibuffered.  The queue owns `N` command buffers (three
by default) that rotate through three roles:

| Role     | Owner         | Meaning                                             |
|----------|---------------|-----------------------------------------------------|
| fill     | client thread | commands are being recorded here                    |
| complete | handoff       | recorded and uploaded, waiting for the render worker |
| draw     | render worker | being replayed against the live context             |

Every dynamic buffer and texture has one physical copy per slot, plus a CPU staging copy and a
[ValidityMask] saying which physical copies match staging.  Writing staging clears the mask;
submitting a frame uploads the copy for that frame's slot, once.

# Resources

| Class   | Use case              | Copies   | Created with                                        |
|---------|-----------------------|----------|-----------------------------------------------------|
| Static  | meshes, sprites       | one      | [images::Transaction::new_static_buffer] and friends |
| Dynamic | per-frame uniforms    | one/slot | [images::Transaction::new_dynamic_buffer]           |
| Render  | offscreen targets     | one      | [images::Transaction::new_render_texture]           |

Resources are created in transactions and committed as a unit; see [images::factory].

# Backends

Backends implement the traits in [imp].  The [imp::trace] backend records every call and can
inject failures, and is what the tests run against.  [imp::nop] renders nothing.
*/

pub mod images;
pub mod bindings;
pub mod pixel_formats;
pub mod imp;
mod multibuffer;
mod bittricks;

pub use multibuffer::{
    DEFAULT_SLOT_COUNT, MAX_SLOT_COUNT, MIN_SLOT_COUNT, MappedStaging, Rotation, Slot,
    ValidityMask,
};
