// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! Immutable forward resources optimized for write-once, read-many patterns.

Static resources have a single GPU copy, created from client data during a transaction
and never updated afterwards.  No validity tracking is needed.
*/

pub mod buffer;
pub mod texture;
