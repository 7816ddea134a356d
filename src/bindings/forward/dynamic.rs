// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Resources that are dynamic.  That is, they change frequently.

Writes land in a CPU staging copy.  `execute()` brings the physical copy for the slot being
submitted up to date, and only if that copy is stale.
*/
pub mod buffer;
pub mod texture;
