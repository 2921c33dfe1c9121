// LogScout - app/mod.rs
//
// Application layer: scan, classification and end-to-end discovery.
// Dependencies: core and platform layers.

pub mod classify;
pub mod discover;
pub mod scan;
