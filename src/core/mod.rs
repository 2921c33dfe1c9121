// LogScout - core/mod.rs
//
// Core business logic layer.
// Dependencies: regex, chrono, serde, serde_json, toml (for pattern files).
// Must NOT depend on: platform, app, or perform any filesystem I/O.

pub mod detector;
pub mod grok;
pub mod library;
pub mod model;
pub mod parsers;
pub mod rotation;
pub mod timestamp;
