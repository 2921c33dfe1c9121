// LogScout - platform/mod.rs
//
// Platform abstraction layer: filesystem access through host paths, daemon
// configuration readers, OS detection and config.toml loading.
// Dependencies: core, util.

pub mod config;
pub mod fs;
pub mod os;
pub mod sources;
