//! StreamForge sidecar event server.
//!
//! Startup sequence: tracing → data dir → store → settings → shared
//! state → port discovery → `SERVER_PORT` announcement → serve →
//! graceful drain. The host desktop shell spawns this binary and reads
//! the announced port from stdout.

pub mod app;
pub mod background;
pub mod bootstrap;
pub mod config;
pub mod events;
pub mod hub;
pub mod lifecycle;
pub mod logger;
pub mod queue;
pub mod resolver;
pub mod server;
