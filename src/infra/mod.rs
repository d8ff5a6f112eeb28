//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod generator;
pub mod git;
pub mod hosting;
pub mod http;
pub mod process;
pub mod telemetry;
pub mod watcher;
pub mod workspace;
