//! Application services: resolution, authorization, generation and diffs.

pub mod authorization;
pub mod diff;
pub mod error;
pub mod generation;
pub mod hosting;
pub mod index;
pub mod live;
pub mod preview;
