//! Preview generated documentation at any branch or pull-request head.
//!
//! The `serve` mode resolves revisions, generates them in throwaway
//! workspaces and caches the output per render variant; the `watch` mode
//! regenerates a local working tree on every change.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
