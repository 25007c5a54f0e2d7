//! Slashhook server library - the interactions webhook and command sync.
//!
//! Routes, configuration and application state live here, apart from
//! main.rs, so integration tests can drive the router directly.

pub mod commands;
pub mod config;
pub mod logging;
pub mod routes;
pub mod state;
