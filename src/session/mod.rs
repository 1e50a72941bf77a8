//! Session controllers
//!
//! This module provides the two roles built on the broadcast bus:
//! - `AdminSession`: samples the camera, publishes frames and status,
//!   drives the AI commentary bridge
//! - `ViewerSession`: mirrors the broadcast state, renders the latest frame
//! - Chat composition and per-session chat logs for both

mod admin;
mod chat;
mod config;
mod stats;
mod viewer;

pub use admin::AdminSession;
pub use chat::{compose_comment, ChatLog};
pub use config::SessionConfig;
pub use stats::{AdminSnapshot, ViewerSnapshot};
pub use viewer::{ViewerSession, ViewerState};
