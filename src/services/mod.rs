//! Domain services used by websocket and HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business logic and persistence concerns so route
//! handlers can stay focused on protocol translation and auth plumbing.

pub mod auth;
pub mod catalog;
pub mod chat;
pub mod game;
pub mod lobby;
pub mod session;
pub mod transcript;
