//! tabplay: tracks browser tabs that hold audio or video and controls their
//! playback from an extension popup.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod database;
pub mod host;
pub mod managers;
pub mod page;
pub mod platform;
pub mod services;
pub mod storage;
pub mod types;

#[cfg(feature = "headless")]
pub mod rpc_handler;
