// tabplay shared type definitions
// Each submodule defines types used across the engine, the host seam and the popup.

pub mod errors;
pub mod events;
pub mod license;
pub mod media_tab;
pub mod page;
pub mod settings;
pub mod storage;
pub mod view;
