// tabplay services
// Background monitor, playback control, the popup surface, licensing and settings.

pub mod control_surface;
pub mod license_gate;
pub mod media_probe;
pub mod playback;
pub mod settings_engine;
pub mod site_labels;
pub mod tab_monitor;
