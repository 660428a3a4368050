// tabplay state managers
// Managers own shared persisted state.

pub mod media_tab_store;
