//! Boundary toward the browser host.
//!
//! The engine never touches the browser directly: tab metadata comes from a
//! [`TabService`] and page access goes through a [`ScriptInjector`].

#[cfg(feature = "headless")]
pub mod headless;

use async_trait::async_trait;

use crate::types::errors::HostError;
use crate::types::events::TabInfo;
use crate::types::media_tab::TabId;
use crate::types::page::{PageScript, ScriptOutput};

/// Tab inspection service.
#[async_trait]
pub trait TabService: Send + Sync {
    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError>;

    /// All open tabs.
    async fn query_tabs(&self) -> Result<Vec<TabInfo>, HostError>;

    /// The active tab of the current window, if any.
    async fn active_tab(&self) -> Result<Option<TabInfo>, HostError>;
}

/// Script injection service.
///
/// Implementations run the script in the tab's isolated page context and
/// must report injection failure as an error, never as a default result.
#[async_trait]
pub trait ScriptInjector: Send + Sync {
    async fn execute(&self, tab_id: TabId, script: PageScript) -> Result<ScriptOutput, HostError>;
}
