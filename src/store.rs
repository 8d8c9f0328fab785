//! Panel configuration persistence.

use indexmap::IndexMap;
use tracing::debug;

use crate::core::PanelConfig;
use crate::error::{HistoryError, HistoryResult};

/// Read/write access to stored panel definitions, keyed by a
/// `group/panel` style path.
///
/// Saves replace the whole record; concurrent writers resolve as last write
/// wins.
pub trait ConfigStore {
    fn load_panel(&self, path: &str) -> HistoryResult<PanelConfig>;

    fn save_panel(&mut self, path: &str, panel: PanelConfig) -> HistoryResult<()>;

    /// Stored panel paths in insertion order.
    fn list_panels(&self) -> Vec<String>;
}

/// Insertion-ordered in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    panels: IndexMap<String, PanelConfig>,
}

impl MemoryConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_panel(&mut self, path: &str) -> HistoryResult<PanelConfig> {
        self.panels
            .shift_remove(path)
            .ok_or_else(|| HistoryError::ConfigNotFound {
                path: path.to_owned(),
            })
    }

    pub fn to_json_string(&self) -> HistoryResult<String> {
        Ok(serde_json::to_string_pretty(&self.panels)?)
    }

    pub fn from_json_str(input: &str) -> HistoryResult<Self> {
        let panels: IndexMap<String, PanelConfig> = serde_json::from_str(input)?;
        for panel in panels.values() {
            panel.validate()?;
        }
        Ok(Self { panels })
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load_panel(&self, path: &str) -> HistoryResult<PanelConfig> {
        self.panels
            .get(path)
            .cloned()
            .ok_or_else(|| HistoryError::ConfigNotFound {
                path: path.to_owned(),
            })
    }

    fn save_panel(&mut self, path: &str, mut panel: PanelConfig) -> HistoryResult<()> {
        panel.normalize_for_save();
        panel.validate()?;
        debug!(path, variables = panel.variables.len(), "panel saved");
        self.panels.insert(path.to_owned(), panel);
        Ok(())
    }

    fn list_panels(&self) -> Vec<String> {
        self.panels.keys().cloned().collect()
    }
}
