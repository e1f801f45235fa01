pub mod disk;
pub mod memory;

use crate::core::widget::{
    DashboardState, MIN_REFRESH_INTERVAL_MS, Theme, WidgetDefinition, WidgetPatch,
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Key the dashboard document is persisted under.
pub const STORAGE_KEY: &str = "finboard-storage";
const STATE_VERSION: u32 = 0;

/// Durable string storage for the dashboard document.
pub trait StateStorage: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Widget with id {0} already exists")]
    DuplicateId(String),
    #[error("Refresh interval must be at least {MIN_REFRESH_INTERVAL_MS} ms, got {0} ms")]
    RefreshIntervalTooShort(u64),
    #[error("Invalid dashboard document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize)]
struct PersistedDocument {
    state: DashboardState,
    #[serde(default)]
    version: u32,
}

/// Import format. Missing or null members fall back to defaults.
#[derive(Deserialize)]
struct ImportDocument {
    #[serde(default)]
    widgets: Option<Vec<WidgetDefinition>>,
    #[serde(default)]
    theme: Option<Theme>,
}

/// Single source of truth for the dashboard layout and theme.
///
/// Every change is written through to [`StateStorage`]. Storage failures are
/// logged and never undo the in-memory change.
pub struct DashboardStore {
    state: RwLock<DashboardState>,
    storage: Arc<dyn StateStorage>,
    theme: watch::Sender<Theme>,
}

impl DashboardStore {
    /// Restores the last persisted dashboard, or starts empty.
    pub fn load(storage: Arc<dyn StateStorage>) -> Self {
        let state = match storage.load(STORAGE_KEY) {
            Ok(Some(document)) => match serde_json::from_str::<PersistedDocument>(&document) {
                Ok(document) => {
                    let mut state = document.state;
                    state.widgets = normalize_intervals(dedupe(state.widgets));
                    info!(widgets = state.widgets.len(), "Restored dashboard");
                    state
                }
                Err(e) => {
                    warn!("Ignoring unreadable dashboard document: {}", e);
                    DashboardState::default()
                }
            },
            Ok(None) => DashboardState::default(),
            Err(e) => {
                warn!("Failed to read dashboard storage: {}", e);
                DashboardState::default()
            }
        };

        let (theme, _) = watch::channel(state.theme);
        Self {
            state: RwLock::new(state),
            storage,
            theme,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DashboardState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DashboardState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &DashboardState) {
        let document = PersistedDocument {
            state: state.clone(),
            version: STATE_VERSION,
        };
        let result = serde_json::to_string(&document)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.storage.save(STORAGE_KEY, &json));
        if let Err(e) = result {
            warn!("Failed to persist dashboard: {}", e);
        }
    }

    pub fn snapshot(&self) -> DashboardState {
        self.read().clone()
    }

    pub fn widgets(&self) -> Vec<WidgetDefinition> {
        self.read().widgets.clone()
    }

    pub fn widget(&self, id: &str) -> Option<WidgetDefinition> {
        self.read().widget(id).cloned()
    }

    pub fn theme(&self) -> Theme {
        self.read().theme
    }

    /// Receives every theme change, including those made by an import.
    pub fn subscribe_theme(&self) -> watch::Receiver<Theme> {
        self.theme.subscribe()
    }

    /// Appends `widget` at the end of the layout.
    pub fn add(&self, widget: WidgetDefinition) -> Result<(), StoreError> {
        validate_interval(widget.refresh_interval_ms)?;
        let mut state = self.write();
        if state.position(&widget.id).is_some() {
            return Err(StoreError::DuplicateId(widget.id));
        }
        debug!(id = %widget.id, kind = %widget.kind, "Adding widget");
        state.widgets.push(widget);
        self.persist(&state);
        Ok(())
    }

    /// Removes the widget with `id`. Unknown ids are a no-op.
    pub fn remove(&self, id: &str) -> bool {
        let mut state = self.write();
        let Some(index) = state.position(id) else {
            return false;
        };
        state.widgets.remove(index);
        debug!(%id, "Removed widget");
        self.persist(&state);
        true
    }

    /// Merges `patch` into the widget with `id`. Returns false for unknown ids.
    pub fn update(&self, id: &str, patch: WidgetPatch) -> Result<bool, StoreError> {
        if let Some(interval) = patch.refresh_interval_ms {
            validate_interval(interval)?;
        }
        let mut state = self.write();
        let Some(widget) = state.widgets.iter_mut().find(|w| w.id == id) else {
            return Ok(false);
        };
        widget.apply_patch(patch);
        self.persist(&state);
        Ok(true)
    }

    /// Moves the widget at `from` so it ends up at `to`. An out of range
    /// `from` is a no-op; `to` is clamped to the last position.
    pub fn reorder(&self, from: usize, to: usize) -> bool {
        let mut state = self.write();
        if from >= state.widgets.len() {
            return false;
        }
        let widget = state.widgets.remove(from);
        let to = to.min(state.widgets.len());
        state.widgets.insert(to, widget);
        self.persist(&state);
        true
    }

    pub fn set_theme(&self, theme: Theme) {
        let mut state = self.write();
        state.theme = theme;
        self.persist(&state);
        self.theme.send_replace(theme);
    }

    pub fn toggle_theme(&self) -> Theme {
        let mut state = self.write();
        state.theme = state.theme.toggled();
        self.persist(&state);
        self.theme.send_replace(state.theme);
        state.theme
    }

    /// Serializes the layout and theme as pretty-printed JSON.
    pub fn export(&self) -> Result<String, StoreError> {
        let state = self.snapshot();
        Ok(serde_json::to_string_pretty(&state)?)
    }

    /// Replaces the layout and theme with an exported document. On a parse
    /// error nothing changes.
    pub fn import(&self, json: &str) -> Result<(), StoreError> {
        let document: ImportDocument = serde_json::from_str(json).map_err(|e| {
            error!("Failed to import dashboard: {}", e);
            StoreError::InvalidDocument(e)
        })?;
        let widgets = normalize_intervals(dedupe(document.widgets.unwrap_or_default()));
        let theme = document.theme.unwrap_or_default();

        let mut state = self.write();
        state.widgets = widgets;
        state.theme = theme;
        info!(widgets = state.widgets.len(), %theme, "Imported dashboard");
        self.persist(&state);
        self.theme.send_replace(theme);
        Ok(())
    }
}

fn validate_interval(interval: Option<u64>) -> Result<(), StoreError> {
    match interval {
        Some(ms) if ms < MIN_REFRESH_INTERVAL_MS => Err(StoreError::RefreshIntervalTooShort(ms)),
        _ => Ok(()),
    }
}

/// Documents written elsewhere may carry intervals `add` would reject. Zero
/// disables automatic refresh; anything else is raised to the minimum.
fn normalize_intervals(mut widgets: Vec<WidgetDefinition>) -> Vec<WidgetDefinition> {
    for widget in &mut widgets {
        widget.refresh_interval_ms = match widget.refresh_interval_ms {
            Some(0) => None,
            Some(ms) if ms < MIN_REFRESH_INTERVAL_MS => {
                warn!(id = %widget.id, ms, "Raising refresh interval to the minimum");
                Some(MIN_REFRESH_INTERVAL_MS)
            }
            other => other,
        };
    }
    widgets
}

/// Drops widgets whose id was already seen, keeping the first.
fn dedupe(widgets: Vec<WidgetDefinition>) -> Vec<WidgetDefinition> {
    let mut seen = HashSet::new();
    widgets
        .into_iter()
        .filter(|widget| {
            let first = seen.insert(widget.id.clone());
            if !first {
                warn!(id = %widget.id, "Dropping widget with duplicate id");
            }
            first
        })
        .collect()
}
