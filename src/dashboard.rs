//! Live dashboard: widget definitions from the store, their fetched data,
//! and the timers that keep it fresh.

use crate::core::widget::WidgetPatch;
use crate::pipeline::scheduler::RefreshScheduler;
use crate::pipeline::{WidgetPipeline, WidgetView};
use crate::store::DashboardStore;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

type Views = Arc<RwLock<HashMap<String, WidgetView>>>;

pub struct Dashboard {
    store: Arc<DashboardStore>,
    pipeline: Arc<WidgetPipeline>,
    views: Views,
    scheduler: RefreshScheduler,
}

impl Dashboard {
    pub fn new(store: Arc<DashboardStore>, pipeline: Arc<WidgetPipeline>) -> Self {
        Self {
            store,
            pipeline,
            views: Arc::new(RwLock::new(HashMap::new())),
            scheduler: RefreshScheduler::new(),
        }
    }

    pub fn store(&self) -> &Arc<DashboardStore> {
        &self.store
    }

    pub fn pipeline(&self) -> &Arc<WidgetPipeline> {
        &self.pipeline
    }

    /// Fetches data for one widget now. Returns its view afterwards, or
    /// `None` if the widget does not exist.
    pub async fn refresh(&self, id: &str) -> Option<WidgetView> {
        refresh_widget(&self.store, &self.pipeline, &self.views, id).await;
        self.view(id)
    }

    /// Fetches every widget concurrently.
    pub async fn refresh_all(&self) {
        let widgets = self.store.widgets();
        join_all(
            widgets
                .iter()
                .map(|w| refresh_widget(&self.store, &self.pipeline, &self.views, &w.id)),
        )
        .await;
    }

    /// Reconciles background refresh tasks with the current widget list:
    /// new widgets start loading, removed ones stop, and widgets whose
    /// fetch inputs changed are restarted. Returns the number of tasks
    /// started.
    pub fn sync(&self) -> usize {
        let widgets = self.store.widgets();
        let ids: HashSet<&str> = widgets.iter().map(|w| w.id.as_str()).collect();

        self.scheduler.retain(|id| ids.contains(id));
        self.views
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|id, _| ids.contains(id.as_str()));

        let mut started = 0;
        for widget in &widgets {
            let period = widget.refresh_interval_ms.map(Duration::from_millis);
            let job = {
                let store = Arc::clone(&self.store);
                let pipeline = Arc::clone(&self.pipeline);
                let views = Arc::clone(&self.views);
                let id = widget.id.clone();
                move || {
                    let store = Arc::clone(&store);
                    let pipeline = Arc::clone(&pipeline);
                    let views = Arc::clone(&views);
                    let id = id.clone();
                    async move { refresh_widget(&store, &pipeline, &views, &id).await }
                }
            };
            if self
                .scheduler
                .schedule(&widget.id, widget.refresh_fingerprint(), period, job)
            {
                started += 1;
            }
        }
        debug!(started, widgets = widgets.len(), "Synced refresh tasks");
        started
    }

    pub fn view(&self, id: &str) -> Option<WidgetView> {
        self.views
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Runs `f` on the view of `id`, creating an empty view if needed.
    /// Used to adjust table criteria between renders.
    pub fn with_view_mut<R>(&self, id: &str, f: impl FnOnce(&mut WidgetView) -> R) -> R {
        let mut views = self.views.write().unwrap_or_else(PoisonError::into_inner);
        f(views.entry(id.to_string()).or_default())
    }

    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}

async fn refresh_widget(
    store: &DashboardStore,
    pipeline: &WidgetPipeline,
    views: &RwLock<HashMap<String, WidgetView>>,
    id: &str,
) {
    let Some(widget) = store.widget(id) else {
        debug!(%id, "Skipping refresh of unknown widget");
        return;
    };

    let result = pipeline.load(&widget).await;

    // The widget may have been removed while the request was in flight
    if store.widget(id).is_none() {
        debug!(%id, "Discarding data for removed widget");
        return;
    }

    let data = match result {
        Ok(load) => {
            if !load.payload.is_null() {
                if let Err(e) = store.update(id, WidgetPatch::payload(load.payload)) {
                    warn!(%id, error = %e, "Failed to record widget payload");
                }
            }
            Ok(load.data)
        }
        Err(e) => {
            warn!(%id, error = %e, "Widget refresh failed");
            Err(e)
        }
    };

    views
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(id.to_string())
        .or_default()
        .apply(data);
}
