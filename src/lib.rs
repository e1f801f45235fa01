pub mod cli;
pub mod core;
pub mod dashboard;
pub mod pipeline;
pub mod providers;
pub mod store;

use crate::cli::fields::FieldsOptions;
use crate::cli::show::ShowOptions;
use crate::cli::widgets::NewWidget;
use crate::core::config::AppConfig;
use crate::core::provider::FinanceProvider;
use crate::core::widget::WidgetPatch;
use crate::dashboard::Dashboard;
use crate::pipeline::WidgetPipeline;
use crate::providers::{AlphaVantageProvider, CachingProvider, ResponseCache};
use crate::store::disk::DiskStorage;
use crate::store::{DashboardStore, StateStorage};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Add(NewWidget),
    Remove {
        id: String,
    },
    Update {
        id: String,
        patch: WidgetPatch,
    },
    Move {
        from: usize,
        to: usize,
    },
    Theme,
    List,
    Export {
        output: Option<PathBuf>,
    },
    Import {
        input: PathBuf,
    },
    Fields {
        id: String,
        options: FieldsOptions,
    },
    Show(ShowOptions),
    Watch {
        options: ShowOptions,
        redraw: Duration,
        frames: Option<usize>,
    },
}

/// Wired-up application: configuration, cached finance client, dashboard
/// store and live dashboard.
pub struct App {
    dashboard: Dashboard,
}

impl App {
    pub fn new(config: &AppConfig, storage: Arc<dyn StateStorage>) -> Result<Self> {
        let cache = Arc::new(ResponseCache::new(config.cache_window()));
        let http_provider =
            AlphaVantageProvider::new(config.base_url(), config.api_key(), config.request_timeout())?;
        let provider: Arc<dyn FinanceProvider> =
            Arc::new(CachingProvider::new(http_provider, cache));

        let store = Arc::new(DashboardStore::load(storage));
        let pipeline = Arc::new(WidgetPipeline::new(provider));
        Ok(Self {
            dashboard: Dashboard::new(store, pipeline),
        })
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn store(&self) -> &DashboardStore {
        self.dashboard.store()
    }

    pub async fn run(&self, command: AppCommand) -> Result<()> {
        let store = self.store();
        match command {
            AppCommand::Add(new_widget) => cli::widgets::add(store, new_widget),
            AppCommand::Remove { id } => cli::widgets::remove(store, &id),
            AppCommand::Update { id, patch } => cli::widgets::update(store, &id, patch),
            AppCommand::Move { from, to } => cli::widgets::reorder(store, from, to),
            AppCommand::Theme => {
                cli::document::toggle_theme(store);
                Ok(())
            }
            AppCommand::List => {
                cli::widgets::list(store);
                Ok(())
            }
            AppCommand::Export { output } => cli::document::export(store, output.as_deref()),
            AppCommand::Import { input } => cli::document::import(store, &input),
            AppCommand::Fields { id, options } => {
                cli::fields::run(&self.dashboard, &id, options).await
            }
            AppCommand::Show(options) => cli::show::run(&self.dashboard, &options).await,
            AppCommand::Watch {
                options,
                redraw,
                frames,
            } => cli::watch::run(&self.dashboard, &options, redraw, frames).await,
        }
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Finboard starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(base_url = config.base_url(), "Loaded config");

    let storage = Arc::new(DiskStorage::open(&config.default_data_path()?.join("dashboard"))?);
    App::new(&config, storage)?.run(command).await
}
