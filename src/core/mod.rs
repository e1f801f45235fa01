//! Core dashboard abstractions

pub mod accessor;
pub mod cache;
pub mod config;
pub mod format;
pub mod log;
pub mod provider;
pub mod table;
pub mod widget;

// Re-export main types for cleaner imports
pub use provider::{ApiError, ApiResult, FinanceApi, FinanceProvider, Params};
pub use widget::{DashboardState, Theme, WidgetDefinition, WidgetKind, WidgetPatch};
