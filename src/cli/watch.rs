use super::show::{ShowOptions, render_widget};
use super::ui;
use crate::dashboard::Dashboard;
use crate::pipeline::WidgetView;
use anyhow::Result;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info};

/// Keeps every widget refreshing on its own interval and redraws the
/// dashboard every `redraw` until interrupted, or after `max_frames` frames.
pub async fn run(
    dashboard: &Dashboard,
    options: &ShowOptions,
    redraw: Duration,
    max_frames: Option<usize>,
) -> Result<()> {
    let started = dashboard.sync();
    info!(started, "Watching dashboard");

    let mut theme_changes = dashboard.store().subscribe_theme();
    let mut ticker = interval(redraw);
    let mut configured = HashSet::new();
    let mut frames = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                break;
            }
            changed = theme_changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let theme = *theme_changes.borrow_and_update();
                debug!(%theme, "Theme changed");
            }
            _ = ticker.tick() => {}
        }

        draw(dashboard, options, &mut configured);
        frames += 1;
        if max_frames.is_some_and(|max| frames >= max) {
            break;
        }
    }

    dashboard.shutdown();
    Ok(())
}

fn draw(dashboard: &Dashboard, options: &ShowOptions, configured: &mut HashSet<String>) {
    let theme = dashboard.store().theme();
    let widgets = dashboard.store().widgets();

    let term = console::Term::stdout();
    if let Err(e) = term.clear_screen() {
        debug!("Failed to clear screen: {}", e);
    }

    if widgets.is_empty() {
        println!("No widgets on the dashboard. Add one with `finboard add`.");
        return;
    }

    for (i, widget) in widgets.iter().enumerate() {
        let view = dashboard.with_view_mut(&widget.id, |view| {
            apply_options_once(&widget.id, view, options, configured);
            view.clone()
        });
        render_widget(widget, &view, theme);
        if i < widgets.len() - 1 {
            ui::print_separator();
        }
    }
}

/// Applies the command line view options to a widget the first time it has
/// data, so a requested page is not clamped against an empty table.
fn apply_options_once(
    id: &str,
    view: &mut WidgetView,
    options: &ShowOptions,
    configured: &mut HashSet<String>,
) {
    let Some(data) = &view.data else {
        return;
    };
    if configured.insert(id.to_string()) {
        let rows = data.len();
        options.apply_to(&mut view.table, rows);
    }
}
