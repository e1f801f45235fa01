use super::ui;
use crate::store::DashboardStore;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn toggle_theme(store: &DashboardStore) {
    let theme = store.toggle_theme();
    println!("Theme set to {}", ui::style_text(&theme.to_string(), ui::StyleType::Label));
}

/// Writes the dashboard document to `output`, or stdout when absent.
pub fn export(store: &DashboardStore, output: Option<&Path>) -> Result<()> {
    let document = store.export()?;
    match output {
        Some(path) => {
            fs::write(path, &document)
                .with_context(|| format!("Failed to write dashboard to {}", path.display()))?;
            println!("Exported dashboard to {}", path.display());
        }
        None => println!("{document}"),
    }
    Ok(())
}

pub fn import(store: &DashboardStore, input: &Path) -> Result<()> {
    let document = fs::read_to_string(input)
        .with_context(|| format!("Failed to read dashboard from {}", input.display()))?;
    store
        .import(&document)
        .with_context(|| format!("Failed to import {}", input.display()))?;
    println!(
        "Imported {} widgets from {}",
        store.widgets().len(),
        input.display()
    );
    Ok(())
}
