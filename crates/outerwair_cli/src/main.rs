//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `outerwair_core` linkage.
//! - Summarize a styler database for quick local sanity checks.
//!
//! Usage: `outerwair_cli [DB_PATH]`. Without a path, `OUTERWAIR_DB_PATH`
//! (or the default temp location) is inspected.

use outerwair_core::service::session::{load_base_avatar, load_current_look};
use outerwair_core::{CatalogStore, Category, ImageData, LayoutStore, StorageError, StylerConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> ExitCode {
    println!("outerwair_core ping={}", outerwair_core::ping());
    println!("outerwair_core version={}", outerwair_core::core_version());

    let mut config = StylerConfig::from_env();
    if let Some(path) = std::env::args_os().nth(1) {
        config.db_path = PathBuf::from(path);
    }
    for warning in &config.warnings {
        eprintln!("config warning: {warning}");
    }
    if let Err(err) = config.init_logging() {
        eprintln!("logging disabled: {err}");
    }

    match summarize(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("failed to open `{}`: {err}", config.db_path.display());
            ExitCode::FAILURE
        }
    }
}

fn summarize(config: &StylerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(config.open_store()?);
    println!("db_path={}", config.db_path.display());

    let catalog = CatalogStore::load(store.clone());
    report_warning("catalog", catalog.storage_warning.as_ref());
    println!("catalog_items={}", catalog.value.len());
    for category in Category::ALL {
        println!("  {}={}", category.label(), catalog.value.count_in(category));
    }

    let layout = LayoutStore::load(store.clone());
    report_warning("layout", layout.storage_warning.as_ref());
    println!("layout_overrides={}", layout.value.override_count());

    match load_base_avatar(&*store) {
        Ok(avatar) => println!("base_avatar={}", describe(avatar.as_ref())),
        Err(err) => report_warning("base_avatar", Some(&err)),
    }
    match load_current_look(&*store) {
        Ok(look) => println!("current_look={}", describe(look.as_ref())),
        Err(err) => report_warning("current_look", Some(&err)),
    }
    Ok(())
}

fn describe(image: Option<&ImageData>) -> String {
    match image {
        Some(image) => format!("{} ({} bytes)", image.mime_type(), image.len()),
        None => "none".to_string(),
    }
}

fn report_warning(area: &str, warning: Option<&StorageError>) {
    if let Some(err) = warning {
        eprintln!("{area} warning [{}]: {err}", err.code());
    }
}
