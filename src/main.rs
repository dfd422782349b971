//! Process wiring for a full batch run: read the configuration, discover
//! rule files per loadable kind, run the two-phase load and write the
//! resolved graph to the relational store.
//!
//! Discovery follows the rule tree convention: each loadable kind maps to
//! a subdirectory whose relative path is the kind name with underscores as
//! separators, and every `.txt` file in it is one document.

use std::fs;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rulegraph::error::{Result, RulegraphError};
use rulegraph::kinds::builtin_catalog;
use rulegraph::loader::Loader;
use rulegraph::persist::{PersistenceMode, Persistor};

#[derive(Deserialize)]
struct Settings {
    #[serde(default = "default_rules_dir")]
    rules_dir: String,
    // absent means an in-memory store, useful for dry runs
    #[serde(default)]
    database: Option<String>,
}

fn default_rules_dir() -> String {
    "rules".to_string()
}

fn load_settings() -> Result<Settings> {
    Config::builder()
        .add_source(File::with_name("rulegraph").required(false))
        .add_source(Environment::with_prefix("RULEGRAPH"))
        .build()
        .map_err(|e| RulegraphError::Config(e.to_string()))?
        .try_deserialize()
        .map_err(|e| RulegraphError::Config(e.to_string()))
}

// Every .txt file under directories whose relative path matches the kind.
fn discover(root: &Path, kind: &str) -> Vec<String> {
    let relative: PathBuf = kind.split('_').collect();
    let mut documents = Vec::new();
    walk(root, &relative, &mut documents);
    documents
}

fn walk(dir: &Path, relative: &Path, documents: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if path.ends_with(relative) {
            gather_files(&path, documents);
        } else {
            walk(&path, relative, documents);
        }
    }
}

fn gather_files(dir: &Path, documents: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "txt") {
            match fs::read_to_string(&path) {
                Ok(contents) => documents.push(contents),
                Err(e) => warn!(path = %path.display(), error = %e, "unreadable file"),
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings()?;
    let catalog = builtin_catalog();

    let mut loader = Loader::new(catalog.clone());
    for kind in catalog.kinds().iter().filter(|k| k.loadable()) {
        let documents = discover(Path::new(&settings.rules_dir), kind.name());
        info!(kind = kind.name(), files = documents.len(), "discovered");
        loader.instantiate(kind.name(), &documents)?;
    }
    loader.resolve()?;

    let mode = match settings.database {
        Some(path) => PersistenceMode::File(path),
        None => PersistenceMode::InMemory,
    };
    let mut persistor = Persistor::create(mode, loader.catalog())?;
    persistor.write_all(loader.catalog(), loader.registry())?;
    info!("load complete");
    Ok(())
}
