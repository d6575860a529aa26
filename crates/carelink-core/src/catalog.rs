//! JSON catalog loading.
//!
//! A catalog is either one JSON file holding an array of services or a
//! directory walked recursively for `*.json` files (each an array), read in
//! sorted path order.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::traits::CatalogSource;
use crate::types::Service;

pub struct JsonCatalog {
    path: PathBuf,
}

impl JsonCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn list_json_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut json_files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                json_files.push(path.to_path_buf());
            }
        }
        json_files.sort();
        json_files
    }

    fn read_file(&self, file_path: &Path) -> Result<Vec<Service>> {
        let raw = fs::read_to_string(file_path).with_context(|| format!("reading {}", file_path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", file_path.display()))
    }
}

impl CatalogSource for JsonCatalog {
    fn load_services(&self) -> Result<Vec<Service>> {
        let files = if self.path.is_dir() { self.list_json_files(&self.path) } else { vec![self.path.clone()] };
        let mut services = Vec::new();
        for file in &files {
            services.extend(self.read_file(file)?);
        }
        let services = dedup_and_report(services);
        info!(files = files.len(), services = services.len(), "catalog loaded from {}", self.path.display());
        Ok(services)
    }
}

/// A fixed, already-loaded catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    services: Vec<Service>,
}

impl StaticCatalog {
    pub fn new(services: Vec<Service>) -> Self {
        Self { services }
    }
}

impl CatalogSource for StaticCatalog {
    fn load_services(&self) -> Result<Vec<Service>> {
        Ok(dedup_and_report(self.services.clone()))
    }
}

/// Keeps the first service for each id and logs data-quality issues.
pub fn dedup_and_report(services: Vec<Service>) -> Vec<Service> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(services.len());
    for service in services {
        if !seen.insert(service.id.clone()) {
            warn!(id = %service.id, "duplicate service id; keeping first occurrence");
            continue;
        }
        for issue in service.validate() {
            warn!(id = %service.id, "catalog issue: {issue}");
        }
        out.push(service);
    }
    out
}
