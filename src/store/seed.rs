//! Catalog bootstrap: the built-in course list and YAML catalog imports.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::Store;
use crate::error::{Error, Result};
use crate::types::{NewCourse, NewExercise};

const DEFAULT_CATALOG: &str = include_str!("default_catalog.yaml");

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub courses: Vec<CatalogCourse>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogCourse {
    #[serde(flatten)]
    pub course: NewCourse,
    #[serde(default)]
    pub exercises: Vec<NewExercise>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub courses: usize,
    pub exercises: usize,
}

pub fn parse_catalog(yaml: &str) -> Result<CatalogFile> {
    let catalog: CatalogFile = serde_yaml::from_str(yaml)?;

    for entry in &catalog.courses {
        if entry.course.name.trim().is_empty() {
            return Err(Error::invalid("course name cannot be empty"));
        }
        if entry.course.price_cents < 0 {
            return Err(Error::invalid(format!(
                "course '{}' has a negative price",
                entry.course.name
            )));
        }
        if let Some(ex) = entry.exercises.iter().find(|e| e.title.trim().is_empty()) {
            return Err(Error::invalid(format!(
                "course '{}' has an exercise without a title (order {})",
                entry.course.name, ex.order
            )));
        }
    }

    Ok(catalog)
}

pub fn load_catalog_file(path: &Path) -> Result<CatalogFile> {
    let content = std::fs::read_to_string(path)?;
    parse_catalog(&content)
}

/// Imports every course of `catalog` atomically.
pub fn import_catalog(store: &dyn Store, catalog: &CatalogFile) -> Result<ImportSummary> {
    let summary = store.import_courses(&catalog.courses)?;

    for entry in &catalog.courses {
        info!(
            "Imported course '{}' with {} exercises",
            entry.course.name,
            entry.exercises.len()
        );
    }

    Ok(summary)
}

/// Inserts the built-in catalog when the store has no courses yet.
pub fn seed_default_catalog(store: &dyn Store) -> Result<Option<ImportSummary>> {
    if !store.list_courses()?.is_empty() {
        return Ok(None);
    }

    let catalog = parse_catalog(DEFAULT_CATALOG)?;
    import_catalog(store, &catalog).map(Some)
}
