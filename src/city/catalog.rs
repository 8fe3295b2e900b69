//! Archetype catalog - loads building templates from TOML content
//!
//! Content files hold an `[[archetypes]]` array. Archetypes are validated on
//! load and handed out as `Arc`s so instances can share them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;
use serde::Deserialize;
use thiserror::Error;

use crate::city::archetype::{Archetype, Classification};

/// Bundled starter content
const BUILTIN_ARCHETYPES: &str = include_str!("../../data/archetypes.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation errors: {}", .0.join(", "))]
    Validation(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct ContentFile {
    #[serde(default)]
    archetypes: Vec<Archetype>,
}

/// Registry of archetypes in load order
#[derive(Debug, Clone, Default)]
pub struct ArchetypeCatalog {
    archetypes: Vec<Arc<Archetype>>,
    by_id: AHashMap<String, usize>,
}

impl ArchetypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the bundled content
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::parse_toml(BUILTIN_ARCHETYPES)
    }

    /// Parse an archetype content document
    pub fn parse_toml(content: &str) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        catalog.extend_from_str(content)?;
        Ok(catalog)
    }

    pub fn load_from_toml(path: &Path) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        catalog.load_file(path)?;
        Ok(catalog)
    }

    /// Load every `.toml` file under `path`, recursively, in path order
    pub fn load_directory(path: &Path) -> Result<Self, CatalogError> {
        let mut files = Vec::new();
        collect_toml_files(path, &mut files)?;
        files.sort();

        let mut catalog = Self::new();
        for file in &files {
            catalog.load_file(file)?;
        }
        Ok(catalog)
    }

    /// Add the archetypes of one file; returns how many were added
    pub fn load_file(&mut self, path: &Path) -> Result<usize, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        self.extend_from_str(&content).map_err(|e| match e {
            CatalogError::Parse(msg) => CatalogError::Parse(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    fn extend_from_str(&mut self, content: &str) -> Result<usize, CatalogError> {
        let file: ContentFile =
            toml::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;

        let mut problems = Vec::new();
        for (idx, archetype) in file.archetypes.iter().enumerate() {
            problems.extend(archetype.validate());
            let clash = self.by_id.contains_key(&archetype.id)
                || file.archetypes[..idx].iter().any(|a| a.id == archetype.id);
            if clash {
                problems.push(format!("{}: duplicate archetype id", archetype.id));
            }
        }
        if !problems.is_empty() {
            return Err(CatalogError::Validation(problems));
        }

        let added = file.archetypes.len();
        for archetype in file.archetypes {
            self.insert(archetype);
        }
        Ok(added)
    }

    fn insert(&mut self, archetype: Archetype) {
        self.by_id.insert(archetype.id.clone(), self.archetypes.len());
        self.archetypes.push(Arc::new(archetype));
    }

    /// Register an archetype built in code
    pub fn add(&mut self, archetype: Archetype) -> Result<(), CatalogError> {
        let mut problems = archetype.validate();
        if self.by_id.contains_key(&archetype.id) {
            problems.push(format!("{}: duplicate archetype id", archetype.id));
        }
        if !problems.is_empty() {
            return Err(CatalogError::Validation(problems));
        }
        self.insert(archetype);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Archetype>> {
        self.by_id.get(id).map(|idx| Arc::clone(&self.archetypes[*idx]))
    }

    pub fn by_classification(
        &self,
        classification: Classification,
    ) -> impl Iterator<Item = &Arc<Archetype>> {
        self.archetypes
            .iter()
            .filter(move |a| a.classification == classification)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Archetype>> {
        self.archetypes.iter()
    }

    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }
}

fn collect_toml_files(path: &Path, out: &mut Vec<PathBuf>) -> Result<(), CatalogError> {
    for entry in std::fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_dir() {
            collect_toml_files(&entry_path, out)?;
        } else if entry_path.extension().map_or(false, |ext| ext == "toml") {
            out.push(entry_path);
        }
    }
    Ok(())
}
