//! Annotation persistence
//!
//! The anchoring engine never talks to storage; callers hand annotations to
//! an `AnnotationStore` and load them back before highlighting.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;

use super::types::{Annotation, AnnotationType};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid annotation file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Annotation {0} has no selectors")]
    EmptyTarget(String),
}

/// Query filters for listing annotations
#[derive(Debug, Default, Clone)]
pub struct AnnotationQuery {
    pub source: Option<String>,
    pub annotation_type: Option<AnnotationType>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AnnotationQuery {
    /// All annotations scoped to one source document
    pub fn for_source(source: &str) -> Self {
        Self {
            source: Some(source.to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, annotation: &Annotation) -> bool {
        self.source
            .as_deref()
            .map_or(true, |source| annotation.source() == source)
            && self
                .annotation_type
                .map_or(true, |kind| annotation.annotation_type == kind)
    }

    /// Filter, order (oldest first) and page a set of annotations
    fn apply<'a>(&self, annotations: impl Iterator<Item = &'a Annotation>) -> Vec<Annotation> {
        let mut found: Vec<&Annotation> = annotations.filter(|a| self.matches(a)).collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        found
            .into_iter()
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

/// Persistence collaborator for annotations
pub trait AnnotationStore {
    /// List annotations matching `query`, oldest first
    fn load(&self, query: &AnnotationQuery) -> Result<Vec<Annotation>, StoreError>;

    /// Insert or update an annotation; returns its id
    fn save(&mut self, annotation: Annotation) -> Result<String, StoreError>;

    /// Delete by id; returns whether an annotation was removed
    fn delete(&mut self, id: &str) -> Result<bool, StoreError>;

    /// Get an annotation by id
    fn get(&self, id: &str) -> Result<Option<Annotation>, StoreError> {
        Ok(self
            .load(&AnnotationQuery::default())?
            .into_iter()
            .find(|a| a.id == id))
    }
}

/// Only anchorable annotations are stored
fn check_target(annotation: &Annotation) -> Result<(), StoreError> {
    if annotation.target.is_anchorable() {
        Ok(())
    } else {
        Err(StoreError::EmptyTarget(annotation.id.clone()))
    }
}

/// Upsert into a vector, keeping the original creation time
fn upsert(annotations: &mut Vec<Annotation>, mut annotation: Annotation) -> String {
    let id = annotation.id.clone();
    match annotations.iter_mut().find(|a| a.id == id) {
        Some(existing) => {
            annotation.created_at = existing.created_at;
            annotation.updated_at = Utc::now();
            *existing = annotation;
        }
        None => annotations.push(annotation),
    }
    id
}

fn remove(annotations: &mut Vec<Annotation>, id: &str) -> bool {
    let before = annotations.len();
    annotations.retain(|a| a.id != id);
    annotations.len() != before
}

// ============================================
// In-memory store
// ============================================

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    annotations: Vec<Annotation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

impl AnnotationStore for MemoryStore {
    fn load(&self, query: &AnnotationQuery) -> Result<Vec<Annotation>, StoreError> {
        Ok(query.apply(self.annotations.iter()))
    }

    fn save(&mut self, annotation: Annotation) -> Result<String, StoreError> {
        check_target(&annotation)?;
        Ok(upsert(&mut self.annotations, annotation))
    }

    fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        Ok(remove(&mut self.annotations, id))
    }
}

// ============================================
// JSON file store
// ============================================

/// Annotations kept as a pretty-printed JSON array in one file
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    annotations: Vec<Annotation>,
}

impl JsonFileStore {
    /// Open a store file; a missing file is an empty store
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let annotations = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Vec::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        tracing::debug!("Opened annotation store {} ({} annotations)", path.display(), annotations.len());
        Ok(Self { path, annotations })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `annotations` to disk through a temp file
    fn flush(&self, annotations: &[Annotation]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(annotations)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl AnnotationStore for JsonFileStore {
    fn load(&self, query: &AnnotationQuery) -> Result<Vec<Annotation>, StoreError> {
        Ok(query.apply(self.annotations.iter()))
    }

    fn save(&mut self, annotation: Annotation) -> Result<String, StoreError> {
        check_target(&annotation)?;
        let mut next = self.annotations.clone();
        let id = upsert(&mut next, annotation);
        self.flush(&next)?;
        self.annotations = next;
        Ok(id)
    }

    fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let mut next = self.annotations.clone();
        if !remove(&mut next, id) {
            return Ok(false);
        }
        self.flush(&next)?;
        self.annotations = next;
        Ok(true)
    }
}
