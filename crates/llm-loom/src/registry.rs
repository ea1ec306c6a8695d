//! Schema registry: loads, validates, and caches provider schemas.
//!
//! Schemas are looked up by provider name, either through an explicit
//! registration (`name → path`) or by convention in a schema directory
//! (`<dir>/<name>.json`). Loaded schemas are validated once, cached, and
//! handed out as shared immutable [`Arc`] handles.
//!
//! The registry is an injected dependency, not a process-wide singleton:
//! construct one per application (or per test) and share it by `Arc`.
//!
//! # Example
//!
//! ```rust,no_run
//! use llm_loom::SchemaRegistry;
//!
//! let registry = SchemaRegistry::new("./schemas");
//! let schema = registry.load("claude").expect("schema present");
//! assert_eq!(schema.name(), "claude");
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::LoomError;
use crate::schema::ProviderSchema;

/// Loads and caches [`ProviderSchema`]s by provider name.
///
/// # Thread safety
///
/// Lookups are safe under concurrent readers; loads serialize on a short
/// write section. Published schemas are immutable, so readers hold them
/// without locks.
#[derive(Debug)]
pub struct SchemaRegistry {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    directory: Option<PathBuf>,
    registrations: HashMap<String, PathBuf>,
    cache: HashMap<String, Arc<ProviderSchema>>,
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }
}

impl SchemaRegistry {
    /// Creates a registry with a schema directory.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let registry = Self::default();
        registry.set_directory(directory);
        registry
    }

    /// Sets the fallback lookup directory.
    pub fn set_directory(&self, directory: impl Into<PathBuf>) -> &Self {
        let mut inner = self.inner.write().expect("schema registry lock poisoned");
        inner.directory = Some(directory.into());
        self
    }

    /// Associates an explicit schema file with a provider name,
    /// overriding directory lookup for that name.
    pub fn register(&self, name: impl Into<String>, path: impl Into<PathBuf>) -> &Self {
        let mut inner = self.inner.write().expect("schema registry lock poisoned");
        inner.registrations.insert(name.into(), path.into());
        self
    }

    /// Returns the names of all available providers: explicit
    /// registrations whose file exists, plus `*.json` files in the
    /// schema directory. Each name appears at most once.
    pub fn providers(&self) -> Vec<String> {
        let inner = self.inner.read().expect("schema registry lock poisoned");
        let mut names = Vec::new();

        for (name, path) in &inner.registrations {
            if path.is_file() {
                names.push(name.clone());
            }
        }

        if let Some(dir) = &inner.directory {
            if let Ok(entries) = std::fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_file() && path.extension().is_some_and(|e| e == "json") {
                        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                            if !names.iter().any(|n| n == stem) {
                                names.push(stem.to_string());
                            }
                        }
                    }
                }
            }
        }

        names.sort();
        names
    }

    /// Returns `true` if a schema file exists for `name`.
    pub fn is_available(&self, name: &str) -> bool {
        self.resolve(name).is_some_and(|p| p.is_file())
    }

    /// Loads the schema for `name`: resolve the path, read, parse,
    /// validate, cache. Subsequent calls return the cached handle.
    ///
    /// # Errors
    ///
    /// [`LoomError::Schema`] when the provider is unknown, the file is
    /// missing, or the document fails validation.
    pub fn load(&self, name: &str) -> Result<Arc<ProviderSchema>, LoomError> {
        {
            let inner = self.inner.read().expect("schema registry lock poisoned");
            if let Some(schema) = inner.cache.get(name) {
                return Ok(Arc::clone(schema));
            }
        }

        let path = self.resolve(name).ok_or_else(|| {
            LoomError::Schema(format!("no schema path known for provider '{name}'"))
        })?;
        if !path.is_file() {
            return Err(LoomError::Schema(format!(
                "schema file not found for provider '{name}' at {}",
                path.display()
            )));
        }

        let schema = Arc::new(ProviderSchema::from_file(&path)?);
        debug!(provider = name, path = %path.display(), "loaded provider schema");

        let mut inner = self.inner.write().expect("schema registry lock poisoned");
        // A racing loader may have published first; return its handle so
        // every caller observes one canonical Arc per provider.
        let entry = inner
            .cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::clone(&schema));
        Ok(Arc::clone(entry))
    }

    /// Resolves the schema path for `name`: registration first, then
    /// `<directory>/<name>.json`.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let inner = self.inner.read().expect("schema registry lock poisoned");
        if let Some(path) = inner.registrations.get(name) {
            return Some(path.clone());
        }
        inner
            .directory
            .as_ref()
            .map(|dir| dir.join(format!("{name}.json")))
    }
}

/// Convenience: load a schema straight from a file, bypassing the
/// registry. Useful for one-off contexts and tests.
pub fn load_schema_file(path: impl AsRef<Path>) -> Result<Arc<ProviderSchema>, LoomError> {
    Ok(Arc::new(ProviderSchema::from_file(path)?))
}
