//! File-backed document store
//!
//! Every call loads the document fresh from disk. Mutating calls apply the
//! change to the in-memory copy and write once at the end, so a failing
//! operation leaves the file untouched. There is no locking: two concurrent
//! invocations race and the last write wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{
    Assigned, ConfigDocument, ModelDeletion, ProviderRecord, RouterSection, RouterType,
    StoreError, StoreResult, Unassigned,
};

/// Router configuration bound to a file path
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ─────────────────────────────────────────────────────────────────────
    // Load / save
    // ─────────────────────────────────────────────────────────────────────

    pub fn load(&self) -> StoreResult<ConfigDocument> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(self.path.clone()))
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let value = serde_json::from_str(&contents).map_err(|e| self.malformed(e.to_string()))?;
        let doc = ConfigDocument::from_value(value).map_err(|message| self.malformed(message))?;

        tracing::debug!(
            path = %self.path.display(),
            providers = doc.providers().len(),
            "Loaded router config"
        );
        Ok(doc)
    }

    /// Write the document with 2-space indentation, non-ASCII kept literal.
    /// Not atomic: a crash mid-write can truncate the file.
    pub fn save(&self, doc: &ConfigDocument) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io(source))?;
        }

        let mut json = serde_json::to_string_pretty(&doc.to_value())
            .map_err(|e| self.malformed(e.to_string()))?;
        json.push('\n');
        fs::write(&self.path, json).map_err(|source| self.io(source))?;

        tracing::debug!(path = %self.path.display(), "Saved router config");
        Ok(())
    }

    /// Load, apply `f`, and save only if `f` succeeds
    pub fn update<T>(
        &self,
        f: impl FnOnce(&mut ConfigDocument) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut doc = self.load()?;
        let out = f(&mut doc)?;
        self.save(&doc)?;
        Ok(out)
    }

    fn malformed(&self, message: String) -> StoreError {
        StoreError::MalformedDocument {
            path: self.path.clone(),
            message,
        }
    }

    fn io(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Router section
    // ─────────────────────────────────────────────────────────────────────

    pub fn router(&self) -> StoreResult<RouterSection> {
        Ok(self.load()?.router().clone())
    }

    /// Replace the router section wholesale; other sections are untouched
    #[allow(dead_code)] // Store API; commands edit single assignments instead
    pub fn set_router(&self, router: RouterSection) -> StoreResult<()> {
        self.update(|doc| {
            doc.set_router(router);
            Ok(())
        })
    }

    pub fn assign_router(&self, router_type: RouterType, input: &str) -> StoreResult<Assigned> {
        let assigned = self.update(|doc| doc.assign_router(router_type, input))?;
        tracing::info!(
            router = %router_type,
            assignment = %assigned.assignment,
            "Router assignment updated"
        );
        Ok(assigned)
    }

    /// Unset a router type. Nothing is written when it was not set.
    pub fn unassign_router(&self, router_type: RouterType) -> StoreResult<Unassigned> {
        let mut doc = self.load()?;
        let removed = doc.router_mut().remove_assignment(router_type)?;
        if removed.previous.is_some() {
            self.save(&doc)?;
        }
        Ok(removed)
    }

    pub fn set_long_context_threshold(&self, threshold: u64) -> StoreResult<()> {
        self.update(|doc| doc.router_mut().set_threshold(threshold))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Providers
    // ─────────────────────────────────────────────────────────────────────

    pub fn providers(&self) -> StoreResult<Vec<ProviderRecord>> {
        Ok(self.load()?.providers().to_vec())
    }

    pub fn add_provider(&self, record: ProviderRecord) -> StoreResult<()> {
        let name = record.name.clone();
        self.update(|doc| doc.add_provider(record))?;
        tracing::info!(provider = %name, "Provider added");
        Ok(())
    }

    /// Idempotent; returns false when the model was already listed
    pub fn add_model_to_provider(&self, provider: &str, model: &str) -> StoreResult<bool> {
        self.update(|doc| doc.add_model_to_provider(provider, model))
    }

    #[allow(dead_code)] // Store API; `update` deletes vanished models globally
    pub fn remove_model_from_provider(&self, provider: &str, model: &str) -> StoreResult<()> {
        self.update(|doc| doc.remove_model_from_provider(provider, model))
    }

    pub fn delete_provider(&self, name: &str) -> StoreResult<()> {
        self.update(|doc| doc.delete_provider(name).map(|_| ()))?;
        tracing::info!(provider = %name, "Provider deleted");
        Ok(())
    }

    pub fn delete_model(&self, model: &str) -> StoreResult<ModelDeletion> {
        self.update(|doc| doc.delete_model(model))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Derived queries
    // ─────────────────────────────────────────────────────────────────────

    pub fn models_by_provider(&self) -> StoreResult<Vec<(String, Vec<String>)>> {
        Ok(self.load()?.models_by_provider())
    }

    #[allow(dead_code)] // Store API; `change` resolves through the document
    pub fn providers_with_model(&self, model: &str) -> StoreResult<Vec<String>> {
        Ok(self.load()?.providers_with_model(model))
    }

    #[allow(dead_code)] // Store API; no command queries a single pair
    pub fn provider_has_model(&self, provider: &str, model: &str) -> StoreResult<bool> {
        Ok(self.load()?.provider_has_model(provider, model))
    }
}
