//! Router configuration document
//!
//! The claude-code-router `config.json` has two sections this tool manages
//! (`Router` and `Providers`) and any number it does not. The document keeps
//! the original top-level key layout so the unmanaged keys are written back
//! verbatim and in place.
//!
//! All queries and mutations here are pure in-memory operations.
//! [`ConfigStore`] wraps each one in a single load → mutate → save cycle.

use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod error;
mod provider;
mod router;
mod store;

pub use error::{DuplicateField, StoreError, StoreResult};
pub use provider::ProviderRecord;
pub use router::{Assignment, RouterSection, RouterType, Unassigned};
pub use store::ConfigStore;

/// Top-level key of the router section
pub const ROUTER_KEY: &str = "Router";
/// Top-level key of the provider list
pub const PROVIDERS_KEY: &str = "Providers";

// ─────────────────────────────────────────────────────────────────────────────
// Operation results
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of binding a router type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assigned {
    pub assignment: Assignment,
    pub threshold_removed: bool,
}

/// Outcome of deleting a model everywhere
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDeletion {
    /// Providers the model was removed from, in document order
    pub providers: Vec<String>,
    /// The model was the `longContext` one and the threshold was dropped
    pub threshold_removed: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Document
// ─────────────────────────────────────────────────────────────────────────────

/// Typed view of the configuration file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    router: RouterSection,
    providers: Vec<ProviderRecord>,
    /// Every top-level key in file order; managed sections are rewritten
    /// into their slots on serialization
    layout: Map<String, Value>,
}

impl ConfigDocument {
    /// Build from parsed JSON. Errors describe the shape problem.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(layout) = value else {
            return Err("top-level value must be a JSON object".to_string());
        };

        let router = match layout.get(ROUTER_KEY) {
            None | Some(Value::Null) => RouterSection::default(),
            Some(Value::Object(entries)) => RouterSection::from_map(entries.clone()),
            Some(_) => return Err(format!("'{}' must be an object", ROUTER_KEY)),
        };

        let providers = match layout.get(PROVIDERS_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(value @ Value::Array(_)) => serde_json::from_value(value.clone())
                .map_err(|e| format!("invalid '{}' entry: {}", PROVIDERS_KEY, e))?,
            Some(_) => return Err(format!("'{}' must be an array", PROVIDERS_KEY)),
        };

        Ok(Self {
            router,
            providers,
            layout,
        })
    }

    /// Serialize back to JSON, preserving key layout.
    ///
    /// A managed section absent from the original file is only introduced
    /// once it has content.
    pub fn to_value(&self) -> Value {
        let mut root = self.layout.clone();

        if root.contains_key(ROUTER_KEY) || !self.router.is_empty() {
            // serde_json serialization of these types cannot fail
            let router = serde_json::to_value(&self.router).unwrap_or(Value::Null);
            root.insert(ROUTER_KEY.to_string(), router);
        }
        if root.contains_key(PROVIDERS_KEY) || !self.providers.is_empty() {
            let providers = serde_json::to_value(&self.providers).unwrap_or(Value::Null);
            root.insert(PROVIDERS_KEY.to_string(), providers);
        }

        Value::Object(root)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Router section
    // ─────────────────────────────────────────────────────────────────────

    pub fn router(&self) -> &RouterSection {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut RouterSection {
        &mut self.router
    }

    #[allow(dead_code)] // Backs ConfigStore::set_router
    pub fn set_router(&mut self, router: RouterSection) {
        self.router = router;
    }

    /// Resolve user input into an assignment.
    ///
    /// `provider,model` is validated against the provider list. A bare model
    /// name resolves only when exactly one provider carries it.
    pub fn resolve_model_reference(&self, input: &str) -> StoreResult<Assignment> {
        if let Some(assignment) = Assignment::parse(input) {
            let provider = self
                .provider(&assignment.provider)
                .ok_or_else(|| StoreError::ProviderNotFound(assignment.provider.clone()))?;
            if !provider.has_model(&assignment.model) {
                return Err(StoreError::ModelNotFound {
                    model: assignment.model,
                    provider: Some(assignment.provider),
                });
            }
            return Ok(assignment);
        }

        let model = input.trim();
        let mut matches = self.providers_with_model(model);
        match matches.len() {
            0 => Err(StoreError::ModelNotFound {
                model: model.to_string(),
                provider: None,
            }),
            1 => Ok(Assignment::new(matches.remove(0), model)),
            _ => Err(StoreError::AmbiguousModelReference {
                model: model.to_string(),
                providers: matches,
            }),
        }
    }

    pub fn assign_router(&mut self, router_type: RouterType, input: &str) -> StoreResult<Assigned> {
        let assignment = self.resolve_model_reference(input)?;
        let threshold_removed = self.router.set_assignment(router_type, &assignment);
        Ok(Assigned {
            assignment,
            threshold_removed,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Providers
    // ─────────────────────────────────────────────────────────────────────

    pub fn providers(&self) -> &[ProviderRecord] {
        &self.providers
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderRecord> {
        self.providers.iter().find(|p| p.name == name)
    }

    fn provider_mut(&mut self, name: &str) -> StoreResult<&mut ProviderRecord> {
        self.providers
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| StoreError::ProviderNotFound(name.to_string()))
    }

    /// Append a provider; name and base URL must both be unused
    pub fn add_provider(&mut self, record: ProviderRecord) -> StoreResult<()> {
        for existing in &self.providers {
            if existing.name == record.name {
                return Err(StoreError::DuplicateProvider {
                    field: DuplicateField::Name,
                    value: record.name,
                });
            }
            if existing.api_base_url == record.api_base_url {
                return Err(StoreError::DuplicateProvider {
                    field: DuplicateField::BaseUrl,
                    value: record.api_base_url,
                });
            }
        }
        self.providers.push(record);
        Ok(())
    }

    /// Returns false when the model was already listed
    pub fn add_model_to_provider(&mut self, provider: &str, model: &str) -> StoreResult<bool> {
        Ok(self.provider_mut(provider)?.insert_model(model))
    }

    /// Remove one model from one provider only
    #[allow(dead_code)] // Backs ConfigStore::remove_model_from_provider
    pub fn remove_model_from_provider(&mut self, provider: &str, model: &str) -> StoreResult<()> {
        if self.provider_mut(provider)?.remove_model(model) {
            Ok(())
        } else {
            Err(StoreError::ModelNotFound {
                model: model.to_string(),
                provider: Some(provider.to_string()),
            })
        }
    }

    /// Remove a provider. Router assignments that reference it are left as is.
    pub fn delete_provider(&mut self, name: &str) -> StoreResult<ProviderRecord> {
        let index = self
            .providers
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| StoreError::ProviderNotFound(name.to_string()))?;
        Ok(self.providers.remove(index))
    }

    /// Remove a model from every provider that lists it
    pub fn delete_model(&mut self, model: &str) -> StoreResult<ModelDeletion> {
        let providers: Vec<String> = self
            .providers
            .iter_mut()
            .filter_map(|p| p.remove_model(model).then(|| p.name.clone()))
            .collect();

        if providers.is_empty() {
            return Err(StoreError::ModelNotFound {
                model: model.to_string(),
                provider: None,
            });
        }

        let threshold_removed =
            self.router.is_long_context_model(model) && self.router.remove_threshold();

        Ok(ModelDeletion {
            providers,
            threshold_removed,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Derived queries
    // ─────────────────────────────────────────────────────────────────────

    /// Provider name → models, in document order
    pub fn models_by_provider(&self) -> Vec<(String, Vec<String>)> {
        self.providers
            .iter()
            .map(|p| (p.name.clone(), p.models.clone()))
            .collect()
    }

    pub fn providers_with_model(&self, model: &str) -> Vec<String> {
        self.providers
            .iter()
            .filter(|p| p.has_model(model))
            .map(|p| p.name.clone())
            .collect()
    }

    #[allow(dead_code)] // Backs ConfigStore::provider_has_model
    pub fn provider_has_model(&self, provider: &str, model: &str) -> bool {
        self.provider(provider).is_some_and(|p| p.has_model(model))
    }
}
