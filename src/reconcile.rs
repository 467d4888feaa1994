//! Model list refresh (`ccs update`)
//!
//! For each provider the freshly fetched catalog is compared with the stored
//! model list. New models are added. Vanished ones are deleted from every
//! provider that lists them (the same global delete as `ccs delete model`),
//! except:
//! - an empty fetch changes nothing (a provider outage must not wipe models)
//! - a model referenced by any router assignment is never removed
//!
//! Each provider is persisted before the next one is fetched, so an
//! interrupted sweep keeps the providers already processed.

use std::collections::HashSet;

use crate::document::{ConfigStore, StoreResult};
use crate::probe::{EndpointProbe, HttpClient};

/// A model tagged with its owning provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderModel {
    pub provider: String,
    pub model: String,
}

impl ProviderModel {
    fn new(provider: &str, model: &str) -> Self {
        Self {
            provider: provider.to_string(),
            model: model.to_string(),
        }
    }
}

/// Aggregate outcome of a refresh across all providers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<ProviderModel>,
    pub removed: Vec<ProviderModel>,
    /// Unchanged, protected by a router assignment, or kept after an empty fetch
    pub retained: Vec<ProviderModel>,
    /// Providers whose fetch came back empty
    pub unreachable: Vec<String>,
    /// Fetch problems and per-model failures; none of them abort the sweep
    pub warnings: Vec<String>,
}

impl ReconcileReport {
    /// Retained models grouped by provider, in first-seen order
    pub fn retained_by_provider(&self) -> Vec<(String, Vec<String>)> {
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        for entry in &self.retained {
            match groups.iter_mut().find(|(p, _)| *p == entry.provider) {
                Some((_, models)) => models.push(entry.model.clone()),
                None => groups.push((entry.provider.clone(), vec![entry.model.clone()])),
            }
        }
        groups
    }
}

/// Refresh every provider's model list from its listing endpoint
pub fn reconcile<C: HttpClient>(
    store: &ConfigStore,
    probe: &EndpointProbe<C>,
) -> StoreResult<ReconcileReport> {
    let mut report = ReconcileReport::default();

    for provider in store.providers()? {
        tracing::info!(
            provider = %provider.name,
            url = %provider.api_base_url,
            "Fetching models"
        );

        let catalog = probe.fetch_model_catalog(&provider.api_base_url, provider.api_key.as_deref());
        report.warnings.extend(
            catalog
                .warnings
                .iter()
                .map(|w| format!("{}: {}", provider.name, w)),
        );

        let name = provider.name.as_str();
        if let Some(source) = &catalog.source {
            tracing::debug!(
                provider = %name,
                source = %source,
                count = catalog.models.len(),
                "Catalog fetched"
            );
        }
        if catalog.is_empty() {
            tracing::warn!(provider = %name, "No models fetched, keeping existing models");
            report.unreachable.push(name.to_string());
            // Re-read: an earlier provider's sweep may have deleted shared models
            let current = store.load()?;
            if let Some(current) = current.provider(name) {
                report
                    .retained
                    .extend(current.models.iter().map(|m| ProviderModel::new(name, m)));
            }
            continue;
        }

        store.update(|doc| {
            let Some(current) = doc.provider(name) else {
                return Ok(());
            };
            let stored: HashSet<&str> = current.models.iter().map(String::as_str).collect();
            let fetched: HashSet<&str> = catalog.models.iter().map(String::as_str).collect();

            let to_add: Vec<String> = catalog
                .models
                .iter()
                .filter(|m| !stored.contains(m.as_str()))
                .cloned()
                .collect();
            let to_remove: Vec<String> = current
                .models
                .iter()
                .filter(|m| !fetched.contains(m.as_str()))
                .cloned()
                .collect();
            report.retained.extend(
                current
                    .models
                    .iter()
                    .filter(|m| fetched.contains(m.as_str()))
                    .map(|m| ProviderModel::new(name, m)),
            );

            for model in &to_add {
                match doc.add_model_to_provider(name, model) {
                    Ok(_) => report.added.push(ProviderModel::new(name, model)),
                    Err(e) => report
                        .warnings
                        .push(format!("Error adding model {} to {}: {}", model, name, e)),
                }
            }

            // Taken after the additions, from the same in-memory document
            let referenced = doc.router().referenced_models();
            for model in &to_remove {
                if referenced.contains(model) {
                    tracing::debug!(provider = name, model = %model, "Model in use by router, keeping");
                    report.retained.push(ProviderModel::new(name, model));
                    continue;
                }
                // Deleted from every provider that lists it, with the threshold cascade
                match doc.delete_model(model) {
                    Ok(deletion) => {
                        tracing::debug!(model = %model, providers = ?deletion.providers, "Model deleted");
                        report.removed.push(ProviderModel::new(name, model));
                    }
                    Err(e) => report
                        .warnings
                        .push(format!("Error removing model {}: {}", model, e)),
                }
            }
            Ok(())
        })?;
    }

    tracing::info!(
        added = report.added.len(),
        removed = report.removed.len(),
        retained = report.retained.len(),
        "Update completed"
    );
    Ok(report)
}
