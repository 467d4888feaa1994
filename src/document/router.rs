//! Router section: request-class assignments and the long-context threshold
//!
//! The section is stored as an ordered JSON object so keys this tool does
//! not know about (`image`, future router classes) survive a rewrite in
//! their original position. Typed access goes through [`RouterType`] and
//! [`Assignment`]; the `"provider,model"` string form only exists at the
//! storage boundary.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::error::{StoreError, StoreResult};

/// Sibling key of the assignments, not a router type
pub const LONG_CONTEXT_THRESHOLD: &str = "longContextThreshold";

// ─────────────────────────────────────────────────────────────────────────────
// Router Type
// ─────────────────────────────────────────────────────────────────────────────

/// Request class that can be bound to a provider+model pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouterType {
    Default,
    Background,
    Think,
    LongContext,
    WebSearch,
}

impl RouterType {
    /// Display order used by `show`
    pub const ALL: [RouterType; 5] = [
        Self::Default,
        Self::Background,
        Self::Think,
        Self::LongContext,
        Self::WebSearch,
    ];

    /// JSON key in the router section
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Background => "background",
            Self::Think => "think",
            Self::LongContext => "longContext",
            Self::WebSearch => "webSearch",
        }
    }

    /// `default` must always stay assigned
    pub fn is_removable(&self) -> bool {
        !matches!(self, Self::Default)
    }

    /// Comma-separated list of accepted names, for error hints
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(RouterType::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for RouterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouterType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| StoreError::InvalidRouterType(s.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Assignment
// ─────────────────────────────────────────────────────────────────────────────

/// A resolved `provider,model` binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub provider: String,
    pub model: String,
}

impl Assignment {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }

    /// Parse the stored string form, splitting on the last comma.
    ///
    /// Returns `None` when there is no comma; such a value names only a
    /// model (see [`referenced_model`]).
    pub fn parse(raw: &str) -> Option<Self> {
        let (provider, model) = raw.rsplit_once(',')?;
        Some(Self::new(provider.trim(), model.trim()))
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.provider, self.model)
    }
}

/// Model name referenced by a stored assignment string.
///
/// Everything after the last comma, or the whole string if there is none.
/// The single parser behind bare-model detection, the longContext cascade
/// and reconciliation's protected set.
pub fn referenced_model(raw: &str) -> &str {
    match raw.rsplit_once(',') {
        Some((_, model)) => model.trim(),
        None => raw.trim(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Router Section
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of removing a router assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unassigned {
    /// Raw value that was removed, `None` if the type was not set
    pub previous: Option<String>,
    /// Whether `longContextThreshold` was dropped along with it
    pub threshold_removed: bool,
}

/// Ordered `Router` mapping with typed accessors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouterSection {
    entries: Map<String, Value>,
}

impl RouterSection {
    pub fn from_map(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw stored string for a router type (non-string values read as unset)
    pub fn get(&self, router_type: RouterType) -> Option<&str> {
        self.entries.get(router_type.as_str()).and_then(Value::as_str)
    }

    /// Model currently referenced by `longContext`, if assigned
    pub fn long_context_model(&self) -> Option<&str> {
        self.get(RouterType::LongContext)
            .map(referenced_model)
            .filter(|m| !m.is_empty())
    }

    /// Whether `model` is the one `longContext` points at
    pub fn is_long_context_model(&self, model: &str) -> bool {
        self.long_context_model() == Some(model)
    }

    /// Bind a router type. Returns true if the threshold had to be dropped.
    ///
    /// Rebinding `longContext` to a different model invalidates the
    /// threshold; rebinding to the same model keeps it.
    pub fn set_assignment(&mut self, router_type: RouterType, assignment: &Assignment) -> bool {
        let threshold_removed = router_type == RouterType::LongContext
            && !self.is_long_context_model(&assignment.model)
            && self.remove_threshold();

        self.entries
            .insert(router_type.as_str().to_string(), Value::String(assignment.to_string()));
        threshold_removed
    }

    /// Unset a router type. `default` cannot be removed.
    pub fn remove_assignment(&mut self, router_type: RouterType) -> StoreResult<Unassigned> {
        if !router_type.is_removable() {
            return Err(StoreError::InvalidRouterType(format!(
                "{} (cannot be deleted)",
                router_type
            )));
        }

        let is_set = self.entries.contains_key(router_type.as_str());
        let threshold_removed =
            router_type == RouterType::LongContext && is_set && self.remove_threshold();

        let previous = self
            .entries
            .shift_remove(router_type.as_str())
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            });

        Ok(Unassigned {
            previous,
            threshold_removed,
        })
    }

    #[cfg(test)]
    pub fn threshold(&self) -> Option<u64> {
        self.entries.get(LONG_CONTEXT_THRESHOLD).and_then(Value::as_u64)
    }

    /// Raw threshold value for display, whatever its JSON type
    pub fn threshold_raw(&self) -> Option<&Value> {
        self.entries.get(LONG_CONTEXT_THRESHOLD)
    }

    /// Set the threshold; meaningless until `longContext` names a model
    pub fn set_threshold(&mut self, threshold: u64) -> StoreResult<()> {
        if self.long_context_model().is_none() {
            return Err(StoreError::PreconditionFailed(
                "longContext model must be set before setting longContextThreshold".to_string(),
            ));
        }
        self.entries
            .insert(LONG_CONTEXT_THRESHOLD.to_string(), Value::from(threshold));
        Ok(())
    }

    /// Drop the threshold. Returns true if it was present.
    pub fn remove_threshold(&mut self) -> bool {
        self.entries.shift_remove(LONG_CONTEXT_THRESHOLD).is_some()
    }

    /// Every model name referenced by any string-valued entry except the
    /// threshold. Passthrough keys (e.g. `image`) count too.
    pub fn referenced_models(&self) -> HashSet<String> {
        self.entries
            .iter()
            .filter(|(key, _)| key.as_str() != LONG_CONTEXT_THRESHOLD)
            .filter_map(|(_, value)| value.as_str())
            .map(referenced_model)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect()
    }
}
