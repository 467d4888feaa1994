//! Endpoint probing for OpenAI-compatible providers
//!
//! Two jobs, both over the `/models` listing endpoint:
//! - decide whether a provider's base URL should carry a `/v1` segment
//! - fetch the provider's current model catalog
//!
//! Both are heuristics. Any response other than 404 from a candidate path
//! (including 401/403) is taken as evidence the path exists. Callers treat
//! the result as best effort; an inconclusive probe never fails.

use serde_json::Value;
use std::collections::HashSet;

mod client;

pub use client::{BlockingHttpClient, HttpClient};
#[cfg(test)]
pub use client::{HttpResponse, TransportError};

// ─────────────────────────────────────────────────────────────────────────────
// URL shapes
// ─────────────────────────────────────────────────────────────────────────────

/// The two canonical forms of a base URL and their probe targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EndpointForms {
    /// Input with one trailing `/` stripped
    pub trimmed: String,
    /// Base URL keeping (or gaining) the `/v1` segment
    pub with_v1: String,
    /// Base URL with the `/v1` segment removed
    pub without_v1: String,
    /// `{stem}/v1/models`
    pub v1_models: String,
    /// `{stem}/models`
    pub bare_models: String,
}

impl EndpointForms {
    pub fn from_base(raw: &str) -> Self {
        let trimmed = raw.strip_suffix('/').unwrap_or(raw);

        let (stem, with_v1, without_v1) = if let Some(stem) = trimmed.strip_suffix("/v1") {
            (stem.to_string(), trimmed.to_string(), stem.to_string())
        } else if let Some(idx) = trimmed.find("/v1/") {
            // Path continues past the segment, e.g. `/v1/chat/completions`
            let stem = &trimmed[..idx];
            let rest = &trimmed[idx + "/v1".len()..];
            (stem.to_string(), trimmed.to_string(), format!("{}{}", stem, rest))
        } else {
            (
                trimmed.to_string(),
                format!("{}/v1", trimmed),
                trimmed.to_string(),
            )
        };

        Self {
            trimmed: trimmed.to_string(),
            with_v1,
            without_v1,
            v1_models: format!("{}/v1/models", stem),
            bare_models: format!("{}/models", stem),
        }
    }

    /// Listing endpoints in probe order
    pub fn model_urls(&self) -> [&str; 2] {
        [self.v1_models.as_str(), self.bare_models.as_str()]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Model catalog
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a catalog fetch. Empty `models` means nothing was fetched,
/// not that the provider has no models.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelCatalog {
    pub models: Vec<String>,
    /// Listing URL that produced `models`
    pub source: Option<String>,
    /// Per-candidate problems, in the order they happened
    pub warnings: Vec<String>,
}

impl ModelCatalog {
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Extract model names from a listing body.
///
/// Accepts `{"data": [{"id": ..}]}` (OpenAI), `{"models": [..]}` and a bare
/// array. Array items may be strings or objects carrying `id`/`name`.
/// Returns `None` for any other shape.
fn parse_model_list(body: &str) -> Option<Vec<String>> {
    let value: Value = serde_json::from_str(body).ok()?;

    let items = match &value {
        Value::Object(map) => match (map.get("data"), map.get("models")) {
            (Some(Value::Array(items)), _) => items,
            (_, Some(Value::Array(items))) => items,
            _ => return None,
        },
        Value::Array(items) => items,
        _ => return None,
    };

    let names = items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.clone()),
            Value::Object(obj) => obj
                .get("id")
                .or_else(|| obj.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect();
    Some(names)
}

/// Drop repeats, keeping first occurrence order
fn dedup(models: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    models
        .into_iter()
        .filter(|m| !m.is_empty() && seen.insert(m.clone()))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Probe
// ─────────────────────────────────────────────────────────────────────────────

/// Probes provider endpoints over an injected HTTP client
pub struct EndpointProbe<C> {
    client: C,
}

impl<C: HttpClient> EndpointProbe<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Unauthenticated existence check: 2xx or non-404 4xx means the path
    /// is there. 404, other statuses and transport errors do not.
    fn path_exists(&self, url: &str) -> bool {
        match self.client.get(url, None) {
            Ok(resp) => {
                let exists = (200..300).contains(&resp.status)
                    || ((400..500).contains(&resp.status) && resp.status != 404);
                tracing::debug!(url, status = resp.status, exists, "Probed endpoint");
                exists
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "Probe failed");
                false
            }
        }
    }

    /// Decide whether `raw` should be stored with or without `/v1`.
    ///
    /// Falls back to the trimmed input when neither listing path answers.
    pub fn resolve_base_url(&self, raw: &str) -> String {
        let forms = EndpointForms::from_base(raw);

        if self.path_exists(&forms.v1_models) {
            return forms.with_v1;
        }
        if self.path_exists(&forms.bare_models) {
            return forms.without_v1;
        }

        tracing::debug!(url = %forms.trimmed, "Endpoint shape inconclusive, keeping URL");
        forms.trimmed
    }

    /// Fetch the model list from `{base}/v1/models`, then `{base}/models`.
    ///
    /// The first candidate yielding a non-empty list wins. Exhausting both
    /// returns an empty catalog with the collected warnings.
    pub fn fetch_model_catalog(&self, base_url: &str, api_key: Option<&str>) -> ModelCatalog {
        let forms = EndpointForms::from_base(base_url);
        let bearer = api_key.filter(|k| !k.is_empty());
        let mut catalog = ModelCatalog::default();

        for url in forms.model_urls() {
            let resp = match self.client.get(url, bearer) {
                Ok(resp) => resp,
                Err(e) => {
                    catalog
                        .warnings
                        .push(format!("Failed to fetch models from {}: {}", url, e));
                    continue;
                }
            };

            match resp.status {
                200 => match parse_model_list(&resp.body) {
                    Some(models) if !models.is_empty() => {
                        catalog.models = dedup(models);
                        catalog.source = Some(url.to_string());
                        tracing::debug!(url, count = catalog.models.len(), "Fetched models");
                        return catalog;
                    }
                    Some(_) => {
                        tracing::debug!(url, "Listing returned no models");
                    }
                    None => catalog
                        .warnings
                        .push(format!("Unexpected response format from {}", url)),
                },
                401 => catalog
                    .warnings
                    .push(format!("Authentication required for {}", url)),
                404 => {}
                status => catalog
                    .warnings
                    .push(format!("HTTP {} from {}", status, url)),
            }
        }

        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Scripted client: unknown URLs fail at the transport level
    #[derive(Default)]
    struct FakeHttp {
        routes: HashMap<String, HttpResponse>,
        calls: RefCell<Vec<(String, Option<String>)>>,
    }

    impl FakeHttp {
        fn route(mut self, url: &str, status: u16, body: &str) -> Self {
            self.routes
                .insert(url.to_string(), HttpResponse::new(status, body));
            self
        }
    }

    impl HttpClient for FakeHttp {
        fn get(&self, url: &str, bearer: Option<&str>) -> Result<HttpResponse, TransportError> {
            self.calls
                .borrow_mut()
                .push((url.to_string(), bearer.map(str::to_string)));
            self.routes
                .get(url)
                .cloned()
                .ok_or_else(|| TransportError("connection refused".to_string()))
        }
    }

    fn urls(probe: &EndpointProbe<FakeHttp>) -> Vec<String> {
        probe.client.calls.borrow().iter().map(|(u, _)| u.clone()).collect()
    }

    #[test]
    fn test_forms_plain_url() {
        let forms = EndpointForms::from_base("http://x.com/");
        assert_eq!(forms.trimmed, "http://x.com");
        assert_eq!(forms.with_v1, "http://x.com/v1");
        assert_eq!(forms.without_v1, "http://x.com");
        assert_eq!(forms.model_urls(), ["http://x.com/v1/models", "http://x.com/models"]);
    }

    #[test]
    fn test_forms_trailing_v1() {
        let forms = EndpointForms::from_base("http://x.com/api/v1");
        assert_eq!(forms.with_v1, "http://x.com/api/v1");
        assert_eq!(forms.without_v1, "http://x.com/api");
        assert_eq!(
            forms.model_urls(),
            ["http://x.com/api/v1/models", "http://x.com/api/models"]
        );
    }

    #[test]
    fn test_forms_inner_v1_segment() {
        let forms = EndpointForms::from_base("https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(forms.with_v1, "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(forms.without_v1, "https://openrouter.ai/api/chat/completions");
        assert_eq!(forms.v1_models, "https://openrouter.ai/api/v1/models");
        assert_eq!(forms.bare_models, "https://openrouter.ai/api/models");
    }

    #[test]
    fn test_resolve_v1_success() {
        let probe = EndpointProbe::new(FakeHttp::default().route(
            "http://x.com/v1/models",
            200,
            "{}",
        ));
        assert_eq!(probe.resolve_base_url("http://x.com"), "http://x.com/v1");
        assert_eq!(urls(&probe), vec!["http://x.com/v1/models"]);
    }

    #[test]
    fn test_resolve_v1_auth_required_counts_as_present() {
        let probe = EndpointProbe::new(FakeHttp::default().route(
            "http://x.com/v1/models",
            401,
            "",
        ));
        assert_eq!(probe.resolve_base_url("http://x.com/"), "http://x.com/v1");
    }

    #[test]
    fn test_resolve_falls_back_to_bare() {
        let probe = EndpointProbe::new(
            FakeHttp::default()
                .route("http://x.com/v1/models", 404, "")
                .route("http://x.com/models", 200, "[]"),
        );
        assert_eq!(probe.resolve_base_url("http://x.com"), "http://x.com");
    }

    #[test]
    fn test_resolve_strips_v1_when_only_bare_answers() {
        let probe = EndpointProbe::new(FakeHttp::default().route(
            "http://x.com/models",
            403,
            "",
        ));
        assert_eq!(probe.resolve_base_url("http://x.com/v1/"), "http://x.com");
    }

    #[test]
    fn test_resolve_both_missing_keeps_input() {
        let probe = EndpointProbe::new(
            FakeHttp::default()
                .route("http://x.com/v1/models", 404, "")
                .route("http://x.com/models", 404, ""),
        );
        assert_eq!(probe.resolve_base_url("http://x.com"), "http://x.com");

        // Transport errors on both behave the same
        let probe = EndpointProbe::new(FakeHttp::default());
        assert_eq!(probe.resolve_base_url("http://x.com/"), "http://x.com");
        assert_eq!(urls(&probe).len(), 2);
    }

    #[test]
    fn test_probe_sends_no_auth() {
        let probe = EndpointProbe::new(FakeHttp::default());
        probe.resolve_base_url("http://x.com");
        assert!(probe.client.calls.borrow().iter().all(|(_, b)| b.is_none()));
    }

    #[test]
    fn test_fetch_openai_shape_with_bearer() {
        let probe = EndpointProbe::new(FakeHttp::default().route(
            "http://x.com/v1/models",
            200,
            r#"{"object":"list","data":[{"id":"gpt-a"},{"object":"model"},{"id":"gpt-b"},{"id":"gpt-a"}]}"#,
        ));
        let catalog = probe.fetch_model_catalog("http://x.com/v1", Some("sk-1"));
        assert_eq!(catalog.models, vec!["gpt-a", "gpt-b"]);
        assert_eq!(catalog.source.as_deref(), Some("http://x.com/v1/models"));
        assert!(catalog.warnings.is_empty());
        assert_eq!(
            probe.client.calls.borrow()[0],
            ("http://x.com/v1/models".to_string(), Some("sk-1".to_string()))
        );
    }

    #[test]
    fn test_fetch_models_key_and_bare_array() {
        let probe = EndpointProbe::new(FakeHttp::default().route(
            "http://x.com/v1/models",
            200,
            r#"{"models":["m1","m2"]}"#,
        ));
        assert_eq!(probe.fetch_model_catalog("http://x.com", None).models, vec!["m1", "m2"]);

        let probe = EndpointProbe::new(
            FakeHttp::default()
                .route("http://x.com/v1/models", 404, "")
                .route("http://x.com/models", 200, r#"["m3", {"name": "m4"}]"#),
        );
        let catalog = probe.fetch_model_catalog("http://x.com", None);
        assert_eq!(catalog.models, vec!["m3", "m4"]);
        assert_eq!(catalog.source.as_deref(), Some("http://x.com/models"));
    }

    #[test]
    fn test_fetch_unexpected_shape_warns() {
        let probe = EndpointProbe::new(
            FakeHttp::default()
                .route("http://x.com/v1/models", 200, r#"{"status":"ok"}"#)
                .route("http://x.com/models", 404, ""),
        );
        let catalog = probe.fetch_model_catalog("http://x.com", None);
        assert!(catalog.is_empty());
        assert_eq!(
            catalog.warnings,
            vec!["Unexpected response format from http://x.com/v1/models"]
        );
    }

    #[test]
    fn test_fetch_moves_past_auth_and_server_errors() {
        let probe = EndpointProbe::new(
            FakeHttp::default()
                .route("http://x.com/v1/models", 401, "")
                .route("http://x.com/models", 500, "boom"),
        );
        let catalog = probe.fetch_model_catalog("http://x.com", None);
        assert!(catalog.is_empty());
        assert_eq!(catalog.warnings.len(), 2);
        assert!(catalog.warnings[0].starts_with("Authentication required"));
        assert!(catalog.warnings[1].starts_with("HTTP 500"));
    }

    #[test]
    fn test_fetch_transport_failure_is_not_an_error() {
        let probe = EndpointProbe::new(FakeHttp::default());
        let catalog = probe.fetch_model_catalog("http://down.example", Some("k"));
        assert!(catalog.is_empty());
        assert_eq!(catalog.warnings.len(), 2);
        assert!(catalog.source.is_none());
    }
}
