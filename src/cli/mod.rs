// CLI module - command-line argument parsing and handlers
//
// Each subcommand performs exactly one store operation against a freshly
// loaded document and renders the structured result:
// - ls / show: read-only views
// - change / set / add / delete: single read-modify-write
// - update: per-provider model refresh

mod table;

use crate::config::{Config, VERSION};
use crate::document::{ConfigStore, ProviderRecord, RouterType, StoreError};
use crate::probe::{EndpointProbe, HttpClient};
use crate::reconcile::{reconcile, ReconcileReport};
use crate::restart::run_restart_hook;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use table::Table;

/// Claude Code Router Switcher - Manage router configuration
#[derive(Parser, Debug)]
#[command(name = "ccs")]
#[command(version = VERSION)]
#[command(about = "Claude Code Router Switcher - Manage router configuration", long_about = None)]
pub struct Cli {
    /// Path to config file (default: ~/.claude-code-router/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all models grouped by provider
    Ls,

    /// Show current router configuration
    Show,

    /// Change a router configuration value
    Change {
        /// Type of router to change (default, background, think, longContext, webSearch)
        router_type: String,

        /// <provider>,<model> or just <model> (auto-detects provider if unique)
        model_value: String,

        /// Don't restart the CCR service after changing the configuration
        #[arg(long)]
        no_restart: bool,
    },

    /// Add provider or model
    Add {
        #[command(subcommand)]
        target: AddTarget,
    },

    /// Delete provider, model or router assignment
    Delete {
        #[command(subcommand)]
        target: DeleteTarget,
    },

    /// Set configuration values
    Set {
        #[command(subcommand)]
        target: SetTarget,
    },

    /// Update models from provider endpoints
    Update,
}

#[derive(Subcommand, Debug)]
pub enum AddTarget {
    /// Add a new provider
    Provider {
        /// Provider name
        #[arg(long)]
        name: String,

        /// API base URL
        #[arg(long)]
        base_url: String,

        /// API key (optional)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Add a model to a provider
    Model {
        /// Provider name
        provider: String,

        /// Model name to add
        model_name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DeleteTarget {
    /// Delete a provider
    Provider {
        provider_name: String,

        /// Auto-confirm deletion
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Delete a model from every provider
    Model {
        model_name: String,

        /// Auto-confirm deletion
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Delete/unset a router configuration (default cannot be deleted)
    Router {
        router_type: String,

        /// Auto-confirm deletion
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum SetTarget {
    /// Set the long context threshold
    #[command(name = "longContextThreshold")]
    LongContextThreshold {
        /// Threshold value as integer
        threshold: u64,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a command needs: the store, settings, the probe, and the
/// terminal streams (injected so handlers can be driven from tests)
pub struct Session<C, R, W> {
    pub store: ConfigStore,
    pub config: Config,
    pub probe: EndpointProbe<C>,
    pub input: R,
    pub out: W,
}

impl<C: HttpClient, R: BufRead, W: Write> Session<C, R, W> {
    pub fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Ls => self.list_models(),
            Commands::Show => self.show_config(),
            Commands::Change {
                router_type,
                model_value,
                no_restart,
            } => self.change_router(&router_type, &model_value, no_restart),
            Commands::Add { target } => match target {
                AddTarget::Provider {
                    name,
                    base_url,
                    api_key,
                } => self.add_provider(&name, &base_url, api_key),
                AddTarget::Model {
                    provider,
                    model_name,
                } => self.add_model(&provider, &model_name),
            },
            Commands::Delete { target } => match target {
                DeleteTarget::Provider { provider_name, yes } => {
                    self.delete_provider(&provider_name, yes)
                }
                DeleteTarget::Model { model_name, yes } => self.delete_model(&model_name, yes),
                DeleteTarget::Router { router_type, yes } => {
                    self.delete_router(&router_type, yes)
                }
            },
            Commands::Set { target } => match target {
                SetTarget::LongContextThreshold { threshold } => {
                    self.set_long_context_threshold(threshold)
                }
            },
            Commands::Update => self.update_models(),
        }
    }

    /// `ARE YOU SURE?! [y/N]` unless auto-confirmed. Only "y" proceeds.
    fn confirm(&mut self, auto_confirm: bool) -> Result<bool> {
        if auto_confirm {
            return Ok(true);
        }
        write!(self.out, "ARE YOU SURE?! [y/N]: ")?;
        self.out.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        if answer.trim().eq_ignore_ascii_case("y") {
            return Ok(true);
        }
        writeln!(self.out, "Deletion cancelled")?;
        Ok(false)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Views
    // ─────────────────────────────────────────────────────────────────────

    fn list_models(&mut self) -> Result<()> {
        let models_by_provider = self.store.models_by_provider()?;
        if models_by_provider.is_empty() {
            writeln!(self.out, "No providers or models found in config")?;
            return Ok(());
        }

        let mut table = Table::new("Available Models", &["Provider", "Models"]);
        for (provider, models) in models_by_provider {
            let models = if models.is_empty() {
                "No models".to_string()
            } else {
                models.join(", ")
            };
            table.add_row(vec![provider, models]);
        }
        table.render(&mut self.out)?;
        Ok(())
    }

    fn show_config(&mut self) -> Result<()> {
        let router = self.store.router()?;
        if router.is_empty() {
            writeln!(self.out, "No router configuration found")?;
            return Ok(());
        }

        let mut table = Table::new("Current Router Configuration", &["Type", "Value"]);
        for router_type in RouterType::ALL {
            let value = router.get(router_type).unwrap_or("Not set").to_string();
            table.add_row(vec![router_type.to_string(), value]);
        }
        let threshold = router
            .threshold_raw()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "Not set".to_string());
        table.add_row(vec!["longContextThreshold".to_string(), threshold]);
        table.render(&mut self.out)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Router assignments
    // ─────────────────────────────────────────────────────────────────────

    fn change_router(&mut self, router_type: &str, model_value: &str, no_restart: bool) -> Result<()> {
        let router_type: RouterType = router_type.parse().map_err(|e: StoreError| {
            anyhow::anyhow!("{}\nValid types: {}", e, RouterType::valid_names())
        })?;

        let assigned = match self.store.assign_router(router_type, model_value) {
            Ok(assigned) => assigned,
            Err(e) => {
                self.explain_reference_error(&e)?;
                return Err(e.into());
            }
        };

        writeln!(self.out, "Updated {} to: {}", router_type, assigned.assignment)?;
        if assigned.threshold_removed {
            writeln!(
                self.out,
                "Also removed longContextThreshold (longContext model changed)"
            )?;
        }

        if no_restart || !self.config.restart.enabled {
            writeln!(self.out, "Configuration updated without restarting CCR service")?;
        } else {
            let command = self.config.restart.command.join(" ");
            match run_restart_hook(&self.config.restart.command) {
                Ok(()) => {
                    writeln!(self.out, "Issued {} command", command)?;
                    writeln!(self.out, "ccr service was stopped so new model can activate")?;
                }
                // The config change is already committed
                Err(e) => {
                    tracing::warn!("Restart hook failed: {}", e);
                    writeln!(self.out, "Warning: {}", e)?;
                }
            }
        }

        if router_type == RouterType::LongContext {
            writeln!(self.out)?;
            writeln!(self.out, "Tip: Set longContextThreshold next to enable:")?;
            writeln!(self.out, "  ccs set longContextThreshold <integer>")?;
        }
        Ok(())
    }

    /// Hints printed before a failed model reference is returned
    fn explain_reference_error(&mut self, err: &StoreError) -> Result<()> {
        match err {
            StoreError::AmbiguousModelReference { model, .. } => {
                writeln!(self.out, "Please specify provider explicitly: <provider>,{}", model)?;
            }
            StoreError::ModelNotFound { .. } | StoreError::ProviderNotFound(_) => {}
            _ => return Ok(()),
        }
        writeln!(self.out)?;
        self.list_models()
    }

    fn delete_router(&mut self, router_type: &str, yes: bool) -> Result<()> {
        let router_type: RouterType = router_type.parse().map_err(|e: StoreError| {
            anyhow::anyhow!("{}\nValid types: {}", e, RouterType::valid_names())
        })?;
        if !router_type.is_removable() {
            let err = StoreError::InvalidRouterType(router_type.to_string());
            return Err(anyhow::anyhow!("{}\nNote: 'default' cannot be deleted", err));
        }

        if !self.confirm(yes)? {
            return Ok(());
        }

        let removed = self.store.unassign_router(router_type)?;
        if removed.previous.is_none() {
            writeln!(self.out, "Router '{}' is not set", router_type)?;
            return Ok(());
        }
        writeln!(self.out, "Deleted router: {}", router_type)?;
        if removed.threshold_removed {
            writeln!(self.out, "Also removed longContextThreshold")?;
        }
        Ok(())
    }

    fn set_long_context_threshold(&mut self, threshold: u64) -> Result<()> {
        if let Err(e) = self.store.set_long_context_threshold(threshold) {
            if matches!(e, StoreError::PreconditionFailed(_)) {
                writeln!(
                    self.out,
                    "Use 'ccs change longContext <provider>,<model>' to set it first"
                )?;
            }
            return Err(e.into());
        }
        writeln!(self.out, "Updated longContextThreshold to: {}", threshold)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Providers and models
    // ─────────────────────────────────────────────────────────────────────

    fn add_provider(&mut self, name: &str, base_url: &str, api_key: Option<String>) -> Result<()> {
        let resolved = self.probe.resolve_base_url(base_url);
        let record = ProviderRecord::new(name, resolved.as_str()).with_api_key(api_key);
        self.store.add_provider(record)?;

        if resolved != base_url {
            writeln!(
                self.out,
                "Added provider: {} (base URL adjusted to: {})",
                name, resolved
            )?;
        } else {
            writeln!(self.out, "Added provider: {}", name)?;
        }
        writeln!(self.out, "Tip: Run 'ccs update' to fetch models from the new provider")?;
        Ok(())
    }

    fn add_model(&mut self, provider: &str, model_name: &str) -> Result<()> {
        if self.store.add_model_to_provider(provider, model_name)? {
            writeln!(self.out, "Added model '{}' to provider '{}'", model_name, provider)?;
        } else {
            writeln!(
                self.out,
                "Model '{}' already present in provider '{}'",
                model_name, provider
            )?;
        }
        Ok(())
    }

    fn delete_provider(&mut self, name: &str, yes: bool) -> Result<()> {
        if !self.confirm(yes)? {
            return Ok(());
        }
        self.store.delete_provider(name)?;
        writeln!(self.out, "Deleted provider: {}", name)?;
        Ok(())
    }

    fn delete_model(&mut self, model_name: &str, yes: bool) -> Result<()> {
        if !self.confirm(yes)? {
            return Ok(());
        }
        let deletion = self.store.delete_model(model_name)?;
        writeln!(self.out, "Deleted model: {}", model_name)?;
        if deletion.threshold_removed {
            writeln!(
                self.out,
                "Also removed longContextThreshold (longContext model was deleted)"
            )?;
        }
        Ok(())
    }

    fn update_models(&mut self) -> Result<()> {
        if self.store.providers()?.is_empty() {
            writeln!(self.out, "No providers found in config")?;
            return Ok(());
        }

        let report = reconcile(&self.store, &self.probe)?;
        self.render_report(&report)
    }

    fn render_report(&mut self, report: &ReconcileReport) -> Result<()> {
        for warning in &report.warnings {
            writeln!(self.out, "Warning: {}", warning)?;
        }
        for provider in &report.unreachable {
            writeln!(
                self.out,
                "No models fetched from {}. Keeping existing models.",
                provider
            )?;
        }

        writeln!(self.out)?;
        writeln!(self.out, "Update completed!")?;

        if !report.added.is_empty() {
            writeln!(self.out)?;
            writeln!(self.out, "Added {} model(s):", report.added.len())?;
            for entry in &report.added {
                writeln!(self.out, "  • {}: {}", entry.provider, entry.model)?;
            }
        }
        if !report.removed.is_empty() {
            writeln!(self.out)?;
            writeln!(self.out, "Removed {} model(s):", report.removed.len())?;
            for entry in &report.removed {
                writeln!(self.out, "  • {}: {}", entry.provider, entry.model)?;
            }
        }
        if !report.retained.is_empty() {
            writeln!(self.out)?;
            writeln!(self.out, "Retained {} model(s):", report.retained.len())?;
            for (provider, models) in report.retained_by_provider() {
                writeln!(self.out, "  • {}: {}", provider, models.join(", "))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RestartConfig;
    use crate::probe::{HttpResponse, TransportError};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeHttp(HashMap<String, HttpResponse>);

    impl HttpClient for FakeHttp {
        fn get(&self, url: &str, _bearer: Option<&str>) -> Result<HttpResponse, TransportError> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| TransportError("unreachable".to_string()))
        }
    }

    struct Harness {
        _dir: TempDir,
        session: Session<FakeHttp, Cursor<Vec<u8>>, Vec<u8>>,
    }

    impl Harness {
        fn new(doc: Value, http: FakeHttp, stdin: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("config.json");
            fs::write(&path, doc.to_string()).unwrap();

            let config = Config {
                document_path: path.clone(),
                restart: RestartConfig {
                    enabled: false,
                    ..Default::default()
                },
                ..Default::default()
            };
            let session = Session {
                store: ConfigStore::new(path),
                config,
                probe: EndpointProbe::new(http),
                input: Cursor::new(stdin.as_bytes().to_vec()),
                out: Vec::new(),
            };
            Self { _dir: dir, session }
        }

        fn run(&mut self, args: &[&str]) -> Result<()> {
            let cli = Cli::try_parse_from(std::iter::once("ccs").chain(args.iter().copied()))
                .expect("arguments should parse");
            self.session.run(cli.command)
        }

        fn output(&self) -> String {
            String::from_utf8(self.session.out.clone()).unwrap()
        }

        fn saved(&self) -> Value {
            let text = fs::read_to_string(self.session.store.path()).unwrap();
            serde_json::from_str(&text).unwrap()
        }
    }

    fn sample() -> Value {
        json!({
            "Providers": [
                {"name": "p1", "api_base_url": "http://p1", "models": ["m1", "m2"]},
                {"name": "p2", "api_base_url": "http://p2", "models": ["m2", "m3"]}
            ],
            "Router": {"default": "p1,m1"}
        })
    }

    #[test]
    fn test_ls_lists_models() {
        let mut h = Harness::new(sample(), FakeHttp::default(), "");
        h.run(&["ls"]).unwrap();
        let out = h.output();
        assert!(out.starts_with("Available Models\n"));
        assert!(out.contains("p1       │ m1, m2"));
        assert!(out.contains("p2       │ m2, m3"));
    }

    #[test]
    fn test_show_marks_unset() {
        let mut h = Harness::new(sample(), FakeHttp::default(), "");
        h.run(&["show"]).unwrap();
        let out = h.output();
        assert!(out.contains("default              │ p1,m1"));
        assert!(out.contains("webSearch            │ Not set"));
        assert!(out.contains("longContextThreshold │ Not set"));
    }

    #[test]
    fn test_change_with_bare_model() {
        let mut h = Harness::new(sample(), FakeHttp::default(), "");
        h.run(&["change", "think", "m3"]).unwrap();
        assert!(h.output().contains("Updated think to: p2,m3"));
        assert_eq!(h.saved()["Router"]["think"], "p2,m3");
    }

    #[test]
    fn test_change_ambiguous_model_fails() {
        let mut h = Harness::new(sample(), FakeHttp::default(), "");
        let err = h.run(&["change", "background", "m2"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::AmbiguousModelReference { .. })
        ));
        assert!(h.output().contains("Please specify provider explicitly: <provider>,m2"));
        assert!(h.saved()["Router"].get("background").is_none());
    }

    #[test]
    fn test_change_invalid_router_type() {
        let mut h = Harness::new(sample(), FakeHttp::default(), "");
        let err = h.run(&["change", "image", "m1"]).unwrap_err();
        assert!(err.to_string().contains("Invalid router type: image"));
    }

    #[test]
    fn test_change_long_context_prints_tip() {
        let mut h = Harness::new(sample(), FakeHttp::default(), "");
        h.run(&["change", "longContext", "p1,m2", "--no-restart"]).unwrap();
        let out = h.output();
        assert!(out.contains("Configuration updated without restarting CCR service"));
        assert!(out.contains("ccs set longContextThreshold <integer>"));
    }

    #[test]
    fn test_threshold_requires_long_context() {
        let mut h = Harness::new(sample(), FakeHttp::default(), "");
        let err = h.run(&["set", "longContextThreshold", "60000"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::PreconditionFailed(_))
        ));

        h.run(&["change", "longContext", "m3"]).unwrap();
        h.run(&["set", "longContextThreshold", "60000"]).unwrap();
        assert_eq!(h.saved()["Router"]["longContextThreshold"], 60000);
    }

    #[test]
    fn test_add_provider_adjusts_base_url() {
        let mut http = FakeHttp::default();
        http.0.insert(
            "http://new.example/v1/models".to_string(),
            HttpResponse::new(401, ""),
        );
        let mut h = Harness::new(sample(), http, "");
        h.run(&["add", "provider", "--name", "new", "--base-url", "http://new.example/"])
            .unwrap();
        assert!(h
            .output()
            .contains("Added provider: new (base URL adjusted to: http://new.example/v1)"));

        let saved = h.saved();
        let added = &saved["Providers"][2];
        assert_eq!(added["api_base_url"], "http://new.example/v1");
        assert!(added.get("api_key").is_none());
    }

    #[test]
    fn test_add_provider_duplicate_rejected() {
        let mut h = Harness::new(sample(), FakeHttp::default(), "");
        let err = h
            .run(&["add", "provider", "--name", "p1", "--base-url", "http://other", "--api-key", "k"])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::DuplicateProvider { .. })
        ));
    }

    #[test]
    fn test_delete_cancelled_without_yes() {
        let mut h = Harness::new(sample(), FakeHttp::default(), "n\n");
        h.run(&["delete", "provider", "p1"]).unwrap();
        assert!(h.output().contains("Deletion cancelled"));
        assert_eq!(h.saved()["Providers"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_delete_confirmed_by_prompt() {
        let mut h = Harness::new(sample(), FakeHttp::default(), "y\n");
        h.run(&["delete", "model", "m2"]).unwrap();
        assert!(h.output().contains("Deleted model: m2"));
        assert_eq!(h.saved()["Providers"][0]["models"], json!(["m1"]));
        assert_eq!(h.saved()["Providers"][1]["models"], json!(["m3"]));
    }

    #[test]
    fn test_delete_default_router_rejected() {
        let mut h = Harness::new(sample(), FakeHttp::default(), "");
        let err = h.run(&["delete", "router", "default", "-y"]).unwrap_err();
        assert!(err.to_string().contains("'default' cannot be deleted"));
    }

    #[test]
    fn test_delete_router_not_set() {
        let mut h = Harness::new(sample(), FakeHttp::default(), "");
        h.run(&["delete", "router", "webSearch", "--yes"]).unwrap();
        assert!(h.output().contains("Router 'webSearch' is not set"));
    }

    #[test]
    fn test_update_reports_partition() {
        let mut http = FakeHttp::default();
        http.0.insert(
            "http://p1/v1/models".to_string(),
            HttpResponse::new(200, r#"{"data":[{"id":"m1"},{"id":"m4"}]}"#),
        );
        let mut h = Harness::new(sample(), http, "");
        h.run(&["update"]).unwrap();

        let out = h.output();
        assert!(out.contains("Added 1 model(s):\n  • p1: m4"));
        assert!(out.contains("Removed 1 model(s):\n  • p1: m2"));
        assert!(out.contains("No models fetched from p2. Keeping existing models."));
        // m2 vanished from p1, so it is deleted from p2 as well
        assert!(out.contains("  • p2: m3"));
        assert_eq!(h.saved()["Providers"][0]["models"], json!(["m1", "m4"]));
        assert_eq!(h.saved()["Providers"][1]["models"], json!(["m3"]));
    }

    #[test]
    fn test_missing_document_is_error() {
        let mut h = Harness::new(sample(), FakeHttp::default(), "");
        fs::remove_file(h.session.store.path()).unwrap();
        let err = h.run(&["ls"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound(_))
        ));
    }
}
