//! Pipeline configuration (§6): loaded from a TOML file, overridden by
//! environment variables, with flag > env > file > default resolution for
//! secrets. Mirrors `visigrid-config/src/settings.rs`'s load-with-fallback
//! shape and `fetch/common.rs::resolve_api_key`'s flag>env>error precedence.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CliError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Invoice<->Payment LOW-window lower bound, days before the invoice date.
    pub match_days_before: i64,
    /// Invoice<->Payment LOW-window upper bound, days after the invoice date.
    pub match_days_after: i64,
    /// Cross-currency amount tolerance, as a percent.
    pub usd_ars_tolerance_percent: f64,
    /// LLM calls allowed per minute, shared across the scan's work queue.
    pub gemini_rpm_limit: u32,
    /// Displacement cascade step bound (§4.10).
    pub max_cascade_depth: u32,
    /// Displacement cascade wall-clock bound, in milliseconds (§4.10).
    pub cascade_timeout_ms: u64,
    /// Document-store intake folder. For the bundled local backend this is
    /// a filesystem path; a cloud-backed `DocumentStore` would take a
    /// Drive folder ID here instead.
    pub drive_root_folder_id: String,
    /// Local backend: directory holding the ledger CSVs (one per sheet).
    pub ledger_dir: String,
    /// Vision-LLM endpoint (model URL, without the API key query param).
    pub gemini_endpoint: String,
    /// Vision-LLM API key. Resolved separately via `resolve_gemini_key` so
    /// it can come from `--gemini-api-key`/`GEMINI_API_KEY` without living
    /// in the config file.
    #[serde(skip)]
    pub gemini_api_key: Option<String>,
    /// Exchange-rate provider base URL (§6).
    pub exchange_rate_provider: String,
    /// Suppress `eprintln!` progress output.
    pub quiet: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            match_days_before: 10,
            match_days_after: 60,
            usd_ars_tolerance_percent: 5.0,
            gemini_rpm_limit: 150,
            max_cascade_depth: adva_recon::orchestrator::MAX_CASCADE_DEPTH,
            cascade_timeout_ms: adva_recon::orchestrator::CASCADE_TIMEOUT_MS,
            drive_root_folder_id: String::new(),
            ledger_dir: String::new(),
            gemini_endpoint: String::new(),
            gemini_api_key: None,
            exchange_rate_provider: String::new(),
            quiet: false,
        }
    }
}

impl PipelineConfig {
    /// Load from `path` if given, else `~/.config/adva/config.toml` if it
    /// exists, else defaults. A present-but-unparseable file is a hard
    /// error (`EXIT_CONFIG_INVALID`), not a silent fallback — unlike the
    /// GUI settings file, misconfigured credentials fail a batch job loudly.
    pub fn load(path: Option<&Path>) -> Result<Self, CliError> {
        let resolved = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let default_path = default_config_path();
                default_path.exists().then_some(default_path)
            }
        };

        match resolved {
            None => Ok(Self::default()),
            Some(p) => {
                let contents = fs::read_to_string(&p).map_err(|e| CliError::config(format!("cannot read config {}: {e}", p.display())))?;
                toml::from_str(&contents).map_err(|e| CliError::config(format!("invalid config {}: {e}", p.display())))
            }
        }
    }

    /// `--gemini-api-key` flag, then `GEMINI_API_KEY` env var, then error.
    pub fn resolve_gemini_key(&mut self, flag: Option<String>) -> Result<(), CliError> {
        if let Some(key) = flag {
            let trimmed = key.trim().to_string();
            if trimmed.is_empty() {
                return Err(CliError::missing_key("--gemini-api-key was empty"));
            }
            self.gemini_api_key = Some(trimmed);
            return Ok(());
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            let trimmed = key.trim().to_string();
            if !trimmed.is_empty() {
                self.gemini_api_key = Some(trimmed);
                return Ok(());
            }
        }
        Err(CliError::missing_key("missing Gemini API key (use --gemini-api-key or set GEMINI_API_KEY)")
            .with_hint("the document pipeline cannot classify or extract documents without a vision-LLM key"))
    }
}

fn default_config_path() -> std::path::PathBuf {
    dirs::config_dir().unwrap_or_else(|| std::path::PathBuf::from(".")).join("adva").join("config.toml")
}
