//! `adva scan` (§11): run every file in the intake folder through the
//! document pipeline, bounded by a `WorkQueue`, and report a `ScanSummary`.
//! Grounded in `parse/statement_pdf.rs`'s sequential fetch->parse->write
//! shape per file, fanned out across workers the way §4.3 specifies.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use adva_core::rate_limiter::RateLimiter;
use adva_core::work_queue::WorkQueue;
use adva_llm::LlmGateway;
use adva_pipeline::{DocumentPipeline, Outcome};
use adva_store::document_store::DocumentStore;
use adva_store::tabular_store::TabularStore;
use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::CliError;

const DEFAULT_PARALLELISM: usize = 4;

#[derive(Debug, Default, Serialize)]
pub struct ScanSummary {
    pub files_processed: usize,
    pub added: BTreeMap<String, usize>,
    pub sin_procesar: usize,
    pub errors: usize,
    pub duration_ms: u64,
}

impl ScanSummary {
    fn record(&mut self, outcome: &Outcome) {
        self.files_processed += 1;
        match outcome {
            Outcome::Persisted { direction, .. } => {
                *self.added.entry(direction.to_string()).or_insert(0) += 1;
            }
            Outcome::SinProcesar { .. } => self.sin_procesar += 1,
            Outcome::Error { .. } => self.errors += 1,
        }
    }

    pub fn print_human(&self) {
        println!("files processed: {}", self.files_processed);
        for (direction, count) in &self.added {
            println!("  {direction}: {count}");
        }
        println!("sin_procesar: {}", self.sin_procesar);
        println!("errors: {}", self.errors);
        println!("duration: {}ms", self.duration_ms);
    }

    pub fn print_json(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{json}");
        }
    }
}

pub fn cmd_scan(config: &PipelineConfig, json: bool) -> Result<ScanSummary, CliError> {
    let store: Arc<dyn DocumentStore> = Arc::new(crate::local_store::FilesystemDocumentStore::new(&config.drive_root_folder_id));
    let sheets: Arc<dyn TabularStore> = Arc::new(crate::local_store::CsvTabularStore::new(&config.ledger_dir));

    let api_key = config.gemini_api_key.clone().ok_or_else(|| CliError::missing_key("no Gemini API key resolved"))?;
    let rate_limiter = Arc::new(RateLimiter::new(config.gemini_rpm_limit, 60_000));
    let llm = Arc::new(LlmGateway::new(config.gemini_endpoint.clone(), api_key, rate_limiter));

    let pipeline = Arc::new(DocumentPipeline::new(store.clone(), sheets, llm, config.drive_root_folder_id.clone()));

    let started = Instant::now();
    let entries = store.list(&config.drive_root_folder_id)?;

    let summary = Arc::new(Mutex::new(ScanSummary::default()));
    let queue = WorkQueue::new(DEFAULT_PARALLELISM);
    for entry in entries {
        let pipeline = pipeline.clone();
        let summary = summary.clone();
        let quiet = config.quiet;
        queue.add(move || {
            if !quiet {
                eprintln!("scanning {}...", entry.name);
            }
            let outcome = pipeline.process_file(&entry);
            if let Outcome::Error { reason, stage, .. } = &outcome {
                eprintln!("warning: {} failed at {stage:?}: {reason}", entry.name);
            }
            summary.lock().expect("scan summary mutex poisoned").record(&outcome);
            Ok(())
        });
    }
    queue.on_idle();
    queue.shutdown();

    let mut summary = Arc::try_unwrap(summary).expect("all workers finished").into_inner().expect("scan summary mutex poisoned");
    summary.duration_ms = started.elapsed().as_millis() as u64;

    if json {
        summary.print_json();
    } else if !config.quiet {
        summary.print_human();
    }
    Ok(summary)
}
