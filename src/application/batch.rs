//! Batch driver: every app directory under a root, in parallel, with
//! failures isolated per app.

use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{error, info};

use crate::application::pipeline::{AppOutcome, AppPipeline, AppReport};
use crate::common::EngineConfig;
use crate::infrastructure::concurrency::build_pool;
use crate::infrastructure::{AppLayout, KeywordLists};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppFailure {
    pub app: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub processed: Vec<AppReport>,
    pub skipped: Vec<String>,
    pub failed: Vec<AppFailure>,
    pub elapsed: Duration,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.processed.len() + self.skipped.len() + self.failed.len()
    }

    /// True when there was work and none of it succeeded.
    pub fn all_failed(&self) -> bool {
        !self.failed.is_empty() && self.processed.is_empty() && self.skipped.is_empty()
    }
}

pub struct BatchRunner {
    config: EngineConfig,
    lists: KeywordLists,
    progress: bool,
}

impl BatchRunner {
    /// Load the keyword lists named by `config`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let lists = KeywordLists::load(&config.lists_dir)
            .with_context(|| format!("failed to load keyword lists from {}", config.lists_dir.display()))?;
        Ok(Self::with_lists(config, lists))
    }

    pub fn with_lists(config: EngineConfig, lists: KeywordLists) -> Self {
        Self {
            config,
            lists,
            progress: true,
        }
    }

    pub fn without_progress(mut self) -> Self {
        self.progress = false;
        self
    }

    pub fn run(&self, root: &Path) -> Result<BatchSummary> {
        let start = Instant::now();
        let apps = list_apps(root)?;
        info!(root = %root.display(), apps = apps.len(), "starting batch");

        let pool = build_pool(self.config.threads)?;
        let pipeline = AppPipeline::new(&self.config, &self.lists);
        let bar = self.progress_bar(apps.len() as u64);

        let results: Vec<(String, std::result::Result<AppReport, String>)> = pool.install(|| {
            apps.par_iter()
                .map(|dir| {
                    let layout = AppLayout::new(dir);
                    let app = layout.name();
                    let result = match catch_unwind(AssertUnwindSafe(|| pipeline.run(&layout))) {
                        Ok(Ok(report)) => Ok(report),
                        Ok(Err(err)) => Err(err.to_string()),
                        Err(panic) => Err(panic_message(panic.as_ref())),
                    };
                    if let Err(message) = &result {
                        error!(app = %app, error = %message, "app failed");
                    }
                    bar.inc(1);
                    (app, result)
                })
                .collect()
        });
        bar.finish_and_clear();

        let mut summary = BatchSummary::default();
        for (app, result) in results {
            match result {
                Ok(report) if report.outcome == AppOutcome::Skipped => summary.skipped.push(app),
                Ok(report) => summary.processed.push(report),
                Err(message) => summary.failed.push(AppFailure { app, message }),
            }
        }
        summary.elapsed = start.elapsed();
        info!(
            processed = summary.processed.len(),
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            elapsed_s = summary.elapsed.as_secs_f64(),
            "batch finished"
        );
        Ok(summary)
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} apps | ETA: {eta}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar
    }
}

/// App directories directly under `root`, sorted by name.
pub fn list_apps(root: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(root).with_context(|| format!("cannot read batch root {}", root.display()))?;
    let mut apps = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            apps.push(path);
        }
    }
    apps.sort();
    Ok(apps)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
