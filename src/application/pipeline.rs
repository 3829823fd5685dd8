//! Per-app pipeline: load the KG, extract (or reuse) raw behaviors, reduce,
//! persist.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::common::{EngineConfig, EngineError, Result};
use crate::domain::branch::BranchNoiseResolver;
use crate::domain::dead_leaf::DeadLeafEliminator;
use crate::domain::extractor::{ExtractOptions, ReachabilityExtractor};
use crate::domain::interest::InterestFilter;
use crate::domain::noise::NoiseClassifier;
use crate::domain::reducer::BehaviorReducer;
use crate::infrastructure::kg_loader::load_knowledge_graph;
use crate::infrastructure::{AppLayout, AuxiliaryData, JsonBehaviorStore, KeywordLists};
use crate::ports::BehaviorStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppOutcome {
    /// Reduction ran and `uhg.json` was written.
    Processed {
        raw: usize,
        reduced: usize,
        reused_raw: bool,
    },
    /// A finished reduced file already exists, or the app has no KG tables.
    Skipped,
}

#[derive(Debug, Clone)]
pub struct AppReport {
    pub app: String,
    pub outcome: AppOutcome,
    pub elapsed: Duration,
}

/// Shared, read-only state for processing apps. One per batch.
pub struct AppPipeline<'a> {
    config: &'a EngineConfig,
    lists: &'a KeywordLists,
    noise: NoiseClassifier,
}

impl<'a> AppPipeline<'a> {
    pub fn new(config: &'a EngineConfig, lists: &'a KeywordLists) -> Self {
        let noise = if config.noise_filter {
            lists.noise_classifier()
        } else {
            NoiseClassifier::permissive()
        };
        Self {
            config,
            lists,
            noise,
        }
    }

    pub fn run(&self, layout: &AppLayout) -> Result<AppReport> {
        self.run_with_store(layout, &JsonBehaviorStore::new(layout))
    }

    pub fn run_with_store(&self, layout: &AppLayout, store: &dyn BehaviorStore) -> Result<AppReport> {
        let start = Instant::now();
        let app = layout.name();

        if !self.config.rewrite_reduce
            && !self.config.save_behavior
            && store.has_reduced()
            && !store.has_raw()
        {
            info!(app = %app, "already reduced, skipping");
            return Ok(AppReport {
                app,
                outcome: AppOutcome::Skipped,
                elapsed: start.elapsed(),
            });
        }

        let graph = match load_knowledge_graph(layout, self.config.track_find_edges) {
            Ok(graph) => graph,
            Err(EngineError::MissingInput { path }) => {
                warn!(app = %app, path = %path.display(), "no knowledge graph, skipping");
                return Ok(AppReport {
                    app,
                    outcome: AppOutcome::Skipped,
                    elapsed: start.elapsed(),
                });
            }
            Err(err) => return Err(err),
        };

        let cached = if self.config.rewrite_behavior {
            None
        } else {
            store.load_raw()?
        };
        let reused_raw = cached.is_some();
        let raw = match cached {
            Some(raw) => {
                debug!(app = %app, count = raw.len(), "reusing raw behaviors");
                raw
            }
            None => {
                let options = ExtractOptions {
                    native_hop: self.config.hop_limit(),
                    noise_filter: self.config.noise_filter,
                };
                let raw = ReachabilityExtractor::new(&graph, &self.noise, options).extract_all();
                store.save_raw(&raw)?;
                raw
            }
        };

        let aux = AuxiliaryData::load(layout, self.config.max_aux_bytes, self.config.use_filter);
        let mut reducer =
            BehaviorReducer::new(BranchNoiseResolver::new(&graph, &aux.coverage, &aux.resources));
        if self.config.remove_leaf {
            reducer = reducer.with_dead_leaf(DeadLeafEliminator::new(&graph));
        }
        if self.config.use_filter {
            reducer = reducer.with_interest(InterestFilter::new(
                &graph,
                &aux.ui_context,
                &self.lists.texts,
                &self.lists.key_methods,
            ));
        }
        let reduced = reducer.reduce_all(&raw);
        let reduced_count = reduced.behaviors.len();
        store.save_reduced(reduced)?;

        if !self.config.save_behavior {
            store.remove_raw()?;
        }

        let elapsed = start.elapsed();
        info!(
            app = %app,
            raw = raw.len(),
            reduced = reduced_count,
            reused_raw,
            elapsed_ms = elapsed.as_millis() as u64,
            "app processed"
        );
        Ok(AppReport {
            app,
            outcome: AppOutcome::Processed {
                raw: raw.len(),
                reduced: reduced_count,
                reused_raw,
            },
            elapsed,
        })
    }
}
