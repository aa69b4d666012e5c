//! Batch analysis with bounded concurrency.
//!
//! Units run up to `concurrency` at a time; outcomes come back re-sequenced
//! to input order regardless of completion order. One failing unit never
//! aborts the rest. Each unit is cached individually, so a re-run of a
//! partially failed batch only pays for what did not finish.

use crate::cancel::CancelFlag;
use crate::error::Result;
use futures::stream::{self, StreamExt};
use offload_cache::{AnalysisCache, CacheKey, CacheMetadata};
use offload_protocol::{ErrorCode, TaskParams};
use offload_security::ValidatedPath;
use std::future::Future;
use std::sync::Arc;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// The per-unit product of one model call: parsed data plus provenance.
#[derive(Debug, Clone)]
pub struct UnitAnalysis {
    pub value: serde_json::Value,
    pub model_used: String,
    pub execution_time_ms: u64,
}

/// A unit failure, already reduced to the envelope taxonomy.
#[derive(Debug, Clone)]
pub struct UnitError {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub file: ValidatedPath,
    pub result: std::result::Result<UnitAnalysis, UnitError>,
    pub from_cache: bool,
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One outcome per input file, in input order.
    pub outcomes: Vec<BatchOutcome>,
    pub cache_hits: usize,
    pub analyzed: usize,
    pub failed: usize,
}

pub struct BatchAnalyzer {
    cache: Arc<AnalysisCache>,
    concurrency: usize,
}

impl BatchAnalyzer {
    pub fn new(cache: Arc<AnalysisCache>, concurrency: usize) -> Self {
        Self {
            cache,
            concurrency: concurrency.max(1),
        }
    }

    /// Run `analyze_one` over every file.
    ///
    /// Cached units short-circuit without dispatching. Once `cancel` fires,
    /// units not yet dispatched report [`ErrorCode::Cancelled`]; units
    /// already running finish and are cached normally.
    pub async fn analyze_batch<F, Fut>(
        &self,
        task_name: &str,
        params: &TaskParams,
        files: Vec<ValidatedPath>,
        cancel: &CancelFlag,
        analyze_one: F,
    ) -> BatchReport
    where
        F: Fn(ValidatedPath) -> Fut,
        Fut: Future<Output = Result<UnitAnalysis>>,
    {
        let analyze_one = &analyze_one;
        let outcomes: Vec<BatchOutcome> = stream::iter(files.into_iter().map(|file| {
            let cancel = cancel.clone();
            async move {
                self.process_unit(task_name, params, file, &cancel, analyze_one)
                    .await
            }
        }))
        .buffered(self.concurrency)
        .collect()
        .await;

        let cache_hits = outcomes.iter().filter(|o| o.from_cache).count();
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        let analyzed = outcomes.len() - cache_hits - failed;
        log::info!(
            "{task_name}: batch done, {analyzed} analyzed, {cache_hits} cached, {failed} failed"
        );

        BatchReport {
            outcomes,
            cache_hits,
            analyzed,
            failed,
        }
    }

    async fn process_unit<F, Fut>(
        &self,
        task_name: &str,
        params: &TaskParams,
        file: ValidatedPath,
        cancel: &CancelFlag,
        analyze_one: &F,
    ) -> BatchOutcome
    where
        F: Fn(ValidatedPath) -> Fut,
        Fut: Future<Output = Result<UnitAnalysis>>,
    {
        let key = CacheKey::generate(task_name, params, std::slice::from_ref(&file));
        if let Some(hit) = self.cache.get(&key) {
            return BatchOutcome {
                file,
                result: Ok(UnitAnalysis {
                    value: hit.value,
                    model_used: hit.model_used,
                    execution_time_ms: hit.execution_time_ms,
                }),
                from_cache: true,
            };
        }

        if cancel.is_cancelled() {
            return BatchOutcome {
                file,
                result: Err(UnitError {
                    code: ErrorCode::Cancelled,
                    message: "batch cancelled before this file was dispatched".to_string(),
                }),
                from_cache: false,
            };
        }

        match analyze_one(file.clone()).await {
            Ok(unit) => {
                self.cache.put(
                    key,
                    unit.value.clone(),
                    CacheMetadata {
                        model_used: unit.model_used.clone(),
                        execution_time_ms: unit.execution_time_ms,
                    },
                );
                BatchOutcome {
                    file,
                    result: Ok(unit),
                    from_cache: false,
                }
            }
            Err(err) => {
                log::warn!("{task_name}: {file} failed: {err}");
                BatchOutcome {
                    file,
                    result: Err(UnitError {
                        code: err.code(),
                        message: err.to_string(),
                    }),
                    from_cache: false,
                }
            }
        }
    }
}
