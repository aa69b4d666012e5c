//! The orchestration core: one entry point per operation, every exit a
//! [`ResultEnvelope`].

use crate::batch::{BatchAnalyzer, UnitAnalysis};
use crate::cancel::CancelFlag;
use crate::discovery::{self, DiscoveryOptions};
use crate::error::{EngineError, Result};
use offload_backend::{BackendError, ModelBackend, RespondOptions};
use offload_cache::{AnalysisCache, CacheKey, CacheMetadata};
use offload_chunker::{ContextWindowChunker, ConversationPlan};
use offload_protocol::{
    assemble, error_envelope, ParamValue, PromptStages, ResultEnvelope, TaskParams,
};
use offload_security::{AllowedRoots, ValidatedPath};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One offloadable task: a name plus the three-part prompt it builds for a
/// unit of content. Implementations hold no per-run state.
pub trait TaskPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn stages(&self, content: &str, params: &TaskParams) -> PromptStages;
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Deadline for one complete model call, streaming included.
    pub model_call_timeout: Duration,
    pub batch_concurrency: usize,
    pub max_file_size: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            model_call_timeout: Duration::from_secs(120),
            batch_concurrency: crate::batch::DEFAULT_CONCURRENCY,
            max_file_size: discovery::DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Runs task plugins against the model backend.
///
/// Every public operation returns a [`ResultEnvelope`]; failures travel in
/// the envelope's error field, never as a Rust error across this boundary.
pub struct TaskRunner {
    guard: AllowedRoots,
    backend: Arc<dyn ModelBackend>,
    cache: Arc<AnalysisCache>,
    chunker: ContextWindowChunker,
    config: RunnerConfig,
}

impl TaskRunner {
    pub fn new(guard: AllowedRoots, backend: Arc<dyn ModelBackend>) -> Self {
        Self::with_config(guard, backend, RunnerConfig::default())
    }

    pub fn with_config(
        guard: AllowedRoots,
        backend: Arc<dyn ModelBackend>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            guard,
            backend,
            cache: Arc::new(AnalysisCache::default()),
            chunker: ContextWindowChunker::default(),
            config,
        }
    }

    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    /// Run a task over caller-supplied content.
    ///
    /// Inline content has no stable identity, so this path never consults
    /// the cache; file-based operations do.
    pub async fn run_task(
        &self,
        plugin: &dyn TaskPlugin,
        params: &TaskParams,
        content: &str,
    ) -> ResultEnvelope {
        let started = Instant::now();
        match self.analyze_content(plugin, params, content).await {
            Ok((raw, model)) => assemble(plugin.name(), &raw, &model, elapsed_ms(started)),
            Err(err) => self.failure(err, started),
        }
    }

    /// Analyze one file, cached by task, params, and path.
    pub async fn analyze_file(
        &self,
        plugin: &dyn TaskPlugin,
        params: &TaskParams,
        path: impl AsRef<Path>,
    ) -> ResultEnvelope {
        let started = Instant::now();
        let file = match self.guard.validate(path) {
            Ok(file) => file,
            Err(err) => return self.failure(err.into(), started),
        };

        let key = CacheKey::generate(plugin.name(), params, std::slice::from_ref(&file));
        if let Some(hit) = self.cache.get(&key) {
            log::debug!("{}: cache hit for {file}", plugin.name());
            return ResultEnvelope::success(hit.value, &hit.model_used, hit.execution_time_ms);
        }

        match self.analyze_unit(plugin, params, &file).await {
            Ok(unit) => {
                self.cache.put(
                    key,
                    unit.value.clone(),
                    CacheMetadata {
                        model_used: unit.model_used.clone(),
                        execution_time_ms: unit.execution_time_ms,
                    },
                );
                ResultEnvelope::success(unit.value, &unit.model_used, unit.execution_time_ms)
            }
            Err(err) => self.failure(err, started),
        }
    }

    /// Discover files under `root` and analyze each one as its own unit.
    ///
    /// Per-file failures land inside the aggregated data; the operation
    /// itself only fails when the root is rejected outright.
    pub async fn analyze_project(
        &self,
        plugin: &dyn TaskPlugin,
        params: &TaskParams,
        root: impl AsRef<Path>,
        options: &DiscoveryOptions,
        cancel: &CancelFlag,
    ) -> ResultEnvelope {
        let started = Instant::now();
        let root = match self.guard.validate(root) {
            Ok(root) => root,
            Err(err) => return self.failure(err.into(), started),
        };

        let discovered = discovery::discover(&root, options);
        log::info!(
            "{}: discovered {} files under {root}{}",
            plugin.name(),
            discovered.files.len(),
            if discovered.truncated { " (truncated)" } else { "" },
        );

        let batch = BatchAnalyzer::new(Arc::clone(&self.cache), self.config.batch_concurrency);
        let report = batch
            .analyze_batch(plugin.name(), params, discovered.files, cancel, |file| async move {
                self.analyze_unit(plugin, params, &file).await
            })
            .await;

        let model_used = report
            .outcomes
            .iter()
            .find_map(|o| o.result.as_ref().ok().map(|u| u.model_used.clone()))
            .unwrap_or_default();

        let files: Vec<serde_json::Value> = report
            .outcomes
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(unit) => json!({
                    "file": outcome.file.to_string(),
                    "data": unit.value,
                    "cached": outcome.from_cache,
                }),
                Err(err) => json!({
                    "file": outcome.file.to_string(),
                    "error": { "code": err.code.as_str(), "message": err.message },
                }),
            })
            .collect();

        ResultEnvelope::success(
            json!({
                "files": files,
                "discovered": report.outcomes.len(),
                "truncated": discovered.truncated,
                "cacheHits": report.cache_hits,
                "analyzed": report.analyzed,
                "failed": report.failed,
            }),
            &model_used,
            elapsed_ms(started),
        )
    }

    async fn analyze_unit(
        &self,
        plugin: &dyn TaskPlugin,
        params: &TaskParams,
        file: &ValidatedPath,
    ) -> Result<UnitAnalysis> {
        let started = Instant::now();
        let content = self.read_text_file(file).await?;
        let (raw, model) = self.analyze_content(plugin, params, &content).await?;

        let elapsed = elapsed_ms(started);
        let envelope = assemble(plugin.name(), &raw, &model, elapsed);
        Ok(UnitAnalysis {
            value: envelope.data.unwrap_or(serde_json::Value::Null),
            model_used: model,
            execution_time_ms: elapsed,
        })
    }

    async fn analyze_content(
        &self,
        plugin: &dyn TaskPlugin,
        params: &TaskParams,
        content: &str,
    ) -> Result<(String, String)> {
        let (model, context_window) = self.resolve_model(params).await?;
        let stages = plugin.stages(content, params);
        let conversation = self.chunker.plan_conversation(&stages, context_window)?;
        let raw = self.call_model(&model, conversation).await?;
        Ok((raw, model))
    }

    /// Pick the model: the `model` param when given, otherwise the first
    /// loaded one. Window comes from the handle when reported.
    async fn resolve_model(&self, params: &TaskParams) -> Result<(String, usize)> {
        let models = self.backend.list_loaded_models().await?;
        let chosen = match params.get("model") {
            Some(ParamValue::Str(wanted)) => {
                models.into_iter().find(|m| &m.id == wanted).ok_or_else(|| {
                    BackendError::Unavailable {
                        reason: format!("requested model {wanted} is not loaded"),
                    }
                })?
            }
            _ => models.into_iter().next().ok_or_else(|| BackendError::Unavailable {
                reason: "no models are loaded".to_string(),
            })?,
        };

        let context_window = match chosen.context_length {
            Some(tokens) => tokens,
            None => self.backend.context_length(&chosen.id).await?,
        };
        Ok((chosen.id, context_window))
    }

    async fn call_model(&self, model: &str, conversation: ConversationPlan) -> Result<String> {
        let messages = conversation.into_messages();
        let call = async {
            let stream = self
                .backend
                .respond(model, messages, RespondOptions::default())
                .await?;
            stream.collect().await
        };

        match tokio::time::timeout(self.config.model_call_timeout, call).await {
            Ok(raw) => Ok(raw?),
            Err(_) => Err(BackendError::Timeout {
                elapsed_ms: u64::try_from(self.config.model_call_timeout.as_millis())
                    .unwrap_or(u64::MAX),
            }
            .into()),
        }
    }

    async fn read_text_file(&self, file: &ValidatedPath) -> Result<String> {
        let meta = tokio::fs::metadata(file.as_path()).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                EngineError::FileNotFound(file.to_path_buf())
            } else {
                EngineError::Unreadable {
                    path: file.to_path_buf(),
                    reason: err.to_string(),
                }
            }
        })?;

        if meta.len() > self.config.max_file_size {
            return Err(EngineError::FileTooLarge {
                path: file.to_path_buf(),
                size: meta.len(),
                limit: self.config.max_file_size,
            });
        }

        let bytes = tokio::fs::read(file.as_path()).await.map_err(|err| {
            EngineError::Unreadable {
                path: file.to_path_buf(),
                reason: err.to_string(),
            }
        })?;
        String::from_utf8(bytes).map_err(|_| EngineError::NotText(file.to_path_buf()))
    }

    fn failure(&self, err: EngineError, started: Instant) -> ResultEnvelope {
        error_envelope(err.code(), err.to_string(), None, "", elapsed_ms(started))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload_protocol::ErrorCode;
    use std::fs;

    fn runner_over(dir: &Path) -> TaskRunner {
        let guard = AllowedRoots::new([dir.to_path_buf()]).unwrap();
        let backend = Arc::new(NoopBackend);
        TaskRunner::with_config(
            guard,
            backend,
            RunnerConfig {
                max_file_size: 64,
                ..RunnerConfig::default()
            },
        )
    }

    struct NoopBackend;

    #[async_trait::async_trait]
    impl ModelBackend for NoopBackend {
        async fn list_loaded_models(&self) -> offload_backend::Result<Vec<offload_backend::ModelHandle>> {
            Ok(Vec::new())
        }

        async fn context_length(&self, _model: &str) -> offload_backend::Result<usize> {
            Ok(offload_backend::DEFAULT_CONTEXT_LENGTH)
        }

        async fn respond(
            &self,
            _model: &str,
            _messages: Vec<offload_chunker::Message>,
            _options: RespondOptions,
        ) -> offload_backend::Result<offload_backend::TokenStream> {
            let (_tx, stream) = offload_backend::token_channel(1);
            Ok(stream)
        }
    }

    #[tokio::test]
    async fn missing_files_map_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_over(dir.path());
        let missing = runner
            .guard
            .validate(dir.path().join("gone.rs"))
            .unwrap();

        let err = runner.read_text_file(&missing).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileNotFound);
    }

    #[tokio::test]
    async fn oversized_files_are_refused_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.rs");
        fs::write(&path, "x".repeat(100)).unwrap();

        let runner = runner_over(dir.path());
        let file = runner.guard.validate(&path).unwrap();

        let err = runner.read_text_file(&file).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileTooLarge);
    }

    #[tokio::test]
    async fn binary_files_are_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.rs");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let runner = runner_over(dir.path());
        let file = runner.guard.validate(&path).unwrap();

        let err = runner.read_text_file(&file).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedFileType);
    }

    #[tokio::test]
    async fn empty_model_list_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner_over(dir.path());

        let err = runner.resolve_model(&TaskParams::new()).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ModelUnavailable);
    }
}
