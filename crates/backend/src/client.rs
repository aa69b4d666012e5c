use crate::error::{BackendError, Result};
use crate::sse::{parse_sse_event, SseBuffer, SseEvent};
use crate::stream::{token_channel, TokenStream, TOKEN_CHANNEL_CAPACITY};
use crate::types::{ModelHandle, RespondOptions, DEFAULT_CONTEXT_LENGTH};
use crate::ModelBackend;
use async_trait::async_trait;
use futures::StreamExt;
use offload_chunker::Message;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Base URL of the OpenAI-compatible endpoint, including `/v1`.
    pub base_url: String,
    /// Total deadline for one request, streaming included. Local models can
    /// take a long time before the first token on large prompts.
    pub request_timeout: Duration,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:1234/v1".to_string(),
            request_timeout: Duration::from_secs(180),
        }
    }
}

/// OpenAI-compatible HTTP backend (LM Studio, Ollama, llama.cpp server).
pub struct HttpBackend {
    http: reqwest::Client,
    config: HttpBackendConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
    // LM Studio reports `max_context_length`; other servers use
    // `context_length` or nothing at all.
    #[serde(default)]
    context_length: Option<usize>,
    #[serde(default)]
    max_context_length: Option<usize>,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| BackendError::Connection {
                endpoint: config.base_url.clone(),
                reason: format!("failed to build HTTP client: {err}"),
            })?;
        Ok(Self { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn map_send_error(&self, url: &str, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout {
                elapsed_ms: u64::try_from(self.config.request_timeout.as_millis())
                    .unwrap_or(u64::MAX),
            }
        } else {
            BackendError::Connection {
                endpoint: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    async fn fetch_models(&self) -> Result<Vec<ModelEntry>> {
        let url = format!("{}/models", self.config.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| self.map_send_error(&url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let models: ModelsResponse =
            response.json().await.map_err(|err| BackendError::Stream {
                reason: format!("unparseable /models response: {err}"),
            })?;
        Ok(models.data)
    }
}

#[async_trait]
impl ModelBackend for HttpBackend {
    async fn list_loaded_models(&self) -> Result<Vec<ModelHandle>> {
        let models = self.fetch_models().await?;
        Ok(models
            .into_iter()
            .map(|entry| ModelHandle {
                context_length: entry.context_length.or(entry.max_context_length),
                id: entry.id,
            })
            .collect())
    }

    async fn context_length(&self, model: &str) -> Result<usize> {
        let models = self.fetch_models().await?;
        let reported = models
            .iter()
            .find(|entry| entry.id == model)
            .and_then(|entry| entry.context_length.or(entry.max_context_length));

        Ok(reported.unwrap_or_else(|| {
            log::debug!("{model}: server reports no context length, assuming {DEFAULT_CONTEXT_LENGTH}");
            DEFAULT_CONTEXT_LENGTH
        }))
    }

    async fn respond(
        &self,
        model: &str,
        messages: Vec<Message>,
        options: RespondOptions,
    ) -> Result<TokenStream> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = ChatRequest {
            model,
            messages: &messages,
            stream: true,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        log::debug!(
            "chat completion: model={model} messages={} url={url}",
            messages.len()
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|err| self.map_send_error(&url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let (tx, stream) = token_channel(TOKEN_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buffer = SseBuffer::default();

            loop {
                while let Some(event) = buffer.next_event() {
                    match parse_sse_event(&event) {
                        Ok(SseEvent::Fragment(fragment)) => {
                            if !tx.send(fragment).await {
                                return; // consumer gone
                            }
                        }
                        Ok(SseEvent::Empty) => {}
                        Ok(SseEvent::Done) => return,
                        Err(err) => {
                            tx.fail(err).await;
                            return;
                        }
                    }
                }

                match bytes.next().await {
                    Some(Ok(chunk)) => buffer.push(&chunk),
                    Some(Err(err)) => {
                        tx.fail(BackendError::Stream {
                            reason: format!("stream read error: {err}"),
                        })
                        .await;
                        return;
                    }
                    None => {
                        // Connection closed; flush a trailing partial event.
                        if let Some(rest) = buffer.remainder() {
                            match parse_sse_event(&rest) {
                                Ok(SseEvent::Fragment(fragment)) => {
                                    tx.send(fragment).await;
                                }
                                Ok(_) => {}
                                Err(err) => tx.fail(err).await,
                            }
                        }
                        return;
                    }
                }
            }
        });

        Ok(stream)
    }
}
