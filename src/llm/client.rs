/// Ollama HTTP client implementation.
///
/// Provides `OllamaClient`, the remote categorization strategy, along with
/// the error type shared by every `CategorizationClient` and the retry helper.
use std::path::Path;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::FileType;

/// Errors that can occur while asking a model for a category.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The server answered but not with something usable.
    #[error("LLM API error: {message}")]
    Api { message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl LlmError {
    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else {
            Self::Network(error)
        }
    }
}

/// A source of raw category answers for files and directories.
///
/// Implementations return the model's single-line answer untouched;
/// splitting and sanitizing it is the caller's job
/// (see [`parse_category_response`](super::parse_category_response)).
pub trait CategorizationClient: Send + Sync {
    fn categorize_file(
        &self,
        file_name: &str,
        file_path: Option<&Path>,
        file_type: FileType,
    ) -> Result<String, LlmError>;
}

const SYSTEM_PROMPT: &str = "You are a file categorization assistant. \
If it's an installer, describe the type of software it installs. \
Consider the filename, extension, and any directory context provided. \
Always reply with one line in the format <Main category> : <Subcategory>. \
Main category must be broad (one or two words, plural). \
Subcategory must be specific, relevant, and must not repeat the main category. \
Do not explain or apologize.";

/// Builds the user part of the categorization prompt.
pub fn build_prompt(file_name: &str, file_path: Option<&Path>, file_type: FileType) -> String {
    let noun = match file_type {
        FileType::File => "file",
        FileType::Directory => "directory",
    };
    match file_path {
        Some(path) => format!(
            "Categorize the {noun} with full path: {}\nName: {file_name}",
            path.display()
        ),
        None => format!("Categorize {noun}: {file_name}"),
    }
}

/// Builder for constructing `OllamaClient` instances.
///
/// # Examples
///
/// ```
/// use ftax::llm::OllamaClientBuilder;
///
/// let client = OllamaClientBuilder::new()
///     .base_url("http://localhost:11434")
///     .model("llama3.2")
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.model(), "llama3.2");
/// ```
#[derive(Debug, Default)]
pub struct OllamaClientBuilder {
    base_url: Option<String>,
    model: Option<String>,
}

impl OllamaClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL for the Ollama API (e.g. "http://localhost:11434").
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model name. An empty name means "largest installed model".
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Builds the `OllamaClient` with the configured settings.
    ///
    /// # Environment Variables
    ///
    /// Without `base_url()`, `OLLAMA_HOST` is used, defaulting to
    /// `http://localhost:11434`. Without `model()`, `OLLAMA_MODEL` is used,
    /// defaulting to an empty string.
    pub fn build(self) -> Result<OllamaClient, LlmError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => std::env::var("OLLAMA_HOST")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
        };
        let model = match self.model {
            Some(m) => m,
            None => std::env::var("OLLAMA_MODEL").unwrap_or_default(),
        };

        reqwest::Url::parse(&base_url)
            .map_err(|e| LlmError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(LlmError::Network)?;

        Ok(OllamaClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            resolved_model: OnceLock::new(),
        })
    }
}

/// Synchronous client for a local or remote Ollama server.
///
/// Construct it with [`OllamaClientBuilder`].
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    resolved_model: OnceLock<String>,
}

impl OllamaClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The configured model name; may be empty.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Lists installed models from `/api/tags`, largest first.
    pub fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(LlmError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(LlmError::Http {
                status: response.status().as_u16(),
            });
        }

        let json: serde_json::Value = response.json().map_err(LlmError::Network)?;
        Ok(model_names_by_size(&json))
    }

    /// The model to send requests to, asking the server once when none was configured.
    fn effective_model(&self) -> Result<String, LlmError> {
        if !self.model.is_empty() {
            return Ok(self.model.clone());
        }
        if let Some(model) = self.resolved_model.get() {
            return Ok(model.clone());
        }

        let model = self
            .list_models()?
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Api {
                message: "no models installed on the Ollama server".to_string(),
            })?;
        tracing::info!(model = %model, "Using largest installed Ollama model");
        Ok(self.resolved_model.get_or_init(|| model).clone())
    }

    /// Sends one non-streaming `/api/generate` request, with retries.
    pub fn generate(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let model = self.effective_model()?;
        let url = format!("{}/api/generate", self.base_url);
        let request_body = serde_json::json!({
            "model": model,
            "system": system,
            "prompt": prompt,
            "stream": false
        });

        tracing::debug!(model = %model, prompt_len = prompt.len(), "Sending generate request");

        retry_with_backoff(|| {
            let response = self
                .client
                .post(&url)
                .json(&request_body)
                .send()
                .map_err(LlmError::from_reqwest)?;

            let status = response.status();
            if !status.is_success() {
                return Err(LlmError::Http {
                    status: status.as_u16(),
                });
            }

            let body = response.text().map_err(LlmError::from_reqwest)?;
            extract_generated_text(&body)
        })
    }
}

impl CategorizationClient for OllamaClient {
    fn categorize_file(
        &self,
        file_name: &str,
        file_path: Option<&Path>,
        file_type: FileType,
    ) -> Result<String, LlmError> {
        let prompt = build_prompt(file_name, file_path, file_type);
        self.generate(SYSTEM_PROMPT, &prompt)
    }
}

/// Pulls the `response` field out of an `/api/generate` body.
fn extract_generated_text(body: &str) -> Result<String, LlmError> {
    let json: serde_json::Value = serde_json::from_str(body).map_err(LlmError::Serialization)?;

    if let Some(message) = json.get("error").and_then(|v| v.as_str()) {
        return Err(LlmError::Api {
            message: message.to_string(),
        });
    }

    json.get("response")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| LlmError::Api {
            message: "Missing 'response' field in API response".to_string(),
        })
}

fn model_names_by_size(json: &serde_json::Value) -> Vec<String> {
    let mut models: Vec<(String, u64)> = json
        .get("models")
        .and_then(|m| m.as_array())
        .map(|models| {
            models
                .iter()
                .filter_map(|model| {
                    let name = model.get("name").and_then(|n| n.as_str())?;
                    let size = model.get("size").and_then(|s| s.as_u64()).unwrap_or(0);
                    Some((name.to_string(), size))
                })
                .collect()
        })
        .unwrap_or_default();

    models.sort_by(|a, b| b.1.cmp(&a.1));
    models.into_iter().map(|(name, _)| name).collect()
}

const BACKOFF_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Retries an operation with exponential backoff (1s, 2s, 4s).
///
/// Only transient errors are retried: network failures, timeouts and
/// HTTP 5xx. Returns the last error once retries are exhausted.
pub fn retry_with_backoff<F, T>(f: F) -> Result<T, LlmError>
where
    F: FnMut() -> Result<T, LlmError>,
{
    retry_with_delays(&BACKOFF_DELAYS, f)
}

fn retry_with_delays<F, T>(delays: &[Duration], mut f: F) -> Result<T, LlmError>
where
    F: FnMut() -> Result<T, LlmError>,
{
    let mut last_error = match f() {
        Ok(result) => return Ok(result),
        Err(e) if !should_retry(&e) => return Err(e),
        Err(e) => e,
    };

    for (attempt, delay) in delays.iter().enumerate() {
        tracing::warn!(attempt = attempt + 1, error = %last_error, "Retrying LLM request");
        thread::sleep(*delay);

        match f() {
            Ok(result) => return Ok(result),
            Err(e) if !should_retry(&e) => return Err(e),
            Err(e) => last_error = e,
        }
    }

    Err(last_error)
}

fn should_retry(error: &LlmError) -> bool {
    match error {
        LlmError::Network(_) | LlmError::Timeout(_) => true,
        LlmError::Http { status } => (500..600).contains(status),
        LlmError::Serialization(_) | LlmError::Api { .. } | LlmError::InvalidUrl(_) => false,
    }
}
