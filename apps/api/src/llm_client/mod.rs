//! LLM client: the single point of entry for all model provider calls.
//!
//! ARCHITECTURAL RULE: No other module may call a model provider directly.
//! All LLM interactions MUST go through this module, and credentials always
//! arrive through an explicit `AiConfig` plus the process environment; there
//! is no ambient per-request key state.
//!
//! Providers are routed by model-name prefix. A request is resolved against
//! the caller's plan tier and stored keys before any network traffic happens,
//! so a missing key fails fast with a credential error.

use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MAX_TOKENS: u32 = 4096;

/// Model used when the caller has no stored keys or names a model we cannot
/// route on the hosted tier.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Case-insensitive substrings that identify a credential problem regardless
/// of the status code a provider chose to use.
const CREDENTIAL_MARKERS: &[&str] = &["api key", "unauthorized", "invalid key", "invalid x-api-key"];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{0} API key not found")]
    MissingKey(&'static str),

    #[error("Provider rejected the API key: {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// The providers we can route to, keyed by model-name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    Google,
    DeepSeek,
    Groq,
    /// Also the fallthrough for model names we do not recognize.
    OpenAi,
}

impl Provider {
    pub fn for_model(model: &str) -> Provider {
        if model.starts_with("claude") {
            Provider::Anthropic
        } else if model.starts_with("gemini") {
            Provider::Google
        } else if model.starts_with("deepseek") {
            Provider::DeepSeek
        } else if model.starts_with("gemma") {
            Provider::Groq
        } else {
            Provider::OpenAi
        }
    }

    /// Chat-completions base URL for the OpenAI-compatible providers.
    fn chat_base_url(self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::DeepSeek => "https://api.deepseek.com/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
            // Anthropic and Google speak their own wire formats.
            Provider::Anthropic | Provider::Google => unreachable!("not an OpenAI-compatible provider"),
        }
    }
}

/// A user-supplied provider key, stored client-side and sent with each
/// AI-backed request. `service` matches the provider slug ("anthropic",
/// "google", "deepseek", "groq", "openai"). Extra client fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub service: String,
    pub key: String,
}

/// Per-request AI settings: the chosen model plus any stored keys.
/// Never persisted server-side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub model: String,
    #[serde(default, alias = "apiKeys")]
    pub api_keys: Vec<ApiKey>,
}

impl AiConfig {
    fn stored_key(&self, service: &str) -> Option<String> {
        self.api_keys
            .iter()
            .find(|k| k.service == service)
            .map(|k| k.key.clone())
    }
}

/// Provider keys held in the process environment, used for the hosted tier
/// and the keyless default path.
#[derive(Debug, Clone, Default)]
pub struct EnvKeys {
    pub anthropic: Option<String>,
    pub gemini: Option<String>,
    pub deepseek: Option<String>,
    pub groq: Option<String>,
}

impl EnvKeys {
    pub fn from_config(config: &Config) -> Self {
        Self {
            anthropic: config.anthropic_api_key.clone(),
            gemini: config.gemini_api_key.clone(),
            deepseek: config.deepseek_api_key.clone(),
            groq: config.groq_api_key.clone(),
        }
    }
}

/// Outcome of key resolution: which provider to hit, with which model and key.
#[derive(Debug, Clone, PartialEq)]
struct ResolvedCall {
    provider: Provider,
    model: String,
    api_key: String,
}

/// The single LLM client shared by all request handlers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    env_keys: EnvKeys,
}

impl LlmClient {
    pub fn new(env_keys: EnvKeys) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            env_keys,
        }
    }

    /// Resolves provider, model, and key for a request without touching the
    /// network.
    ///
    /// Pro tier runs on environment keys only; an unrecognized model name
    /// falls back to the default Gemini model. Free tier with no stored keys
    /// also runs on the default model. Free tier with stored keys must bring
    /// the key for the provider the model routes to, except that Gemini
    /// models may fall back to the environment key.
    fn resolve(&self, ai: &AiConfig, is_pro: bool) -> Result<ResolvedCall, LlmError> {
        if is_pro {
            return match Provider::for_model(&ai.model) {
                Provider::Anthropic => self.env_call(Provider::Anthropic, &ai.model),
                Provider::Google => self.env_call(Provider::Google, &ai.model),
                Provider::DeepSeek => self.env_call(Provider::DeepSeek, &ai.model),
                Provider::Groq => self.env_call(Provider::Groq, &ai.model),
                Provider::OpenAi => self.default_gemini(),
            };
        }

        if ai.api_keys.is_empty() {
            return self.default_gemini();
        }

        match Provider::for_model(&ai.model) {
            Provider::Anthropic => ai
                .stored_key("anthropic")
                .map(|key| ResolvedCall {
                    provider: Provider::Anthropic,
                    model: ai.model.clone(),
                    api_key: key,
                })
                .ok_or(LlmError::MissingKey("Anthropic")),
            Provider::Google => ai
                .stored_key("google")
                .or_else(|| self.env_keys.gemini.clone())
                .map(|key| ResolvedCall {
                    provider: Provider::Google,
                    model: ai.model.clone(),
                    api_key: key,
                })
                .ok_or(LlmError::MissingKey("Google")),
            Provider::DeepSeek => ai
                .stored_key("deepseek")
                .map(|key| ResolvedCall {
                    provider: Provider::DeepSeek,
                    model: ai.model.clone(),
                    api_key: key,
                })
                .ok_or(LlmError::MissingKey("DeepSeek")),
            Provider::Groq => ai
                .stored_key("groq")
                .map(|key| ResolvedCall {
                    provider: Provider::Groq,
                    model: ai.model.clone(),
                    api_key: key,
                })
                .ok_or(LlmError::MissingKey("Groq")),
            Provider::OpenAi => ai
                .stored_key("openai")
                .map(|key| ResolvedCall {
                    provider: Provider::OpenAi,
                    model: ai.model.clone(),
                    api_key: key,
                })
                .ok_or(LlmError::MissingKey("OpenAI")),
        }
    }

    fn env_call(&self, provider: Provider, model: &str) -> Result<ResolvedCall, LlmError> {
        let (key, label) = match provider {
            Provider::Anthropic => (self.env_keys.anthropic.as_ref(), "Anthropic"),
            Provider::Google => (self.env_keys.gemini.as_ref(), "Gemini"),
            Provider::DeepSeek => (self.env_keys.deepseek.as_ref(), "DeepSeek"),
            Provider::Groq => (self.env_keys.groq.as_ref(), "Groq"),
            Provider::OpenAi => (None, "OpenAI"),
        };
        let api_key = key.cloned().ok_or(LlmError::MissingKey(label))?;
        Ok(ResolvedCall {
            provider,
            model: model.to_string(),
            api_key,
        })
    }

    fn default_gemini(&self) -> Result<ResolvedCall, LlmError> {
        let api_key = self
            .env_keys
            .gemini
            .clone()
            .ok_or(LlmError::MissingKey("Gemini"))?;
        Ok(ResolvedCall {
            provider: Provider::Google,
            model: DEFAULT_MODEL.to_string(),
            api_key,
        })
    }

    /// Makes one model call and returns the text reply. No automatic retries:
    /// a failure surfaces immediately so the caller can decide what to do.
    pub async fn call(
        &self,
        ai: &AiConfig,
        is_pro: bool,
        prompt: &str,
        system: &str,
    ) -> Result<String, LlmError> {
        let resolved = self.resolve(ai, is_pro)?;

        debug!(
            "LLM call via {:?} (model: {})",
            resolved.provider, resolved.model
        );

        match resolved.provider {
            Provider::Anthropic => self.call_anthropic(&resolved, prompt, system).await,
            Provider::Google => self.call_gemini(&resolved, prompt, system).await,
            Provider::OpenAi | Provider::DeepSeek | Provider::Groq => {
                self.call_chat_completions(&resolved, prompt, system).await
            }
        }
    }

    /// Convenience method that calls the model and deserializes the text
    /// response as JSON. The prompt must instruct the model to return valid
    /// JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        ai: &AiConfig,
        is_pro: bool,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let text = self.call(ai, is_pro, prompt, system).await?;

        // Strip markdown code fences if the model wraps JSON in them
        let text = strip_json_fences(&text);

        serde_json::from_str(text).map_err(LlmError::Parse)
    }

    async fn call_anthropic(
        &self,
        call: &ResolvedCall,
        prompt: &str,
        system: &str,
    ) -> Result<String, LlmError> {
        let request_body = AnthropicRequest {
            model: &call.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &call.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Anthropic API returned {status}: {body}");
            return Err(classify_api_error(status.as_u16(), extract_error_message(&body)));
        }

        let parsed: AnthropicResponse = response.json().await?;
        parsed
            .content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .ok_or(LlmError::EmptyContent)
    }

    async fn call_gemini(
        &self,
        call: &ResolvedCall,
        prompt: &str,
        system: &str,
    ) -> Result<String, LlmError> {
        let url = format!(
            "{GEMINI_API_BASE}/{}:generateContent?key={}",
            call.model, call.api_key
        );

        let request_body = GeminiRequest {
            system_instruction: GeminiContent {
                parts: vec![GeminiPart { text: system }],
            },
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: MAX_TOKENS,
            },
        };

        let response = self.client.post(url).json(&request_body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API returned {status}: {body}");
            return Err(classify_api_error(status.as_u16(), extract_error_message(&body)));
        }

        let parsed: GeminiResponse = response.json().await?;
        parsed.text().ok_or(LlmError::EmptyContent)
    }

    async fn call_chat_completions(
        &self,
        call: &ResolvedCall,
        prompt: &str,
        system: &str,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", call.provider.chat_base_url());

        let request_body = ChatRequest {
            model: &call.model,
            max_tokens: MAX_TOKENS,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&call.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "{:?} API returned {status}: {body}",
                call.provider
            );
            return Err(classify_api_error(status.as_u16(), extract_error_message(&body)));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyContent)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire formats
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    parts: Option<Vec<GeminiResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    fn text(self) -> Option<String> {
        self.candidates?
            .into_iter()
            .next()?
            .content?
            .parts?
            .into_iter()
            .find_map(|p| p.text)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Error classification
// ────────────────────────────────────────────────────────────────────────────

/// Pulls the human-readable message out of a provider error body, falling
/// back to the raw body when the shape is unfamiliar.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<ProviderError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

/// True when the message text indicates a credential problem. Providers are
/// inconsistent about status codes here (Gemini reports a bad key as 400),
/// so the message is checked as well.
pub fn has_credential_marker(message: &str) -> bool {
    let lower = message.to_lowercase();
    CREDENTIAL_MARKERS.iter().any(|m| lower.contains(m))
}

fn classify_api_error(status: u16, message: String) -> LlmError {
    if status == 429 {
        return LlmError::RateLimited;
    }
    if status == 401 || status == 403 || has_credential_marker(&message) {
        return LlmError::Unauthorized(message);
    }
    LlmError::Api { status, message }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(env_keys: EnvKeys) -> LlmClient {
        LlmClient::new(env_keys)
    }

    fn all_env_keys() -> EnvKeys {
        EnvKeys {
            anthropic: Some("env-ant".to_string()),
            gemini: Some("env-gem".to_string()),
            deepseek: Some("env-ds".to_string()),
            groq: Some("env-groq".to_string()),
        }
    }

    fn ai_with_key(model: &str, service: &str, key: &str) -> AiConfig {
        AiConfig {
            model: model.to_string(),
            api_keys: vec![ApiKey {
                service: service.to_string(),
                key: key.to_string(),
            }],
        }
    }

    #[test]
    fn test_for_model_prefixes() {
        assert_eq!(Provider::for_model("claude-3-5-sonnet"), Provider::Anthropic);
        assert_eq!(Provider::for_model("gemini-2.0-flash"), Provider::Google);
        assert_eq!(Provider::for_model("deepseek-chat"), Provider::DeepSeek);
        assert_eq!(Provider::for_model("gemma2-9b-it"), Provider::Groq);
        assert_eq!(Provider::for_model("gpt-4o"), Provider::OpenAi);
        assert_eq!(Provider::for_model(""), Provider::OpenAi);
    }

    #[test]
    fn test_resolve_pro_uses_env_key() {
        let c = client(all_env_keys());
        let ai = ai_with_key("claude-3-5-sonnet", "anthropic", "user-key");
        let resolved = c.resolve(&ai, true).unwrap();
        assert_eq!(resolved.provider, Provider::Anthropic);
        assert_eq!(resolved.model, "claude-3-5-sonnet");
        // Stored keys are ignored on the hosted tier.
        assert_eq!(resolved.api_key, "env-ant");
    }

    #[test]
    fn test_resolve_pro_missing_env_key_fails() {
        let c = client(EnvKeys::default());
        let ai = AiConfig {
            model: "claude-3-5-sonnet".to_string(),
            api_keys: vec![],
        };
        let err = c.resolve(&ai, true).unwrap_err();
        assert_eq!(err.to_string(), "Anthropic API key not found");
    }

    #[test]
    fn test_resolve_pro_unknown_model_falls_back_to_default() {
        let c = client(all_env_keys());
        let ai = AiConfig {
            model: "gpt-4o".to_string(),
            api_keys: vec![],
        };
        let resolved = c.resolve(&ai, true).unwrap();
        assert_eq!(resolved.provider, Provider::Google);
        assert_eq!(resolved.model, DEFAULT_MODEL);
        assert_eq!(resolved.api_key, "env-gem");
    }

    #[test]
    fn test_resolve_free_without_keys_uses_default_model() {
        let c = client(all_env_keys());
        let ai = AiConfig {
            model: "claude-3-5-sonnet".to_string(),
            api_keys: vec![],
        };
        let resolved = c.resolve(&ai, false).unwrap();
        assert_eq!(resolved.provider, Provider::Google);
        assert_eq!(resolved.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_resolve_free_without_keys_and_no_env_gemini_fails() {
        let c = client(EnvKeys::default());
        let err = c.resolve(&AiConfig::default(), false).unwrap_err();
        assert_eq!(err.to_string(), "Gemini API key not found");
    }

    #[test]
    fn test_resolve_free_with_stored_key() {
        let c = client(EnvKeys::default());
        let ai = ai_with_key("claude-3-5-sonnet", "anthropic", "user-key");
        let resolved = c.resolve(&ai, false).unwrap();
        assert_eq!(resolved.provider, Provider::Anthropic);
        assert_eq!(resolved.api_key, "user-key");
    }

    #[test]
    fn test_resolve_free_wrong_service_key_fails() {
        let c = client(EnvKeys::default());
        let ai = ai_with_key("deepseek-chat", "anthropic", "user-key");
        let err = c.resolve(&ai, false).unwrap_err();
        assert_eq!(err.to_string(), "DeepSeek API key not found");
    }

    #[test]
    fn test_resolve_free_gemini_model_falls_back_to_env_key() {
        let c = client(all_env_keys());
        // Stored keys exist, but none for Google.
        let ai = ai_with_key("gemini-1.5-pro", "openai", "user-key");
        let resolved = c.resolve(&ai, false).unwrap();
        assert_eq!(resolved.provider, Provider::Google);
        assert_eq!(resolved.model, "gemini-1.5-pro");
        assert_eq!(resolved.api_key, "env-gem");
    }

    #[test]
    fn test_resolve_free_unmatched_model_requires_openai_key() {
        let c = client(all_env_keys());
        let ai = ai_with_key("gpt-4o", "groq", "user-key");
        let err = c.resolve(&ai, false).unwrap_err();
        assert_eq!(err.to_string(), "OpenAI API key not found");

        let ai = ai_with_key("gpt-4o", "openai", "user-key");
        let resolved = c.resolve(&ai, false).unwrap();
        assert_eq!(resolved.provider, Provider::OpenAi);
        assert_eq!(resolved.api_key, "user-key");
    }

    #[test]
    fn test_has_credential_marker() {
        assert!(has_credential_marker("Invalid x-api-key"));
        assert!(has_credential_marker("API key not valid. Please pass a valid API key."));
        assert!(has_credential_marker("Unauthorized"));
        assert!(!has_credential_marker("model is overloaded"));
    }

    #[test]
    fn test_classify_api_error() {
        assert!(matches!(
            classify_api_error(429, "slow down".to_string()),
            LlmError::RateLimited
        ));
        assert!(matches!(
            classify_api_error(401, "bad token".to_string()),
            LlmError::Unauthorized(_)
        ));
        // Gemini reports a bad key as 400; the marker catches it.
        assert!(matches!(
            classify_api_error(400, "API key not valid".to_string()),
            LlmError::Unauthorized(_)
        ));
        assert!(matches!(
            classify_api_error(500, "internal".to_string()),
            LlmError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error": {"message": "invalid x-api-key", "type": "authentication_error"}}"#;
        assert_eq!(extract_error_message(body), "invalid x-api-key");
        assert_eq!(extract_error_message("plain text"), "plain text");
    }

    #[test]
    fn test_ai_config_accepts_camel_case_payloads() {
        let ai: AiConfig = serde_json::from_str(
            r#"{"model": "claude-3-5-sonnet", "apiKeys": [{"service": "anthropic", "key": "k", "addedAt": "2025-01-01"}]}"#,
        )
        .unwrap();
        assert_eq!(ai.api_keys.len(), 1);
        assert_eq!(ai.api_keys[0].service, "anthropic");
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }
}
