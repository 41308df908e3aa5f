//! AI Provider implementations

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::message::MessageGenerator;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.deepseek.com";
const DEFAULT_OPENAI_MODEL: &str = "deepseek-chat";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Supported AI providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiProvider {
    /// Any OpenAI-compatible chat completion endpoint
    #[default]
    OpenAI,
    Anthropic,
}

impl std::str::FromStr for AiProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "gpt" | "deepseek" => Ok(AiProvider::OpenAI),
            "anthropic" | "claude" => Ok(AiProvider::Anthropic),
            _ => anyhow::bail!("Unknown AI provider: {}. Use 'openai' or 'anthropic'", s),
        }
    }
}

impl AiProvider {
    fn key_env_var(self) -> &'static str {
        match self {
            AiProvider::OpenAI => "OPENAI_API_KEY",
            AiProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// AI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Generate commit messages with the model
    #[serde(default)]
    pub enabled: bool,
    /// AI provider to use
    #[serde(default = "default_provider")]
    pub provider: String,
    /// API key (can use env var like ${DEEPSEEK_API_KEY})
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: Option<String>,
    /// Model to use
    pub model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_max_tokens() -> u32 {
    64
}

fn default_temperature() -> f32 {
    0.5
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            api_key: None,
            base_url: None,
            model: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Request to Anthropic Claude API
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

/// Response from Anthropic Claude API
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

/// Request to an OpenAI-compatible chat completion API
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    n: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Response from an OpenAI-compatible chat completion API
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageContent,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessageContent {
    content: Option<String>,
}

/// AI client for making API calls
pub struct AiClient {
    provider: AiProvider,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    client: reqwest::Client,
}

impl AiClient {
    /// Create a new AI client from configuration
    pub fn new(config: &AiConfig) -> Result<Self> {
        let provider: AiProvider = config.provider.parse()?;
        let api_key = resolve_api_key(config.api_key.as_deref(), provider)?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| match provider {
                AiProvider::OpenAI => DEFAULT_OPENAI_BASE_URL.to_string(),
                AiProvider::Anthropic => DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            })
            .trim_end_matches('/')
            .to_string();

        let model = config.model.clone().unwrap_or_else(|| match provider {
            AiProvider::OpenAI => DEFAULT_OPENAI_MODEL.to_string(),
            AiProvider::Anthropic => DEFAULT_ANTHROPIC_MODEL.to_string(),
        });

        Ok(Self {
            provider,
            api_key,
            base_url,
            model,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            client: reqwest::Client::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        match self.provider {
            AiProvider::OpenAI => format!("{}/chat/completions", self.base_url),
            AiProvider::Anthropic => format!("{}/v1/messages", self.base_url),
        }
    }

    async fn call_api(&self, prompt: &str) -> Result<String> {
        match self.provider {
            AiProvider::Anthropic => self.call_anthropic(prompt).await,
            AiProvider::OpenAI => self.call_openai(prompt).await,
        }
    }

    async fn call_anthropic(&self, prompt: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to call Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic API error ({}): {}", status, error_text);
        }

        let result: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        result
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .context("Empty response from Anthropic")
    }

    async fn call_openai(&self, prompt: &str) -> Result<String> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            n: 1,
            stream: false,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to call chat completion API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat completion API error ({}): {}", status, error_text);
        }

        let result: OpenAIResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        parse_openai_content(result)
    }
}

impl MessageGenerator for AiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.call_api(prompt).await
    }
}

fn parse_openai_content(result: OpenAIResponse) -> Result<String> {
    result
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .context("Empty response from chat completion API")
}

/// Resolve the API key from config (with env var expansion) or the provider's env var
fn resolve_api_key(configured: Option<&str>, provider: AiProvider) -> Result<String> {
    let key = match configured {
        Some(raw) if !raw.trim().is_empty() => shellexpand::env(raw)
            .with_context(|| format!("Failed to expand API key '{}'", raw))?
            .into_owned(),
        _ => std::env::var(provider.key_env_var()).with_context(|| {
            format!(
                "API key not found. Pass --api-key, set it in the config or via {}",
                provider.key_env_var()
            )
        })?,
    };

    if key.trim().is_empty() {
        anyhow::bail!("API key is empty");
    }

    Ok(key)
}
