//! HTTP-backed agent runner — calls an LLM API directly instead of spawning
//! local agent processes.

use async_trait::async_trait;

use crate::crew::{Capability, CrewAgent};
use crate::error::CoreError;
use crate::runner::{AgentMessage, AgentRunner, Role};

/// Which wire format the endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiFlavor {
    /// Anthropic-compatible Messages API (`POST {base}/v1/messages`)
    #[default]
    Anthropic,
    /// OpenAI-compatible chat completions (`POST {base}/chat/completions`)
    OpenAi,
}

#[derive(Debug, Clone)]
pub struct HttpRunnerConfig {
    pub flavor: ApiFlavor,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f64>,
}

impl Default for HttpRunnerConfig {
    fn default() -> Self {
        Self {
            flavor: ApiFlavor::Anthropic,
            base_url: "https://api.anthropic.com".to_string(),
            api_key: String::new(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 8192,
            temperature: None,
        }
    }
}

impl HttpRunnerConfig {
    /// Build a config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let flavor = match std::env::var("CREWLINE_API_FLAVOR").as_deref() {
            Ok("openai") => ApiFlavor::OpenAi,
            _ => ApiFlavor::Anthropic,
        };
        Self {
            flavor,
            base_url: std::env::var("ANTHROPIC_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("ANTHROPIC_AUTH_TOKEN")
                .or_else(|_| std::env::var("ANTHROPIC_API_KEY"))
                .unwrap_or_default(),
            model: std::env::var("ANTHROPIC_MODEL").unwrap_or(defaults.model),
            max_tokens: defaults.max_tokens,
            temperature: None,
        }
    }
}

/// Calls the configured LLM API to produce agent turns.
pub struct HttpAgentRunner {
    client: reqwest::Client,
    config: HttpRunnerConfig,
}

impl HttpAgentRunner {
    pub fn new(config: HttpRunnerConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(HttpRunnerConfig::from_env())
    }

    async fn call_anthropic(
        &self,
        system: &str,
        messages: &[AgentMessage],
    ) -> Result<String, CoreError> {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));

        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "system": system,
            "messages": wire_messages(messages),
        });
        if let Some(temp) = self.config.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        tracing::info!("[HttpAgentRunner] POST {} (model: {})", url, self.config.model);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Runner(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CoreError::Runner(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(CoreError::Runner(format!("API returned {}: {}", status, text)));
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| CoreError::Runner(format!("failed to parse response JSON: {}", e)))?;

        // Concatenate the text blocks of the Anthropic response.
        let content = json
            .get("content")
            .and_then(|c| c.as_array())
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                    .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        Ok(content)
    }

    async fn call_openai(
        &self,
        system: &str,
        messages: &[AgentMessage],
    ) -> Result<String, CoreError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let mut wire = vec![serde_json::json!({ "role": "system", "content": system })];
        wire.extend(wire_messages(messages));

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": wire,
        });
        if let Some(temp) = self.config.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        tracing::info!("[HttpAgentRunner] POST {} (model: {})", url, self.config.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::Runner(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CoreError::Runner(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(CoreError::Runner(format!("API returned {}: {}", status, text)));
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| CoreError::Runner(format!("failed to parse response JSON: {}", e)))?;

        Ok(json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or("")
            .to_string())
    }
}

#[async_trait]
impl AgentRunner for HttpAgentRunner {
    async fn complete(
        &self,
        agent: &CrewAgent,
        messages: &[AgentMessage],
    ) -> Result<String, CoreError> {
        let system = system_prompt(agent);
        match self.config.flavor {
            ApiFlavor::Anthropic => self.call_anthropic(&system, messages).await,
            ApiFlavor::OpenAi => self.call_openai(&system, messages).await,
        }
    }
}

fn wire_messages(messages: &[AgentMessage]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            serde_json::json!({ "role": role, "content": m.content })
        })
        .collect()
}

/// Build the agent persona plus instructions for the granted tool directives.
fn system_prompt(agent: &CrewAgent) -> String {
    let mut prompt = format!("You are {}.\nYour goal: {}", agent.role, agent.goal);
    if !agent.backstory.is_empty() {
        prompt.push_str(&format!("\nBackstory: {}", agent.backstory));
    }

    let mut tool_lines = Vec::new();
    if agent.has_capability(Capability::RemoteSearch) {
        tool_lines.push("SEARCH: <query> — search the web");
    }
    if agent.has_capability(Capability::PageFetch) {
        tool_lines.push("FETCH: <url> — fetch a web page");
    }
    if agent.has_capability(Capability::HumanInput) {
        tool_lines.push("ASK_HUMAN: <question> — ask the human operator");
    }
    if !tool_lines.is_empty() {
        prompt.push_str(
            "\n\nTo use a tool, reply with exactly one directive line and nothing else:\n",
        );
        prompt.push_str(&tool_lines.join("\n"));
        prompt.push_str("\nThe result comes back as the next user message. Otherwise reply with your answer.");
    }
    prompt
}
