use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::wire::{ChatMessage, CompletionRequest};

/// Chat-completions client for OpenAI and API-compatible hosts (Groq).
pub struct OpenAICompatible {
    client: Client,
    api_base: String,
    key_var: &'static str,
}

impl OpenAICompatible {
    pub fn new(api_base: String, key_var: &'static str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, api_base, key_var })
    }

    fn url(&self) -> String {
        format!("{}/v1/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

fn body(req: &CompletionRequest) -> ChatRequest<'_> {
    ChatRequest {
        model: &req.model,
        messages: &req.messages,
        temperature: req.temperature,
        max_tokens: req.max_tokens,
    }
}

fn reply_text(raw: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(raw)
        .map_err(|e| anyhow!("failed to parse chat response: {e}\nRaw: {raw}"))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow!("chat response had no content"))
}

#[async_trait]
impl super::Provider for OpenAICompatible {
    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let api_key = super::read_api_key(self.key_var)?;
        let url = self.url();
        tracing::debug!(%url, model = %req.model, "POST chat completion");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body(req))
            .send()
            .await
            .context("chat completion request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("reading chat completion body failed")?;
        tracing::trace!(%status, body = %text, "chat completion raw response");

        if !status.is_success() {
            return Err(anyhow!("API error ({status}): {text}"));
        }
        reply_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let req = CompletionRequest {
            model: "llama-3.3-70b-versatile".into(),
            messages: vec![ChatMessage::system("s"), ChatMessage::user("u")],
            temperature: 0.3,
            max_tokens: 8000,
        };
        let json = serde_json::to_value(body(&req)).unwrap();
        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "u");
        assert_eq!(json["max_tokens"], 8000);
    }

    #[test]
    fn extracts_first_choice() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"1. What?"}}]}"#;
        assert_eq!(reply_text(raw).unwrap(), "1. What?");
        assert!(reply_text(r#"{"choices":[]}"#).is_err());
        assert!(reply_text("<html>").is_err());
    }

    #[test]
    fn url_joins_base() {
        let p = OpenAICompatible::new("https://api.groq.com/openai/".into(), "GROQ_API_KEY", Duration::from_secs(1)).unwrap();
        assert_eq!(p.url(), "https://api.groq.com/openai/v1/chat/completions");
    }
}
