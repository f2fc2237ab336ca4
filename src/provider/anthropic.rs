use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Provider;
use crate::wire::{CompletionRequest, Role};

const API_VERSION: &str = "2023-06-01";

pub struct Anthropic {
    client: Client,
    api_base: String,
}

impl Anthropic {
    pub fn new(api_base: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, api_base })
    }
}

#[derive(Serialize)]
struct MsgRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Msg<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MsgResponse {
    content: Vec<Block>,
}

#[derive(Deserialize)]
struct Block {
    #[serde(default)]
    text: String,
    #[serde(default)]
    r#type: String,
}

/// The Messages API takes the system prompt as a separate field.
fn to_body(req: &CompletionRequest) -> MsgRequest<'_> {
    MsgRequest {
        model: &req.model,
        max_tokens: req.max_tokens,
        temperature: req.temperature,
        messages: req
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| Msg { role: m.role.as_str(), content: &m.content })
            .collect(),
        system: req.system_text(),
    }
}

fn reply_text(raw: &str) -> Result<String> {
    let parsed: MsgResponse = serde_json::from_str(raw)
        .map_err(|e| anyhow!("anthropic response parse error: {}", e))?;
    let text: String = parsed
        .content
        .into_iter()
        .filter(|b| b.r#type == "text")
        .map(|b| b.text)
        .collect();
    if text.is_empty() {
        return Err(anyhow!("anthropic: empty content"));
    }
    Ok(text)
}

#[async_trait]
impl Provider for Anthropic {
    async fn complete(&self, req: &CompletionRequest) -> Result<String> {
        let api_key = super::read_api_key("ANTHROPIC_API_KEY")?;
        let url = format!("{}/v1/messages", self.api_base.trim_end_matches('/'));
        tracing::debug!(%url, model = %req.model, "POST messages");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&to_body(req))
            .send()
            .await
            .context("anthropic request failed")?;

        let status = resp.status();
        let text = resp.text().await.context("anthropic read body failed")?;
        tracing::trace!(%status, body = %text, "anthropic raw response");

        if !status.is_success() {
            return Err(anyhow!("anthropic API error ({status}): {text}"));
        }
        reply_text(&text)
    }
}
