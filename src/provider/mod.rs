use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use crate::cli::ProviderKind;
use crate::config::Config;
use crate::wire::CompletionRequest;

pub mod anthropic;
pub mod ollama;
pub mod openai;

/// Single opaque call to a hosted model: messages in, reply text out.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn complete(&self, req: &CompletionRequest) -> Result<String>;
}

pub type DynProvider = Box<dyn Provider + Send + Sync>;

const GROQ_BASE: &str = "https://api.groq.com/openai";
const OPENAI_BASE: &str = "https://api.openai.com";
const ANTHROPIC_BASE: &str = "https://api.anthropic.com";
const OLLAMA_BASE: &str = "http://localhost:11434";

/// Environment variable holding the credential, if the provider needs one.
pub fn api_key_var(kind: ProviderKind) -> Option<&'static str> {
    match kind {
        ProviderKind::Groq => Some("GROQ_API_KEY"),
        ProviderKind::OpenAI => Some("OPENAI_API_KEY"),
        ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
        ProviderKind::Ollama => None,
    }
}

/// True when the credential for `kind` is present (or not needed).
pub fn has_credential(kind: ProviderKind) -> bool {
    api_key_var(kind).map_or(true, |var| std::env::var(var).map_or(false, |v| !v.trim().is_empty()))
}

/// Read the credential at call time; a missing key stops the call before it starts.
pub(crate) fn read_api_key(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(anyhow::anyhow!("{var} env var is not set")),
    }
}

pub fn make_provider(cfg: &Config) -> Result<DynProvider> {
    let timeout = Duration::from_secs(cfg.timeout_secs);
    let base = |default: &str| cfg.api_base.clone().unwrap_or_else(|| default.to_string());
    let provider: DynProvider = match cfg.provider {
        ProviderKind::Groq => Box::new(openai::OpenAICompatible::new(base(GROQ_BASE), "GROQ_API_KEY", timeout)?),
        ProviderKind::OpenAI => Box::new(openai::OpenAICompatible::new(base(OPENAI_BASE), "OPENAI_API_KEY", timeout)?),
        ProviderKind::Anthropic => Box::new(anthropic::Anthropic::new(base(ANTHROPIC_BASE), timeout)?),
        ProviderKind::Ollama => Box::new(ollama::Ollama::new(base(OLLAMA_BASE), timeout)?),
    };
    Ok(provider)
}
