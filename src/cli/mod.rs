use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Groq,
    #[value(alias = "openai")]
    OpenAI,
    Anthropic,
    Ollama,
}

#[derive(Parser, Debug)]
#[command(name = "jobmaster", version, about = "Guided generator for JobMaster workflow YAML and SQL files")]
pub struct Args {
    /// TOML file with defaults; flags below override it.
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    #[arg(long)]
    pub model: Option<String>,

    /// Override the provider's base URL.
    #[arg(long)]
    pub api_base: Option<String>,

    /// Reference documentation injected into every system prompt.
    #[arg(long)]
    pub doc: Option<String>,

    /// Where the generated archive is written.
    #[arg(long)]
    pub out_dir: Option<String>,

    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Invent a demo context and generate straight away, without prompting.
    #[arg(long, default_value_t = false, conflicts_with = "context")]
    pub demo: bool,

    /// Generate from a context JSON file, without prompting.
    #[arg(long)]
    pub context: Option<String>,

    #[arg(long, default_value_t = false)]
    pub save_request: bool,

    #[arg(long, default_value_t = false)]
    pub save_response: bool,

    #[arg(long, default_value_t = false)]
    pub debug: bool,

    #[arg(long, default_value_t = false)]
    pub list_models: bool,
}
