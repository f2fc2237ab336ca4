use anyhow::{Context as _, Result};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::{Args, ProviderKind};

/// Groq models offered by `--list-models`; the first is the default.
pub const KNOWN_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "llama-3.1-8b-instant",
    "gemma2-9b-it",
    "mixtral-8x7b-32768",
];

/// Sampling knobs for one kind of model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CallParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    pub model: String,
    pub api_base: Option<String>,
    pub timeout_secs: u64,
    pub doc_path: String,
    pub out_dir: String,
    pub artifact_root: String,
    pub generation: CallParams,
    pub clarification: CallParams,
    pub demo: CallParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Groq,
            model: KNOWN_MODELS[0].into(),
            api_base: None,
            timeout_secs: 600,
            doc_path: "doc.txt".into(),
            out_dir: ".".into(),
            artifact_root: ".".into(),
            generation: CallParams { temperature: 0.3, max_tokens: 8000 },
            clarification: CallParams { temperature: 0.4, max_tokens: 2000 },
            demo: CallParams { temperature: 0.9, max_tokens: 2000 },
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("invalid config TOML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s).with_context(|| format!("reading {}", path.display()))
    }

    /// Defaults, then the optional config file, then command-line flags.
    pub fn resolve(args: &Args) -> Result<Self> {
        let mut cfg = match &args.config {
            Some(p) => Self::load(Path::new(p))?,
            None => Self::default(),
        };
        if let Some(p) = args.provider {
            cfg.provider = p;
        }
        if let Some(m) = &args.model {
            cfg.model = m.clone();
        }
        if let Some(b) = &args.api_base {
            cfg.api_base = Some(b.clone());
        }
        if let Some(d) = &args.doc {
            cfg.doc_path = d.clone();
        }
        if let Some(o) = &args.out_dir {
            cfg.out_dir = o.clone();
        }
        if let Some(t) = args.timeout_secs {
            cfg.timeout_secs = t;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = Config::from_toml_str(
            r#"
provider = "ollama"
model = "qwen2.5-coder"

[generation]
temperature = 0.1
max_tokens = 12000
"#,
        )
        .unwrap();
        assert_eq!(cfg.provider, ProviderKind::Ollama);
        assert_eq!(cfg.generation, CallParams { temperature: 0.1, max_tokens: 12000 });
        assert_eq!(cfg.clarification, CallParams { temperature: 0.4, max_tokens: 2000 });
        assert_eq!(cfg.doc_path, "doc.txt");
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobmaster.toml");
        fs::write(&path, "model = \"from-file\"\nout_dir = \"file-out\"\n").unwrap();
        let args = Args::parse_from([
            "jobmaster",
            "--config",
            path.to_str().unwrap(),
            "--model",
            "from-flag",
        ]);
        let cfg = Config::resolve(&args).unwrap();
        assert_eq!(cfg.model, "from-flag");
        assert_eq!(cfg.out_dir, "file-out");
    }
}
