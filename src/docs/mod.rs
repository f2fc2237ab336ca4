use fs_err as fs;
use std::path::{Path, PathBuf};

use crate::errors::{JobMasterError, Result};

/// Reference documentation injected verbatim into the system prompts.
///
/// Read once per session. A missing or unreadable file is remembered rather
/// than reported immediately: only generation refuses to run without it.
#[derive(Debug, Clone)]
pub struct Documentation {
    path: PathBuf,
    text: Option<String>,
}

impl Documentation {
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(t) if !t.trim().is_empty() => Self { path: path.to_path_buf(), text: Some(t) },
            Ok(_) => {
                tracing::warn!(path = %path.display(), "documentation file is empty");
                Self::missing(path)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "documentation not loaded");
                Self::missing(path)
            }
        }
    }

    #[cfg(test)]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { path: PathBuf::from("<memory>"), text: Some(text.into()) }
    }

    pub fn missing(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), text: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.text.is_some()
    }

    pub fn line_count(&self) -> usize {
        self.text.as_deref().map_or(0, |t| t.lines().count())
    }

    /// Text for generation; absence is a configuration error.
    pub fn require(&self) -> Result<&str> {
        self.text.as_deref().ok_or_else(|| {
            JobMasterError::Config(format!("documentation not found ({})", self.path.display()))
        })
    }

    /// Text for clarification and demo prompts; empty when missing.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}
