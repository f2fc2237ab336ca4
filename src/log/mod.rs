use anyhow::Result;
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::wire::CompletionRequest;

/// Install the global subscriber. `RUST_LOG` wins when set.
pub fn init(debug: bool) {
    let default = if debug { "warn,jobmaster=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// On-disk shape of `<stage>.request.json`.
#[derive(Serialize)]
struct RequestRecord<'a> {
    tx: Uuid,
    stage: &'a str,
    recorded_at: DateTime<Utc>,
    request: &'a CompletionRequest,
}

pub struct SavedPaths {
    pub dir: PathBuf,
    pub request: Option<PathBuf>,
    pub reply: Option<PathBuf>,
}

fn tx_dir(root: &Path, tx: Uuid) -> PathBuf {
    root.join(".jobmaster").join("tx").join(tx.to_string())
}

/// Writes per-call transcripts for one session.
#[derive(Debug, Clone)]
pub struct Recorder {
    root: PathBuf,
    tx: Uuid,
    save_request: bool,
    save_reply: bool,
}

impl Recorder {
    pub fn new(root: impl Into<PathBuf>, save_request: bool, save_reply: bool) -> Self {
        Self { root: root.into(), tx: Uuid::new_v4(), save_request, save_reply }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::new(".", false, false)
    }

    pub fn dir(&self) -> PathBuf {
        tx_dir(&self.root, self.tx)
    }

    pub fn is_enabled(&self) -> bool {
        self.save_request || self.save_reply
    }

    /// Save `<stage>.request.json` and `<stage>.reply.txt` as configured.
    /// Returns `None` when nothing is being recorded.
    pub fn record(&self, stage: &str, req: &CompletionRequest, reply: &str) -> Result<Option<SavedPaths>> {
        if !self.is_enabled() {
            return Ok(None);
        }
        let dir = self.dir();
        fs::create_dir_all(&dir)?;

        let mut request = None;
        let mut reply_path = None;

        if self.save_request {
            let p = dir.join(format!("{stage}.request.json"));
            let record = RequestRecord { tx: self.tx, stage, recorded_at: Utc::now(), request: req };
            fs::write(&p, to_string_pretty(&record)?)?;
            request = Some(p);
        }
        if self.save_reply {
            let p = dir.join(format!("{stage}.reply.txt"));
            fs::write(&p, reply)?;
            reply_path = Some(p);
        }

        Ok(Some(SavedPaths { dir, request, reply: reply_path }))
    }
}

pub fn log_saved_paths(stage: &str, saved: &SavedPaths) {
    tracing::debug!(stage, dir = %saved.dir.display(), "transcript directory");
    match &saved.request {
        Some(p) => tracing::debug!(stage, path = %p.display(), "request saved"),
        None => tracing::debug!(stage, "request not saved (flag off)"),
    }
    match &saved.reply {
        Some(p) => tracing::debug!(stage, path = %p.display(), "reply saved"),
        None => tracing::debug!(stage, "reply not saved (flag off)"),
    }
}
