use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod columns;

pub use columns::Column;

/// Longest retention the form offers, in months.
pub const MAX_RETENTION_MONTHS: u32 = 120;
pub const DEFAULT_ARCHIVE_RETENTION: u32 = 6;
pub const DEFAULT_EXPORT_RETENTION: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Folder {
    Import,
    Feed,
    Export,
}

impl Folder {
    pub const ALL: [Folder; 3] = [Folder::Import, Folder::Feed, Folder::Export];

    pub fn label(self) -> &'static str {
        match self {
            Folder::Import => "Import",
            Folder::Feed => "Feed",
            Folder::Export => "Export",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            Folder::Import => "bring data in (SFTP, REST API, Cloud Storage -> local file)",
            Folder::Feed => "load / transform data in the database (INSERT, UPSERT, views...)",
            Folder::Export => "extract data and send it out (SFTP, REST API, Cloud Storage)",
        }
    }

    pub fn parse(s: &str) -> Option<Folder> {
        Folder::ALL
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Folder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Platform {
    #[default]
    BQ,
    TD,
}

const BQ_TYPES: &[&str] = &[
    "STRING", "INT64", "NUMERIC", "FLOAT64", "BOOL", "DATE", "TIMESTAMP", "BYTES",
];

const TD_TYPES: &[&str] = &[
    "VARCHAR(255)", "INTEGER", "BIGINT", "DECIMAL(15,2)", "FLOAT", "DATE", "TIMESTAMP",
    "BYTEINT", "BYTE(100)",
];

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::BQ, Platform::TD];

    pub fn code(self) -> &'static str {
        match self {
            Platform::BQ => "BQ",
            Platform::TD => "TD",
        }
    }

    /// Column types offered for this platform; the first one is the default.
    pub fn column_types(self) -> &'static [&'static str] {
        match self {
            Platform::BQ => BQ_TYPES,
            Platform::TD => TD_TYPES,
        }
    }

    pub fn default_column_type(self) -> &'static str {
        self.column_types()[0]
    }

    pub fn parse(s: &str) -> Option<Platform> {
        Platform::ALL
            .into_iter()
            .find(|p| p.code().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "SFTP")]
    Sftp,
    #[serde(rename = "API REST", alias = "REST API")]
    RestApi,
    #[serde(rename = "Cloud Storage (GCS)", alias = "GCS")]
    CloudStorage,
    #[serde(rename = "Local files")]
    LocalFiles,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Sftp,
        SourceKind::RestApi,
        SourceKind::CloudStorage,
        SourceKind::LocalFiles,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Sftp => "SFTP",
            SourceKind::RestApi => "API REST",
            SourceKind::CloudStorage => "Cloud Storage (GCS)",
            SourceKind::LocalFiles => "Local files",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestinationKind {
    #[serde(rename = "SFTP")]
    Sftp,
    #[serde(rename = "API REST", alias = "REST API")]
    RestApi,
    #[serde(rename = "Cloud Storage (GCS)", alias = "GCS")]
    CloudStorage,
}

impl DestinationKind {
    pub const ALL: [DestinationKind; 3] = [
        DestinationKind::Sftp,
        DestinationKind::RestApi,
        DestinationKind::CloudStorage,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DestinationKind::Sftp => "SFTP",
            DestinationKind::RestApi => "API REST",
            DestinationKind::CloudStorage => "Cloud Storage (GCS)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    pub const ALL: [FileFormat; 2] = [FileFormat::Csv, FileFormat::Json];

    pub fn label(self) -> &'static str {
        match self {
            FileFormat::Csv => "CSV",
            FileFormat::Json => "JSON",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoadMode {
    Full,
    Insert,
    Update,
    Upsert,
}

impl LoadMode {
    pub const ALL: [LoadMode; 4] = [LoadMode::Full, LoadMode::Insert, LoadMode::Update, LoadMode::Upsert];

    pub fn label(self) -> &'static str {
        match self {
            LoadMode::Full => "FULL",
            LoadMode::Insert => "INSERT",
            LoadMode::Update => "UPDATE",
            LoadMode::Upsert => "UPSERT",
        }
    }

    /// UPDATE and UPSERT are rendered as a MERGE keyed on the primary key.
    pub fn needs_primary_key(self) -> bool {
        matches!(self, LoadMode::Update | LoadMode::Upsert)
    }
}

/// Everything the user (or the demo generator) has told us about the workflow.
///
/// Optional slots stay `None` until the matching form path fills them in; the
/// prompt renderer skips every `None` (and every blank string).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    pub domain: String,
    pub folders: Vec<Folder>,
    pub platform: Platform,
    pub description: String,

    pub source: Option<SourceKind>,
    pub destination: Option<DestinationKind>,
    pub file_format: Option<FileFormat>,
    pub delimiter: Option<String>,
    pub has_header: Option<bool>,
    pub source_uri: Option<String>,
    pub destination_uri: Option<String>,

    pub staging_table: Option<String>,
    pub core_table: Option<String>,
    pub load_mode: Option<LoadMode>,
    pub primary_key: Option<String>,

    pub input_dir: Option<String>,
    pub work_dir: Option<String>,
    pub archive_dir: Option<String>,
    pub export_dir: Option<String>,
    pub file_mask: Option<String>,
    pub export_file_name: Option<String>,

    pub archive_retention_months: Option<u32>,
    pub export_retention_months: Option<u32>,

    pub extra_instructions: Option<String>,

    pub columns: Vec<Column>,
}

/// Non-blocking remarks on a context; shown to the user, never enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    MissingPrimaryKey(LoadMode),
    InvalidFileMask(String),
    RetentionTooLong { field: &'static str, months: u32 },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::MissingPrimaryKey(mode) => {
                write!(f, "load mode {} usually needs a primary key", mode.label())
            }
            Advisory::InvalidFileMask(err) => write!(f, "file mask is not a valid regex: {err}"),
            Advisory::RetentionTooLong { field, months } => write!(
                f,
                "{field} retention of {months} months exceeds {MAX_RETENTION_MONTHS}"
            ),
        }
    }
}

/// Trimmed copy of `s`, or `None` when nothing is left.
pub fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

impl Context {
    pub fn has_folder(&self, folder: Folder) -> bool {
        self.folders.contains(&folder)
    }

    /// Replace the folder selection, keeping the canonical Import/Feed/Export order.
    pub fn set_folders<I: IntoIterator<Item = Folder>>(&mut self, folders: I) {
        let mut v: Vec<Folder> = folders.into_iter().collect();
        v.sort();
        v.dedup();
        self.folders = v;
    }

    pub fn toggle_folder(&mut self, folder: Folder) {
        if self.has_folder(folder) {
            self.folders.retain(|f| *f != folder);
        } else {
            let mut next = self.folders.clone();
            next.push(folder);
            self.set_folders(next);
        }
    }

    /// Append a block of text to the supplementary instructions.
    pub fn append_instructions(&mut self, heading: &str, text: &str) {
        let existing = self.extra_instructions.take().unwrap_or_default();
        self.extra_instructions = Some(format!("{existing}\n\n{heading}\n{text}"));
    }

    /// Fill the step-3 defaults the form pre-selects.
    pub fn apply_detail_defaults(&mut self) {
        if self.has_folder(Folder::Import) && self.has_header.is_none() {
            self.has_header = Some(true);
        }
        self.archive_retention_months.get_or_insert(DEFAULT_ARCHIVE_RETENTION);
        self.export_retention_months.get_or_insert(DEFAULT_EXPORT_RETENTION);
    }

    pub fn advisories(&self) -> Vec<Advisory> {
        let mut out = Vec::new();
        if let Some(mode) = self.load_mode {
            let pk_missing = self.primary_key.as_deref().map_or(true, |k| k.trim().is_empty());
            if mode.needs_primary_key() && pk_missing {
                out.push(Advisory::MissingPrimaryKey(mode));
            }
        }
        if let Some(mask) = self.file_mask.as_deref().filter(|m| !m.trim().is_empty()) {
            if let Err(e) = Regex::new(mask) {
                out.push(Advisory::InvalidFileMask(e.to_string()));
            }
        }
        for (field, months) in [
            ("archive", self.archive_retention_months),
            ("export", self.export_retention_months),
        ] {
            if let Some(m) = months.filter(|m| *m > MAX_RETENTION_MONTHS) {
                out.push(Advisory::RetentionTooLong { field, months: m });
            }
        }
        out
    }

    /// Compact summary for the progress banner. Empty until a domain exists.
    pub fn recap(&self) -> Vec<(&'static str, String)> {
        if self.domain.trim().is_empty() {
            return Vec::new();
        }
        let mut out = vec![
            ("Domain", self.domain.clone()),
            ("Platform", self.platform.code().to_string()),
        ];
        if !self.folders.is_empty() {
            let names: Vec<&str> = self.folders.iter().map(|f| f.label()).collect();
            out.push(("Folders", names.join(", ")));
        }
        if !self.columns.is_empty() {
            out.push(("Columns", self.columns.len().to_string()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folders_keep_canonical_order() {
        let mut ctx = Context::default();
        ctx.set_folders([Folder::Export, Folder::Import, Folder::Export]);
        assert_eq!(ctx.folders, vec![Folder::Import, Folder::Export]);

        ctx.toggle_folder(Folder::Feed);
        assert_eq!(ctx.folders, vec![Folder::Import, Folder::Feed, Folder::Export]);
        ctx.toggle_folder(Folder::Import);
        assert_eq!(ctx.folders, vec![Folder::Feed, Folder::Export]);
    }

    #[test]
    fn upsert_without_key_is_advisory_only() {
        let ctx = Context {
            load_mode: Some(LoadMode::Upsert),
            ..Context::default()
        };
        assert_eq!(ctx.advisories(), vec![Advisory::MissingPrimaryKey(LoadMode::Upsert)]);

        let keyed = Context {
            load_mode: Some(LoadMode::Upsert),
            primary_key: Some("id".into()),
            ..Context::default()
        };
        assert!(keyed.advisories().is_empty());
    }

    #[test]
    fn bad_mask_and_long_retention_are_flagged() {
        let ctx = Context {
            file_mask: Some("^orders_(\\d{8}\\.csv$".into()),
            export_retention_months: Some(200),
            ..Context::default()
        };
        let adv = ctx.advisories();
        assert_eq!(adv.len(), 2);
        assert!(matches!(adv[0], Advisory::InvalidFileMask(_)));
        assert_eq!(adv[1], Advisory::RetentionTooLong { field: "export", months: 200 });
    }

    #[test]
    fn append_instructions_keeps_existing_text() {
        let mut ctx = Context {
            extra_instructions: Some("Keep history".into()),
            ..Context::default()
        };
        ctx.append_instructions("Answers:", "1. daily");
        assert_eq!(ctx.extra_instructions.as_deref(), Some("Keep history\n\nAnswers:\n1. daily"));
    }

    #[test]
    fn deserializes_partial_payload() {
        let ctx: Context = serde_json::from_str(
            r#"{"domain":"Orders","platform":"TD","folders":["Import","Feed"],
                "source":"API REST","load_mode":"UPSERT",
                "columns":[{"name":"id","type":"INTEGER","nullable":false},{"name":"label","type":"VARCHAR(255)"}]}"#,
        )
        .unwrap();
        assert_eq!(ctx.platform, Platform::TD);
        assert_eq!(ctx.source, Some(SourceKind::RestApi));
        assert_eq!(ctx.load_mode, Some(LoadMode::Upsert));
        assert!(!ctx.columns[0].nullable);
        assert!(ctx.columns[1].nullable);
        assert!(ctx.description.is_empty());
    }

    #[test]
    fn recap_is_empty_without_domain() {
        assert!(Context::default().recap().is_empty());
        let ctx = Context {
            domain: "Stock".into(),
            folders: vec![Folder::Feed],
            ..Context::default()
        };
        let recap = ctx.recap();
        assert_eq!(recap[0], ("Domain", "Stock".to_string()));
        assert_eq!(recap[2], ("Folders", "Feed".to_string()));
    }
}
