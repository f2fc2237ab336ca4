use serde::{Deserialize, Serialize};

use super::Platform;

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self { name: name.into(), ty: ty.into(), nullable: true }
    }

    /// Blank column pre-filled with the platform's default type.
    pub fn blank(platform: Platform) -> Self {
        Self::new("", platform.default_column_type())
    }
}

/// Canonical spelling of `ty` in the platform vocabulary, if it belongs there.
pub fn canonical_type(platform: Platform, ty: &str) -> Option<&'static str> {
    platform
        .column_types()
        .iter()
        .copied()
        .find(|t| t.eq_ignore_ascii_case(ty.trim()))
}

/// Trim names and drop columns whose name ends up empty. Order is preserved.
pub fn normalize(columns: Vec<Column>) -> Vec<Column> {
    columns
        .into_iter()
        .filter_map(|mut c| {
            let name = c.name.trim();
            if name.is_empty() {
                return None;
            }
            c.name = name.to_string();
            Some(c)
        })
        .collect()
}

/// Parse `name[,type]` lines. Unknown or missing types fall back to the
/// platform default; lines without a name are skipped.
pub fn parse_bulk(input: &str, platform: Platform) -> Vec<Column> {
    input
        .lines()
        .filter_map(|line| {
            let mut parts = line.split(',').map(str::trim);
            let name = parts.next().filter(|n| !n.is_empty())?;
            let mut col = Column::blank(platform);
            col.name = name.to_string();
            if let Some(ty) = parts.next().and_then(|t| canonical_type(platform, t)) {
                col.ty = ty.to_string();
            }
            Some(col)
        })
        .collect()
}
