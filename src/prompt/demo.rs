use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::PromptPair;
use crate::context::{columns, Context, Platform};
use crate::errors::{JobMasterError, Result};

/// Business domains the demo picks from.
pub const DEMO_DOMAINS: &[&str] = &[
    "Customers",
    "Stock",
    "Orders",
    "HR (Human Resources)",
    "Logistics",
    "Suppliers",
    "Products",
    "Contracts",
    "Claims (Insurance)",
    "Bank transactions",
    "Subscriptions",
    "Marketing campaigns",
    "Support tickets",
    "Vehicles (Fleet)",
    "Patients (Healthcare)",
    "Bookings",
    "Inventory",
    "Payroll",
    "Deliveries",
    "IoT sensor data",
];

/// Domain and platform imposed on the demo context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoPick {
    pub domain: String,
    pub platform: Platform,
}

/// Chooses the domain/platform pair for a demo run.
pub trait DemoPicker {
    fn pick(&mut self) -> DemoPick;
}

pub struct RandomPicker<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomPicker<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomPicker<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> DemoPicker for RandomPicker<R> {
    fn pick(&mut self) -> DemoPick {
        let domain = DEMO_DOMAINS.choose(&mut self.rng).copied().unwrap_or(DEMO_DOMAINS[0]);
        let platform = Platform::ALL.choose(&mut self.rng).copied().unwrap_or_default();
        DemoPick { domain: domain.to_string(), platform }
    }
}

fn type_hint(platform: Platform) -> String {
    platform.column_types().join(", ")
}

pub fn system_prompt_demo(documentation: &str) -> String {
    format!(
r#"You are a data engineering expert. Invent a realistic use case for a JobMaster
workflow using the domain AND the platform imposed below. Produce one complete JSON
object with these fields:

- domain: business domain name (USE the imposed domain)
- description: detailed description of the need in 2-3 sentences
- platform: USE the imposed platform ("BQ" or "TD")
- folders: list drawn from ["Import", "Feed", "Export"] (often Import + Feed)
- source: data source, one of "SFTP", "API REST", "Cloud Storage (GCS)", "Local files"
- file_format: "CSV" or "JSON"
- delimiter: CSV delimiter (when relevant)
- columns: list of 5 to 10 objects {{"name": string, "type": string, "nullable": bool}}
- load_mode: "FULL", "INSERT", "UPDATE" or "UPSERT"
- staging_table, core_table, primary_key: strings (primary_key when load_mode is UPDATE or UPSERT)

IMPORTANT: column types must belong to the imposed platform.
  BQ -> {bq}
  TD -> {td}

Reply ONLY with the JSON, with no introduction or comment. The JSON must be valid.

DOCUMENTATION:
{documentation}"#,
        bq = type_hint(Platform::BQ),
        td = type_hint(Platform::TD),
    )
}

pub fn user_prompt_demo(pick: &DemoPick) -> String {
    format!(
        "Imposed domain: {}\nImposed platform: {}\n\nGenerate a realistic workflow context.",
        pick.domain,
        pick.platform.code()
    )
}

pub fn demo(pick: &DemoPick, documentation: &str) -> PromptPair {
    PromptPair {
        system: system_prompt_demo(documentation),
        user: user_prompt_demo(pick),
    }
}

/// Drop a surrounding ``` fence (with or without a language tag).
pub fn strip_code_fence(reply: &str) -> &str {
    let t = reply.trim();
    if !t.starts_with("```") {
        return t;
    }
    let inner = match t.split_once('\n') {
        Some((_, rest)) => rest,
        None => return "",
    };
    match inner.rfind("```") {
        Some(end) => inner[..end].trim(),
        None => inner.trim(),
    }
}

/// Parse the demo reply into a context. Malformed JSON is a hard error.
///
/// A missing domain or platform falls back to the pick.
pub fn parse_payload(reply: &str, pick: &DemoPick) -> Result<Context> {
    let payload = |e: serde_json::Error| JobMasterError::Payload(e.to_string());
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(reply)).map_err(payload)?;
    let has_platform = value.get("platform").is_some_and(|p| !p.is_null());
    let mut ctx: Context = serde_json::from_value(value).map_err(payload)?;

    if ctx.domain.trim().is_empty() {
        ctx.domain = pick.domain.clone();
    }
    if !has_platform {
        ctx.platform = pick.platform;
    }
    let folders = std::mem::take(&mut ctx.folders);
    ctx.set_folders(folders);
    ctx.columns = columns::normalize(std::mem::take(&mut ctx.columns));
    Ok(ctx)
}
