use crate::context::{Context, Folder};
use crate::extract::{close_marker, open_marker};
use crate::wire::ChatMessage;

pub mod demo;

/// System + user text for one model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system), ChatMessage::user(self.user)]
    }
}

fn domain_rules() -> &'static str {
r#"BUSINESS CONTEXT:
- "Import" = bring the data home (SFTP -> local, API -> file, Cloud Storage -> disk).
  An Import folder contains NO INSERT/UPSERT into the database.
- "Feed" = load / transform the data in the database (INSERT, UPSERT, CREATE VIEW, etc.).
  As soon as there is an INSERT or a table load, it belongs in a Feed folder.
- "Export" = extract the data and send it outside (file -> SFTP/API/Cloud Storage).

ABSOLUTE RULES:
- Follow the YAML format of the documentation EXACTLY (2-space indentation, no tabs).
- Use ONLY the job_id values from the official catalogue.
- Every parameter listed for a job_id is MANDATORY.
- The variable prefix is "£" (never #, never $).
- Leave air in the scripts: blank line after the description, after parametres_env, and between jobs.
- id_script has the form Domain_Type_Name (MANDATORY).
- Choose consistent, descriptive YAML and SQL file names yourself: domain prefix, snake_case.
- For installation/: every SQL file has a matching YAML file with a job.run.sql.
- The duration in job.fichier.effacement is in MONTHS (not minutes).
- job.run.create_view takes Plateforme + Table (NO Requete). The view is generated automatically.
- File masks (Masque) are regular expressions."#
}

fn sql_rules() -> &'static str {
r#"SQL RULES:
- BigQuery (.gql): use BQ types (STRING, INT64, NUMERIC, FLOAT64, DATE, TIMESTAMP, BOOL).
- Teradata (.dql): use TD types (VARCHAR(n), INTEGER, DECIMAL(p,s), FLOAT, DATE, TIMESTAMP).
- £ variables are substituted inside SQL (e.g. £BQ_TMP.staging_invoices).
- Loading Cloud Storage data into BigQuery:
    • External table: CREATE OR REPLACE EXTERNAL TABLE with OPTIONS (format, uris, skip_leading_rows).
    • Direct load: LOAD DATA OVERWRITE ... FROM FILES (...).
    • GCS URI: gs://<bucket>/<path>/<pattern>
- Teradata with NOS:
    • External table: CREATE FOREIGN TABLE with USING (LOCATION, STOREDAS, HEADER).
    • S3 URI: /s3/<bucket>/<path>/  |  Azure: /az/<container>/<path>/  |  GCS: /gs/<bucket>/<path>/
- Every SQL file starts with an explanatory comment.
- One SQL statement per file, atomic (one object = one file)."#
}

fn layout_rules() -> String {
    format!(
r#"RESPONSE FORMAT:
For every file to generate, use exactly this format:

{open}
(file content)
{close}

PATH LAYOUT:
Paths must follow this tree:
  Domain/
    Import/
      config/          <- configuration YAML
      sql/             <- SQL scripts
      installation/    <- installation sub-folder (YAML + SQL)
    Feed/
      config/
      sql/
      installation/
    Export/
      config/
      sql/
      installation/
installation/ is ALWAYS a sub-folder of Import, Feed or Export (never at the same level).
Generate EVERY required file: configuration YAML, SQL, and installation YAML + SQL.
Write NO explanatory text outside the file blocks."#,
        open = open_marker("relative/path/of/file.yml"),
        close = close_marker(),
    )
}

pub fn system_prompt_generation(documentation: &str) -> String {
    format!(
"You are a JobMaster expert. You generate YAML workflows and SQL scripts
that comply with the official documentation below.

{rules}

{sql}

{layout}

OFFICIAL DOCUMENTATION:
{documentation}",
        rules = domain_rules(),
        sql = sql_rules(),
        layout = layout_rules(),
    )
}

/// One rendered line per populated field, in the fixed field order.
///
/// Blank strings count as absent. Columns render as an indented sub-list and
/// supplementary instructions as a trailing block.
pub fn context_lines(ctx: &Context) -> Vec<String> {
    let mut lines = Vec::new();
    let mut push = |label: &str, value: Option<String>| {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            lines.push(format!("- {label}: {v}"));
        }
    };
    let text = |v: &Option<String>| v.clone();

    push("Domain", Some(ctx.domain.clone()));
    if !ctx.folders.is_empty() {
        let names: Vec<&str> = ctx.folders.iter().map(|f| f.label()).collect();
        push("Folders to generate", Some(names.join(", ")));
    }
    push("Platform", Some(ctx.platform.code().to_string()));
    push("Description", Some(ctx.description.clone()));

    push("Data source", ctx.source.map(|s| s.label().to_string()));
    push("Source URI", text(&ctx.source_uri));
    push("Export destination", ctx.destination.map(|d| d.label().to_string()));
    push("Destination URI", text(&ctx.destination_uri));

    push("File format", ctx.file_format.map(|f| f.label().to_string()));
    push("CSV delimiter", text(&ctx.delimiter));
    push("File has a header row", ctx.has_header.map(|h| if h { "yes" } else { "no" }.to_string()));

    push("Staging table", text(&ctx.staging_table));
    push("Core table", text(&ctx.core_table));
    push("Primary key (for MERGE/UPSERT)", text(&ctx.primary_key));
    push("Load mode", ctx.load_mode.map(|m| m.label().to_string()));

    if !ctx.columns.is_empty() {
        lines.push(String::new());
        lines.push(format!("Data structure ({} columns):", ctx.columns.len()));
        for col in &ctx.columns {
            let not_null = if col.nullable { "" } else { ", NOT NULL" };
            lines.push(format!("  - {} ({}{})", col.name, col.ty, not_null));
        }
    }

    let mut push = |label: &str, value: Option<String>| {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            lines.push(format!("- {label}: {v}"));
        }
    };
    push("Input directory", text(&ctx.input_dir));
    push("Work directory", text(&ctx.work_dir));
    push("Archive directory", text(&ctx.archive_dir));
    push("Export directory", text(&ctx.export_dir));

    push("Purge archives after", ctx.archive_retention_months.map(|m| format!("{m} months")));
    push("Purge exports after", ctx.export_retention_months.map(|m| format!("{m} months")));

    push("File name mask (regex)", text(&ctx.file_mask));
    push("Export file name", text(&ctx.export_file_name));

    if let Some(extra) = ctx.extra_instructions.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push(String::new());
        lines.push("Additional instructions:".to_string());
        lines.push(extra.trim().to_string());
    }
    lines
}

pub fn user_prompt_generation(ctx: &Context) -> String {
    let mut out = String::from("Generate a complete JobMaster workflow with these parameters:\n\n");
    out.push_str(&context_lines(ctx).join("\n"));
    out.push_str(
        "\n\nGenerate every required file (YAML + SQL + installation) strictly following \
the documentation and the data structure provided.",
    );
    out
}

pub fn generation(ctx: &Context, documentation: &str) -> PromptPair {
    PromptPair {
        system: system_prompt_generation(documentation),
        user: user_prompt_generation(ctx),
    }
}

pub fn system_prompt_clarification(documentation: &str) -> String {
    let folders: Vec<&str> = Folder::ALL.iter().map(|f| f.label()).collect();
    format!(
"You are a JobMaster expert. You are given the partial parameters of a workflow ({folders}).
Analyse them and ask 3 to 6 precise questions to clarify the missing details.
Focus on:
- The data structure if absent (columns, types)
- File paths and URIs
- Business rules (frequency, purge, file mask)
- The load mode (FULL, INSERT, UPSERT, UPDATE)
- The staging and core tables

Reply ONLY with a numbered list of questions. No introduction, no conclusion.

OFFICIAL DOCUMENTATION:
{documentation}",
        folders = folders.join(" / "),
    )
}

pub fn clarification(ctx: &Context, documentation: &str) -> PromptPair {
    PromptPair {
        system: system_prompt_clarification(documentation),
        user: format!("Here is the partial context:\n\n{}", user_prompt_generation(ctx)),
    }
}

/// Heading under which clarification answers are appended to the instructions.
pub const ANSWERS_HEADING: &str = "Answers to the clarification questions:";
