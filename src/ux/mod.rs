use anyhow::{Context as _, Result};
use colored::Colorize;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

use crate::context::columns::{self, Column};
use crate::context::{
    non_blank, Context, DestinationKind, FileFormat, Folder, LoadMode, Platform, SourceKind,
};
use crate::prompt::demo::RandomPicker;
use crate::session::{Engine, Session};
use crate::tree::FileTree;
use crate::wizard::Step;

/// What the user asked for at the end of a step screen.
enum Flow {
    Stay,
    Moved,
    Quit,
}

fn prompt_line(label: &str) -> Option<String> {
    print!("{label}");
    let _ = io::stdout().flush();
    let mut s = String::new();
    match io::stdin().read_line(&mut s) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(s.trim_end_matches(['\r', '\n']).to_string()),
    }
}

/// Reading of a yes/no answer; empty or unrecognised input keeps `current`.
fn yes_no(answer: &str, current: bool) -> bool {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => current,
    }
}

pub fn confirm(prompt: &str) -> bool {
    prompt_line(&format!("{prompt} [y/N]: "))
        .map(|s| yes_no(&s, false))
        .unwrap_or(false)
}

/// Yes/no question whose default is the current value.
fn ask_yes_no(prompt: &str, current: bool) -> Option<bool> {
    let hint = if current { "[Y/n]" } else { "[y/N]" };
    let s = prompt_line(&format!("{} {hint}: ", prompt.bold()))?;
    Some(yes_no(&s, current))
}

/// Ask for a value; an empty answer keeps `current`.
fn ask(label: &str, current: &str) -> Option<String> {
    let hint = if current.is_empty() { String::new() } else { format!(" [{}]", current.dimmed()) };
    let s = prompt_line(&format!("{}{}: ", label.bold(), hint))?;
    Some(if s.trim().is_empty() { current.to_string() } else { s.trim().to_string() })
}

/// Same as `ask` for optional fields; `-` clears the value.
fn ask_opt(label: &str, current: &Option<String>) -> Option<Option<String>> {
    let s = ask(label, current.as_deref().unwrap_or(""))?;
    Some(if s == "-" { None } else { non_blank(&s) })
}

/// Read lines until an empty one (or EOF).
fn read_block(label: &str) -> String {
    println!("{} {}", label.bold(), "(finish with an empty line)".dimmed());
    let mut lines = Vec::new();
    while let Some(l) = prompt_line("  ") {
        if l.trim().is_empty() {
            break;
        }
        lines.push(l);
    }
    lines.join("\n")
}

fn choose<T: Copy>(label: &str, options: &[(T, &str)], current: Option<T>) -> Option<Option<T>> {
    let listing: Vec<String> = options
        .iter()
        .enumerate()
        .map(|(i, (_, name))| format!("{}={}", i + 1, name))
        .collect();
    let s = prompt_line(&format!("{} ({}, empty keeps, - clears): ", label.bold(), listing.join(" ")))?;
    let s = s.trim();
    if s.is_empty() {
        return Some(current);
    }
    if s == "-" {
        return Some(None);
    }
    match s.parse::<usize>().ok().and_then(|n| options.get(n.wrapping_sub(1))) {
        Some((v, _)) => Some(Some(*v)),
        None => {
            println!("{}", "unknown choice, value kept".yellow());
            Some(current)
        }
    }
}

fn ask_months(label: &str, current: Option<u32>) -> Option<Option<u32>> {
    let cur = current.map(|m| m.to_string()).unwrap_or_default();
    let s = ask(label, &cur)?;
    match s.parse::<u32>() {
        Ok(m) => Some(Some(m)),
        Err(_) if s.is_empty() => Some(None),
        Err(_) => {
            println!("{}", "not a number, value kept".yellow());
            Some(current)
        }
    }
}

fn error_line(e: impl std::fmt::Display) {
    println!("{} {}", "error:".red().bold(), e);
}

/// Run `fut` behind a spinner.
pub async fn with_spinner<F: Future>(message: &str, fut: F) -> F::Output {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    let out = fut.await;
    pb.finish_and_clear();
    out
}

pub fn print_banner(session: &Session, engine: &Engine) {
    let current = session.step();
    let steps: Vec<String> = Step::ALL
        .iter()
        .map(|s| {
            let label = s.to_string();
            if *s == current {
                label.cyan().bold().to_string()
            } else if *s < current {
                label.green().to_string()
            } else {
                label.dimmed().to_string()
            }
        })
        .collect();
    println!("\n{}", "━━━━━━━━━━━━━━━━━━━━━━━ JobMaster ━━━━━━━━━━━━━━━━━━━━━━━".bold());
    println!("  {}", steps.join("  "));

    let docs = engine.docs();
    if docs.is_loaded() {
        println!("  {} {} ({} lines)", "doc:".dimmed(), docs.path().display(), docs.line_count());
    } else {
        println!("  {} {} not found, generation disabled", "doc:".yellow(), docs.path().display());
    }
    if session.wizard.demo_mode {
        println!("  {}", "demo mode".magenta().bold());
    }
    let recap = session.context.recap();
    if !recap.is_empty() {
        let parts: Vec<String> = recap.iter().map(|(k, v)| format!("{}: {}", k.dimmed(), v)).collect();
        println!("  {}", parts.join("   "));
    }
    println!("{}", "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".bold());
}

fn print_tree_node(node: &FileTree<'_>, depth: usize) {
    let pad = "  ".repeat(depth);
    for (name, child) in &node.children {
        println!("{}{} {}", pad, format!("{name}/").blue().bold(), format!("({})", child.file_count()).dimmed());
        print_tree_node(child, depth + 1);
    }
    for f in &node.files {
        let tag = match f.language() {
            "" => String::new(),
            "yaml" => format!("  [{}]", "yaml".green()),
            lang => format!("  [{}]", lang.yellow()),
        };
        println!("{}{}{}", pad, f.file_name(), tag);
    }
}

/// Tree of generated files, or the raw reply when none were detected.
pub fn print_generation(session: &Session) {
    let tree = session.tree();
    if tree.is_empty() {
        println!("{}", "No files detected in the reply. Raw output:".yellow().bold());
        println!("{}", session.wizard.raw_reply);
        return;
    }
    println!("\n{} {}", "Generated files".bold(), format!("({})", tree.file_count()).dimmed());
    print_tree_node(&tree, 1);
}

fn print_file_contents(session: &Session) {
    for f in &session.wizard.files {
        println!("\n{} {}", "──".dimmed(), f.path.bold());
        println!("{}", f.content);
    }
}

/// Write the archive atomically into `out_dir`.
pub fn write_archive(out_dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs_err::create_dir_all(out_dir)?;
    let mut tmp = NamedTempFile::new_in(out_dir)
        .with_context(|| format!("creating temp file in {}", out_dir.display()))?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    let dest = out_dir.join(name);
    tmp.persist(&dest)
        .map_err(|e| e.error)
        .with_context(|| format!("writing {}", dest.display()))?;
    Ok(dest)
}

/// Pack the current files and report where they went.
pub fn save_archive(session: &Session, out_dir: &Path) -> Result<PathBuf> {
    let (name, bytes) = session.archive()?;
    let dest = write_archive(out_dir, &name, &bytes)?;
    println!(
        "{} {} ({})",
        "Archive written:".green().bold(),
        dest.display(),
        format_size(bytes.len() as u64, DECIMAL)
    );
    Ok(dest)
}

fn step_basics(session: &mut Session) -> Option<()> {
    let ctx = &mut session.context;
    ctx.domain = ask("Business domain", &ctx.domain)?;
    ctx.description = ask("Workflow description", &ctx.description)?;

    let platform = ask("Platform (BQ/TD)", ctx.platform.code())?;
    match Platform::parse(&platform) {
        Some(p) => ctx.platform = p,
        None => println!("{}", "unknown platform, value kept".yellow()),
    }

    for f in Folder::ALL {
        let mark = if ctx.has_folder(f) { "[x]".green() } else { "[ ]".normal() };
        println!("  {} {} {}", mark, format!("{f}:").bold(), f.summary().dimmed());
    }
    let input = ask("Folders to toggle (comma separated)", "")?;
    toggle_folders(ctx, &input);
    Some(())
}

/// Flip every folder named in `input`; unknown names are reported and skipped.
fn toggle_folders(ctx: &mut Context, input: &str) {
    for name in input.split(',').filter(|n| !n.trim().is_empty()) {
        match Folder::parse(name) {
            Some(f) => ctx.toggle_folder(f),
            None => println!("{} {}", "unknown folder:".yellow(), name.trim()),
        }
    }
}

fn print_columns(cols: &[Column]) {
    if cols.is_empty() {
        println!("  {}", "(no columns)".dimmed());
    }
    for (i, c) in cols.iter().enumerate() {
        let null = if c.nullable { "" } else { " NOT NULL" };
        println!("  {:>2}. {} {}{}", i + 1, c.name.bold(), c.ty.cyan(), null.red());
    }
}

/// One column editor command. `None` on EOF.
fn step_columns(session: &mut Session) -> Option<Flow> {
    let platform = session.context.platform;
    print_columns(&session.column_drafts);
    println!(
        "{}",
        "a name[,type] add | b bulk paste | t N type | x N toggle NOT NULL | r N remove | n next | p back | q quit"
            .dimmed()
    );
    println!("  types: {}", platform.column_types().join(", ").dimmed());
    let line = prompt_line("> ")?;
    let (cmd, rest) = line.trim().split_once(' ').unwrap_or((line.trim(), ""));
    let index = |s: &str| s.trim().parse::<usize>().ok().and_then(|n| n.checked_sub(1));
    let drafts = &mut session.column_drafts;
    match cmd {
        "a" => drafts.extend(columns::parse_bulk(rest, platform)),
        "b" => drafts.extend(columns::parse_bulk(&read_block("name,type per line"), platform)),
        "t" => {
            let (n, ty) = rest.split_once(' ').unwrap_or((rest, ""));
            match (index(n).and_then(|i| drafts.get_mut(i)), columns::canonical_type(platform, ty)) {
                (Some(c), Some(t)) => c.ty = t.to_string(),
                _ => println!("{}", "usage: t N TYPE (from the list above)".yellow()),
            }
        }
        "x" => match index(rest).and_then(|i| drafts.get_mut(i)) {
            Some(c) => c.nullable = !c.nullable,
            None => println!("{}", "no such column".yellow()),
        },
        "r" => match index(rest).filter(|i| *i < drafts.len()) {
            Some(i) => {
                drafts.remove(i);
            }
            None => println!("{}", "no such column".yellow()),
        },
        "n" | "" => {
            if let Err(e) = session.advance() {
                error_line(e);
            }
            return Some(Flow::Moved);
        }
        "p" => {
            if let Err(e) = session.back() {
                error_line(e);
            }
            return Some(Flow::Moved);
        }
        "q" => return Some(Flow::Quit),
        _ => println!("{}", "unknown command".yellow()),
    }
    Some(Flow::Stay)
}

fn step_details(session: &mut Session) -> Option<()> {
    let ctx = &mut session.context;
    ctx.apply_detail_defaults();

    if ctx.has_folder(Folder::Import) {
        println!("{}", "Import".bold().underline());
        let sources = SourceKind::ALL.map(|k| (k, k.label()));
        ctx.source = choose("Source", &sources, ctx.source)?;
        ctx.source_uri = ask_opt("Source URI / host", &ctx.source_uri)?;
        let formats = FileFormat::ALL.map(|f| (f, f.label()));
        ctx.file_format = choose("File format", &formats, ctx.file_format)?;
        if ctx.file_format == Some(FileFormat::Csv) {
            ctx.delimiter = ask_opt("Delimiter", &ctx.delimiter)?;
            ctx.has_header = Some(ask_yes_no("File has a header row?", ctx.has_header.unwrap_or(true))?);
        }
        ctx.file_mask = ask_opt("File mask (regex)", &ctx.file_mask)?;
        ctx.input_dir = ask_opt("Input directory", &ctx.input_dir)?;
        ctx.work_dir = ask_opt("Work directory", &ctx.work_dir)?;
        ctx.archive_dir = ask_opt("Archive directory", &ctx.archive_dir)?;
        ctx.archive_retention_months = ask_months("Archive retention (months)", ctx.archive_retention_months)?;
    }

    if ctx.has_folder(Folder::Feed) {
        println!("{}", "Feed".bold().underline());
        ctx.staging_table = ask_opt("Staging table", &ctx.staging_table)?;
        ctx.core_table = ask_opt("Core table", &ctx.core_table)?;
        let modes = LoadMode::ALL.map(|m| (m, m.label()));
        ctx.load_mode = choose("Load mode", &modes, ctx.load_mode)?;
        if ctx.load_mode.is_some_and(LoadMode::needs_primary_key) {
            ctx.primary_key = ask_opt("Primary key", &ctx.primary_key)?;
        }
    }

    if ctx.has_folder(Folder::Export) {
        println!("{}", "Export".bold().underline());
        let dests = DestinationKind::ALL.map(|d| (d, d.label()));
        ctx.destination = choose("Destination", &dests, ctx.destination)?;
        ctx.destination_uri = ask_opt("Destination URI / host", &ctx.destination_uri)?;
        ctx.export_dir = ask_opt("Export directory", &ctx.export_dir)?;
        ctx.export_file_name = ask_opt("Export file name", &ctx.export_file_name)?;
        ctx.export_retention_months = ask_months("Export retention (months)", ctx.export_retention_months)?;
    }

    let extra = ask_opt("Additional instructions", &ctx.extra_instructions)?;
    ctx.extra_instructions = extra;

    for a in ctx.advisories() {
        println!("{} {}", "note:".yellow().bold(), a);
    }
    Some(())
}

/// Menu shared by the form steps: next, back, demo (step 1 only), quit.
async fn navigate(session: &mut Session, engine: &Engine) -> Result<Flow> {
    let demo = if session.step() == Step::Basics { " | d demo" } else { "" };
    let Some(line) = prompt_line(&format!("{} ", format!("n next | p back{demo} | e edit | q quit >").dimmed()))
    else {
        return Ok(Flow::Quit);
    };
    match line.trim() {
        "n" | "" => match session.advance() {
            Ok(_) => Ok(Flow::Moved),
            Err(e) => {
                error_line(e);
                Ok(Flow::Stay)
            }
        },
        "p" => {
            if let Err(e) = session.back() {
                error_line(e);
            }
            Ok(Flow::Moved)
        }
        "d" => {
            let mut picker = RandomPicker::from_entropy();
            match with_spinner("Inventing a demo workflow", session.run_demo(engine, &mut picker)).await {
                Ok(_) => println!("{} {}", "Demo context ready:".magenta().bold(), session.context.domain),
                Err(e) => error_line(e),
            }
            Ok(Flow::Moved)
        }
        "q" => Ok(Flow::Quit),
        _ => Ok(Flow::Stay),
    }
}

/// `entered` is true on arrival at the step; model calls only happen then.
async fn questions_screen(session: &mut Session, engine: &Engine, entered: bool) -> Result<Flow> {
    if entered {
        if let Err(e) = with_spinner("Asking clarification questions", session.ensure_questions(engine)).await {
            error_line(e);
        }
    }
    if session.wizard.questions.trim().is_empty() {
        println!("{}", "No questions yet; r asks again.".yellow());
    } else {
        println!("\n{}\n{}", "Clarification questions".bold(), session.wizard.questions);
    }
    if !session.wizard.answers.is_empty() {
        println!("{}\n{}", "Current answers:".dimmed(), session.wizard.answers);
    }
    let Some(line) = prompt_line(&format!("{} ", "a answer | r re-ask | n generate | p back | q quit >".dimmed()))
    else {
        return Ok(Flow::Quit);
    };
    match line.trim() {
        "a" => {
            session.wizard.answers = read_block("Your answers");
            Ok(Flow::Stay)
        }
        "r" => {
            session.reask();
            Ok(Flow::Moved)
        }
        "n" => {
            session.advance()?;
            Ok(Flow::Moved)
        }
        "p" => {
            session.back()?;
            Ok(Flow::Moved)
        }
        "q" => Ok(Flow::Quit),
        _ => Ok(Flow::Stay),
    }
}

async fn generation_screen(session: &mut Session, engine: &Engine, entered: bool) -> Result<Flow> {
    if entered {
        let generated = with_spinner("Generating workflow files", session.ensure_generated(engine))
            .await
            .map(|_| ());
        if let Err(e) = generated {
            error_line(e);
        }
    }
    if session.wizard.raw_reply.is_empty() {
        println!("{}", "Nothing generated yet; g tries again.".yellow());
    } else {
        print_generation(session);
    }
    let Some(line) =
        prompt_line(&format!("{} ", "v view | s save zip | g regenerate | p back | r restart | q quit >".dimmed()))
    else {
        return Ok(Flow::Quit);
    };
    match line.trim() {
        "v" => {
            print_file_contents(session);
            Ok(Flow::Stay)
        }
        "s" => {
            if session.wizard.files.is_empty() {
                println!("{}", "nothing to archive".yellow());
            } else if let Err(e) = save_archive(session, Path::new(&engine.config().out_dir)) {
                error_line(format!("{e:#}"));
            }
            Ok(Flow::Stay)
        }
        "g" => {
            session.regenerate();
            Ok(Flow::Moved)
        }
        "p" => {
            session.back()?;
            Ok(Flow::Moved)
        }
        "r" => {
            if confirm("Discard everything and start over?") {
                session.restart();
            }
            Ok(Flow::Moved)
        }
        "q" => Ok(Flow::Quit),
        _ => Ok(Flow::Stay),
    }
}

/// Interactive five-step wizard on stdin/stdout.
pub async fn run(session: &mut Session, engine: &Engine) -> Result<()> {
    let mut entered = true;
    loop {
        if entered {
            print_banner(session, engine);
        }
        let flow = match session.step() {
            Step::Basics => {
                if step_basics(session).is_none() {
                    Flow::Quit
                } else {
                    navigate(session, engine).await?
                }
            }
            Step::Columns => step_columns(session).unwrap_or(Flow::Quit),
            Step::Details => {
                if step_details(session).is_none() {
                    Flow::Quit
                } else {
                    navigate(session, engine).await?
                }
            }
            Step::Questions => questions_screen(session, engine, entered).await?,
            Step::Generation => generation_screen(session, engine, entered).await?,
        };
        match flow {
            Flow::Quit => return Ok(()),
            Flow::Moved => entered = true,
            Flow::Stay => entered = false,
        }
    }
}

/// Non-interactive path: generate for the session's context and write the archive.
pub async fn generate_headless(session: &mut Session, engine: &Engine) -> Result<Option<PathBuf>> {
    with_spinner("Generating workflow files", session.ensure_generated(engine)).await?;
    print_generation(session);
    if session.wizard.files.is_empty() {
        return Ok(None);
    }
    save_archive(session, Path::new(&engine.config().out_dir)).map(Some)
}
