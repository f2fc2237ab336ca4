use anyhow::Context as _;
use clap::Parser;
use colored::Colorize;
use fs_err as fs;
use std::path::Path;

mod archive;
mod cli;
mod config;
mod context;
mod docs;
mod errors;
mod extract;
mod log;
mod prompt;
mod provider;
mod session;
mod tree;
mod ux;
mod wire;
mod wizard;

use prompt::demo::RandomPicker;
use session::{Engine, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = cli::Args::parse();
    log::init(args.debug);

    if args.list_models {
        for (i, m) in config::KNOWN_MODELS.iter().enumerate() {
            let mark = if i == 0 { " (default)" } else { "" };
            println!("{m}{mark}");
        }
        return Ok(());
    }

    let cfg = config::Config::resolve(&args)?;
    tracing::debug!(provider = ?cfg.provider, model = %cfg.model, "resolved config");

    if !provider::has_credential(cfg.provider) {
        if let Some(var) = provider::api_key_var(cfg.provider) {
            println!("{} {var} is not set; model calls will fail until it is.", "warning:".yellow().bold());
        }
    }

    let docs = docs::Documentation::load(Path::new(&cfg.doc_path));
    let recorder = log::Recorder::new(&cfg.artifact_root, args.save_request, args.save_response);
    if args.debug && recorder.is_enabled() {
        tracing::debug!(dir = %recorder.dir().display(), "transcripts will be saved");
    }

    let prov = provider::make_provider(&cfg)?;
    let engine = Engine::new(prov, cfg, docs, recorder);
    let mut session = Session::new();

    if args.demo {
        let mut picker = RandomPicker::from_entropy();
        ux::with_spinner("Inventing a demo workflow", session.run_demo(&engine, &mut picker)).await?;
        println!("{} {} ({})", "Demo context:".magenta().bold(), session.context.domain, session.context.platform);
        ux::generate_headless(&mut session, &engine).await?;
        return Ok(());
    }

    if let Some(path) = &args.context {
        let raw = fs::read_to_string(path)?;
        let ctx: context::Context =
            serde_json::from_str(&raw).with_context(|| format!("parsing context JSON {path}"))?;
        session.start_from(ctx)?;
        for a in session.context.advisories() {
            println!("{} {}", "note:".yellow().bold(), a);
        }
        ux::generate_headless(&mut session, &engine).await?;
        return Ok(());
    }

    ux::run(&mut session, &engine).await
}
