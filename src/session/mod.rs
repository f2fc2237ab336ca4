use crate::archive;
use crate::config::{CallParams, Config};
use crate::context::{columns, Column, Context};
use crate::docs::Documentation;
use crate::errors::{JobMasterError, Result};
use crate::extract;
use crate::log::{log_saved_paths, Recorder};
use crate::prompt::{self, demo, PromptPair};
use crate::provider::DynProvider;
use crate::tree::FileTree;
use crate::wire::{CompletionRequest, GeneratedFile};
use crate::wizard::{self, Rejection, Step, Transition, WizardState};

/// The three kinds of model call the wizard makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clarify,
    Generate,
    Demo,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Clarify => "clarify",
            Stage::Generate => "generate",
            Stage::Demo => "demo",
        }
    }

    pub fn params(self, cfg: &Config) -> CallParams {
        match self {
            Stage::Clarify => cfg.clarification,
            Stage::Generate => cfg.generation,
            Stage::Demo => cfg.demo,
        }
    }
}

/// Everything a step handler needs to reach the model.
pub struct Engine {
    provider: DynProvider,
    config: Config,
    docs: Documentation,
    recorder: Recorder,
}

impl Engine {
    pub fn new(provider: DynProvider, config: Config, docs: Documentation, recorder: Recorder) -> Self {
        Self { provider, config, docs, recorder }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn docs(&self) -> &Documentation {
        &self.docs
    }

    /// One model call. Provider failures come back as `JobMasterError::Provider`.
    pub async fn call(&self, stage: Stage, prompt: PromptPair) -> Result<String> {
        let params = stage.params(&self.config);
        let req = CompletionRequest {
            model: self.config.model.clone(),
            messages: prompt.into_messages(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        tracing::info!(
            stage = stage.name(),
            model = %req.model,
            temperature = params.temperature,
            max_tokens = params.max_tokens,
            "calling model"
        );

        let reply = self
            .provider
            .complete(&req)
            .await
            .map_err(|e| JobMasterError::Provider(format!("{e:#}")))?;
        tracing::debug!(stage = stage.name(), reply_len = reply.len(), "model replied");

        match self.recorder.record(stage.name(), &req, &reply) {
            Ok(Some(saved)) => log_saved_paths(stage.name(), &saved),
            Ok(None) => {}
            Err(e) => tracing::warn!(stage = stage.name(), error = %e, "could not save transcript"),
        }
        Ok(reply)
    }
}

/// One user's wizard session: the context being built plus cached model output.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub context: Context,
    pub wizard: WizardState,
    /// Step-2 editor rows; may hold blank names until the step is left.
    pub column_drafts: Vec<Column>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.wizard.step
    }

    /// Back to step 1 with every field and cache at its default.
    pub fn restart(&mut self) {
        let first = wizard::transition(self.wizard.step, Transition::Restart, &self.context).unwrap_or_default();
        *self = Session::default();
        self.wizard.step = first;
    }

    pub fn advance(&mut self) -> std::result::Result<Step, Rejection> {
        let from = self.wizard.step;
        let next = wizard::transition(from, Transition::Next, &self.context)?;
        match from {
            Step::Columns => {
                let cols = columns::normalize(std::mem::take(&mut self.column_drafts));
                self.context.columns = cols.clone();
                self.column_drafts = cols;
            }
            Step::Questions => {
                let answers = self.wizard.answers.trim();
                if !answers.is_empty() {
                    let answers = answers.to_string();
                    self.context.append_instructions(prompt::ANSWERS_HEADING, &answers);
                }
            }
            _ => {}
        }
        self.wizard.step = next;
        Ok(next)
    }

    pub fn back(&mut self) -> std::result::Result<Step, Rejection> {
        let prev = wizard::transition(self.wizard.step, Transition::Back, &self.context)?;
        self.wizard.step = prev;
        Ok(prev)
    }

    /// Start from a ready-made context and jump to generation.
    pub fn start_from(&mut self, ctx: Context) -> std::result::Result<Step, Rejection> {
        wizard::check_basics(&ctx)?;
        self.restart();
        let mut ctx = ctx;
        ctx.columns = columns::normalize(std::mem::take(&mut ctx.columns));
        self.column_drafts = ctx.columns.clone();
        self.context = ctx;
        self.wizard.step = Step::Generation;
        Ok(Step::Generation)
    }

    /// Force the next `ensure_questions` to ask again.
    pub fn reask(&mut self) {
        self.wizard.clear_questions();
    }

    /// Force the next `ensure_generated` to call the model again.
    pub fn regenerate(&mut self) {
        self.wizard.clear_generation();
    }

    /// Clarification questions, fetched once and cached until `reask`.
    pub async fn ensure_questions(&mut self, engine: &Engine) -> Result<&str> {
        if self.wizard.questions.trim().is_empty() {
            let pair = prompt::clarification(&self.context, engine.docs().text_or_empty());
            let reply = engine.call(Stage::Clarify, pair).await?;
            self.wizard.questions = reply;
        }
        Ok(&self.wizard.questions)
    }

    /// Generated files, fetched when the cache is empty.
    ///
    /// A reply without file blocks leaves the list empty and keeps the raw
    /// text for display.
    pub async fn ensure_generated(&mut self, engine: &Engine) -> Result<&[GeneratedFile]> {
        if self.wizard.files.is_empty() {
            let doc = engine.docs().require()?;
            let pair = prompt::generation(&self.context, doc);
            let reply = engine.call(Stage::Generate, pair).await?;
            self.wizard.files = extract::parse_files(&reply);
            if self.wizard.files.is_empty() {
                tracing::warn!(reply_len = reply.len(), "no file blocks found in reply");
            }
            self.wizard.raw_reply = reply;
        }
        Ok(&self.wizard.files)
    }

    /// Let the model invent a context, then jump straight to generation.
    pub async fn run_demo(&mut self, engine: &Engine, picker: &mut dyn demo::DemoPicker) -> Result<Step> {
        let target = wizard::transition(self.wizard.step, Transition::Demo, &self.context)?;
        let pick = picker.pick();
        tracing::info!(domain = %pick.domain, platform = %pick.platform, "demo pick");

        let pair = demo::demo(&pick, engine.docs().text_or_empty());
        let reply = engine.call(Stage::Demo, pair).await?;
        let ctx = demo::parse_payload(&reply, &pick)?;

        self.restart();
        self.column_drafts = ctx.columns.clone();
        self.context = ctx;
        self.wizard.demo_mode = true;
        self.wizard.step = target;
        Ok(target)
    }

    pub fn tree(&self) -> FileTree<'_> {
        FileTree::build(&self.wizard.files)
    }

    /// Archive name and bytes for the current files.
    pub fn archive(&self) -> Result<(String, Vec<u8>)> {
        let bytes = archive::pack(&self.wizard.files)?;
        Ok((archive::file_name(&self.context.domain), bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Folder, LoadMode, Platform};
    use crate::extract::{close_marker, open_marker};
    use crate::provider::Provider;
    use crate::wire::Role;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    type Seen = Arc<Mutex<Vec<CompletionRequest>>>;

    struct Scripted {
        replies: Mutex<VecDeque<anyhow::Result<String>>>,
        seen: Seen,
    }

    #[async_trait]
    impl Provider for Scripted {
        async fn complete(&self, req: &CompletionRequest) -> anyhow::Result<String> {
            self.seen.lock().push(req.clone());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted reply left")))
        }
    }

    /// Answers demo prompts with a payload built from the imposed pair.
    struct EchoDemo;

    #[async_trait]
    impl Provider for EchoDemo {
        async fn complete(&self, req: &CompletionRequest) -> anyhow::Result<String> {
            let user = &req.messages.iter().find(|m| m.role == Role::User).unwrap().content;
            let field = |label: &str| {
                user.lines()
                    .find_map(|l| l.strip_prefix(label))
                    .unwrap_or_default()
                    .trim()
                    .to_string()
            };
            let payload = serde_json::json!({
                "domain": field("Imposed domain:"),
                "platform": field("Imposed platform:"),
                "description": "Invented",
                "folders": ["Import", "Feed"],
                "columns": [{"name": "id", "type": "STRING"}],
            });
            Ok(format!("```json\n{payload}\n```"))
        }
    }

    struct ScriptedPicker(VecDeque<demo::DemoPick>);

    impl demo::DemoPicker for ScriptedPicker {
        fn pick(&mut self) -> demo::DemoPick {
            self.0.pop_front().unwrap()
        }
    }

    fn engine_with(provider: DynProvider, docs: Documentation) -> Engine {
        Engine::new(provider, Config::default(), docs, Recorder::disabled())
    }

    fn scripted(replies: Vec<anyhow::Result<String>>) -> (Engine, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let provider = Scripted { replies: Mutex::new(replies.into()), seen: seen.clone() };
        (engine_with(Box::new(provider), Documentation::from_text("DOC")), seen)
    }

    fn filled() -> Session {
        let mut s = Session::new();
        s.context.domain = "Invoices".into();
        s.context.description = "Daily invoices".into();
        s.context.set_folders([Folder::Import, Folder::Feed]);
        s
    }

    #[test]
    fn refused_step_leaves_session_untouched() {
        let mut s = filled();
        s.context.folders.clear();
        let before = s.context.clone();
        assert_eq!(s.advance(), Err(Rejection::NoFolder));
        assert_eq!(s.step(), Step::Basics);
        assert_eq!(s.context, before);
    }

    #[test]
    fn leaving_columns_drops_blank_names() {
        let mut s = filled();
        s.advance().unwrap();
        s.column_drafts = vec![
            Column::new("id", "INT64"),
            Column::blank(Platform::BQ),
            Column::new(" amount ", "NUMERIC"),
        ];
        assert_eq!(s.advance(), Ok(Step::Details));
        let names: Vec<&str> = s.context.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "amount"]);
        assert_eq!(s.column_drafts.len(), 2);
    }

    #[test]
    fn answers_are_appended_on_leaving_questions() {
        let mut s = filled();
        for _ in 0..3 {
            s.advance().unwrap();
        }
        s.context.extra_instructions = Some("Keep history".into());
        s.wizard.answers = "1. daily\n2. 6 months\n".into();
        assert_eq!(s.advance(), Ok(Step::Generation));
        let extra = s.context.extra_instructions.as_deref().unwrap();
        assert!(extra.starts_with("Keep history\n\n"));
        assert!(extra.ends_with(&format!("{}\n1. daily\n2. 6 months", prompt::ANSWERS_HEADING)));
    }

    #[test]
    fn blank_answers_leave_instructions_alone() {
        let mut s = filled();
        s.wizard.step = Step::Questions;
        s.wizard.answers = "   ".into();
        s.advance().unwrap();
        assert!(s.context.extra_instructions.is_none());
    }

    #[test]
    fn restart_resets_everything() {
        let mut s = filled();
        s.wizard.step = Step::Generation;
        s.wizard.files.push(GeneratedFile::new("a", "b\n"));
        s.wizard.demo_mode = true;
        s.restart();
        assert_eq!(s.step(), Step::Basics);
        assert_eq!(s.context, Context::default());
        assert_eq!(s.wizard, WizardState::default());
    }

    #[tokio::test]
    async fn questions_are_cached_until_reask() {
        let (engine, seen) = scripted(vec![Ok("1. Which columns?".into()), Ok("1. Which mask?".into())]);
        let mut s = filled();
        s.wizard.step = Step::Questions;

        assert_eq!(s.ensure_questions(&engine).await.unwrap(), "1. Which columns?");
        assert_eq!(s.ensure_questions(&engine).await.unwrap(), "1. Which columns?");
        assert_eq!(seen.lock().len(), 1);

        s.reask();
        assert_eq!(s.ensure_questions(&engine).await.unwrap(), "1. Which mask?");

        let calls = seen.lock();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].temperature, 0.4);
        assert_eq!(calls[0].max_tokens, 2000);
        assert!(calls[0].messages[1].content.starts_with("Here is the partial context:"));
    }

    #[tokio::test]
    async fn generation_parses_and_caches() {
        let reply = format!(
            "{}\nid_script: Invoices_Feed_Load\n{}\n{}\nSELECT 1;\n{}\n",
            open_marker("Invoices/Feed/config/feed_invoices.yml"),
            close_marker(),
            open_marker("Invoices/Feed/sql/load_invoices.gql"),
            close_marker(),
        );
        let (engine, seen) = scripted(vec![Ok(reply.clone()), Ok("no blocks".into())]);
        let mut s = filled();
        s.wizard.step = Step::Generation;

        let files = s.ensure_generated(&engine).await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(s.wizard.raw_reply, reply);
        s.ensure_generated(&engine).await.unwrap();
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0].temperature, 0.3);
        assert_eq!(seen.lock()[0].max_tokens, 8000);

        let tree = s.tree();
        assert_eq!(tree.get("Invoices/Feed").unwrap().file_count(), 2);
        let (name, bytes) = s.archive().unwrap();
        assert_eq!(name, "Invoices_jobmaster.zip");
        assert!(!bytes.is_empty());

        s.regenerate();
        assert!(s.wizard.raw_reply.is_empty());
        assert!(s.ensure_generated(&engine).await.unwrap().is_empty());
        assert_eq!(s.wizard.raw_reply, "no blocks");
    }

    #[tokio::test]
    async fn upsert_without_key_still_generates() {
        let (engine, seen) = scripted(vec![Ok(String::new())]);
        let mut s = filled();
        s.context.load_mode = Some(LoadMode::Upsert);
        s.wizard.step = Step::Generation;
        s.ensure_generated(&engine).await.unwrap();
        let user = &seen.lock()[0].messages[1].content;
        assert!(user.contains("- Load mode: UPSERT"));
        assert!(!user.contains("Primary key"));
    }

    #[tokio::test]
    async fn provider_failure_leaves_cache_empty() {
        let (engine, _) = scripted(vec![Err(anyhow::anyhow!("API error (401): bad key")), Ok("1. ok".into())]);
        let mut s = filled();
        let err = s.ensure_questions(&engine).await.unwrap_err();
        assert!(matches!(err, JobMasterError::Provider(ref m) if m.contains("401")));
        assert!(s.wizard.questions.is_empty());
        assert_eq!(s.ensure_questions(&engine).await.unwrap(), "1. ok");
    }

    #[tokio::test]
    async fn generation_needs_documentation() {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let provider = Scripted { replies: Mutex::new(VecDeque::new()), seen: seen.clone() };
        let engine = engine_with(Box::new(provider), Documentation::missing("doc.txt"));
        let mut s = filled();
        let err = s.ensure_generated(&engine).await.unwrap_err();
        assert!(matches!(err, JobMasterError::Config(_)));
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn demo_threads_each_pick() {
        let engine = engine_with(Box::new(EchoDemo), Documentation::missing("doc.txt"));
        let mut picker = ScriptedPicker(
            vec![
                demo::DemoPick { domain: "Payroll".into(), platform: Platform::TD },
                demo::DemoPick { domain: "Bookings".into(), platform: Platform::BQ },
            ]
            .into(),
        );
        let mut s = Session::new();

        assert_eq!(s.run_demo(&engine, &mut picker).await.unwrap(), Step::Generation);
        assert_eq!(s.context.domain, "Payroll");
        assert_eq!(s.context.platform, Platform::TD);
        assert!(s.wizard.demo_mode);
        assert_eq!(s.column_drafts.len(), 1);

        s.restart();
        s.run_demo(&engine, &mut picker).await.unwrap();
        assert_eq!(s.context.domain, "Bookings");
        assert_eq!(s.context.platform, Platform::BQ);
    }

    #[tokio::test]
    async fn demo_refused_after_step_one() {
        let engine = engine_with(Box::new(EchoDemo), Documentation::missing("doc.txt"));
        let mut picker = ScriptedPicker(VecDeque::new());
        let mut s = filled();
        s.advance().unwrap();
        let err = s.run_demo(&engine, &mut picker).await.unwrap_err();
        assert!(matches!(err, JobMasterError::Validation(Rejection::DemoOutsideBasics)));
        assert_eq!(s.step(), Step::Columns);
    }

    #[tokio::test]
    async fn malformed_demo_payload_keeps_session() {
        let (engine, _) = scripted(vec![Ok("Here you go: not json".into())]);
        let mut picker = ScriptedPicker(vec![demo::DemoPick { domain: "Stock".into(), platform: Platform::BQ }].into());
        let mut s = Session::new();
        let err = s.run_demo(&engine, &mut picker).await.unwrap_err();
        assert!(matches!(err, JobMasterError::Payload(_)));
        assert_eq!(s.step(), Step::Basics);
        assert!(!s.wizard.demo_mode);
    }

    #[test]
    fn start_from_validates_basics() {
        let mut s = Session::new();
        assert_eq!(s.start_from(Context::default()), Err(Rejection::MissingDomainOrDescription));
        assert_eq!(s.step(), Step::Basics);
        assert_eq!(s.start_from(filled().context), Ok(Step::Generation));
    }
}
