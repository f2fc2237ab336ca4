use std::fmt;
use thiserror::Error;

use crate::context::Context;
use crate::wire::GeneratedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Step {
    #[default]
    Basics,
    Columns,
    Details,
    Questions,
    Generation,
}

impl Step {
    pub const ALL: [Step; 5] = [Step::Basics, Step::Columns, Step::Details, Step::Questions, Step::Generation];

    pub fn number(self) -> u8 {
        match self {
            Step::Basics => 1,
            Step::Columns => 2,
            Step::Details => 3,
            Step::Questions => 4,
            Step::Generation => 5,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Basics => "Basic parameters",
            Step::Columns => "Data structure",
            Step::Details => "Technical details",
            Step::Questions => "Clarification questions",
            Step::Generation => "Generation",
        }
    }

    fn next(self) -> Option<Step> {
        match self {
            Step::Basics => Some(Step::Columns),
            Step::Columns => Some(Step::Details),
            Step::Details => Some(Step::Questions),
            Step::Questions => Some(Step::Generation),
            Step::Generation => None,
        }
    }

    fn prev(self) -> Option<Step> {
        match self {
            Step::Basics => None,
            Step::Columns => Some(Step::Basics),
            Step::Details => Some(Step::Columns),
            Step::Questions => Some(Step::Details),
            Step::Generation => Some(Step::Questions),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next,
    Back,
    Demo,
    Restart,
}

/// Why a transition was refused. The session is left untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("domain and description are required")]
    MissingDomainOrDescription,
    #[error("select at least one folder")]
    NoFolder,
    #[error("already at the first step")]
    AtFirstStep,
    #[error("already at the last step")]
    AtLastStep,
    #[error("demo mode is only available from step 1")]
    DemoOutsideBasics,
}

/// Guard for leaving step 1.
pub fn check_basics(ctx: &Context) -> Result<(), Rejection> {
    if ctx.domain.trim().is_empty() || ctx.description.trim().is_empty() {
        return Err(Rejection::MissingDomainOrDescription);
    }
    if ctx.folders.is_empty() {
        return Err(Rejection::NoFolder);
    }
    Ok(())
}

/// Transition table: the state reached from `from` via `t`, or why not.
pub fn transition(from: Step, t: Transition, ctx: &Context) -> Result<Step, Rejection> {
    match t {
        Transition::Restart => Ok(Step::Basics),
        Transition::Demo => match from {
            Step::Basics => Ok(Step::Generation),
            _ => Err(Rejection::DemoOutsideBasics),
        },
        Transition::Back => from.prev().ok_or(Rejection::AtFirstStep),
        Transition::Next => {
            if from == Step::Basics {
                check_basics(ctx)?;
            }
            from.next().ok_or(Rejection::AtLastStep)
        }
    }
}

/// Per-session wizard state: current step plus cached model output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WizardState {
    pub step: Step,
    pub questions: String,
    pub answers: String,
    pub raw_reply: String,
    pub files: Vec<GeneratedFile>,
    pub demo_mode: bool,
}

impl WizardState {
    pub fn clear_questions(&mut self) {
        self.questions.clear();
    }

    pub fn clear_generation(&mut self) {
        self.files.clear();
        self.raw_reply.clear();
    }
}
