//! Agent module - the exploration loop and its components
//!
//! Observer, validator, grounder, analyzer and history, composed by `Explorer`.

pub mod analyzer;
pub mod decision;
pub mod explorer;
pub mod grounder;
pub mod history;
pub mod loop_state;
pub mod observer;
pub mod strategies;
pub mod validator;

pub use analyzer::{Issue, IssueAnalyzer, IssueSource, Severity};
pub use decision::{Decision, DecisionFailure, DecisionFailureKind, DecisionPolicy, ScriptedPolicy};
pub use explorer::Explorer;
pub use grounder::{ActionGrounder, Evidence, ExecutionOutcome, OutcomeStatus};
pub use history::{
    HistorySink, IssueCounts, JsonFileSink, SessionHistory, SessionReport, StepRecord,
};
pub use loop_state::{LoopPhase, LoopState, Termination};
pub use observer::{PageObserver, Snapshot};
pub use strategies::{Resolution, ResolutionPlan, Resolver};
pub use validator::{ActionKind, ActionValidator, ValidatedAction};
