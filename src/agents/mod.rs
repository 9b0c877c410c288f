//! 三段式 Agent 管线：Planner（计划）→ Worker（检索）→ Evaluator（校验）

pub mod evaluator;
pub mod intent;
pub mod planner;
pub mod worker;

pub use evaluator::{
    Evaluation, Evaluator, EvaluatorOutput, SafetyScope, MEDICAL_UNVERIFIED_ISSUE,
    NO_VERIFIED_ISSUE, UNVERIFIED_NOTE,
};
pub use intent::{classify_intent, Intent};
pub use planner::{LocationDescriptor, OutputFormat, Plan, Planner, PlannerOutput, Urgency};
pub use worker::{
    check_recency, summarize, Candidate, CandidatesPayload, ResolvedLocation, Worker,
    WorkerOutput,
};
