//! Run engine: per-category orchestration and the dry-run investment plan.

pub mod orchestrator;
pub mod planner;

pub use orchestrator::RunOrchestrator;
pub use planner::{InvestmentPlan, InvestmentPlanner, PlannedOrder};
