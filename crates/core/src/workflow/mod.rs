//! Workflow plans: ordered vault edits that are validated as a whole before
//! any of them is written.
//!
//! Supported ops are `add`, `edit`, `set`, `move` and `update_trait`.

pub mod apply;
pub mod plan;
pub mod types;
pub mod validate;

pub use apply::{apply_plan, preview_plan};
pub use plan::{Op, OpArgs, OpKind, PLAN_VERSION, Plan, parse_plan};
pub use types::{ApplyOutcome, Decision, OpSummary, WorkflowError};
pub use validate::validate_op;
