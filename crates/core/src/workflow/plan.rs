//! Plan documents and their typed op arguments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::WorkflowError;

pub const PLAN_VERSION: u32 = 1;

/// A workflow plan: an ordered list of vault edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub plan_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(default)]
    pub ops: Option<Vec<Op>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Op {
    pub op: String,
    #[serde(default)]
    pub why: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Add,
    Edit,
    Set,
    Move,
    UpdateTrait,
}

impl OpKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(Self::Add),
            "edit" => Some(Self::Edit),
            "set" => Some(Self::Set),
            "move" => Some(Self::Move),
            "update_trait" => Some(Self::UpdateTrait),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AddArgs {
    pub to: String,
    pub text: String,
    pub heading: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EditArgs {
    pub path: String,
    pub old_str: String,
    pub new_str: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SetArgs {
    pub object_id: String,
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MoveArgs {
    pub source: String,
    pub destination: String,
    pub update_refs: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTraitArgs {
    pub trait_id: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub enum OpArgs {
    Add(AddArgs),
    Edit(EditArgs),
    Set(SetArgs),
    Move(MoveArgs),
    UpdateTrait(UpdateTraitArgs),
}

impl Op {
    pub fn kind(&self) -> Option<OpKind> {
        OpKind::parse(self.op.trim())
    }

    /// Decode `args` for this op's kind.
    pub fn parse_args(&self) -> Result<OpArgs, String> {
        let kind = self.kind().ok_or_else(|| format!("unknown op: {}", self.op))?;
        let args = self.args.clone();
        let decoded = match kind {
            OpKind::Add => serde_json::from_value(args).map(OpArgs::Add),
            OpKind::Edit => serde_json::from_value(args).map(OpArgs::Edit),
            OpKind::Set => serde_json::from_value(args).map(OpArgs::Set),
            OpKind::Move => serde_json::from_value(args).map(OpArgs::Move),
            OpKind::UpdateTrait => serde_json::from_value(args).map(OpArgs::UpdateTrait),
        };
        decoded.map_err(|e| format!("invalid args: {e}"))
    }
}

impl Plan {
    pub fn ops(&self) -> &[Op] {
        self.ops.as_deref().unwrap_or_default()
    }

    /// Structural checks that need no vault access.
    pub fn validate_structure(&self) -> Result<(), WorkflowError> {
        if self.plan_version != PLAN_VERSION {
            return Err(WorkflowError::Plan(format!(
                "unsupported plan_version {} (expected {PLAN_VERSION})",
                self.plan_version
            )));
        }
        let ops = match &self.ops {
            Some(ops) if !ops.is_empty() => ops,
            _ => return Err(WorkflowError::Plan("plan has no ops".into())),
        };

        for (index, op) in ops.iter().enumerate() {
            let reject = |reason: &str| WorkflowError::Validation {
                index,
                op: op.op.clone(),
                reason: reason.to_string(),
            };
            if op.op.trim().is_empty() {
                return Err(reject("op is required"));
            }
            if op.kind().is_none() {
                return Err(reject("unknown op"));
            }
            if op.why.trim().is_empty() {
                return Err(reject("why is required"));
            }
            if !op.args.is_object() {
                return Err(reject("args must be an object"));
            }
        }
        Ok(())
    }
}

/// Parse a plan from JSON.
///
/// Accepts either a bare plan or a prompt envelope carrying the plan at
/// `outputs.plan`.
pub fn parse_plan(json: &str) -> Result<Plan, WorkflowError> {
    let value: Value = serde_json::from_str(json)?;
    let plan_value = match value.pointer("/outputs/plan") {
        Some(inner) => inner.clone(),
        None => value,
    };
    if !plan_value.is_object() {
        return Err(WorkflowError::Plan("plan must be a JSON object".into()));
    }
    Ok(serde_json::from_value(plan_value)?)
}

/// Render a `set` field value as the string form stored in frontmatter.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
