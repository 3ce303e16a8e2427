//! Write authorization for mutating tools.
//!
//! A write runs only when writes are enabled for the process *and* the call
//! carries `confirm: true`. Refusals are informational results, not errors,
//! and never reach the management API.

use serde_json::{Map, Value, json};

pub const ALLOW_WRITES_ENV: &str = "ALLOW_WRITES";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    WritesDisabled,
    ConfirmRequired,
}

impl Refusal {
    pub fn reason(self) -> &'static str {
        match self {
            Refusal::WritesDisabled => "writes_disabled",
            Refusal::ConfirmRequired => "confirm_required",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Refusal::WritesDisabled => "Writes disabled. Set ALLOW_WRITES=true to enable.",
            Refusal::ConfirmRequired => "Refusing to run without confirm=true",
        }
    }

    pub fn to_value(self, tool: &str) -> Value {
        json!({
            "status": "refused",
            "tool": tool,
            "reason": self.reason(),
            "message": self.message(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Refused(Refusal),
}

#[derive(Debug, Clone, Copy)]
pub struct SafetyGate {
    writes_enabled: bool,
}

impl SafetyGate {
    pub fn new(writes_enabled: bool) -> Self {
        Self { writes_enabled }
    }

    pub fn writes_enabled(&self) -> bool {
        self.writes_enabled
    }

    pub fn check(&self, args: &Map<String, Value>) -> GateDecision {
        if !self.writes_enabled {
            return GateDecision::Refused(Refusal::WritesDisabled);
        }
        // Only a literal boolean true confirms; "true", 1 and friends do not.
        if args.get("confirm") != Some(&Value::Bool(true)) {
            return GateDecision::Refused(Refusal::ConfirmRequired);
        }
        GateDecision::Proceed
    }
}
