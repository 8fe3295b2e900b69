//! Rule - trigger, conditions and two effect branches

use serde::{Deserialize, Serialize};

use crate::core::types::TurnPhase;
use crate::rules::condition::Condition;
use crate::rules::effect::Effect;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Phase the rule listens to
    pub trigger: TurnPhase,
    /// Evaluated in order; all must pass
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Applied in order when every condition passes
    #[serde(default)]
    pub on_success: Vec<Effect>,
    /// Applied in order otherwise
    #[serde(default)]
    pub on_failure: Vec<Effect>,
    /// Optional name used in reports and logs
    #[serde(default)]
    pub label: Option<String>,
}

impl Rule {
    pub fn new(trigger: TurnPhase) -> Self {
        Self {
            trigger,
            conditions: Vec::new(),
            on_success: Vec::new(),
            on_failure: Vec::new(),
            label: None,
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn then(mut self, effect: Effect) -> Self {
        self.on_success.push(effect);
        self
    }

    pub fn otherwise(mut self, effect: Effect) -> Self {
        self.on_failure.push(effect);
        self
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
