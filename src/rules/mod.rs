//! Data-driven building rules: trigger, conditions, effects, modifiers

pub mod condition;
pub mod context;
pub mod effect;
pub mod modifier;
pub mod rule;

pub use condition::{Condition, Verdict};
pub use context::RuleContext;
pub use effect::{Effect, EffectOutcome};
pub use modifier::{fold_modifiers, EnvironmentRequirement, StatModifier};
pub use rule::Rule;
