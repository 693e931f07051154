pub mod engine;
pub mod rules;

pub use engine::{Alert, AlertEngine, Severity};
pub use rules::{AlertCondition, AlertKind, AlertRule, AlertRuleStore, Operator, Threshold};
