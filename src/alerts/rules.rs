use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChainScopeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Volume,
    Frequency,
    Gas,
    NewUser,
    LargeTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "contains")]
    Contains,
}

impl Operator {
    /// Numeric comparison. `contains` has no numeric meaning and never matches.
    pub fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::GreaterThan => value > threshold,
            Operator::LessThan => value < threshold,
            Operator::Equal => value == threshold,
            Operator::NotEqual => value != threshold,
            Operator::Contains => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Number(f64),
    Text(String),
}

impl Threshold {
    /// Text thresholds are read as floats; unparseable text yields NaN.
    pub fn as_f64(&self) -> f64 {
        match self {
            Threshold::Number(n) => *n,
            Threshold::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }

    /// Numeric value used for severity scaling; text counts as zero.
    pub fn numeric_or_zero(&self) -> f64 {
        match self {
            Threshold::Number(n) => *n,
            Threshold::Text(_) => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCondition {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub operator: Operator,
    pub threshold: Threshold,
    /// Minutes. Carried with the rule but not used by evaluation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<u32>,
}

impl AlertCondition {
    pub fn new(kind: AlertKind, operator: Operator, threshold: Threshold) -> Self {
        Self {
            kind,
            operator,
            threshold,
            timeframe: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub contract_address: String,
    pub condition: AlertCondition,
    pub enabled: bool,
    pub last_triggered: Option<DateTime<Utc>>,
}

/// In-memory alert rule store.
#[derive(Debug, Clone, Default)]
pub struct AlertRuleStore {
    rules: Arc<RwLock<Vec<AlertRule>>>,
    counter: Arc<AtomicU64>,
}

impl AlertRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_rule(
        &self,
        contract_address: &str,
        name: &str,
        condition: AlertCondition,
    ) -> Result<String> {
        let id = format!(
            "rule_{}_{}",
            Utc::now().timestamp_millis(),
            self.counter.fetch_add(1, Ordering::Relaxed)
        );

        let mut rules = self
            .rules
            .write()
            .map_err(|_| ChainScopeError::AlertRuleError("rule store lock poisoned".to_string()))?;
        rules.push(AlertRule {
            id: id.clone(),
            name: name.to_string(),
            contract_address: contract_address.to_string(),
            condition,
            enabled: true,
            last_triggered: None,
        });

        Ok(id)
    }

    /// Rules for one contract, or every rule when `contract_address` is `None`.
    pub fn rules(&self, contract_address: Option<&str>) -> Vec<AlertRule> {
        let Ok(rules) = self.rules.read() else {
            return Vec::new();
        };
        rules
            .iter()
            .filter(|r| contract_address.map_or(true, |addr| r.contract_address == addr))
            .cloned()
            .collect()
    }

    pub fn set_enabled(&self, rule_id: &str, enabled: bool) -> bool {
        self.update(rule_id, |rule| rule.enabled = enabled)
    }

    pub fn mark_triggered(&self, rule_id: &str, at: DateTime<Utc>) -> bool {
        self.update(rule_id, |rule| rule.last_triggered = Some(at))
    }

    fn update(&self, rule_id: &str, f: impl FnOnce(&mut AlertRule)) -> bool {
        let Ok(mut rules) = self.rules.write() else {
            return false;
        };
        match rules.iter_mut().find(|r| r.id == rule_id) {
            Some(rule) => {
                f(rule);
                true
            }
            None => false,
        }
    }
}
