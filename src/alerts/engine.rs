use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::alerts::rules::{AlertCondition, AlertKind, AlertRuleStore, Threshold};
use crate::models::Result;

/// Gas figure used for gas rules until receipts are decoded.
pub const ASSUMED_GAS_USED: f64 = 75_000.0;

/// Blocks per hour used to turn per-block event rates into hourly ones.
pub const BLOCKS_PER_HOUR: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub contract_address: String,
    pub condition: AlertCondition,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
}

/// Evaluates alert rules against contract events and fans triggered alerts
/// out to subscribers.
#[derive(Debug, Clone)]
pub struct AlertEngine {
    rules: AlertRuleStore,
    alerts: Arc<RwLock<Vec<Alert>>>,
    sender: broadcast::Sender<Alert>,
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(AlertRuleStore::new())
    }
}

impl AlertEngine {
    pub fn new(rules: AlertRuleStore) -> Self {
        let (sender, _) = broadcast::channel(256);
        Self {
            rules,
            alerts: Arc::new(RwLock::new(Vec::new())),
            sender,
        }
    }

    pub fn rules(&self) -> &AlertRuleStore {
        &self.rules
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.sender.subscribe()
    }

    pub fn create_alert_rule(
        &self,
        contract_address: &str,
        condition: AlertCondition,
        name: &str,
    ) -> Result<String> {
        let id = self.rules.save_rule(contract_address, name, condition)?;
        info!("Created alert rule {} ({}) for {}", id, name, contract_address);
        Ok(id)
    }

    /// Runs every enabled rule for `contract_address` against one event and
    /// returns the alerts it raised.
    pub fn check_alerts(&self, contract_address: &str, event: &Value, stats: &Value) -> Vec<Alert> {
        let mut raised = Vec::new();

        for rule in self
            .rules
            .rules(Some(contract_address))
            .into_iter()
            .filter(|r| r.enabled)
        {
            if !evaluate_condition(&rule.condition, event, stats) {
                continue;
            }

            let now = Utc::now();
            let alert = Alert {
                id: format!(
                    "alert_{}_{}",
                    now.timestamp_millis(),
                    rand::thread_rng().gen::<u32>()
                ),
                rule_id: rule.id.clone(),
                contract_address: contract_address.to_string(),
                message: alert_message(&rule.condition, event, stats),
                severity: severity(&rule.condition, event),
                condition: rule.condition,
                timestamp: now,
                acknowledged: false,
            };

            self.rules.mark_triggered(&rule.id, now);
            self.trigger(alert.clone());
            raised.push(alert);
        }

        raised
    }

    fn trigger(&self, alert: Alert) {
        info!("Alert {} [{:?}]: {}", alert.id, alert.severity, alert.message);

        if let Ok(mut alerts) = self.alerts.write() {
            alerts.push(alert.clone());
        }

        if self.sender.send(alert).is_err() {
            debug!("No alert subscribers");
        }
    }

    pub fn alerts(&self, contract_address: Option<&str>) -> Vec<Alert> {
        let Ok(alerts) = self.alerts.read() else {
            return Vec::new();
        };
        alerts
            .iter()
            .filter(|a| contract_address.map_or(true, |addr| a.contract_address == addr))
            .cloned()
            .collect()
    }

    pub fn acknowledge(&self, alert_id: &str) -> bool {
        let Ok(mut alerts) = self.alerts.write() else {
            return false;
        };
        match alerts.iter_mut().find(|a| a.id == alert_id) {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }
}

fn decoded_field<'a>(event: &'a Value, field: &str) -> Option<&'a Value> {
    event.get("decoded_data").and_then(|d| d.get(field))
}

/// Integer prefix of the decoded amount, `0` when absent and NaN when it
/// does not start with a number.
fn decoded_amount(event: &Value) -> f64 {
    match decoded_field(event, "amount") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => 0.0,
        Some(Value::Number(n)) => n.as_f64().map(f64::trunc).unwrap_or(f64::NAN),
        Some(Value::String(s)) if s.is_empty() => 0.0,
        Some(Value::String(s)) => parse_int_prefix(s),
        Some(_) => f64::NAN,
    }
}

/// Reads the leading integer of `s`. A `0x` prefix after the sign selects
/// hex; felts wider than 64 bits are accumulated as floats.
fn parse_int_prefix(s: &str) -> f64 {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, s.strip_prefix('+').unwrap_or(s)),
    };
    let (radix, digits) = match rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        Some(hex) => (16, hex),
        None => (10, rest),
    };

    digits
        .chars()
        .map_while(|c| c.to_digit(radix))
        .fold(None, |acc: Option<f64>, d| {
            Some(acc.unwrap_or(0.0) * f64::from(radix) + f64::from(d))
        })
        .map_or(f64::NAN, |v| sign * v)
}

/// `avgEventsPerBlock` coerced the way arithmetic on a loosely typed stats
/// object would: numeric strings count, null and empty strings are zero.
fn avg_events_per_block(stats: &Value) -> f64 {
    match stats.get("avgEventsPerBlock") {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => coerce_number(s),
        Some(_) => f64::NAN,
    }
}

fn coerce_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

pub fn evaluate_condition(condition: &AlertCondition, event: &Value, stats: &Value) -> bool {
    let threshold = condition.threshold.as_f64();

    match condition.kind {
        AlertKind::Volume => condition.operator.compare(decoded_amount(event), threshold),
        AlertKind::Frequency => condition
            .operator
            .compare(avg_events_per_block(stats) * BLOCKS_PER_HOUR, threshold),
        AlertKind::Gas => condition.operator.compare(ASSUMED_GAS_USED, threshold),
        AlertKind::NewUser => {
            let sender = decoded_field(event, "from");
            let known = match (stats.get("users").and_then(Value::as_array), sender) {
                (Some(users), Some(sender)) => users.contains(sender),
                _ => false,
            };
            !known && condition.threshold == Threshold::Number(1.0)
        }
        AlertKind::LargeTransfer => {
            event.get("event_name").and_then(Value::as_str) == Some("Transfer")
                && condition.operator.compare(decoded_amount(event), threshold)
        }
    }
}

pub fn severity(condition: &AlertCondition, event: &Value) -> Severity {
    match condition.kind {
        AlertKind::Volume | AlertKind::LargeTransfer => {
            let amount = decoded_amount(event);
            let threshold = condition.threshold.numeric_or_zero();
            if amount > threshold * 10.0 {
                Severity::High
            } else if amount > threshold * 3.0 {
                Severity::Medium
            } else {
                Severity::Low
            }
        }
        _ => Severity::Medium,
    }
}

/// Renders a field the way a template string interpolates it.
fn display_value(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.is_f64() => n
            .as_f64()
            .map(|f| f.to_string())
            .unwrap_or_else(|| n.to_string()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => display_value(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
        Some(other) => other.to_string(),
    }
}

fn short(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.chars().take(10).collect(),
        _ => "undefined".to_string(),
    }
}

pub fn alert_message(condition: &AlertCondition, event: &Value, stats: &Value) -> String {
    match condition.kind {
        AlertKind::Volume => format!(
            "High volume transaction detected: {} tokens",
            display_value(decoded_field(event, "amount"))
        ),
        AlertKind::Frequency => format!(
            "High frequency activity: {} events per block",
            display_value(stats.get("avgEventsPerBlock"))
        ),
        AlertKind::Gas => "High gas usage detected in transaction".to_string(),
        AlertKind::NewUser => format!(
            "New user interaction: {}...",
            short(decoded_field(event, "from"))
        ),
        AlertKind::LargeTransfer => format!(
            "Large transfer: {} tokens to {}...",
            display_value(decoded_field(event, "amount")),
            short(decoded_field(event, "to"))
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::rules::Operator;
    use serde_json::json;

    fn transfer(amount: &str) -> Value {
        json!({
            "event_name": "Transfer",
            "decoded_data": {
                "amount": amount,
                "from": "0x0123456789abcdef",
                "to": "0xfedcba9876543210"
            }
        })
    }

    fn rule(kind: AlertKind, operator: Operator, threshold: f64) -> AlertCondition {
        AlertCondition::new(kind, operator, Threshold::Number(threshold))
    }

    #[test]
    fn test_amount_parsing() {
        assert_eq!(decoded_amount(&json!({})), 0.0);
        assert_eq!(decoded_amount(&transfer("1500")), 1500.0);
        assert_eq!(decoded_amount(&transfer("42abc")), 42.0);
        assert_eq!(decoded_amount(&json!({"decoded_data": {"amount": 7.9}})), 7.0);
        assert!(decoded_amount(&transfer("abc")).is_nan());
    }

    #[test]
    fn test_hex_amounts() {
        assert_eq!(decoded_amount(&transfer("0x3e8")), 1000.0);
        assert_eq!(decoded_amount(&transfer("0X10")), 16.0);
        assert_eq!(decoded_amount(&transfer("-0x10")), -16.0);
        assert_eq!(decoded_amount(&transfer("0x1fzz")), 31.0);
        assert!(decoded_amount(&transfer("0xzz")).is_nan());
        assert!(decoded_amount(&transfer("0x")).is_nan());

        // 2^64 does not fit a u64 but still compares correctly
        assert_eq!(decoded_amount(&transfer("0x10000000000000000")), 18446744073709551616.0);
    }

    #[test]
    fn test_hex_felt_triggers_large_transfer() {
        let condition = rule(AlertKind::LargeTransfer, Operator::GreaterThan, 500.0);
        let event = transfer("0x3e8");

        assert!(evaluate_condition(&condition, &event, &json!({})));
        assert_eq!(severity(&condition, &event), Severity::Low);

        let volume = rule(AlertKind::Volume, Operator::GreaterThan, 50.0);
        assert_eq!(severity(&volume, &event), Severity::High);
    }

    #[test]
    fn test_large_transfer_rule() {
        let condition = rule(AlertKind::LargeTransfer, Operator::GreaterThan, 100.0);
        assert!(evaluate_condition(&condition, &transfer("500"), &json!({})));
        assert!(!evaluate_condition(&condition, &transfer("50"), &json!({})));

        let mut approval = transfer("500");
        approval["event_name"] = json!("Approval");
        assert!(!evaluate_condition(&condition, &approval, &json!({})));
    }

    #[test]
    fn test_frequency_and_gas_rules() {
        let frequency = AlertCondition::new(
            AlertKind::Frequency,
            Operator::GreaterThan,
            Threshold::Text("500".to_string()),
        );
        let fires = |stats: Value| evaluate_condition(&frequency, &json!({}), &stats);
        assert!(fires(json!({"avgEventsPerBlock": 2})));
        assert!(!fires(json!({"avgEventsPerBlock": 1})));
        assert!(!fires(json!({})));

        let gas = rule(AlertKind::Gas, Operator::LessThan, 80_000.0);
        assert!(evaluate_condition(&gas, &json!({}), &json!({})));
    }

    #[test]
    fn test_frequency_coerces_string_averages() {
        let frequency = rule(AlertKind::Frequency, Operator::GreaterThan, 500.0);
        let fires = |stats: Value| evaluate_condition(&frequency, &json!({}), &stats);

        assert!(fires(json!({"avgEventsPerBlock": "2"})));
        assert!(fires(json!({"avgEventsPerBlock": " 1.75 "})));
        assert!(!fires(json!({"avgEventsPerBlock": "1"})));
        assert!(!fires(json!({"avgEventsPerBlock": "two"})));

        assert_eq!(avg_events_per_block(&json!({"avgEventsPerBlock": ""})), 0.0);
        assert_eq!(avg_events_per_block(&json!({"avgEventsPerBlock": null})), 0.0);
        assert_eq!(avg_events_per_block(&json!({"avgEventsPerBlock": "0x10"})), 16.0);
        assert!(avg_events_per_block(&json!({"avgEventsPerBlock": "inf"})).is_nan());
    }

    #[test]
    fn test_new_user_rule() {
        let condition = rule(AlertKind::NewUser, Operator::Equal, 1.0);
        let event = transfer("1");

        assert!(evaluate_condition(&condition, &event, &json!({"users": ["0xother"]})));
        assert!(evaluate_condition(&condition, &event, &json!({})));
        assert!(!evaluate_condition(
            &condition,
            &event,
            &json!({"users": ["0x0123456789abcdef"]})
        ));

        let disabled = rule(AlertKind::NewUser, Operator::Equal, 0.0);
        assert!(!evaluate_condition(&disabled, &event, &json!({})));
    }

    #[test]
    fn test_severity_scaling() {
        let condition = rule(AlertKind::Volume, Operator::GreaterThan, 100.0);
        assert_eq!(severity(&condition, &transfer("1001")), Severity::High);
        assert_eq!(severity(&condition, &transfer("301")), Severity::Medium);
        assert_eq!(severity(&condition, &transfer("300")), Severity::Low);

        let gas = rule(AlertKind::Gas, Operator::GreaterThan, 1.0);
        assert_eq!(severity(&gas, &transfer("1")), Severity::Medium);
    }

    #[test]
    fn test_messages() {
        let condition = rule(AlertKind::LargeTransfer, Operator::GreaterThan, 1.0);
        assert_eq!(
            alert_message(&condition, &transfer("900"), &json!({})),
            "Large transfer: 900 tokens to 0xfedcba98..."
        );

        let new_user = rule(AlertKind::NewUser, Operator::Equal, 1.0);
        assert_eq!(
            alert_message(&new_user, &transfer("1"), &json!({})),
            "New user interaction: 0x01234567..."
        );
    }

    #[test]
    fn test_messages_render_missing_and_float_fields() {
        let frequency = rule(AlertKind::Frequency, Operator::GreaterThan, 1.0);
        assert_eq!(
            alert_message(&frequency, &json!({}), &json!({"avgEventsPerBlock": 2.0})),
            "High frequency activity: 2 events per block"
        );
        assert_eq!(
            alert_message(&frequency, &json!({}), &json!({"avgEventsPerBlock": 2.5})),
            "High frequency activity: 2.5 events per block"
        );
        assert_eq!(
            alert_message(&frequency, &json!({}), &json!({})),
            "High frequency activity: undefined events per block"
        );

        let large = rule(AlertKind::LargeTransfer, Operator::GreaterThan, 1.0);
        assert_eq!(
            alert_message(&large, &json!({"decoded_data": {}}), &json!({})),
            "Large transfer: undefined tokens to undefined..."
        );
    }

    #[tokio::test]
    async fn test_check_alerts_broadcasts_and_records() {
        let engine = AlertEngine::default();
        let mut rx = engine.subscribe();

        let rule_id = engine
            .create_alert_rule(
                "0xtoken",
                rule(AlertKind::Volume, Operator::GreaterThan, 10.0),
                "big volume",
            )
            .unwrap();
        let disabled = engine
            .create_alert_rule("0xtoken", rule(AlertKind::Gas, Operator::GreaterThan, 1.0), "gas")
            .unwrap();
        engine.rules().set_enabled(&disabled, false);

        let raised = engine.check_alerts("0xtoken", &transfer("200"), &json!({}));
        assert_eq!(raised.len(), 1);
        assert_eq!(raised[0].rule_id, rule_id);
        assert_eq!(raised[0].severity, Severity::High);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, raised[0].id);

        assert!(engine.check_alerts("0xother", &transfer("200"), &json!({})).is_empty());
        assert_eq!(engine.alerts(Some("0xtoken")).len(), 1);
        assert!(engine.rules().rules(Some("0xtoken"))[0].last_triggered.is_some());

        assert!(engine.acknowledge(&raised[0].id));
        assert!(engine.alerts(None)[0].acknowledged);
        assert!(!engine.acknowledge("alert_missing"));
    }
}
