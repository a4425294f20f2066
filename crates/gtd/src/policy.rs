//! The policy contract and parameter schema machinery.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::context::GtdContext;
use crate::result::GtdResult;

/// JSON type of one policy parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Integer,
    Number,
    Boolean,
}

/// Declared shape of one policy parameter, exposed to configuration
/// surfaces as `{name: {type, description, default, min, max}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: &'static str,
    pub default: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
}

impl ParamSpec {
    #[must_use]
    pub fn integer(description: &'static str, default: i64, min: i64, max: i64) -> Self {
        Self {
            param_type: ParamType::Integer,
            description,
            default: default.into(),
            min: Some(min.into()),
            max: Some(max.into()),
        }
    }

    #[must_use]
    pub fn number(description: &'static str, default: f64, min: f64, max: f64) -> Self {
        Self {
            param_type: ParamType::Number,
            description,
            default: default.into(),
            min: Some(min.into()),
            max: Some(max.into()),
        }
    }
}

/// One pluggable exit-timing policy.
///
/// Every method is mandatory — there are no silent default overrides.
/// Stateless policies implement `load_state` as a no-op and return `None`
/// from `state`. Policies must be pure: no side effects beyond the returned
/// result and state.
pub trait GtdPolicy: Send {
    /// Stable registry name.
    fn name(&self) -> &'static str;

    /// Whether this policy is meaningless without live market data. When it
    /// is and a cycle has none, the evaluator skips the policy entirely
    /// (logged) rather than treating it as HOLD.
    fn requires_market_data(&self) -> bool;

    /// Parameter schema for validation and UI generation.
    fn param_schema(&self) -> BTreeMap<&'static str, ParamSpec>;

    /// Checks a parameter map against the schema. Returns the list of
    /// violations — never panics on bad input.
    fn validate_config(&self, params: &serde_json::Map<String, Value>) -> Vec<String>;

    /// Restores cross-cycle memory persisted on the play.
    fn load_state(&mut self, state: &Value);

    /// Cross-cycle memory to persist, if any.
    fn state(&self) -> Option<Value>;

    /// Produces this cycle's recommendation. An error is caught by the
    /// evaluator and treated as abstention, never as a sweep failure.
    fn evaluate(&mut self, ctx: &GtdContext) -> Result<GtdResult>;
}

/// Schema-driven validation shared by every bundled policy: unknown keys,
/// wrong JSON types, and out-of-bounds values are reported as strings.
#[must_use]
pub fn validate_against_schema(
    schema: &BTreeMap<&'static str, ParamSpec>,
    params: &serde_json::Map<String, Value>,
) -> Vec<String> {
    let mut violations = Vec::new();

    for key in params.keys() {
        if !schema.contains_key(key.as_str()) {
            violations.push(format!("unknown parameter `{key}`"));
        }
    }

    for (key, spec) in schema {
        let Some(value) = params.get(*key) else {
            continue;
        };
        let type_ok = match spec.param_type {
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
        };
        if !type_ok {
            violations.push(format!("parameter `{key}` has wrong type"));
            continue;
        }
        if let Some(n) = value.as_f64() {
            if let Some(min) = spec.min.as_ref().and_then(Value::as_f64) {
                if n < min {
                    violations.push(format!("parameter `{key}` below minimum {min}"));
                }
            }
            if let Some(max) = spec.max.as_ref().and_then(Value::as_f64) {
                if n > max {
                    violations.push(format!("parameter `{key}` above maximum {max}"));
                }
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> BTreeMap<&'static str, ParamSpec> {
        BTreeMap::from([(
            "max_days",
            ParamSpec::integer("maximum holding period in days", 30, 1, 365),
        )])
    }

    fn map(v: Value) -> serde_json::Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn valid_params_pass() {
        let violations = validate_against_schema(&schema(), &map(json!({"max_days": 10})));
        assert!(violations.is_empty());
    }

    #[test]
    fn out_of_range_is_reported_without_panic() {
        let violations = validate_against_schema(&schema(), &map(json!({"max_days": 0})));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("below minimum"));
    }

    #[test]
    fn unknown_key_and_wrong_type_are_reported() {
        let violations = validate_against_schema(
            &schema(),
            &map(json!({"max_days": "ten", "bogus": true})),
        );
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn schema_serializes_for_config_surfaces() {
        let json = serde_json::to_value(schema()).unwrap();
        assert_eq!(json["max_days"]["type"], "integer");
        assert_eq!(json["max_days"]["default"], 30);
        assert_eq!(json["max_days"]["min"], 1);
        assert_eq!(json["max_days"]["max"], 365);
    }
}
