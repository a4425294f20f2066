//! Maximum hold days — a simple calendar cap on how long a play stays on.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Duration;
use serde_json::Value;

use crate::context::GtdContext;
use crate::policy::{validate_against_schema, GtdPolicy, ParamSpec};
use crate::result::GtdResult;

const NAME: &str = "max_hold_days";
const PRIORITY: u8 = 30;

pub struct MaxHoldDays;

#[must_use]
pub fn new() -> Box<dyn GtdPolicy> {
    Box::new(MaxHoldDays)
}

impl GtdPolicy for MaxHoldDays {
    fn name(&self) -> &'static str {
        NAME
    }

    fn requires_market_data(&self) -> bool {
        false
    }

    fn param_schema(&self) -> BTreeMap<&'static str, ParamSpec> {
        BTreeMap::from([(
            "max_days",
            ParamSpec::integer("maximum holding period in calendar days", 30, 1, 365),
        )])
    }

    fn validate_config(&self, params: &serde_json::Map<String, Value>) -> Vec<String> {
        validate_against_schema(&self.param_schema(), params)
    }

    fn load_state(&mut self, _state: &Value) {}

    fn state(&self) -> Option<Value> {
        None
    }

    fn evaluate(&mut self, ctx: &GtdContext) -> Result<GtdResult> {
        let max_days = ctx.param_i64(NAME, "max_days", 30);

        if ctx.days_held >= max_days {
            return Ok(GtdResult::close_now(
                format!(
                    "held {} days, at or past the {max_days}-day maximum",
                    ctx.days_held
                ),
                PRIORITY,
            ));
        }

        let deadline = ctx.entry_date + Duration::days(max_days);
        if deadline < ctx.effective_date {
            return Ok(GtdResult::shorten(
                deadline,
                format!("capping hold at {max_days} days from entry"),
                PRIORITY,
            ));
        }

        Ok(GtdResult::hold("within maximum hold period"))
    }
}
