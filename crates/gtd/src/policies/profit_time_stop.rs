//! Profit time stop — force-close when the take-profit hasn't been reached
//! within the allotted days, unless the position is already profitable.

use std::collections::BTreeMap;

use anyhow::Result;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::context::GtdContext;
use crate::policy::{validate_against_schema, GtdPolicy, ParamSpec};
use crate::result::GtdResult;

const NAME: &str = "profit_time_stop";
const PRIORITY: u8 = 45;

pub struct ProfitTimeStop;

#[must_use]
pub fn new() -> Box<dyn GtdPolicy> {
    Box::new(ProfitTimeStop)
}

impl GtdPolicy for ProfitTimeStop {
    fn name(&self) -> &'static str {
        NAME
    }

    fn requires_market_data(&self) -> bool {
        true
    }

    fn param_schema(&self) -> BTreeMap<&'static str, ParamSpec> {
        BTreeMap::from([(
            "max_days",
            ParamSpec::integer("days allowed to reach take-profit", 10, 1, 90),
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
        let max_days = ctx.param_i64(NAME, "max_days", 10);
        let Some(pl_pct) = ctx.pl_pct else {
            return Ok(GtdResult::hold("no P/L available"));
        };

        if pl_pct > Decimal::ZERO {
            return Ok(GtdResult::hold(format!(
                "position profitable at {pl_pct}%"
            )));
        }

        if ctx.days_held >= max_days {
            return Ok(GtdResult::close_now(
                format!(
                    "take-profit not reached within {max_days} days (P/L {pl_pct}% after {} days)",
                    ctx.days_held
                ),
                PRIORITY,
            ));
        }

        Ok(GtdResult::hold("still within profit window"))
    }
}
