//! Profit-conditional extension — the only policy allowed to push the
//! effective date later, and only while the position carries enough
//! unrealized profit. Always clamps to the option expiration.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::context::GtdContext;
use crate::policy::{validate_against_schema, GtdPolicy, ParamSpec};
use crate::result::GtdResult;

const NAME: &str = "profit_extend";
const PRIORITY: u8 = 50;

pub struct ProfitExtend;

#[must_use]
pub fn new() -> Box<dyn GtdPolicy> {
    Box::new(ProfitExtend)
}

impl GtdPolicy for ProfitExtend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn requires_market_data(&self) -> bool {
        true
    }

    fn param_schema(&self) -> BTreeMap<&'static str, ParamSpec> {
        BTreeMap::from([
            (
                "min_profit_pct",
                ParamSpec::number("minimum unrealized profit percent to extend", 10.0, 0.0, 500.0),
            ),
            (
                "extend_days",
                ParamSpec::integer("days added per qualifying cycle", 7, 1, 30),
            ),
        ])
    }

    fn validate_config(&self, params: &serde_json::Map<String, Value>) -> Vec<String> {
        validate_against_schema(&self.param_schema(), params)
    }

    fn load_state(&mut self, _state: &Value) {}

    fn state(&self) -> Option<Value> {
        None
    }

    fn evaluate(&mut self, ctx: &GtdContext) -> Result<GtdResult> {
        let min_profit = ctx.param_decimal(NAME, "min_profit_pct", Decimal::from(10));
        let extend_days = ctx.param_i64(NAME, "extend_days", 7);
        let Some(pl_pct) = ctx.pl_pct else {
            return Ok(GtdResult::hold("no P/L available"));
        };

        if pl_pct < min_profit {
            return Ok(GtdResult::hold(format!(
                "profit {pl_pct}% under the {min_profit}% extension floor"
            )));
        }

        let candidate =
            (ctx.effective_date + Duration::days(extend_days)).min(ctx.option_expiration);
        if candidate <= ctx.effective_date {
            return Ok(GtdResult::hold("already at the expiration cap"));
        }

        Ok(GtdResult::extend(
            candidate,
            format!("profit {pl_pct}% earns a {extend_days}-day extension"),
            PRIORITY,
        ))
    }
}
