//! Weekend-theta avoidance — short-dated positions pay two days of decay
//! over the weekend with no chance to trade out. Close on Friday, and on
//! Thursday pull the exit to Friday pre-emptively.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{Datelike, Duration, Weekday};
use serde_json::Value;

use crate::context::GtdContext;
use crate::policy::{validate_against_schema, GtdPolicy, ParamSpec};
use crate::result::GtdResult;

const NAME: &str = "weekend_theta";
const PRIORITY: u8 = 25;

pub struct WeekendTheta;

#[must_use]
pub fn new() -> Box<dyn GtdPolicy> {
    Box::new(WeekendTheta)
}

impl GtdPolicy for WeekendTheta {
    fn name(&self) -> &'static str {
        NAME
    }

    fn requires_market_data(&self) -> bool {
        false
    }

    fn param_schema(&self) -> BTreeMap<&'static str, ParamSpec> {
        BTreeMap::from([(
            "dte_concern",
            ParamSpec::integer("apply only when days-to-expiry is at or under this", 14, 1, 60),
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
        let concern = ctx.param_i64(NAME, "dte_concern", 14);
        if ctx.days_to_expiry > concern {
            return Ok(GtdResult::hold("outside DTE concern window"));
        }

        match ctx.current_date.weekday() {
            Weekday::Fri => Ok(GtdResult::close_now(
                format!(
                    "Friday close at {} DTE — avoiding weekend theta",
                    ctx.days_to_expiry
                ),
                PRIORITY,
            )),
            Weekday::Thu => {
                let friday = ctx.current_date + Duration::days(1);
                if friday < ctx.effective_date {
                    Ok(GtdResult::shorten(
                        friday,
                        "pre-emptive Thursday shorten ahead of weekend theta",
                        PRIORITY,
                    ))
                } else {
                    Ok(GtdResult::hold("exit already at or before Friday"))
                }
            }
            _ => Ok(GtdResult::hold("not a weekend-adjacent day")),
        }
    }
}
