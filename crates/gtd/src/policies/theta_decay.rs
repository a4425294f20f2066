//! Theta-decay threshold — closes when daily time decay eats too large a
//! share of the remaining premium.

use std::collections::BTreeMap;

use anyhow::Result;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;

use crate::context::GtdContext;
use crate::policy::{validate_against_schema, GtdPolicy, ParamSpec};
use crate::result::GtdResult;

const NAME: &str = "theta_decay";
const PRIORITY: u8 = 20;

pub struct ThetaDecay;

#[must_use]
pub fn new() -> Box<dyn GtdPolicy> {
    Box::new(ThetaDecay)
}

impl GtdPolicy for ThetaDecay {
    fn name(&self) -> &'static str {
        NAME
    }

    fn requires_market_data(&self) -> bool {
        true
    }

    fn param_schema(&self) -> BTreeMap<&'static str, ParamSpec> {
        BTreeMap::from([(
            "max_theta_pct",
            ParamSpec::number(
                "max daily theta as a percent of current premium",
                5.0,
                0.5,
                50.0,
            ),
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
        let max_pct = ctx.param_f64(NAME, "max_theta_pct", 5.0);
        let Some(greeks) = ctx.greeks else {
            return Ok(GtdResult::hold("no greeks available"));
        };
        let Some(premium) = ctx.current_premium.and_then(|p| p.to_f64()) else {
            return Ok(GtdResult::hold("no premium available"));
        };
        if premium <= 0.0 {
            return Ok(GtdResult::hold("premium is zero"));
        }

        let daily_burn_pct = greeks.theta.abs() / premium * 100.0;
        if daily_burn_pct > max_pct {
            return Ok(GtdResult::close_now(
                format!(
                    "daily theta {:.2} burns {daily_burn_pct:.1}% of the {premium:.2} premium (max {max_pct}%)",
                    greeks.theta.abs()
                ),
                PRIORITY,
            ));
        }

        Ok(GtdResult::hold(format!(
            "theta burn {daily_burn_pct:.1}% within bounds"
        )))
    }
}
