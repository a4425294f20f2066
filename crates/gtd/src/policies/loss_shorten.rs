//! Loss-conditional shortening — pulls the exit date in proportionally to
//! how deep the loss has breached a threshold, escalating to an immediate
//! close when the shortened date lands in the past.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Duration;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::context::GtdContext;
use crate::policy::{validate_against_schema, GtdPolicy, ParamSpec};
use crate::result::GtdResult;

const NAME: &str = "loss_shorten";
const PRIORITY: u8 = 10;

pub struct LossShorten;

#[must_use]
pub fn new() -> Box<dyn GtdPolicy> {
    Box::new(LossShorten)
}

impl GtdPolicy for LossShorten {
    fn name(&self) -> &'static str {
        NAME
    }

    fn requires_market_data(&self) -> bool {
        true
    }

    fn param_schema(&self) -> BTreeMap<&'static str, ParamSpec> {
        BTreeMap::from([(
            "loss_threshold_pct",
            ParamSpec::number("P/L percent below which shortening starts", -20.0, -100.0, 0.0),
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
        let threshold = ctx.param_decimal(NAME, "loss_threshold_pct", Decimal::from(-20));
        let Some(pl_pct) = ctx.pl_pct else {
            return Ok(GtdResult::hold("no P/L available"));
        };

        if pl_pct >= threshold {
            return Ok(GtdResult::hold(format!(
                "P/L {pl_pct}% above loss threshold {threshold}%"
            )));
        }

        // Severity scales from 0 at the threshold to 1 at double the
        // threshold (and beyond), cutting that share of the remaining days.
        let breach = threshold - pl_pct;
        let severity = (breach / threshold.abs()).min(Decimal::ONE);
        let remaining = (ctx.effective_date - ctx.current_date).num_days().max(0);
        let cut = (Decimal::from(remaining) * severity)
            .ceil()
            .to_i64()
            .unwrap_or(remaining);

        let shortened = ctx.effective_date - Duration::days(cut);
        if shortened <= ctx.current_date {
            return Ok(GtdResult::close_now(
                format!("loss {pl_pct}% breached {threshold}% and the shortened exit is already due"),
                PRIORITY,
            ));
        }

        Ok(GtdResult::shorten(
            shortened,
            format!("loss {pl_pct}% breached {threshold}% — cutting {cut} of {remaining} remaining days"),
            PRIORITY,
        ))
    }
}
