//! Half-life — closes at a date fraction of the entry-to-expiration life.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Duration;
use serde_json::Value;

use crate::context::GtdContext;
use crate::policy::{validate_against_schema, GtdPolicy, ParamSpec};
use crate::result::GtdResult;

const NAME: &str = "half_life";
const PRIORITY: u8 = 35;

pub struct HalfLife;

#[must_use]
pub fn new() -> Box<dyn GtdPolicy> {
    Box::new(HalfLife)
}

impl GtdPolicy for HalfLife {
    fn name(&self) -> &'static str {
        NAME
    }

    fn requires_market_data(&self) -> bool {
        false
    }

    fn param_schema(&self) -> BTreeMap<&'static str, ParamSpec> {
        BTreeMap::from([(
            "fraction",
            ParamSpec::number("fraction of the play's life before closing", 0.5, 0.1, 0.9),
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
        let fraction = ctx.param_f64(NAME, "fraction", 0.5);
        let total_life = (ctx.option_expiration - ctx.entry_date).num_days();
        if total_life <= 0 {
            return Ok(GtdResult::hold("play life already elapsed"));
        }

        #[allow(clippy::cast_possible_truncation)]
        let boundary_days = (total_life as f64 * fraction).round() as i64;

        if ctx.days_held >= boundary_days {
            return Ok(GtdResult::close_now(
                format!(
                    "held {} of {total_life} days — past the {boundary_days}-day half-life boundary",
                    ctx.days_held
                ),
                PRIORITY,
            ));
        }

        let boundary = ctx.entry_date + Duration::days(boundary_days);
        if boundary < ctx.effective_date {
            return Ok(GtdResult::shorten(
                boundary,
                format!("half-life boundary at day {boundary_days}"),
                PRIORITY,
            ));
        }

        Ok(GtdResult::hold("before half-life boundary"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::test_support::{base_play, ctx_on, with_params};
    use crate::result::GtdAction;
    use chrono::NaiveDate;

    #[test]
    fn closes_exactly_at_half_life() {
        let mut play = base_play();
        with_params(&mut play, NAME, serde_json::json!({"fraction": 0.5}));
        // 20-day life: entry 2026-01-05, expiration 2026-01-25.
        play.contract_expiration_date = NaiveDate::from_ymd_opt(2026, 1, 25).unwrap();
        // 10 days held = the boundary.
        let ctx = ctx_on(&play, (2026, 1, 15), None);

        let result = new().evaluate(&ctx).unwrap();
        assert_eq!(result.action, GtdAction::CloseNow);
    }

    #[test]
    fn shortens_to_boundary_before_it() {
        let mut play = base_play();
        with_params(&mut play, NAME, serde_json::json!({"fraction": 0.5}));
        play.contract_expiration_date = NaiveDate::from_ymd_opt(2026, 1, 25).unwrap();
        let ctx = ctx_on(&play, (2026, 1, 8), None);

        let result = new().evaluate(&ctx).unwrap();
        assert_eq!(result.action, GtdAction::Shorten);
        assert_eq!(
            result.recommended_date,
            Some(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap())
        );
    }

    #[test]
    fn default_fraction_is_half() {
        let play = base_play();
        // 46-day life; boundary at day 23 (2026-01-28).
        let ctx = ctx_on(&play, (2026, 1, 10), None);

        let result = new().evaluate(&ctx).unwrap();
        assert_eq!(result.action, GtdAction::Shorten);
        assert_eq!(
            result.recommended_date,
            Some(NaiveDate::from_ymd_opt(2026, 1, 28).unwrap())
        );
    }
}
