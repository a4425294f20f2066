//! DTE-based close — exits at or under a days-to-expiry threshold.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Duration;
use serde_json::Value;

use crate::context::GtdContext;
use crate::policy::{validate_against_schema, GtdPolicy, ParamSpec};
use crate::result::GtdResult;

const NAME: &str = "dte_close";
const PRIORITY: u8 = 40;

pub struct DteClose;

#[must_use]
pub fn new() -> Box<dyn GtdPolicy> {
    Box::new(DteClose)
}

impl GtdPolicy for DteClose {
    fn name(&self) -> &'static str {
        NAME
    }

    fn requires_market_data(&self) -> bool {
        false
    }

    fn param_schema(&self) -> BTreeMap<&'static str, ParamSpec> {
        BTreeMap::from([(
            "close_at_dte",
            ParamSpec::integer("close when days-to-expiry is at or under this", 7, 0, 60),
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
        let threshold = ctx.param_i64(NAME, "close_at_dte", 7);

        if ctx.days_to_expiry <= threshold {
            return Ok(GtdResult::close_now(
                format!(
                    "{} days to expiry, at or under the {threshold}-DTE close threshold",
                    ctx.days_to_expiry
                ),
                PRIORITY,
            ));
        }

        let target = ctx.option_expiration - Duration::days(threshold);
        if target < ctx.effective_date {
            return Ok(GtdResult::shorten(
                target,
                format!("exiting {threshold} days before option expiration"),
                PRIORITY,
            ));
        }

        Ok(GtdResult::hold("outside DTE concern window"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policies::test_support::{base_play, ctx_on, with_params};
    use crate::result::GtdAction;
    use chrono::NaiveDate;

    #[test]
    fn closes_at_or_under_threshold_citing_both_numbers() {
        let mut play = base_play();
        with_params(&mut play, NAME, serde_json::json!({"close_at_dte": 7}));
        // Expiration 2026-02-20; 5 DTE on 2026-02-15.
        let ctx = ctx_on(&play, (2026, 2, 15), None);

        let result = new().evaluate(&ctx).unwrap();
        assert_eq!(result.action, GtdAction::CloseNow);
        assert_eq!(result.priority, 40);
        assert!(result.reason.contains('5'));
        assert!(result.reason.contains('7'));
    }

    #[test]
    fn shortens_to_threshold_days_before_expiration() {
        let mut play = base_play();
        with_params(&mut play, NAME, serde_json::json!({"close_at_dte": 7}));
        let ctx = ctx_on(&play, (2026, 1, 20), None);

        let result = new().evaluate(&ctx).unwrap();
        assert_eq!(result.action, GtdAction::Shorten);
        assert_eq!(
            result.recommended_date,
            Some(NaiveDate::from_ymd_opt(2026, 2, 13).unwrap())
        );
    }

    #[test]
    fn holds_when_effective_date_already_earlier() {
        let mut play = base_play();
        with_params(&mut play, NAME, serde_json::json!({"close_at_dte": 7}));
        play.dynamic_gtd.effective_date = Some(NaiveDate::from_ymd_opt(2026, 2, 2).unwrap());
        let ctx = ctx_on(&play, (2026, 1, 20), None);

        let result = new().evaluate(&ctx).unwrap();
        assert_eq!(result.action, GtdAction::Hold);
    }
}
