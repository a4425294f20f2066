//! Rolling extension — keeps nudging the exit date later every cycle while
//! P/L stays above a breakeven buffer. One dip below the buffer disables
//! the policy for the life of the play; the disable flag is persisted so it
//! survives process restarts and later P/L recoveries.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::GtdContext;
use crate::policy::{validate_against_schema, GtdPolicy, ParamSpec};
use crate::result::GtdResult;

const NAME: &str = "rolling_extension";
const PRIORITY: u8 = 50;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RollingState {
    disabled: bool,
}

#[derive(Default)]
pub struct RollingExtension {
    state: RollingState,
}

#[must_use]
pub fn new() -> Box<dyn GtdPolicy> {
    Box::new(RollingExtension::default())
}

impl GtdPolicy for RollingExtension {
    fn name(&self) -> &'static str {
        NAME
    }

    fn requires_market_data(&self) -> bool {
        true
    }

    fn param_schema(&self) -> BTreeMap<&'static str, ParamSpec> {
        BTreeMap::from([
            (
                "increment_days",
                ParamSpec::integer("days added per qualifying cycle", 1, 1, 10),
            ),
            (
                "breakeven_buffer_pct",
                ParamSpec::number(
                    "P/L percent the play must stay above to keep rolling",
                    0.0,
                    -10.0,
                    50.0,
                ),
            ),
        ])
    }

    fn validate_config(&self, params: &serde_json::Map<String, Value>) -> Vec<String> {
        validate_against_schema(&self.param_schema(), params)
    }

    fn load_state(&mut self, state: &Value) {
        if let Ok(loaded) = serde_json::from_value(state.clone()) {
            self.state = loaded;
        }
    }

    fn state(&self) -> Option<Value> {
        serde_json::to_value(&self.state).ok()
    }

    fn evaluate(&mut self, ctx: &GtdContext) -> Result<GtdResult> {
        if self.state.disabled {
            return Ok(GtdResult::hold("disabled for the life of this play"));
        }

        let increment = ctx.param_i64(NAME, "increment_days", 1);
        let buffer = ctx.param_decimal(NAME, "breakeven_buffer_pct", Decimal::ZERO);
        let Some(pl_pct) = ctx.pl_pct else {
            return Ok(GtdResult::hold("no P/L available"));
        };

        if pl_pct < buffer {
            self.state.disabled = true;
            return Ok(GtdResult::hold(format!(
                "P/L {pl_pct}% fell below the {buffer}% buffer — rolling extension disabled permanently"
            )));
        }

        let candidate = (ctx.effective_date + Duration::days(increment)).min(ctx.option_expiration);
        if candidate <= ctx.effective_date {
            return Ok(GtdResult::hold("already at the expiration cap"));
        }

        Ok(GtdResult::extend(
            candidate,
            format!("P/L {pl_pct}% above buffer — rolling forward {increment} day(s)"),
            PRIORITY,
        ))
    }
}
