//! Event-based exits — gets out ahead of binary events. Single-stock events
//! (earnings, dividends) only touch plays on that symbol; index-wide events
//! (FOMC, CPI) touch every play.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Duration;
use serde_json::Value;

use play_engine_core::market::CalendarEvent;

use crate::context::GtdContext;
use crate::policy::{validate_against_schema, GtdPolicy, ParamSpec};
use crate::result::GtdResult;

const NAME: &str = "event_calendar";
const PRIORITY: u8 = 15;

pub struct EventCalendarPolicy;

#[must_use]
pub fn new() -> Box<dyn GtdPolicy> {
    Box::new(EventCalendarPolicy)
}

impl GtdPolicy for EventCalendarPolicy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn requires_market_data(&self) -> bool {
        false
    }

    fn param_schema(&self) -> BTreeMap<&'static str, ParamSpec> {
        BTreeMap::from([
            (
                "close_days_before",
                ParamSpec::integer("close when a matching event is this close", 1, 0, 5),
            ),
            (
                "shorten_days_before",
                ParamSpec::integer("shorten when a matching event is this close", 3, 1, 10),
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
        let close_before = ctx.param_i64(NAME, "close_days_before", 1);
        let shorten_before = ctx.param_i64(NAME, "shorten_days_before", 3);

        // Soonest upcoming event that concerns this play's underlying.
        let next: Option<&CalendarEvent> = ctx
            .events
            .iter()
            .filter(|e| e.date >= ctx.current_date && e.matches_symbol(&ctx.symbol))
            .min_by_key(|e| e.date);

        let Some(event) = next else {
            return Ok(GtdResult::hold("no matching upcoming events"));
        };

        let days_until = (event.date - ctx.current_date).num_days();
        let scope = if event.is_index_wide() {
            "index-wide"
        } else {
            "single-stock"
        };

        if days_until <= close_before {
            return Ok(GtdResult::close_now(
                format!(
                    "{scope} {:?} event on {} is {days_until} day(s) away",
                    event.kind, event.date
                ),
                PRIORITY,
            ));
        }

        if days_until <= shorten_before {
            let target = event.date - Duration::days(close_before);
            if target < ctx.effective_date {
                return Ok(GtdResult::shorten(
                    target,
                    format!(
                        "{scope} {:?} event on {} — exiting {close_before} day(s) ahead",
                        event.kind, event.date
                    ),
                    PRIORITY,
                ));
            }
        }

        Ok(GtdResult::hold("no event inside the concern window"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GtdContext;
    use crate::policies::test_support::{base_play, with_params};
    use crate::result::GtdAction;
    use chrono::{NaiveDate, TimeZone, Utc};
    use play_engine_core::market::EventKind;

    fn event(kind: EventKind, symbol: Option<&str>, ymd: (i32, u32, u32)) -> CalendarEvent {
        CalendarEvent {
            kind,
            symbol: symbol.map(String::from),
            date: NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap(),
        }
    }

    fn ctx_with_events(events: Vec<CalendarEvent>) -> GtdContext {
        let mut play = base_play();
        with_params(
            &mut play,
            NAME,
            serde_json::json!({"close_days_before": 1, "shorten_days_before": 3}),
        );
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 17, 0, 0).unwrap();
        GtdContext::build(&play, now, None, None, events)
    }

    #[test]
    fn imminent_matching_event_closes() {
        let ctx = ctx_with_events(vec![event(
            EventKind::Earnings,
            Some("QQQ"),
            (2026, 1, 21),
        )]);
        let result = new().evaluate(&ctx).unwrap();
        assert_eq!(result.action, GtdAction::CloseNow);
        assert_eq!(result.priority, PRIORITY);
    }

    #[test]
    fn nearby_event_shortens_to_the_day_before() {
        let ctx = ctx_with_events(vec![event(
            EventKind::Earnings,
            Some("QQQ"),
            (2026, 1, 23),
        )]);
        let result = new().evaluate(&ctx).unwrap();
        assert_eq!(result.action, GtdAction::Shorten);
        assert_eq!(
            result.recommended_date,
            Some(NaiveDate::from_ymd_opt(2026, 1, 22).unwrap())
        );
    }

    #[test]
    fn other_symbols_earnings_are_ignored() {
        let ctx = ctx_with_events(vec![event(
            EventKind::Earnings,
            Some("TSLA"),
            (2026, 1, 21),
        )]);
        let result = new().evaluate(&ctx).unwrap();
        assert_eq!(result.action, GtdAction::Hold);
    }

    #[test]
    fn index_wide_event_hits_every_symbol() {
        let ctx = ctx_with_events(vec![event(EventKind::Fomc, None, (2026, 1, 21))]);
        let result = new().evaluate(&ctx).unwrap();
        assert_eq!(result.action, GtdAction::CloseNow);
        assert!(result.reason.contains("index-wide"));
    }

    #[test]
    fn past_events_are_ignored() {
        let ctx = ctx_with_events(vec![event(
            EventKind::Earnings,
            Some("QQQ"),
            (2026, 1, 10),
        )]);
        let result = new().evaluate(&ctx).unwrap();
        assert_eq!(result.action, GtdAction::Hold);
    }
}
