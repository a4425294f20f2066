//! Per-cycle evaluation context.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use play_engine_core::market::{is_market_open, CalendarEvent, OptionGreeks, OptionQuote};
use play_engine_core::play::Play;

/// Immutable snapshot handed to every policy for one evaluation cycle.
/// Built once per play per sweep and shared read-only; policies communicate
/// back exclusively through their returned [`GtdResult`](crate::GtdResult)
/// and state.
#[derive(Debug, Clone)]
pub struct GtdContext {
    pub now: DateTime<Utc>,
    pub current_date: NaiveDate,
    pub entry_date: NaiveDate,
    /// The hard backstop; extensions clamp here.
    pub option_expiration: NaiveDate,
    /// The floating deadline as of this cycle.
    pub effective_date: NaiveDate,
    pub symbol: String,
    pub entry_price: Decimal,
    pub current_price: Option<Decimal>,
    pub entry_premium: Decimal,
    pub current_premium: Option<Decimal>,
    /// Unrealized P/L in percent of entry premium; None without market data.
    pub pl_pct: Option<Decimal>,
    pub greeks: Option<OptionGreeks>,
    pub days_held: i64,
    pub days_to_expiry: i64,
    pub market_open: bool,
    pub events: Vec<CalendarEvent>,
    params: BTreeMap<String, serde_json::Map<String, Value>>,
    state: BTreeMap<String, Value>,
}

impl GtdContext {
    /// Builds the cycle snapshot from a play plus whatever market data the
    /// collaborators produced this sweep.
    #[must_use]
    pub fn build(
        play: &Play,
        now: DateTime<Utc>,
        current_price: Option<Decimal>,
        quote: Option<&OptionQuote>,
        events: Vec<CalendarEvent>,
    ) -> Self {
        let today = now.date_naive();
        let current_premium = quote.map(OptionQuote::mid);
        let pl_pct = current_premium.map(|p| play.premium_pl_pct(p));

        let params = play
            .dynamic_gtd
            .policies
            .iter()
            .map(|p| (p.name.clone(), p.params.clone()))
            .collect();

        Self {
            now,
            current_date: today,
            entry_date: play.entry_date(),
            option_expiration: play.contract_expiration_date,
            effective_date: play.effective_date(),
            symbol: play.symbol.clone(),
            entry_price: play.entry.stock_price,
            current_price,
            entry_premium: play.entry.premium,
            current_premium,
            pl_pct,
            greeks: quote.map(|q| q.greeks),
            days_held: play.days_held(today),
            days_to_expiry: play.days_to_expiry(today),
            market_open: is_market_open(now),
            events,
            params,
            state: play.dynamic_gtd.policy_state.clone(),
        }
    }

    /// Whether this cycle has the live data that price-aware policies need.
    #[must_use]
    pub fn has_market_data(&self) -> bool {
        self.current_price.is_some() && self.current_premium.is_some()
    }

    /// Configured parameters for one policy, if any.
    #[must_use]
    pub fn params_for(&self, policy: &str) -> Option<&serde_json::Map<String, Value>> {
        self.params.get(policy)
    }

    /// Persisted cross-cycle state for one policy, if any.
    #[must_use]
    pub fn state_for(&self, policy: &str) -> Option<&Value> {
        self.state.get(policy)
    }

    /// Integer parameter with fallback to the policy's default.
    #[must_use]
    pub fn param_i64(&self, policy: &str, key: &str, default: i64) -> i64 {
        self.params_for(policy)
            .and_then(|p| p.get(key))
            .and_then(Value::as_i64)
            .unwrap_or(default)
    }

    /// Float parameter with fallback to the policy's default.
    #[must_use]
    pub fn param_f64(&self, policy: &str, key: &str, default: f64) -> f64 {
        self.params_for(policy)
            .and_then(|p| p.get(key))
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    /// Decimal parameter with fallback; accepts JSON numbers or numeric
    /// strings (the store serializes decimals as strings).
    #[must_use]
    pub fn param_decimal(&self, policy: &str, key: &str, default: Decimal) -> Decimal {
        let Some(value) = self.params_for(policy).and_then(|p| p.get(key)) else {
            return default;
        };
        match value {
            Value::Number(n) => n
                .as_f64()
                .and_then(Decimal::from_f64_retain)
                .unwrap_or(default),
            Value::String(s) => s.parse().unwrap_or(default),
            _ => default,
        }
    }

    /// P/L as f64 for policies doing ratio math against greeks.
    #[must_use]
    pub fn pl_pct_f64(&self) -> Option<f64> {
        self.pl_pct.and_then(|d| d.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use play_engine_core::play::{
        DynamicGtd, EntryPoint, OrderKind, PlayClass, PolicyInstance, TradeType,
    };
    use rust_decimal_macros::dec;

    fn make_play() -> Play {
        Play {
            play_name: "SPY_call".to_string(),
            symbol: "SPY".to_string(),
            trade_type: TradeType::Call,
            strike_price: dec!(500),
            contract_expiration_date: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            creation_date: NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            entry: EntryPoint {
                stock_price: dec!(495),
                premium: dec!(6.00),
                order_type: OrderKind::Market,
            },
            take_profit: Default::default(),
            stop_loss: Default::default(),
            contracts: 1,
            play_class: PlayClass::Simple,
            conditional_plays: None,
            status: Default::default(),
            dynamic_gtd: DynamicGtd {
                enabled: true,
                policies: vec![PolicyInstance {
                    name: "dte_close".to_string(),
                    enabled: true,
                    params: serde_json::from_str(r#"{"close_at_dte": 5}"#).unwrap(),
                }],
                ..Default::default()
            },
            integrity: true,
        }
    }

    #[test]
    fn build_computes_derived_fields() {
        let play = make_play();
        let now = Utc.with_ymd_and_hms(2026, 1, 22, 15, 0, 0).unwrap();
        let quote = OptionQuote {
            bid: dec!(8.90),
            ask: dec!(9.10),
            last: dec!(9.00),
            greeks: Default::default(),
        };
        let ctx = GtdContext::build(&play, now, Some(dec!(505)), Some(&quote), vec![]);

        assert_eq!(ctx.days_held, 10);
        assert_eq!(ctx.days_to_expiry, 29);
        assert_eq!(ctx.current_premium, Some(dec!(9.00)));
        assert_eq!(ctx.pl_pct, Some(dec!(50)));
        assert!(ctx.has_market_data());
        assert_eq!(ctx.effective_date, play.contract_expiration_date);
    }

    #[test]
    fn missing_market_data_is_visible() {
        let play = make_play();
        let now = Utc.with_ymd_and_hms(2026, 1, 22, 15, 0, 0).unwrap();
        let ctx = GtdContext::build(&play, now, None, None, vec![]);
        assert!(!ctx.has_market_data());
        assert_eq!(ctx.pl_pct, None);
    }

    #[test]
    fn params_reach_policies_by_name() {
        let play = make_play();
        let now = Utc.with_ymd_and_hms(2026, 1, 22, 15, 0, 0).unwrap();
        let ctx = GtdContext::build(&play, now, None, None, vec![]);
        assert_eq!(ctx.param_i64("dte_close", "close_at_dte", 7), 5);
        // Unknown policy or key falls back to the default.
        assert_eq!(ctx.param_i64("dte_close", "missing", 7), 7);
        assert_eq!(ctx.param_i64("nobody", "close_at_dte", 7), 7);
    }
}
