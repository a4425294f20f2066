//! Trailing stop/target ratchet.
//!
//! Each play section (take-profit, stop-loss) tracks the most favorable
//! underlying price seen since entry and trails an exit level behind it.
//! The level only ever ratchets in the trader's favor — it never loosens —
//! and every accepted adjustment lands in the section's append-only history.
//! Entirely config-gated: both the global flag and the per-section flag
//! must be on, and a mis-configured section is a no-op.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use play_engine_core::play::{ExitSpec, Play, TradeType, TrailAdjustment, TrailMode};

/// Updates both sections from the current underlying price. Returns whether
/// any trailing state changed (peak, activation, or level).
pub fn update_trailing_levels(
    play: &mut Play,
    current_price: Decimal,
    now: DateTime<Utc>,
    globally_enabled: bool,
) -> bool {
    let trade_type = play.trade_type;
    let entry_price = play.entry.stock_price;
    let play_name = play.play_name.clone();

    let tp_changed = update_section(
        &mut play.take_profit,
        trade_type,
        entry_price,
        current_price,
        now,
        globally_enabled,
    );
    let sl_changed = update_section(
        &mut play.stop_loss,
        trade_type,
        entry_price,
        current_price,
        now,
        globally_enabled,
    );

    if tp_changed || sl_changed {
        debug!(play = %play_name, price = %current_price, "Trailing state updated");
    }
    tp_changed || sl_changed
}

fn update_section(
    section: &mut ExitSpec,
    trade_type: TradeType,
    entry_price: Decimal,
    price: Decimal,
    now: DateTime<Utc>,
    globally_enabled: bool,
) -> bool {
    let Some(config) = section.trailing.clone() else {
        return false;
    };
    if !globally_enabled || !config.enabled {
        return false;
    }
    // Mis-configured sections are a silent no-op rather than a crash.
    if config.value <= Decimal::ZERO || config.activation_pct < Decimal::ZERO {
        return false;
    }
    if entry_price.is_zero() {
        return false;
    }

    let state = section.trail_state.get_or_insert_with(Default::default);
    let mut changed = false;

    // Track the most favorable price seen — never regresses.
    let peak = match (state.highest_favorable_price, trade_type) {
        (Some(peak), TradeType::Call) if price <= peak => peak,
        (Some(peak), TradeType::Put) if price >= peak => peak,
        _ => {
            state.highest_favorable_price = Some(price);
            state.last_update = Some(now);
            changed = true;
            price
        }
    };

    // Activation: minimum favorable move from entry, in percent.
    if !state.trail_activated {
        let favorable_move_pct = match trade_type {
            TradeType::Call => (price - entry_price) / entry_price * Decimal::from(100),
            TradeType::Put => (entry_price - price) / entry_price * Decimal::from(100),
        };
        if favorable_move_pct >= config.activation_pct {
            state.trail_activated = true;
            changed = true;
        } else {
            return changed;
        }
    }

    // Candidate level trails the peak; direction depends on the right.
    let candidate = match (config.mode, trade_type) {
        (TrailMode::Percent, TradeType::Call) => {
            peak * (Decimal::ONE - config.value / Decimal::from(100))
        }
        (TrailMode::Percent, TradeType::Put) => {
            peak * (Decimal::ONE + config.value / Decimal::from(100))
        }
        (TrailMode::Fixed, TradeType::Call) => peak - config.value,
        (TrailMode::Fixed, TradeType::Put) => peak + config.value,
    };

    // Ratchet: accept only a strictly more favorable level.
    let accept = match (state.current_trail_level, trade_type) {
        (None, _) => true,
        (Some(level), TradeType::Call) => candidate > level,
        (Some(level), TradeType::Put) => candidate < level,
    };
    if accept {
        state.trail_history.push(TrailAdjustment {
            timestamp: now,
            old_level: state.current_trail_level,
            new_level: candidate,
        });
        state.current_trail_level = Some(candidate);
        state.last_update = Some(now);
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use play_engine_core::play::{
        EntryPoint, OrderKind, PlayClass, TrailingConfig,
    };
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 20, 15, 30, 0).unwrap()
    }

    fn trailing(mode: TrailMode, value: Decimal, activation_pct: Decimal) -> TrailingConfig {
        TrailingConfig {
            enabled: true,
            mode,
            value,
            activation_pct,
        }
    }

    fn make_play(trade_type: TradeType) -> Play {
        Play {
            play_name: "trail_test".to_string(),
            symbol: "MSFT".to_string(),
            trade_type,
            strike_price: dec!(400),
            contract_expiration_date: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
            creation_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            entry: EntryPoint {
                stock_price: dec!(100),
                premium: dec!(5.00),
                order_type: OrderKind::Market,
            },
            take_profit: ExitSpec {
                trailing: Some(trailing(TrailMode::Percent, dec!(5), dec!(2))),
                ..Default::default()
            },
            stop_loss: Default::default(),
            contracts: 1,
            play_class: PlayClass::Simple,
            conditional_plays: None,
            status: Default::default(),
            dynamic_gtd: Default::default(),
            integrity: true,
        }
    }

    #[test]
    fn call_take_profit_level_never_decreases() {
        let mut play = make_play(TradeType::Call);
        let prices = [
            dec!(100),
            dec!(103),
            dec!(101),
            dec!(108),
            dec!(95),
            dec!(112),
            dec!(90),
        ];

        let mut last_level: Option<Decimal> = None;
        for price in prices {
            update_trailing_levels(&mut play, price, now(), true);
            let state = play.take_profit.trail_state.as_ref().unwrap();
            if let (Some(prev), Some(cur)) = (last_level, state.current_trail_level) {
                assert!(cur >= prev, "level regressed from {prev} to {cur}");
            }
            if state.current_trail_level.is_some() {
                last_level = state.current_trail_level;
            }
        }
        // Peak 112 with a 5% trail → 106.4.
        let state = play.take_profit.trail_state.as_ref().unwrap();
        assert_eq!(state.highest_favorable_price, Some(dec!(112)));
        assert_eq!(state.current_trail_level, Some(dec!(106.40)));
    }

    #[test]
    fn put_level_never_increases() {
        let mut play = make_play(TradeType::Put);
        let prices = [dec!(100), dec!(97), dec!(99), dec!(92), dec!(105), dec!(88)];

        let mut last_level: Option<Decimal> = None;
        for price in prices {
            update_trailing_levels(&mut play, price, now(), true);
            let state = play.take_profit.trail_state.as_ref().unwrap();
            if let (Some(prev), Some(cur)) = (last_level, state.current_trail_level) {
                assert!(cur <= prev, "level loosened from {prev} to {cur}");
            }
            if state.current_trail_level.is_some() {
                last_level = state.current_trail_level;
            }
        }
        // Trough 88 with a 5% trail above → 92.4.
        let state = play.take_profit.trail_state.as_ref().unwrap();
        assert_eq!(state.highest_favorable_price, Some(dec!(88)));
        assert_eq!(state.current_trail_level, Some(dec!(92.40)));
    }

    #[test]
    fn inactive_until_activation_threshold() {
        let mut play = make_play(TradeType::Call);
        // +1% move: below the 2% activation threshold.
        update_trailing_levels(&mut play, dec!(101), now(), true);
        let state = play.take_profit.trail_state.as_ref().unwrap();
        assert!(!state.trail_activated);
        assert!(state.current_trail_level.is_none());
        // Peak still tracked while dormant.
        assert_eq!(state.highest_favorable_price, Some(dec!(101)));

        // +3% move activates and sets the first level.
        update_trailing_levels(&mut play, dec!(103), now(), true);
        let state = play.take_profit.trail_state.as_ref().unwrap();
        assert!(state.trail_activated);
        assert!(state.current_trail_level.is_some());
    }

    #[test]
    fn globally_disabled_is_a_no_op() {
        let mut play = make_play(TradeType::Call);
        let changed = update_trailing_levels(&mut play, dec!(110), now(), false);
        assert!(!changed);
        assert!(play.take_profit.trail_state.is_none());
    }

    #[test]
    fn section_disabled_is_a_no_op() {
        let mut play = make_play(TradeType::Call);
        play.take_profit.trailing.as_mut().unwrap().enabled = false;
        let changed = update_trailing_levels(&mut play, dec!(110), now(), true);
        assert!(!changed);
        assert!(play.take_profit.trail_state.is_none());
    }

    #[test]
    fn misconfigured_section_is_a_no_op() {
        let mut play = make_play(TradeType::Call);
        play.take_profit.trailing.as_mut().unwrap().value = dec!(0);
        let changed = update_trailing_levels(&mut play, dec!(110), now(), true);
        assert!(!changed);
    }

    #[test]
    fn fixed_mode_trails_by_dollar_amount() {
        let mut play = make_play(TradeType::Call);
        play.take_profit.trailing = Some(trailing(TrailMode::Fixed, dec!(3), dec!(2)));
        update_trailing_levels(&mut play, dec!(110), now(), true);

        let state = play.take_profit.trail_state.as_ref().unwrap();
        assert_eq!(state.current_trail_level, Some(dec!(107)));
    }

    #[test]
    fn every_accepted_update_lands_in_history() {
        let mut play = make_play(TradeType::Call);
        update_trailing_levels(&mut play, dec!(105), now(), true);
        update_trailing_levels(&mut play, dec!(110), now(), true);
        // No new peak, no new level — nothing appended.
        update_trailing_levels(&mut play, dec!(104), now(), true);

        let state = play.take_profit.trail_state.as_ref().unwrap();
        assert_eq!(state.trail_history.len(), 2);
        assert_eq!(state.trail_history[0].old_level, None);
        assert_eq!(
            state.trail_history[1].old_level,
            state.trail_history[0].new_level.into()
        );
    }
}
