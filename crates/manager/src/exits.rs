//! Static and trailing exit checks — the TP/SL rules the sweep enforces.

use rust_decimal::Decimal;
use tracing::info;

use play_engine_core::play::{CloseType, ExitSpec, Play, TradeType};

/// Checks all exit rules against the current market. Stop-loss rules run
/// first (more urgent), then take-profit. Returns the close reason when one
/// fires.
#[must_use]
pub fn check_exit_conditions(
    play: &Play,
    current_price: Decimal,
    current_premium: Option<Decimal>,
) -> Option<CloseType> {
    if section_triggered(
        &play.stop_loss,
        play.trade_type,
        current_price,
        current_premium.map(|p| play.premium_pl_pct(p)),
        Direction::Adverse,
    ) {
        info!(
            play = %play.play_name,
            price = %current_price,
            "Stop-loss condition met"
        );
        return Some(CloseType::StopLoss);
    }

    if section_triggered(
        &play.take_profit,
        play.trade_type,
        current_price,
        current_premium.map(|p| play.premium_pl_pct(p)),
        Direction::Favorable,
    ) {
        info!(
            play = %play.play_name,
            price = %current_price,
            "Take-profit condition met"
        );
        return Some(CloseType::TakeProfit);
    }

    None
}

#[derive(Clone, Copy, PartialEq)]
enum Direction {
    /// Take-profit: fires when the market moved with the play.
    Favorable,
    /// Stop-loss: fires when the market moved against it.
    Adverse,
}

fn section_triggered(
    section: &ExitSpec,
    trade_type: TradeType,
    price: Decimal,
    pl_pct: Option<Decimal>,
    direction: Direction,
) -> bool {
    // Static underlying-price target.
    if let Some(target) = section.stock_price {
        let hit = match (trade_type, direction) {
            (TradeType::Call, Direction::Favorable) | (TradeType::Put, Direction::Adverse) => {
                price >= target
            }
            (TradeType::Call, Direction::Adverse) | (TradeType::Put, Direction::Favorable) => {
                price <= target
            }
        };
        if hit {
            return true;
        }
    }

    // Premium percentage target.
    if let (Some(target_pct), Some(pl)) = (section.premium_pct, pl_pct) {
        let hit = match direction {
            Direction::Favorable => pl >= target_pct,
            Direction::Adverse => pl <= target_pct,
        };
        if hit {
            return true;
        }
    }

    // Trailing level, once activated: crossing back through the ratcheted
    // level exits in either section.
    if let Some(state) = &section.trail_state {
        if state.trail_activated {
            if let Some(level) = state.current_trail_level {
                let crossed = match trade_type {
                    TradeType::Call => price <= level,
                    TradeType::Put => price >= level,
                };
                if crossed {
                    return true;
                }
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use play_engine_core::play::{
        EntryPoint, OrderKind, PlayClass, TrailState,
    };
    use rust_decimal_macros::dec;

    fn make_play(trade_type: TradeType) -> Play {
        Play {
            play_name: "exit_test".to_string(),
            symbol: "AMZN".to_string(),
            trade_type,
            strike_price: dec!(200),
            contract_expiration_date: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
            creation_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            entry: EntryPoint {
                stock_price: dec!(200),
                premium: dec!(8.00),
                order_type: OrderKind::Market,
            },
            take_profit: ExitSpec {
                stock_price: Some(dec!(215)),
                premium_pct: Some(dec!(50)),
                ..Default::default()
            },
            stop_loss: ExitSpec {
                stock_price: Some(dec!(190)),
                premium_pct: Some(dec!(-40)),
                ..Default::default()
            },
            contracts: 1,
            play_class: PlayClass::Simple,
            conditional_plays: None,
            status: Default::default(),
            dynamic_gtd: Default::default(),
            integrity: true,
        }
    }

    #[test]
    fn call_take_profit_on_price_target() {
        let play = make_play(TradeType::Call);
        assert_eq!(
            check_exit_conditions(&play, dec!(216), None),
            Some(CloseType::TakeProfit)
        );
        assert_eq!(check_exit_conditions(&play, dec!(210), None), None);
    }

    #[test]
    fn call_stop_loss_on_price_target() {
        let play = make_play(TradeType::Call);
        assert_eq!(
            check_exit_conditions(&play, dec!(189), None),
            Some(CloseType::StopLoss)
        );
    }

    #[test]
    fn put_directions_are_mirrored() {
        let mut play = make_play(TradeType::Put);
        play.take_profit.stock_price = Some(dec!(185));
        play.stop_loss.stock_price = Some(dec!(210));

        assert_eq!(
            check_exit_conditions(&play, dec!(184), None),
            Some(CloseType::TakeProfit)
        );
        assert_eq!(
            check_exit_conditions(&play, dec!(211), None),
            Some(CloseType::StopLoss)
        );
        assert_eq!(check_exit_conditions(&play, dec!(200), None), None);
    }

    #[test]
    fn premium_pct_targets_fire() {
        let play = make_play(TradeType::Call);
        // +50% premium: 12.00 vs 8.00 entry. Price short of its target.
        assert_eq!(
            check_exit_conditions(&play, dec!(210), Some(dec!(12.00))),
            Some(CloseType::TakeProfit)
        );
        // -40%: 4.80.
        assert_eq!(
            check_exit_conditions(&play, dec!(195), Some(dec!(4.80))),
            Some(CloseType::StopLoss)
        );
    }

    #[test]
    fn stop_loss_outranks_take_profit() {
        let mut play = make_play(TradeType::Call);
        // Degenerate config where both would fire at once.
        play.take_profit.stock_price = Some(dec!(100));
        play.stop_loss.stock_price = Some(dec!(300));
        assert_eq!(
            check_exit_conditions(&play, dec!(200), None),
            Some(CloseType::StopLoss)
        );
    }

    #[test]
    fn activated_trailing_level_triggers() {
        let mut play = make_play(TradeType::Call);
        play.take_profit.stock_price = None;
        play.take_profit.premium_pct = None;
        play.take_profit.trail_state = Some(TrailState {
            current_trail_level: Some(dec!(207)),
            highest_favorable_price: Some(dec!(218)),
            trail_activated: true,
            ..Default::default()
        });

        // Fell back through the ratcheted level.
        assert_eq!(
            check_exit_conditions(&play, dec!(206), None),
            Some(CloseType::TakeProfit)
        );
        // Still above it.
        assert_eq!(check_exit_conditions(&play, dec!(209), None), None);
    }

    #[test]
    fn dormant_trailing_level_is_ignored() {
        let mut play = make_play(TradeType::Call);
        play.take_profit.stock_price = None;
        play.take_profit.premium_pct = None;
        play.take_profit.trail_state = Some(TrailState {
            current_trail_level: Some(dec!(207)),
            trail_activated: false,
            ..Default::default()
        });
        assert_eq!(check_exit_conditions(&play, dec!(206), None), None);
    }
}
