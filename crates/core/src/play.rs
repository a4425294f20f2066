//! The play record — one options position tracked through its lifecycle.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option right for the play (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    Call,
    Put,
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "C"),
            Self::Put => write!(f, "P"),
        }
    }
}

/// Conditional role of a play.
///
/// PRIMARY plays carry OCO/OTO references to siblings; OTO plays sit in the
/// staging folder until their trigger fills; everything else is SIMPLE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlayClass {
    Simple,
    Primary,
    Oto,
}

impl Default for PlayClass {
    fn default() -> Self {
        Self::Simple
    }
}

/// Lifecycle status. NEW -> OPEN -> {CLOSED, EXPIRED}; the last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlayStatus {
    New,
    Open,
    Closed,
    Expired,
}

impl PlayStatus {
    /// Returns true for CLOSED and EXPIRED.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Expired)
    }
}

impl Default for PlayStatus {
    fn default() -> Self {
        Self::New
    }
}

/// Why a play was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseType {
    TakeProfit,
    StopLoss,
    Gtd,
    Manual,
}

impl std::fmt::Display for CloseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TakeProfit => write!(f, "take_profit"),
            Self::StopLoss => write!(f, "stop_loss"),
            Self::Gtd => write!(f, "gtd"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Order type used at entry or exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    Market,
    Limit,
}

impl Default for OrderKind {
    fn default() -> Self {
        Self::Market
    }
}

/// Entry terms captured when the play was created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPoint {
    /// Underlying stock price at entry.
    pub stock_price: Decimal,
    /// Contract premium paid at entry.
    pub premium: Decimal,
    #[serde(default)]
    pub order_type: OrderKind,
}

/// Trailing mode for a take-profit or stop-loss section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailMode {
    /// Level trails the peak by a percentage of the peak.
    Percent,
    /// Level trails the peak by a fixed dollar amount.
    Fixed,
}

/// Per-section trailing configuration. Disabled by default; the global
/// config gate must also be on for trailing to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingConfig {
    #[serde(default)]
    pub enabled: bool,
    pub mode: TrailMode,
    /// Percent (for `Percent` mode) or dollar amount (for `Fixed` mode).
    pub value: Decimal,
    /// Minimum favorable move from the entry stock price, in percent,
    /// before trailing activates.
    pub activation_pct: Decimal,
}

/// One accepted ratchet adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailAdjustment {
    pub timestamp: DateTime<Utc>,
    pub old_level: Option<Decimal>,
    pub new_level: Decimal,
}

/// Mutable trailing state for one section. The level only ever ratchets in
/// the trader's favor; `trail_history` is append-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrailState {
    pub current_trail_level: Option<Decimal>,
    pub highest_favorable_price: Option<Decimal>,
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trail_activated: bool,
    #[serde(default)]
    pub trail_history: Vec<TrailAdjustment>,
}

/// Exit terms for one side of the play (take-profit or stop-loss).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExitSpec {
    /// Absolute underlying price target.
    pub stock_price: Option<Decimal>,
    /// Premium percentage target relative to entry premium.
    pub premium_pct: Option<Decimal>,
    #[serde(default)]
    pub order_type: OrderKind,
    pub trailing: Option<TrailingConfig>,
    pub trail_state: Option<TrailState>,
}

/// References to sibling plays by filename.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionalPlays {
    /// Sibling canceled when this play fills (one-cancels-other).
    pub oco_trigger: Option<String>,
    /// Staged sibling promoted to NEW when this play fills (one-triggers-other).
    pub oto_trigger: Option<String>,
}

impl ConditionalPlays {
    /// True when neither trigger is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.oco_trigger.is_none() && self.oto_trigger.is_none()
    }
}

/// Broker-facing status for the play and its orders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusBlock {
    #[serde(default)]
    pub play_status: PlayStatus,
    pub order_id: Option<String>,
    pub order_status: Option<String>,
    #[serde(default)]
    pub position_exists: bool,
    pub closing_order_id: Option<String>,
    pub closing_order_status: Option<String>,
    pub close_type: Option<CloseType>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// One configured GTD policy instance on a play.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyInstance {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Dynamic Good-Til-Date block: the adjustable exit deadline overlay plus
/// per-policy persisted state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DynamicGtd {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub policies: Vec<PolicyInstance>,
    /// Cross-cycle state keyed by policy name.
    #[serde(default)]
    pub policy_state: BTreeMap<String, serde_json::Value>,
    /// Current dynamic deadline; never later than the contract expiration.
    pub effective_date: Option<NaiveDate>,
    pub last_evaluated: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// One options position instance, persisted as a single JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Play {
    /// Document identity; also the filename stem in the record store.
    pub play_name: String,
    pub symbol: String,
    pub trade_type: TradeType,
    pub strike_price: Decimal,
    /// Hard exit backstop. Immutable once set; never later than the broker
    /// contract's actual expiration.
    pub contract_expiration_date: NaiveDate,
    pub creation_date: NaiveDate,
    pub entry: EntryPoint,
    #[serde(default)]
    pub take_profit: ExitSpec,
    #[serde(default)]
    pub stop_loss: ExitSpec,
    pub contracts: u32,
    #[serde(default)]
    pub play_class: PlayClass,
    pub conditional_plays: Option<ConditionalPlays>,
    #[serde(default)]
    pub status: StatusBlock,
    #[serde(default)]
    pub dynamic_gtd: DynamicGtd,
    /// False once the record has been auto-repaired. Never cleared
    /// automatically; a human has to vouch for the record again.
    #[serde(default = "default_true")]
    pub integrity: bool,
}

impl Play {
    /// Days until the contract expiration backstop.
    #[must_use]
    pub fn days_to_expiry(&self, today: NaiveDate) -> i64 {
        (self.contract_expiration_date - today).num_days()
    }

    /// Days the position has been held, from the fill date when known,
    /// otherwise from creation.
    #[must_use]
    pub fn days_held(&self, today: NaiveDate) -> i64 {
        let entered = self.entry_date();
        (today - entered).num_days()
    }

    /// Date the position was entered: fill date when OPEN, else creation date.
    #[must_use]
    pub fn entry_date(&self) -> NaiveDate {
        self.status
            .opened_at
            .map_or(self.creation_date, |t| t.date_naive())
    }

    /// Current dynamic exit deadline, defaulting to the contract backstop.
    #[must_use]
    pub fn effective_date(&self) -> NaiveDate {
        self.dynamic_gtd
            .effective_date
            .unwrap_or(self.contract_expiration_date)
    }

    /// Unrealized P/L in percent of entry premium.
    #[must_use]
    pub fn premium_pl_pct(&self, current_premium: Decimal) -> Decimal {
        if self.entry.premium.is_zero() {
            return Decimal::ZERO;
        }
        (current_premium - self.entry.premium) / self.entry.premium * Decimal::from(100)
    }

    /// OCC-style contract symbol, e.g. `AAPL260116C00150000`.
    #[must_use]
    pub fn occ_symbol(&self) -> String {
        let strike_milli = (self.strike_price * Decimal::from(1000)).round().normalize();
        format!(
            "{}{}{}{:0>8}",
            self.symbol.to_uppercase(),
            self.contract_expiration_date.format("%y%m%d"),
            self.trade_type,
            strike_milli.to_string()
        )
    }

    /// Structural invariant check. Returns a list of violations; empty means
    /// the record is internally consistent.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.play_name.trim().is_empty() {
            violations.push("play_name is empty".to_string());
        }
        if self.contracts == 0 {
            violations.push("contracts must be positive".to_string());
        }
        if let Some(eff) = self.dynamic_gtd.effective_date {
            if eff > self.contract_expiration_date {
                violations.push(format!(
                    "effective_date {} is past contract expiration {}",
                    eff, self.contract_expiration_date
                ));
            }
        }
        let has_children = self
            .conditional_plays
            .as_ref()
            .is_some_and(|c| !c.is_empty());
        match self.play_class {
            PlayClass::Primary if !has_children => {
                violations.push("PRIMARY play has no conditional children".to_string());
            }
            PlayClass::Simple if has_children => {
                violations.push("SIMPLE play carries conditional children".to_string());
            }
            _ => {}
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_play() -> Play {
        Play {
            play_name: "AAPL_call_test".to_string(),
            symbol: "AAPL".to_string(),
            trade_type: TradeType::Call,
            strike_price: dec!(150),
            contract_expiration_date: NaiveDate::from_ymd_opt(2026, 1, 16).unwrap(),
            creation_date: NaiveDate::from_ymd_opt(2025, 12, 1).unwrap(),
            entry: EntryPoint {
                stock_price: dec!(148.50),
                premium: dec!(4.20),
                order_type: OrderKind::Limit,
            },
            take_profit: ExitSpec {
                stock_price: Some(dec!(160)),
                premium_pct: Some(dec!(50)),
                ..ExitSpec::default()
            },
            stop_loss: ExitSpec {
                stock_price: Some(dec!(140)),
                premium_pct: Some(dec!(-40)),
                ..ExitSpec::default()
            },
            contracts: 2,
            play_class: PlayClass::Simple,
            conditional_plays: None,
            status: StatusBlock::default(),
            dynamic_gtd: DynamicGtd::default(),
            integrity: true,
        }
    }

    #[test]
    fn days_to_expiry_counts_calendar_days() {
        let play = make_play();
        let today = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        assert_eq!(play.days_to_expiry(today), 7);
    }

    #[test]
    fn effective_date_defaults_to_backstop() {
        let mut play = make_play();
        assert_eq!(play.effective_date(), play.contract_expiration_date);

        let earlier = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        play.dynamic_gtd.effective_date = Some(earlier);
        assert_eq!(play.effective_date(), earlier);
    }

    #[test]
    fn premium_pl_pct_from_entry_premium() {
        let play = make_play();
        assert_eq!(play.premium_pl_pct(dec!(6.30)), dec!(50));
        assert_eq!(play.premium_pl_pct(dec!(2.10)), dec!(-50));
    }

    #[test]
    fn occ_symbol_format() {
        let play = make_play();
        assert_eq!(play.occ_symbol(), "AAPL260116C00150000");
    }

    #[test]
    fn validate_rejects_effective_date_past_backstop() {
        let mut play = make_play();
        play.dynamic_gtd.effective_date = Some(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        let violations = play.validate();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("effective_date"));
    }

    #[test]
    fn validate_enforces_play_class_consistency() {
        let mut play = make_play();
        play.play_class = PlayClass::Primary;
        assert!(!play.validate().is_empty());

        play.conditional_plays = Some(ConditionalPlays {
            oco_trigger: Some("AAPL_put_hedge.json".to_string()),
            oto_trigger: None,
        });
        assert!(play.validate().is_empty());

        play.play_class = PlayClass::Simple;
        assert!(!play.validate().is_empty());
    }

    #[test]
    fn status_defaults_survive_missing_fields() {
        // A minimal document (as a repaired record would have) deserializes
        // with NEW status and integrity defaulted true.
        let json = r#"{
            "play_name": "X_call",
            "symbol": "X",
            "trade_type": "CALL",
            "strike_price": "10",
            "contract_expiration_date": "2026-06-19",
            "creation_date": "2026-01-05",
            "entry": {"stock_price": "9.5", "premium": "0.80"},
            "contracts": 1
        }"#;
        let play: Play = serde_json::from_str(json).unwrap();
        assert_eq!(play.status.play_status, PlayStatus::New);
        assert!(play.integrity);
        assert!(!play.dynamic_gtd.enabled);
    }
}
