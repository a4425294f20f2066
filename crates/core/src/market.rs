//! Market snapshot types consumed from the data collaborators.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use chrono_tz::US::Eastern;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option greeks snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OptionGreeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

/// Real-time option quote with greeks, as returned by the market-data
/// collaborator for one contract symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,
    #[serde(default)]
    pub greeks: OptionGreeks,
}

impl OptionQuote {
    /// Midpoint of bid/ask, falling back to last when the book is empty.
    #[must_use]
    pub fn mid(&self) -> Decimal {
        if self.bid.is_zero() && self.ask.is_zero() {
            self.last
        } else {
            (self.bid + self.ask) / Decimal::from(2)
        }
    }
}

/// Kind of upcoming calendar event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Earnings,
    Dividend,
    Fomc,
    Cpi,
    Other,
}

/// One upcoming market event from the calendar collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// None for index-wide events (FOMC, CPI).
    pub symbol: Option<String>,
    pub date: NaiveDate,
}

impl CalendarEvent {
    /// Index-wide events apply to every play regardless of symbol.
    #[must_use]
    pub fn is_index_wide(&self) -> bool {
        self.symbol.is_none()
    }

    /// Whether this event concerns the given underlying.
    #[must_use]
    pub fn matches_symbol(&self, symbol: &str) -> bool {
        match &self.symbol {
            None => true,
            Some(s) => s.eq_ignore_ascii_case(symbol),
        }
    }
}

/// Regular-hours check for US equity options: weekdays 09:30-16:00 Eastern.
/// Holidays are not modeled; the orchestrator tolerates quiet cycles.
#[must_use]
pub fn is_market_open(now: DateTime<Utc>) -> bool {
    let eastern = now.with_timezone(&Eastern);
    if matches!(eastern.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    let minutes = eastern.hour() * 60 + eastern.minute();
    (9 * 60 + 30..16 * 60).contains(&minutes)
}
