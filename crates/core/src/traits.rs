//! Narrow interfaces to external collaborators. The engine never talks to a
//! broker or data vendor directly; implementations live outside this
//! workspace.

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::market::{CalendarEvent, OptionQuote};

/// Market-data collaborator. `None` means the vendor has no data this cycle;
/// policies that need it are skipped, not failed.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn stock_price(&self, symbol: &str) -> Result<Option<Decimal>>;
    async fn option_quote(&self, contract_symbol: &str) -> Result<Option<OptionQuote>>;
}

/// Optional calendar collaborator feeding event-aware GTD policies.
#[async_trait]
pub trait EventCalendar: Send + Sync {
    async fn upcoming_events(&self) -> Result<Vec<CalendarEvent>>;
}
